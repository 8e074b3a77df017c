use std::sync::Arc;

use log::warn;

use crate::binary::Communicator;
use crate::core::{ClientError, Result};
use crate::transaction::{Transaction, TransactionConfig};

/// Entry point for creating transactions over a shared communicator.
///
/// Holds the default [`TransactionConfig`] used by [`Client::tx_start`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rustignite::{BinaryCommunicator, Client, LoopbackServer};
///
/// # fn main() -> rustignite::Result<()> {
/// let server = Arc::new(LoopbackServer::new());
/// let client = Client::new(Arc::new(BinaryCommunicator::new(server.clone())));
///
/// let tx = client.tx_start()?;
/// assert!(tx.is_active());
/// tx.commit()?;
///
/// assert!(server.open_transactions().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    communicator: Arc<dyn Communicator>,
    defaults: TransactionConfig,
}

impl Client {
    pub fn new(communicator: Arc<dyn Communicator>) -> Self {
        Self {
            communicator,
            defaults: TransactionConfig::default(),
        }
    }

    /// Create a client whose transactions default to `defaults`.
    pub fn with_defaults(
        communicator: Arc<dyn Communicator>,
        defaults: TransactionConfig,
    ) -> Result<Self> {
        defaults.validate()?;
        Ok(Self {
            communicator,
            defaults,
        })
    }

    pub fn communicator(&self) -> &Arc<dyn Communicator> {
        &self.communicator
    }

    pub fn defaults(&self) -> &TransactionConfig {
        &self.defaults
    }

    /// Create a transaction with the default configuration without starting it.
    pub fn transaction(&self) -> Result<Transaction> {
        Transaction::with_config(Arc::clone(&self.communicator), self.defaults.clone())
    }

    /// Start a transaction with the default configuration.
    pub fn tx_start(&self) -> Result<Transaction> {
        self.tx_start_with(self.defaults.clone())
    }

    /// Start a transaction with an explicit configuration.
    pub fn tx_start_with(&self, config: TransactionConfig) -> Result<Transaction> {
        let tx = Transaction::with_config(Arc::clone(&self.communicator), config)?;
        tx.start()?;
        Ok(tx)
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok` and rolls back when it returns `Err`.
    /// If `f` already ended the transaction itself, nothing more is sent.
    /// A failed rollback is logged and the closure's error is returned.
    pub fn in_transaction<T, E, F>(&self, config: TransactionConfig, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction) -> std::result::Result<T, E>,
        E: From<ClientError>,
    {
        let tx = self.tx_start_with(config)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("rollback after failed transaction body failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
