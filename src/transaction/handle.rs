use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::codec;
use super::config::{TransactionConcurrency, TransactionConfig, TransactionIsolation};
use super::state::{Lifecycle, TransactionId, TransactionOutcome, TransactionState};
use crate::binary::{ClientOperation, Communicator, MessageBuffer};
use crate::core::{ClientError, Result};

/// Client handle for one server-side transaction.
///
/// Created inactive; [`start`](Transaction::start) opens the transaction on
/// the server and [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback) ends it. The end request is sent at
/// most once no matter how many of these calls race, and a handle dropped
/// while still active rolls itself back.
///
/// All methods take `&self`, so a handle can be shared across threads
/// behind an `Arc`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rustignite::{BinaryCommunicator, LoopbackServer, Transaction, TransactionConfig};
///
/// # fn main() -> rustignite::Result<()> {
/// let server = Arc::new(LoopbackServer::new());
/// let communicator = Arc::new(BinaryCommunicator::new(server.clone()));
///
/// let tx = Transaction::with_config(communicator, TransactionConfig::default())?;
/// let id = tx.start()?.expect("fresh transaction");
/// assert_eq!(tx.id(), Some(id));
///
/// tx.commit()?;
/// assert_eq!(server.committed_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Transaction {
    /// Shared connection; owned by the client, not by the transaction
    communicator: Arc<dyn Communicator>,
    config: TransactionConfig,
    lifecycle: Mutex<Lifecycle>,
}

impl Transaction {
    /// Create an inactive transaction.
    ///
    /// # Errors
    /// Returns `IllegalArgument` if `timeout` is negative. Nothing is sent.
    pub fn new(
        communicator: Arc<dyn Communicator>,
        concurrency: TransactionConcurrency,
        isolation: TransactionIsolation,
        timeout: i64,
        label: Option<String>,
    ) -> Result<Self> {
        let config = TransactionConfig::new(concurrency, isolation, timeout, label)?;
        Self::with_config(communicator, config)
    }

    pub fn with_config(communicator: Arc<dyn Communicator>, config: TransactionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            communicator,
            config,
            lifecycle: Mutex::new(Lifecycle::Inactive),
        })
    }

    /// Open the transaction on the server.
    ///
    /// Returns the server-assigned id, or `None` if the handle was already
    /// started or closed. The state lock is held across the round trip so
    /// concurrent callers cannot both send a start request. On error the
    /// handle stays inactive.
    pub fn start(&self) -> Result<Option<TransactionId>> {
        let mut lifecycle = self.lifecycle.lock()?;
        if !matches!(*lifecycle, Lifecycle::Inactive) {
            debug!("start ignored: transaction is {}", lifecycle.state());
            return Ok(None);
        }

        let communicator = self.communicator.as_ref();
        let mut assigned = None;
        communicator.send(
            ClientOperation::TxStart,
            &mut |buffer| codec::write_begin_request(buffer, &self.config),
            Some(&mut |buffer: &mut MessageBuffer| {
                assigned = Some(codec::read_begin_response(communicator, buffer)?);
                Ok(())
            }),
        )?;
        let id = assigned
            .ok_or_else(|| ClientError::protocol("Start response was not read"))?;

        lifecycle.activate(id, Utc::now())?;
        debug!(
            "transaction {} started ({}, {}, timeout {} ms)",
            id, self.config.concurrency, self.config.isolation, self.config.timeout
        );
        Ok(Some(id))
    }

    /// Commit the transaction. No-op unless the transaction is active.
    pub fn commit(&self) -> Result<()> {
        self.end(TransactionOutcome::Committed)
    }

    /// Roll back the transaction. No-op unless the transaction is active.
    pub fn rollback(&self) -> Result<()> {
        self.end(TransactionOutcome::RolledBack)
    }

    /// Close the handle explicitly: rolls back if still active.
    ///
    /// Unlike dropping the handle, a failure here is returned to the caller.
    pub fn close(&self) -> Result<()> {
        self.rollback()
    }

    fn end(&self, outcome: TransactionOutcome) -> Result<()> {
        // The state flips to Closed before the request goes out, so a failed
        // send is never retried by another close path.
        let id = self.lifecycle.lock()?.close(outcome);
        match id {
            Some(id) => self.send_end(id, outcome.commit_flag()),
            None => {
                debug!("{:?} ignored: nothing to end", outcome);
                Ok(())
            }
        }
    }

    fn send_end(&self, id: TransactionId, commit: bool) -> Result<()> {
        debug!("ending transaction {} (commit = {})", id, commit);
        self.communicator.send(
            ClientOperation::TxEnd,
            &mut |buffer| {
                codec::write_end_request(buffer, id, commit);
                Ok(())
            },
            None,
        )
    }

    fn snapshot(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn concurrency(&self) -> TransactionConcurrency {
        self.config.concurrency
    }

    pub fn isolation(&self) -> TransactionIsolation {
        self.config.isolation
    }

    /// Timeout in milliseconds; 0 means none.
    pub fn timeout(&self) -> i64 {
        self.config.timeout
    }

    pub fn label(&self) -> Option<&str> {
        self.config.label.as_deref()
    }

    /// Current lifecycle state.
    ///
    /// Blocks while a [`start`](Transaction::start) call is waiting for its response.
    pub fn state(&self) -> TransactionState {
        self.snapshot().state()
    }

    /// Server-assigned id; `None` until [`start`](Transaction::start) succeeds.
    ///
    /// Like [`state`](Transaction::state), this blocks while a start is in flight.
    pub fn id(&self) -> Option<TransactionId> {
        self.snapshot().session().map(|session| session.id)
    }

    /// When the start response arrived; `None` until started.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.snapshot().session().map(|session| session.started_at)
    }

    /// How the transaction ended; `None` until closed.
    pub fn outcome(&self) -> Option<TransactionOutcome> {
        self.snapshot().outcome()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("config", &self.config)
            .field("lifecycle", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let id = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .close(TransactionOutcome::RolledBack);

        if let Some(id) = id {
            warn!("transaction {} dropped while active, rolling back", id);
            if let Err(err) = self.send_end(id, false) {
                warn!("implicit rollback of transaction {} failed: {}", id, err);
            }
        }
    }
}
