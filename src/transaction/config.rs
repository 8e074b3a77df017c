use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{ClientError, Result};

/// Locking policy the server applies to the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionConcurrency {
    Optimistic,
    #[default]
    Pessimistic,
}

impl TransactionConcurrency {
    /// Wire code of this mode.
    pub fn code(&self) -> u8 {
        match self {
            TransactionConcurrency::Optimistic => 0,
            TransactionConcurrency::Pessimistic => 1,
        }
    }
}

impl TryFrom<u8> for TransactionConcurrency {
    type Error = ClientError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(TransactionConcurrency::Optimistic),
            1 => Ok(TransactionConcurrency::Pessimistic),
            other => Err(ClientError::illegal_argument(format!(
                "Unknown concurrency mode code {}",
                other
            ))),
        }
    }
}

impl FromStr for TransactionConcurrency {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPTIMISTIC" => Ok(TransactionConcurrency::Optimistic),
            "PESSIMISTIC" => Ok(TransactionConcurrency::Pessimistic),
            _ => Err(ClientError::illegal_argument(format!(
                "Unknown concurrency mode '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for TransactionConcurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionConcurrency::Optimistic => write!(f, "OPTIMISTIC"),
            TransactionConcurrency::Pessimistic => write!(f, "PESSIMISTIC"),
        }
    }
}

/// Visibility guarantee for concurrent changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionIsolation {
    ReadCommitted,
    #[default]
    RepeatableRead,
    Serializable,
}

impl TransactionIsolation {
    /// Wire code of this level.
    pub fn code(&self) -> u8 {
        match self {
            TransactionIsolation::ReadCommitted => 0,
            TransactionIsolation::RepeatableRead => 1,
            TransactionIsolation::Serializable => 2,
        }
    }
}

impl TryFrom<u8> for TransactionIsolation {
    type Error = ClientError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(TransactionIsolation::ReadCommitted),
            1 => Ok(TransactionIsolation::RepeatableRead),
            2 => Ok(TransactionIsolation::Serializable),
            other => Err(ClientError::illegal_argument(format!(
                "Unknown isolation level code {}",
                other
            ))),
        }
    }
}

impl FromStr for TransactionIsolation {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "READ_COMMITTED" => Ok(TransactionIsolation::ReadCommitted),
            "REPEATABLE_READ" => Ok(TransactionIsolation::RepeatableRead),
            "SERIALIZABLE" => Ok(TransactionIsolation::Serializable),
            _ => Err(ClientError::illegal_argument(format!(
                "Unknown isolation level '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for TransactionIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionIsolation::ReadCommitted => write!(f, "READ_COMMITTED"),
            TransactionIsolation::RepeatableRead => write!(f, "REPEATABLE_READ"),
            TransactionIsolation::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Parameters fixed when a transaction is created.
///
/// `timeout` is in milliseconds and enforced by the server; 0 means no timeout.
///
/// # Examples
///
/// ```
/// use rustignite::{TransactionConcurrency, TransactionConfig, TransactionIsolation};
///
/// let config = TransactionConfig::default()
///     .concurrency(TransactionConcurrency::Optimistic)
///     .isolation(TransactionIsolation::Serializable)
///     .timeout_ms(5_000)
///     .label("checkout");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub concurrency: TransactionConcurrency,
    pub isolation: TransactionIsolation,
    pub timeout: i64,
    pub label: Option<String>,
}

impl TransactionConfig {
    /// Create a validated configuration.
    pub fn new(
        concurrency: TransactionConcurrency,
        isolation: TransactionIsolation,
        timeout: i64,
        label: Option<String>,
    ) -> Result<Self> {
        let config = Self {
            concurrency,
            isolation,
            timeout,
            label,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the concurrency mode
    pub fn concurrency(mut self, concurrency: TransactionConcurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the isolation level
    pub fn isolation(mut self, isolation: TransactionIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the timeout in milliseconds (0 = infinite)
    pub fn timeout_ms(mut self, timeout: i64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout from a duration, saturating at `i64::MAX` milliseconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Set the label
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClientError::illegal_argument(format!("Invalid transaction config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout < 0 {
            return Err(ClientError::illegal_argument(format!(
                "Timeout value should be a positive integer, {} passed instead",
                self.timeout
            )));
        }
        Ok(())
    }
}

/// Settings string form: `concurrency=optimistic;isolation=serializable;timeout=5000;label=nightly`.
///
/// Keys may appear in any order and missing keys keep their defaults.
impl FromStr for TransactionConfig {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let mut config = TransactionConfig::default();

        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ClientError::illegal_argument(format!("Expected key=value, got '{}'", pair))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "concurrency" => config.concurrency = value.parse()?,
                "isolation" => config.isolation = value.parse()?,
                "timeout" => {
                    config.timeout = value.parse().map_err(|_| {
                        ClientError::illegal_argument(format!("Invalid timeout '{}'", value))
                    })?
                }
                "label" => config.label = Some(value.to_string()),
                other => {
                    return Err(ClientError::illegal_argument(format!(
                        "Unknown transaction setting '{}'",
                        other
                    )));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

impl fmt::Display for TransactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "concurrency={};isolation={};timeout={}",
            self.concurrency, self.isolation, self.timeout
        )?;
        if let Some(label) = &self.label {
            write!(f, ";label={}", label)?;
        }
        Ok(())
    }
}
