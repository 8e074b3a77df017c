// ============================================================================
// Transaction State Management
// ============================================================================
//
// Client-side lifecycle of one server transaction:
//
//   Inactive ──start──> Active ──commit/rollback/drop──> Closed
//
// The server-assigned identifier and start time only exist from Active on,
// so they live inside the `Active` and `Closed` variants instead of beside
// the state tag.
//
// ============================================================================

use chrono::{DateTime, Utc};

use crate::core::{ClientError, Result};

/// Server-assigned identifier of an open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub i32);

impl TransactionId {
    /// Get the raw ID value
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Inactive,
    Active,
    Closed,
}

impl TransactionState {
    /// Numeric code, matching the protocol's state enumeration.
    pub fn code(&self) -> u8 {
        match self {
            TransactionState::Inactive => 0,
            TransactionState::Active => 1,
            TransactionState::Closed => 2,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Closed)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Inactive => write!(f, "INACTIVE"),
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// How a closed transaction was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

impl TransactionOutcome {
    /// Value of the commit flag sent in the end request.
    pub fn commit_flag(&self) -> bool {
        matches!(self, TransactionOutcome::Committed)
    }
}

/// What the client knows about a transaction the server has opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: TransactionId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Inactive,
    Active(Session),
    Closed {
        session: Session,
        outcome: TransactionOutcome,
    },
}

impl Lifecycle {
    pub fn state(&self) -> TransactionState {
        match self {
            Lifecycle::Inactive => TransactionState::Inactive,
            Lifecycle::Active(_) => TransactionState::Active,
            Lifecycle::Closed { .. } => TransactionState::Closed,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Lifecycle::Inactive => None,
            Lifecycle::Active(session) | Lifecycle::Closed { session, .. } => Some(session),
        }
    }

    pub fn outcome(&self) -> Option<TransactionOutcome> {
        match self {
            Lifecycle::Closed { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }

    /// Record the identifier returned by the server.
    ///
    /// # Errors
    /// Returns error unless the lifecycle is still inactive
    pub fn activate(&mut self, id: TransactionId, started_at: DateTime<Utc>) -> Result<()> {
        if !matches!(self, Lifecycle::Inactive) {
            return Err(ClientError::illegal_argument(format!(
                "Cannot start: transaction is already {}",
                self.state()
            )));
        }
        *self = Lifecycle::Active(Session { id, started_at });
        Ok(())
    }

    /// Move an active transaction to `Closed`.
    ///
    /// Returns the identifier the end request must carry, or `None` when there
    /// is nothing to end (never started, or already closed).
    pub fn close(&mut self, outcome: TransactionOutcome) -> Option<TransactionId> {
        match *self {
            Lifecycle::Active(session) => {
                *self = Lifecycle::Closed { session, outcome };
                Some(session.id)
            }
            Lifecycle::Inactive | Lifecycle::Closed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_lifecycle() {
        let mut lifecycle = Lifecycle::default();
        assert_eq!(lifecycle.state(), TransactionState::Inactive);
        assert!(lifecycle.session().is_none());

        let now = Utc::now();
        lifecycle.activate(TransactionId(5), now).unwrap();
        assert_eq!(lifecycle.state(), TransactionState::Active);
        assert!(lifecycle.state().is_active());
        assert_eq!(lifecycle.session().map(|s| s.id), Some(TransactionId(5)));

        assert_eq!(
            lifecycle.close(TransactionOutcome::Committed),
            Some(TransactionId(5))
        );
        assert!(lifecycle.state().is_terminal());
        assert_eq!(lifecycle.outcome(), Some(TransactionOutcome::Committed));
        // The session survives closing.
        assert_eq!(lifecycle.session().map(|s| s.started_at), Some(now));
    }

    #[test]
    fn test_cannot_close_twice() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.activate(TransactionId(1), Utc::now()).unwrap();

        assert!(lifecycle.close(TransactionOutcome::Committed).is_some());
        assert!(lifecycle.close(TransactionOutcome::RolledBack).is_none());
        assert_eq!(lifecycle.outcome(), Some(TransactionOutcome::Committed));
    }

    #[test]
    fn test_closing_inactive_is_noop() {
        let mut lifecycle = Lifecycle::default();
        assert!(lifecycle.close(TransactionOutcome::RolledBack).is_none());
        assert_eq!(lifecycle.state(), TransactionState::Inactive);
    }

    #[test]
    fn test_cannot_reactivate() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.activate(TransactionId(1), Utc::now()).unwrap();
        assert!(lifecycle.activate(TransactionId(2), Utc::now()).is_err());

        lifecycle.close(TransactionOutcome::RolledBack);
        assert!(lifecycle.activate(TransactionId(3), Utc::now()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionId(12).to_string(), "tx_12");
        assert_eq!(TransactionState::Closed.to_string(), "CLOSED");
        assert_eq!(TransactionState::Active.code(), 1);
    }
}
