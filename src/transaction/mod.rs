// ============================================================================
// Transaction Module
// ============================================================================
//
// Client side of a server transaction: configuration, lifecycle state,
// the start/end payload codec and the `Transaction` handle that ties them
// together.
//
// ============================================================================

pub mod codec;
pub mod config;
pub mod handle;
pub mod state;

pub use codec::EndRequest;
pub use config::{TransactionConcurrency, TransactionConfig, TransactionIsolation};
pub use handle::Transaction;
pub use state::{Lifecycle, Session, TransactionId, TransactionOutcome, TransactionState};
