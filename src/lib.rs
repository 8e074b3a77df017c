// ============================================================================
// RustIgnite Transaction Client
// ============================================================================
//
// Client-side lifecycle of transactions on a remote key-value store that
// speaks a binary request/response protocol.
//
// ============================================================================

pub mod binary;
pub mod client;
pub mod core;
pub mod server;
pub mod transaction;

// Re-export main types for convenience
pub use crate::core::{ClientError, Result};
pub use binary::{
    BinaryCommunicator, ClientOperation, Communicator, MessageBuffer, ObjectType, StreamTransport,
    Transport, TypedValue,
};
pub use client::Client;
pub use server::{InjectedFailure, LoopbackServer};
pub use transaction::{
    Transaction, TransactionConcurrency, TransactionConfig, TransactionId, TransactionIsolation,
    TransactionOutcome, TransactionState,
};
