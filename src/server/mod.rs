pub mod loopback;

pub use loopback::{InjectedFailure, LoopbackServer, ReceivedRequest, STATUS_TX_NOT_FOUND};
