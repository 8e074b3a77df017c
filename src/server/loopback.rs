use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use log::debug;

use crate::binary::frame::STATUS_FAILED;
use crate::binary::{ClientOperation, MessageBuffer, RequestFrame, ResponseFrame, Transport};
use crate::core::{ClientError, Result};
use crate::transaction::codec::{self, EndRequest};
use crate::transaction::{TransactionConfig, TransactionId};

/// Status returned when an end request names an unknown transaction.
pub const STATUS_TX_NOT_FOUND: i32 = 1020;

/// A request as decoded by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedRequest {
    Start(TransactionConfig),
    End(EndRequest),
}

impl ReceivedRequest {
    pub fn operation(&self) -> ClientOperation {
        match self {
            ReceivedRequest::Start(_) => ClientOperation::TxStart,
            ReceivedRequest::End(_) => ClientOperation::TxEnd,
        }
    }
}

/// One-shot failure to apply to the next request of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// The server answers with a non-zero status.
    Rejected { status: i32, message: String },
    /// The request is received but no response comes back.
    Disconnected,
}

#[derive(Default)]
struct ServerState {
    next_id: i32,
    open: BTreeMap<TransactionId, TransactionConfig>,
    received: Vec<ReceivedRequest>,
    committed: usize,
    rolled_back: usize,
    failures: HashMap<ClientOperation, InjectedFailure>,
}

/// In-process server for the transaction operations.
///
/// Implements [`Transport`] by decoding each request frame, applying it to
/// an in-memory table of open transactions and encoding the reply. Ids are
/// assigned from 1 upwards.
#[derive(Default)]
pub struct LoopbackServer {
    state: Mutex<ServerState>,
}

impl LoopbackServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next request of `operation` fail as described.
    pub fn fail_next(&self, operation: ClientOperation, failure: InjectedFailure) -> Result<()> {
        self.state.lock()?.failures.insert(operation, failure);
        Ok(())
    }

    /// Every decoded request, in arrival order.
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.with_state(|state| state.received.clone())
    }

    pub fn request_count(&self, operation: ClientOperation) -> usize {
        self.with_state(|state| {
            state
                .received
                .iter()
                .filter(|request| request.operation() == operation)
                .count()
        })
    }

    /// End requests received so far.
    pub fn end_requests(&self) -> Vec<EndRequest> {
        self.with_state(|state| {
            state
                .received
                .iter()
                .filter_map(|request| match request {
                    ReceivedRequest::End(end) => Some(*end),
                    ReceivedRequest::Start(_) => None,
                })
                .collect()
        })
    }

    pub fn open_transactions(&self) -> Vec<TransactionId> {
        self.with_state(|state| state.open.keys().copied().collect())
    }

    pub fn is_open(&self, id: TransactionId) -> bool {
        self.with_state(|state| state.open.contains_key(&id))
    }

    pub fn committed_count(&self) -> usize {
        self.with_state(|state| state.committed)
    }

    pub fn rolled_back_count(&self) -> usize {
        self.with_state(|state| state.rolled_back)
    }

    fn with_state<R>(&self, f: impl FnOnce(&ServerState) -> R) -> R {
        match self.state.lock() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn handle(state: &mut ServerState, request: &RequestFrame) -> Result<ResponseFrame> {
        let operation = match ClientOperation::from_code(request.op_code) {
            Some(operation) => operation,
            None => {
                return Ok(ResponseFrame::failure(
                    request.request_id,
                    STATUS_FAILED,
                    format!("Unknown operation code {}", request.op_code),
                ));
            }
        };

        let mut payload = MessageBuffer::from_bytes(request.payload.clone());
        let decoded = match operation {
            ClientOperation::TxStart => ReceivedRequest::Start(codec::read_begin_request(&mut payload)?),
            ClientOperation::TxEnd => ReceivedRequest::End(codec::read_end_request(&mut payload)?),
        };
        state.received.push(decoded.clone());

        match state.failures.remove(&operation) {
            Some(InjectedFailure::Rejected { status, message }) => {
                return Ok(ResponseFrame::failure(request.request_id, status, message));
            }
            Some(InjectedFailure::Disconnected) => {
                return Err(ClientError::Io(format!(
                    "Connection closed while waiting for {} response",
                    operation
                )));
            }
            None => {}
        }

        match decoded {
            ReceivedRequest::Start(config) => {
                if let Err(err) = config.validate() {
                    return Ok(ResponseFrame::failure(
                        request.request_id,
                        STATUS_FAILED,
                        err.to_string(),
                    ));
                }
                state.next_id += 1;
                let id = TransactionId(state.next_id);
                debug!("loopback opened {} with {:?}", id, config);
                state.open.insert(id, config);

                let mut response = MessageBuffer::new();
                codec::write_begin_response(&mut response, id);
                Ok(ResponseFrame::success(request.request_id, response.into_bytes()))
            }
            ReceivedRequest::End(end) => {
                if state.open.remove(&end.id).is_none() {
                    return Ok(ResponseFrame::failure(
                        request.request_id,
                        STATUS_TX_NOT_FOUND,
                        format!("Transaction with id {} not found", end.id.as_i32()),
                    ));
                }
                if end.commit {
                    state.committed += 1;
                } else {
                    state.rolled_back += 1;
                }
                debug!("loopback ended {} (commit = {})", end.id, end.commit);
                Ok(ResponseFrame::success(request.request_id, Vec::new()))
            }
        }
    }
}

impl Transport for LoopbackServer {
    fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        let request = RequestFrame::decode(request)?;
        let response = {
            let mut state = self.state.lock()?;
            Self::handle(&mut state, &request)?
        };
        response.encode()
    }
}
