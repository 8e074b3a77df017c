// ============================================================================
// Binary Protocol Layer
// ============================================================================
//
// Payload encoding primitives, typed values, request/response framing and
// the `Communicator` seam that transactions send their messages through.
//
// ============================================================================

pub mod buffer;
pub mod communicator;
pub mod frame;
pub mod object_type;
pub mod operation;
pub mod typed;

pub use buffer::MessageBuffer;
pub use communicator::{BinaryCommunicator, Communicator, StreamTransport, Transport};
pub use frame::{RequestFrame, ResponseBody, ResponseFrame};
pub use object_type::ObjectType;
pub use operation::ClientOperation;
pub use typed::{TypedValue, read_typed_value};
