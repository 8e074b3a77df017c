use std::io::{Read, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use super::frame::{RequestFrame, ResponseFrame};
use super::typed::read_typed_value;
use super::{ClientOperation, MessageBuffer, ObjectType, TypedValue};
use crate::core::{ClientError, Result};

/// Sends one protocol operation and hands the response payload back.
///
/// Implementations own the connection and the framing. `send` blocks until
/// the response arrives. The `writer` fills the request payload; `reader`,
/// when given, is invoked with the response payload on success. Transport
/// failures and server-side rejections are returned as errors and the
/// reader is not called.
///
/// A communicator is shared by every transaction on the connection, so it
/// must be usable from several threads at once.
pub trait Communicator: Send + Sync {
    fn send(
        &self,
        operation: ClientOperation,
        writer: &mut dyn FnMut(&mut MessageBuffer) -> Result<()>,
        reader: Option<&mut dyn FnMut(&mut MessageBuffer) -> Result<()>>,
    ) -> Result<()>;

    fn read_typed_value(
        &self,
        buffer: &mut MessageBuffer,
        expected: ObjectType,
    ) -> Result<TypedValue> {
        read_typed_value(buffer, expected)
    }
}

/// Moves one encoded request to the server and returns the encoded response.
pub trait Transport: Send + Sync {
    fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        (**self).round_trip(request)
    }
}

/// Frames requests, matches responses and checks the status envelope.
pub struct BinaryCommunicator<T: Transport> {
    transport: T,
    next_request_id: AtomicI64,
}

impl<T: Transport> BinaryCommunicator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_request_id: AtomicI64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Communicator for BinaryCommunicator<T> {
    fn send(
        &self,
        operation: ClientOperation,
        writer: &mut dyn FnMut(&mut MessageBuffer) -> Result<()>,
        reader: Option<&mut dyn FnMut(&mut MessageBuffer) -> Result<()>>,
    ) -> Result<()> {
        let mut payload = MessageBuffer::new();
        writer(&mut payload)?;

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let request = RequestFrame {
            op_code: operation.code(),
            request_id,
            payload: payload.into_bytes(),
        };
        debug!(
            "sending {} (request {}, {} payload bytes)",
            operation,
            request_id,
            request.payload.len()
        );

        let raw = self.transport.round_trip(request.encode()?)?;
        let response = ResponseFrame::decode(raw)?;
        if response.request_id != request_id {
            return Err(ClientError::protocol(format!(
                "Response id {} does not match request id {}",
                response.request_id, request_id
            )));
        }

        let payload = response.into_result()?;
        if let Some(reader) = reader {
            reader(&mut MessageBuffer::from_bytes(payload))?;
        }
        Ok(())
    }
}

/// [`Transport`] over a blocking byte stream such as an already-handshaken socket.
///
/// Requests are serialized: one request is written and its response fully
/// read before the next caller gets the stream.
pub struct StreamTransport<S: Read + Write + Send> {
    stream: Mutex<S>,
}

impl<S: Read + Write + Send> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    pub fn into_inner(self) -> Result<S> {
        Ok(self.stream.into_inner()?)
    }
}

impl<S: Read + Write + Send> Transport for StreamTransport<S> {
    fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        let mut stream = self.stream.lock()?;
        stream.write_all(&request)?;
        stream.flush()?;

        let length = stream.read_i32::<LittleEndian>()?;
        let length = usize::try_from(length)
            .map_err(|_| ClientError::protocol(format!("Negative response length {}", length)))?;

        // Grow only as bytes arrive; the length prefix comes from the peer.
        let mut response = (length as i32).to_le_bytes().to_vec();
        let received = Read::by_ref(&mut *stream).take(length as u64).read_to_end(&mut response)?;
        if received != length {
            return Err(ClientError::protocol(format!(
                "Truncated response: expected {} bytes, got {}",
                length, received
            )));
        }
        Ok(response)
    }
}
