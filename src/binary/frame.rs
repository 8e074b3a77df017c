// ============================================================================
// Message Framing
// ============================================================================
//
// Request:  i32 length | i16 op code | i64 request id | payload
// Response: i32 length | i64 request id | i32 status | payload or error string
//
// `length` counts the bytes that follow the length field itself.
// A status of 0 means success; anything else carries a typed error message.
//
// ============================================================================

use super::MessageBuffer;
use crate::core::{ClientError, Result};

/// Status code of a successful response.
pub const STATUS_SUCCESS: i32 = 0;

/// Generic failure status used when the server has no more specific code.
pub const STATUS_FAILED: i32 = 1;

fn frame_length(total: usize) -> Result<i32> {
    i32::try_from(total - 4)
        .map_err(|_| ClientError::protocol(format!("Message of {} bytes is too large", total)))
}

/// Read the length prefix and make sure the rest of the frame is exactly that long.
fn read_frame_body(bytes: Vec<u8>) -> Result<MessageBuffer> {
    let mut buffer = MessageBuffer::from_bytes(bytes);
    let declared = buffer.read_int()?;
    if declared < 0 || declared as usize != buffer.remaining() {
        return Err(ClientError::protocol(format!(
            "Frame length mismatch: header says {}, {} bytes follow",
            declared,
            buffer.remaining()
        )));
    }
    Ok(buffer)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub op_code: i16,
    pub request_id: i64,
    pub payload: Vec<u8>,
}

impl RequestFrame {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = MessageBuffer::new();
        buffer.write_int(0);
        buffer.write_short(self.op_code);
        buffer.write_long(self.request_id);
        buffer.write_bytes(&self.payload);
        let length = frame_length(buffer.len())?;
        buffer.write_int_at(0, length)?;
        Ok(buffer.into_bytes())
    }

    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let mut buffer = read_frame_body(bytes)?;
        let op_code = buffer.read_short()?;
        let request_id = buffer.read_long()?;
        let payload = buffer.read_bytes(buffer.remaining())?;
        Ok(Self {
            op_code,
            request_id,
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Payload(Vec<u8>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub request_id: i64,
    pub status: i32,
    pub body: ResponseBody,
}

impl ResponseFrame {
    pub fn success(request_id: i64, payload: Vec<u8>) -> Self {
        Self {
            request_id,
            status: STATUS_SUCCESS,
            body: ResponseBody::Payload(payload),
        }
    }

    /// A failed response. A `status` of [`STATUS_SUCCESS`] would decode as a
    /// payload, so it is replaced by [`STATUS_FAILED`].
    pub fn failure(request_id: i64, status: i32, message: impl Into<String>) -> Self {
        let status = if status == STATUS_SUCCESS {
            STATUS_FAILED
        } else {
            status
        };
        Self {
            request_id,
            status,
            body: ResponseBody::Error(message.into()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = MessageBuffer::new();
        buffer.write_int(0);
        buffer.write_long(self.request_id);
        buffer.write_int(self.status);
        match &self.body {
            ResponseBody::Payload(payload) => buffer.write_bytes(payload),
            ResponseBody::Error(message) => buffer.write_typed_string(Some(message))?,
        }
        let length = frame_length(buffer.len())?;
        buffer.write_int_at(0, length)?;
        Ok(buffer.into_bytes())
    }

    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let mut buffer = read_frame_body(bytes)?;
        let request_id = buffer.read_long()?;
        let status = buffer.read_int()?;
        let body = if status == STATUS_SUCCESS {
            ResponseBody::Payload(buffer.read_bytes(buffer.remaining())?)
        } else {
            ResponseBody::Error(buffer.read_typed_string()?.unwrap_or_default())
        };
        Ok(Self {
            request_id,
            status,
            body,
        })
    }

    /// Convert into the payload, or a [`ClientError::Server`] for a failed status.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.body {
            ResponseBody::Payload(payload) => Ok(payload),
            ResponseBody::Error(message) => Err(ClientError::Server {
                status: self.status,
                message,
            }),
        }
    }
}
