//! Payload layouts of the transaction start and end operations.
//!
//! ```text
//! OP_TX_START request:  u8 concurrency | u8 isolation | i64 timeout | typed string label
//! OP_TX_START response: typed int transaction id
//! OP_TX_END request:    i32 transaction id | bool commit
//! ```

use super::config::{TransactionConcurrency, TransactionConfig, TransactionIsolation};
use super::state::TransactionId;
use crate::binary::{Communicator, MessageBuffer, ObjectType, TypedValue};
use crate::core::{ClientError, Result};

pub fn write_begin_request(buffer: &mut MessageBuffer, config: &TransactionConfig) -> Result<()> {
    buffer.write_byte(config.concurrency.code());
    buffer.write_byte(config.isolation.code());
    buffer.write_long(config.timeout);
    buffer.write_typed_string(config.label.as_deref())
}

pub fn read_begin_request(buffer: &mut MessageBuffer) -> Result<TransactionConfig> {
    let concurrency = TransactionConcurrency::try_from(buffer.read_byte()?)?;
    let isolation = TransactionIsolation::try_from(buffer.read_byte()?)?;
    let timeout = buffer.read_long()?;
    let label = buffer.read_typed_string()?;
    Ok(TransactionConfig {
        concurrency,
        isolation,
        timeout,
        label,
    })
}

pub fn write_begin_response(buffer: &mut MessageBuffer, id: TransactionId) {
    buffer.write_typed_int(id.as_i32());
}

/// Extract the identifier from a start response using the communicator's typed decoder.
pub fn read_begin_response(
    communicator: &dyn Communicator,
    buffer: &mut MessageBuffer,
) -> Result<TransactionId> {
    match communicator.read_typed_value(buffer, ObjectType::Integer)? {
        TypedValue::Integer(id) => Ok(TransactionId(id)),
        TypedValue::Null => Err(ClientError::protocol(
            "Server returned no transaction id",
        )),
        other => Err(ClientError::UnexpectedType {
            expected: ObjectType::Integer,
            actual: other.object_type().code(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndRequest {
    pub id: TransactionId,
    pub commit: bool,
}

pub fn write_end_request(buffer: &mut MessageBuffer, id: TransactionId, commit: bool) {
    buffer.write_int(id.as_i32());
    buffer.write_bool(commit);
}

pub fn read_end_request(buffer: &mut MessageBuffer) -> Result<EndRequest> {
    let id = TransactionId(buffer.read_int()?);
    let commit = buffer.read_bool()?;
    Ok(EndRequest { id, commit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::ClientOperation;

    struct DecodeOnly;

    impl Communicator for DecodeOnly {
        fn send(
            &self,
            _operation: ClientOperation,
            _writer: &mut dyn FnMut(&mut MessageBuffer) -> Result<()>,
            _reader: Option<&mut dyn FnMut(&mut MessageBuffer) -> Result<()>>,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_begin_request_layout() {
        let config = TransactionConfig::default()
            .concurrency(TransactionConcurrency::Optimistic)
            .isolation(TransactionIsolation::Serializable)
            .timeout_ms(1000);
        let mut buffer = MessageBuffer::new();
        write_begin_request(&mut buffer, &config).unwrap();

        let mut expected = vec![0u8, 2];
        expected.extend_from_slice(&1000i64.to_le_bytes());
        expected.push(101);
        assert_eq!(buffer.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_begin_request_with_label_decodes() {
        let config = TransactionConfig::default().label("nightly");
        let mut buffer = MessageBuffer::new();
        write_begin_request(&mut buffer, &config).unwrap();

        let mut reader = MessageBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(read_begin_request(&mut reader).unwrap(), config);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_end_request_layout() {
        let mut buffer = MessageBuffer::new();
        write_end_request(&mut buffer, TransactionId(258), false);
        assert_eq!(buffer.as_bytes(), &[2, 1, 0, 0, 0]);
    }

    #[test]
    fn test_begin_response() {
        let mut buffer = MessageBuffer::new();
        write_begin_response(&mut buffer, TransactionId(7));
        let mut reader = MessageBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(
            read_begin_response(&DecodeOnly, &mut reader).unwrap(),
            TransactionId(7)
        );
    }

    #[test]
    fn test_null_begin_response_is_protocol_error() {
        let mut reader = MessageBuffer::from_bytes(vec![101]);
        assert!(matches!(
            read_begin_response(&DecodeOnly, &mut reader),
            Err(ClientError::Protocol(_))
        ));
    }
}
