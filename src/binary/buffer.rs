use byteorder::{ByteOrder, LittleEndian};

use super::ObjectType;
use crate::core::{ClientError, Result};

/// Growable byte buffer used to build and parse message payloads.
///
/// Writes append at the end; reads consume from an internal cursor.
/// All multi-byte integers are little-endian.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    data: Vec<u8>,
    position: usize,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap received bytes for reading.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    // ------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------

    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn write_short(&mut self, value: i16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_i16(&mut bytes, value);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_int(&mut self, value: i32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, value);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_long(&mut self, value: i64) {
        let mut bytes = [0u8; 8];
        LittleEndian::write_i64(&mut bytes, value);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Length-prefixed UTF-8 string without a type code.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| {
            ClientError::illegal_argument(format!("String of {} bytes is too long", value.len()))
        })?;
        self.write_int(len);
        self.data.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Nullable string prefixed by its type code: `NULL` or `STRING` + length + bytes.
    pub fn write_typed_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => {
                self.write_byte(ObjectType::Null.code());
                Ok(())
            }
            Some(text) => {
                self.write_byte(ObjectType::String.code());
                self.write_string(text)
            }
        }
    }

    pub fn write_typed_int(&mut self, value: i32) {
        self.write_byte(ObjectType::Integer.code());
        self.write_int(value);
    }

    /// Overwrite four bytes at `offset`; used to patch frame lengths.
    pub(crate) fn write_int_at(&mut self, offset: usize, value: i32) -> Result<()> {
        let slot = self
            .data
            .get_mut(offset..offset + 4)
            .ok_or_else(|| ClientError::protocol(format!("Offset {} is out of bounds", offset)))?;
        LittleEndian::write_i32(slot, value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if self.remaining() < count {
            return Err(ClientError::protocol(format!(
                "Unexpected end of message: need {} bytes at offset {}, {} available",
                count,
                self.position,
                self.remaining()
            )));
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ClientError::protocol(format!("Invalid boolean byte {}", other))),
        }
    }

    pub fn read_short(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_int(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_long(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    /// Read a length-prefixed string (no type code).
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_int()?;
        let len = usize::try_from(len)
            .map_err(|_| ClientError::protocol(format!("Negative string length {}", len)))?;
        let bytes = self.take(len)?.to_vec();
        String::from_utf8(bytes)
            .map_err(|e| ClientError::protocol(format!("Invalid UTF-8 in string: {}", e)))
    }

    /// Read a nullable string written by [`MessageBuffer::write_typed_string`].
    pub fn read_typed_string(&mut self) -> Result<Option<String>> {
        let code = self.read_byte()?;
        if code == ObjectType::Null.code() {
            Ok(None)
        } else if code == ObjectType::String.code() {
            self.read_string().map(Some)
        } else {
            Err(ClientError::UnexpectedType {
                expected: ObjectType::String,
                actual: code,
            })
        }
    }
}
