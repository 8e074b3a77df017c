use super::{MessageBuffer, ObjectType};
use crate::core::{ClientError, Result};

/// A value decoded from its type-code-prefixed wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    String(String),
}

impl TypedValue {
    pub fn object_type(&self) -> ObjectType {
        match self {
            TypedValue::Null => ObjectType::Null,
            TypedValue::Byte(_) => ObjectType::Byte,
            TypedValue::Short(_) => ObjectType::Short,
            TypedValue::Integer(_) => ObjectType::Integer,
            TypedValue::Long(_) => ObjectType::Long,
            TypedValue::Boolean(_) => ObjectType::Boolean,
            TypedValue::String(_) => ObjectType::String,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            TypedValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn write_to(&self, buffer: &mut MessageBuffer) -> Result<()> {
        buffer.write_byte(self.object_type().code());
        match self {
            TypedValue::Null => {}
            TypedValue::Byte(v) => buffer.write_byte(*v as u8),
            TypedValue::Short(v) => buffer.write_short(*v),
            TypedValue::Integer(v) => buffer.write_int(*v),
            TypedValue::Long(v) => buffer.write_long(*v),
            TypedValue::Boolean(v) => buffer.write_bool(*v),
            TypedValue::String(v) => buffer.write_string(v)?,
        }
        Ok(())
    }
}

/// Decode one typed value, checking its type code against `expected`.
///
/// `NULL` is accepted for any expected type, as the protocol allows any
/// object slot to carry a null.
pub fn read_typed_value(buffer: &mut MessageBuffer, expected: ObjectType) -> Result<TypedValue> {
    let code = buffer.read_byte()?;
    let actual = ObjectType::from_code(code)
        .ok_or(ClientError::UnexpectedType { expected, actual: code })?;

    if actual == ObjectType::Null {
        return Ok(TypedValue::Null);
    }
    if actual != expected {
        return Err(ClientError::UnexpectedType { expected, actual: code });
    }

    let value = match actual {
        ObjectType::Byte => TypedValue::Byte(buffer.read_byte()? as i8),
        ObjectType::Short => TypedValue::Short(buffer.read_short()?),
        ObjectType::Integer => TypedValue::Integer(buffer.read_int()?),
        ObjectType::Long => TypedValue::Long(buffer.read_long()?),
        ObjectType::Boolean => TypedValue::Boolean(buffer.read_bool()?),
        ObjectType::String => TypedValue::String(buffer.read_string()?),
        ObjectType::Null => TypedValue::Null,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integer() {
        let mut buffer = MessageBuffer::from_bytes(vec![3, 42, 0, 0, 0]);
        let value = read_typed_value(&mut buffer, ObjectType::Integer).unwrap();
        assert_eq!(value, TypedValue::Integer(42));
        assert_eq!(value.as_int(), Some(42));
    }

    #[test]
    fn test_null_accepted_for_any_type() {
        let mut buffer = MessageBuffer::from_bytes(vec![101]);
        let value = read_typed_value(&mut buffer, ObjectType::Integer).unwrap();
        assert!(value.is_null());
        assert_eq!(value.as_int(), None);
    }

    #[test]
    fn test_type_mismatch() {
        let mut buffer = MessageBuffer::new();
        TypedValue::Long(7).write_to(&mut buffer).unwrap();
        let mut buffer = MessageBuffer::from_bytes(buffer.into_bytes());

        match read_typed_value(&mut buffer, ObjectType::Integer) {
            Err(ClientError::UnexpectedType { expected, actual }) => {
                assert_eq!(expected, ObjectType::Integer);
                assert_eq!(actual, 4);
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_code() {
        let mut buffer = MessageBuffer::from_bytes(vec![250, 0]);
        assert!(matches!(
            read_typed_value(&mut buffer, ObjectType::Integer),
            Err(ClientError::UnexpectedType { actual: 250, .. })
        ));
    }
}
