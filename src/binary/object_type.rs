use std::fmt;

/// Type codes that prefix a typed value on the wire.
///
/// Only the codes the transaction messages need are modelled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Byte,
    Short,
    Integer,
    Long,
    Boolean,
    String,
    Null,
}

impl ObjectType {
    pub fn code(&self) -> u8 {
        match self {
            ObjectType::Byte => 1,
            ObjectType::Short => 2,
            ObjectType::Integer => 3,
            ObjectType::Long => 4,
            ObjectType::Boolean => 8,
            ObjectType::String => 9,
            ObjectType::Null => 101,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ObjectType::Byte),
            2 => Some(ObjectType::Short),
            3 => Some(ObjectType::Integer),
            4 => Some(ObjectType::Long),
            8 => Some(ObjectType::Boolean),
            9 => Some(ObjectType::String),
            101 => Some(ObjectType::Null),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Byte => "BYTE",
            ObjectType::Short => "SHORT",
            ObjectType::Integer => "INTEGER",
            ObjectType::Long => "LONG",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::String => "STRING",
            ObjectType::Null => "NULL",
        };
        write!(f, "{}({})", name, self.code())
    }
}
