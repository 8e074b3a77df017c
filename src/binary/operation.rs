use std::fmt;

/// Operation codes carried in the request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOperation {
    TxStart,
    TxEnd,
}

impl ClientOperation {
    pub fn code(&self) -> i16 {
        match self {
            ClientOperation::TxStart => 4000,
            ClientOperation::TxEnd => 4001,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            4000 => Some(ClientOperation::TxStart),
            4001 => Some(ClientOperation::TxEnd),
            _ => None,
        }
    }
}

impl fmt::Display for ClientOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientOperation::TxStart => write!(f, "OP_TX_START"),
            ClientOperation::TxEnd => write!(f, "OP_TX_END"),
        }
    }
}
