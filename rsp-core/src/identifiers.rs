//! Identifier newtypes shared across layers

use crate::error::{RspError, RspResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// eUICC identifier (EID)
///
/// The canonical external form is the uppercase hex of the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Eid(Vec<u8>);

impl Eid {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

/// Notification sequence number, unique per eUICC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u32);

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// RSP session transaction identifier
///
/// Exchanged with servers as uppercase hex and with the eUICC as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(Vec<u8>);

impl TransactionId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse the hex form used in server JSON bodies
    pub fn from_hex(text: &str) -> RspResult<Self> {
        hex::decode(text)
            .map(Self)
            .map_err(|e| RspError::Decode(format!("Invalid transactionId '{}': {}", text, e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eid_is_uppercase_hex() {
        let eid = Eid::new(vec![0x89, 0x04, 0x90, 0xab]);
        assert_eq!(eid.to_string(), "890490AB");
    }

    #[test]
    fn test_transaction_id_hex() {
        let id = TransactionId::from_hex("0a1B").unwrap();
        assert_eq!(id.as_bytes(), &[0x0A, 0x1B]);
        assert_eq!(id.to_hex(), "0A1B");
        assert!(TransactionId::from_hex("xyz").is_err());
    }
}
