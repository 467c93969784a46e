//! Key and value encoding
//!
//! Integer keys are fixed-width big-endian so that lexical key order in
//! RocksDB equals numeric order. Records are JSON: unknown fields are
//! ignored on read, so entries written today stay readable if a record
//! gains fields later.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Width of every integer key and balance value
pub const INT_WIDTH: usize = 8;

/// Encode an id as a fixed-width big-endian key
pub fn encode_id(id: u64) -> [u8; INT_WIDTH] {
    id.to_be_bytes()
}

/// Decode a fixed-width big-endian key
pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; INT_WIDTH] = bytes
        .try_into()
        .map_err(|_| Error::Corruption(format!("id key has {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Encode a signed balance
pub fn encode_balance(balance: i64) -> [u8; INT_WIDTH] {
    balance.to_be_bytes()
}

/// Decode a signed balance
pub fn decode_balance(bytes: &[u8]) -> Result<i64> {
    let raw: [u8; INT_WIDTH] = bytes
        .try_into()
        .map_err(|_| Error::Corruption(format!("balance has {} bytes", bytes.len())))?;
    Ok(i64::from_be_bytes(raw))
}

/// Encode a structured record
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

/// Decode a structured record
pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Corruption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransferRecord, UserId};

    #[test]
    fn test_id_keys_sort_numerically() {
        let ids = [1u64, 2, 255, 256, 65_536, u64::MAX];
        for pair in ids.windows(2) {
            assert!(encode_id(pair[0]) < encode_id(pair[1]));
        }
        assert_eq!(decode_id(&encode_id(256)).unwrap(), 256);
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        assert!(matches!(decode_id(&[1, 2, 3]), Err(Error::Corruption(_))));
        assert!(matches!(decode_balance(&[0; 9]), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_balance_keeps_sign() {
        assert_eq!(decode_balance(&encode_balance(-5)).unwrap(), -5);
        assert_eq!(decode_balance(&encode_balance(1_000_000)).unwrap(), 1_000_000);
    }

    #[test]
    fn test_record_tolerates_new_fields() {
        let bytes = br#"{"srcUserId":1,"dstUserId":2,"amount":5,"memo":"later field"}"#;
        let record: TransferRecord = decode_record(bytes).unwrap();
        assert_eq!(record.src_user_id, UserId(1));
        assert_eq!(record.amount, 5);
    }

    #[test]
    fn test_garbage_record_is_corruption() {
        let result: Result<TransferRecord> = decode_record(b"\x00\x01");
        assert!(matches!(result, Err(Error::Corruption(_))));
    }
}
