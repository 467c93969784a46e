//! Core types for the ledger
//!
//! Balances and amounts are whole tokens held in `i64`. Ids are `u64`
//! and encode to fixed-width big-endian keys (see [`crate::codec`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier, allocated by the ledger at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Transaction identifier, strictly increasing in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(pub u64);

macro_rules! id_impls {
    ($ty:ident, $what:literal) => {
        impl $ty {
            /// Raw integer value
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                s.trim()
                    .parse::<u64>()
                    .map($ty)
                    .map_err(|_| crate::Error::InvalidArgument(format!("bad {}: {:?}", $what, s)))
            }
        }
    };
}

id_impls!(UserId, "user id");
id_impls!(TxnId, "transaction id");

/// Immutable journal entry for one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// Debited user
    pub src_user_id: UserId,

    /// Credited user
    pub dst_user_id: UserId,

    /// Tokens moved, always > 0
    pub amount: i64,
}

/// Stored credential for a user; the hash is a PHC-formatted Argon2id string
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Salted one-way hash of the password
    pub hash: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord").finish_non_exhaustive()
    }
}

/// Result of creating a user. The plaintext password is returned exactly once.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Allocated id
    pub user_id: UserId,

    /// Generated plaintext password
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A transfer request as presented by the caller
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// User to debit
    pub src_user_id: UserId,

    /// User to credit
    pub dst_user_id: UserId,

    /// Tokens to move
    pub amount: i64,

    /// Plaintext password of the source user
    pub password: String,
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("src_user_id", &self.src_user_id)
            .field("dst_user_id", &self.dst_user_id)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// Aggregate view of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// Users created so far
    pub user_count: u64,

    /// Highest committed transaction id, 0 if none
    pub latest_txn_id: u64,

    /// Sum of all balances
    pub total_supply: i128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId(42));
        assert_eq!(" 7 ".parse::<TxnId>().unwrap(), TxnId(7));
        assert!("-1".parse::<UserId>().is_err());
        assert!("abc".parse::<TxnId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_record_json_shape() {
        let record = TransferRecord {
            src_user_id: UserId(1),
            dst_user_id: UserId(2),
            amount: 100,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"srcUserId": 1, "dstUserId": 2, "amount": 100})
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let user = NewUser {
            user_id: UserId(3),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", user).contains("hunter2"));

        let cred = CredentialRecord {
            hash: "$argon2id$secret".to_string(),
        };
        assert!(!format!("{:?}", cred).contains("argon2id"));
    }
}
