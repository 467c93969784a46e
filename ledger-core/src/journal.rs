//! Transaction journal
//!
//! Append-only map of transaction id to [`TransferRecord`]. Ids come from
//! a counter in the `sequences` key space that is advanced inside the
//! same store transaction as the append, so an aborted transfer never
//! consumes an id and two committed transfers never share one.

use crate::{
    codec,
    storage::{KeySpace, KvRead, StoreTxn, StoreView},
    types::{TransferRecord, TxnId},
    Error, Result,
};

/// Sequence that allocates transaction ids
pub const TXN_SEQUENCE: &str = "transactions";

/// Take the journal writer lock.
///
/// Transfers acquire it before touching any balance, which serializes
/// all transfers behind one writer and rules out lock-order deadlocks.
pub fn lock(txn: &StoreTxn<'_>) -> Result<()> {
    txn.lock_sequence(TXN_SEQUENCE).map(|_| ())
}

/// Allocate the next transaction id
pub fn next_id(txn: &StoreTxn<'_>) -> Result<TxnId> {
    txn.next_sequence(TXN_SEQUENCE).map(TxnId)
}

/// Write an immutable record
pub fn append(txn: &StoreTxn<'_>, txn_id: TxnId, record: &TransferRecord) -> Result<()> {
    let key = codec::encode_id(txn_id.get());
    if txn.get_for_update(KeySpace::Transactions, &key)?.is_some() {
        tracing::error!(txn_id = %txn_id, "Journal id reused");
        return Err(Error::AlreadyExists(format!("transaction {}", txn_id)));
    }
    txn.put(KeySpace::Transactions, &key, &codec::encode_record(record)?)
}

/// Read a record
pub fn get(kv: &impl KvRead, txn_id: TxnId) -> Result<TransferRecord> {
    let bytes = kv
        .get(KeySpace::Transactions, &codec::encode_id(txn_id.get()))?
        .ok_or(Error::TransactionNotFound(txn_id))?;
    codec::decode_record(&bytes)
}

/// Highest committed id, 0 when the journal is empty
pub fn latest_id(view: &StoreView<'_>) -> Result<TxnId> {
    view.sequence(TXN_SEQUENCE).map(TxnId)
}
