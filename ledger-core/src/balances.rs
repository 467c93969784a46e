//! Balance store
//!
//! Maps user id to a signed token balance. No locking of its own; the
//! enclosing [`StoreTxn`] provides atomicity and isolation.

use crate::{
    codec,
    storage::{KeySpace, KvRead, StoreTxn},
    types::UserId,
    Error, Result,
};

/// Set the starting balance of a new user
pub fn initialize(txn: &StoreTxn<'_>, user_id: UserId, amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(Error::InvalidArgument("initial balance is negative".into()));
    }
    let key = codec::encode_id(user_id.get());
    if txn.get_for_update(KeySpace::Balances, &key)?.is_some() {
        return Err(Error::AlreadyExists(format!("balance for user {}", user_id)));
    }
    txn.put(KeySpace::Balances, &key, &codec::encode_balance(amount))
}

/// Current balance
pub fn get(kv: &impl KvRead, user_id: UserId) -> Result<i64> {
    let bytes = kv
        .get(KeySpace::Balances, &codec::encode_id(user_id.get()))?
        .ok_or(Error::UserNotFound(user_id))?;
    codec::decode_balance(&bytes)
}

/// Current balance, locked until the transaction ends
pub fn get_for_update(txn: &StoreTxn<'_>, user_id: UserId) -> Result<i64> {
    let bytes = txn
        .get_for_update(KeySpace::Balances, &codec::encode_id(user_id.get()))?
        .ok_or(Error::UserNotFound(user_id))?;
    codec::decode_balance(&bytes)
}

/// Add `delta` to the balance and return the new value.
///
/// Fails with `InsufficientFunds` if the result would be negative; the
/// stored value is untouched in that case.
pub fn apply_delta(txn: &StoreTxn<'_>, user_id: UserId, delta: i64) -> Result<i64> {
    let current = get_for_update(txn, user_id)?;
    let updated = current
        .checked_add(delta)
        .ok_or_else(|| Error::InvalidArgument(format!("balance overflow for user {}", user_id)))?;
    if updated < 0 {
        return Err(Error::InsufficientFunds(user_id));
    }
    txn.put(
        KeySpace::Balances,
        &codec::encode_id(user_id.get()),
        &codec::encode_balance(updated),
    )?;
    Ok(updated)
}
