//! Token Ledger Core
//!
//! Per-user token balances and an immutable transfer journal on top of an
//! embedded RocksDB transaction store.
//!
//! # Architecture
//!
//! - **One store transaction per operation**: create user, transfer, and reads
//!   each run inside exactly one transaction or snapshot
//! - **Single writer for transfers**: the journal sequence lock serializes transfers
//! - **Credentials**: Argon2id hashes, passwords generated from the OS CSPRNG
//!
//! # Invariants
//!
//! - Conservation: transfers never change the sum of all balances
//! - Non-negativity: no balance is ever observed below zero
//! - Append-only: journal records are never modified or deleted
//! - Unique ids: transaction ids strictly increase in commit order

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod balances;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{LedgerStats, NewUser, TransferRecord, TransferRequest, TxnId, UserId};
