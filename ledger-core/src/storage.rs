//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `credentials` - Password hashes (key: user_id)
//! - `balances` - Signed token balances (key: user_id)
//! - `transactions` - Append-only transfer journal (key: txn_id)
//! - `sequences` - Id counters under reserved keys
//!
//! The database is opened as a pessimistic `TransactionDB`. Every engine
//! operation runs inside exactly one [`StoreTxn`] (writes) or one
//! [`StoreView`] (snapshot reads). Locks taken with `get_for_update` are
//! held until commit or rollback and waited on for at most the configured
//! lock timeout.

use crate::{
    codec,
    error::{Error, Result},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, SnapshotWithThreadMode,
    Transaction, TransactionDB, TransactionDBOptions, TransactionOptions, WriteOptions,
};

/// Column family names
const CF_CREDENTIALS: &str = "credentials";
const CF_BALANCES: &str = "balances";
const CF_TRANSACTIONS: &str = "transactions";
const CF_SEQUENCES: &str = "sequences";

/// Named key space inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpace {
    /// user_id -> credential record
    Credentials,
    /// user_id -> balance
    Balances,
    /// txn_id -> transfer record
    Transactions,
    /// reserved counter keys
    Sequences,
}

impl KeySpace {
    fn cf_name(self) -> &'static str {
        match self {
            KeySpace::Credentials => CF_CREDENTIALS,
            KeySpace::Balances => CF_BALANCES,
            KeySpace::Transactions => CF_TRANSACTIONS,
            KeySpace::Sequences => CF_SEQUENCES,
        }
    }
}

/// Read access shared by transactions and snapshots
pub trait KvRead {
    /// Point read without taking a lock
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: TransactionDB,
    lock_timeout_ms: i64,
    sync_writes: bool,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.store.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.store.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.store.max_background_jobs);

        if config.store.enable_statistics {
            db_opts.enable_statistics();
        }

        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(config.store.lock_timeout_ms);
        txn_db_opts.set_default_lock_timeout(config.store.lock_timeout_ms);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CREDENTIALS, Self::cf_options_credentials()),
            ColumnFamilyDescriptor::new(CF_BALANCES, Self::cf_options_balances()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_SEQUENCES, Options::default()),
        ];

        let db = TransactionDB::open_cf_descriptors(&db_opts, &txn_db_opts, path, cf_descriptors)?;

        tracing::info!(
            path = ?path,
            lock_timeout_ms = config.store.lock_timeout_ms,
            "Opened RocksDB transaction store"
        );

        Ok(Self {
            db,
            lock_timeout_ms: config.store.lock_timeout_ms,
            sync_writes: config.store.sync_writes,
        })
    }

    // Column family options

    fn cf_options_credentials() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_balances() -> Options {
        let mut opts = Options::default();
        // Balances are read on every transfer, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, space: KeySpace) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(space.cf_name())
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", space.cf_name())))
    }

    /// Run `f` inside one store transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back otherwise, so an error at
    /// any step leaves no trace in the store.
    pub fn write<T>(&self, f: impl FnOnce(&StoreTxn<'_>) -> Result<T>) -> Result<T> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);

        let mut txn_opts = TransactionOptions::default();
        txn_opts.set_lock_timeout(self.lock_timeout_ms);
        txn_opts.set_deadlock_detect(true);

        let txn = StoreTxn {
            storage: self,
            inner: self.db.transaction_opt(&write_opts, &txn_opts),
        };

        match f(&txn) {
            Ok(value) => {
                txn.inner.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.inner.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run `f` against a consistent snapshot. Never blocks on writers.
    pub fn read<T>(&self, f: impl FnOnce(&StoreView<'_>) -> Result<T>) -> Result<T> {
        let view = StoreView {
            storage: self,
            snapshot: self.db.snapshot(),
        };
        f(&view)
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.read(|view| {
            let mut stats = StorageStats::default();
            view.for_each(KeySpace::Credentials, |_, _| {
                stats.credentials += 1;
                Ok(())
            })?;
            view.for_each(KeySpace::Balances, |_, _| {
                stats.balances += 1;
                Ok(())
            })?;
            view.for_each(KeySpace::Transactions, |_, _| {
                stats.transactions += 1;
                Ok(())
            })?;
            Ok(stats)
        })
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("lock_timeout_ms", &self.lock_timeout_ms)
            .field("sync_writes", &self.sync_writes)
            .finish_non_exhaustive()
    }
}

/// Storage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Stored credentials
    pub credentials: u64,
    /// Stored balances
    pub balances: u64,
    /// Journal records
    pub transactions: u64,
}

/// An open read/write store transaction
#[allow(missing_debug_implementations)]
pub struct StoreTxn<'db> {
    storage: &'db Storage,
    inner: Transaction<'db, TransactionDB>,
}

impl StoreTxn<'_> {
    /// Read a key and hold an exclusive lock on it until commit/rollback
    pub fn get_for_update(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.storage.cf_handle(space)?;
        Ok(self.inner.get_for_update_cf(cf, key, true)?)
    }

    /// Buffer a write; visible to others only after commit
    pub fn put(&self, space: KeySpace, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.storage.cf_handle(space)?;
        Ok(self.inner.put_cf(cf, key, value)?)
    }

    /// Current value of a counter, locking it for the rest of the transaction
    pub fn lock_sequence(&self, name: &str) -> Result<u64> {
        match self.get_for_update(KeySpace::Sequences, name.as_bytes())? {
            Some(bytes) => codec::decode_id(&bytes),
            None => Ok(0),
        }
    }

    /// Advance a counter and return the new value. Rolled back with the transaction.
    pub fn next_sequence(&self, name: &str) -> Result<u64> {
        let next = self
            .lock_sequence(name)?
            .checked_add(1)
            .ok_or_else(|| Error::Storage(format!("sequence {} exhausted", name)))?;
        self.put(KeySpace::Sequences, name.as_bytes(), &codec::encode_id(next))?;
        Ok(next)
    }
}

impl KvRead for StoreTxn<'_> {
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.storage.cf_handle(space)?;
        Ok(self.inner.get_cf(cf, key)?)
    }
}

/// A read-only point-in-time view
#[allow(missing_debug_implementations)]
pub struct StoreView<'db> {
    storage: &'db Storage,
    snapshot: SnapshotWithThreadMode<'db, TransactionDB>,
}

impl StoreView<'_> {
    /// Visit every entry of a key space in key order
    pub fn for_each(
        &self,
        space: KeySpace,
        mut f: impl FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let cf = self.storage.cf_handle(space)?;
        for item in self.snapshot.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            f(&key, &value)?;
        }
        Ok(())
    }

    /// Last committed value of a counter
    pub fn sequence(&self, name: &str) -> Result<u64> {
        match self.get(KeySpace::Sequences, name.as_bytes())? {
            Some(bytes) => codec::decode_id(&bytes),
            None => Ok(0),
        }
    }
}

impl KvRead for StoreView<'_> {
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.storage.cf_handle(space)?;
        Ok(self.snapshot.get_cf(cf, key)?)
    }
}
