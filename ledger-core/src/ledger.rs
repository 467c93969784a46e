//! Main ledger orchestration layer
//!
//! This module ties together the credential store, balance store and
//! transaction journal. Each public operation runs in exactly one store
//! transaction and is all-or-nothing.
//!
//! # Example
//!
//! ```no_run
//! use token_ledger::{config::AdminSecret, Config, Ledger};
//!
//! fn main() -> token_ledger::Result<()> {
//!     let mut config = Config::default();
//!     config.admin_secret = AdminSecret::new("change-me");
//!     let ledger = Ledger::open(config)?;
//!
//!     let alice = ledger.create_user("change-me")?;
//!     let bob = ledger.create_user("change-me")?;
//!     let txn_id = ledger.create_transfer(alice.user_id, bob.user_id, 100, &alice.password)?;
//!     println!("transfer {} committed", txn_id);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    balances,
    config::AdminSecret,
    credentials::{self, PasswordHasherConfig},
    journal,
    metrics::Metrics,
    storage::{KeySpace, Storage, StoreView},
    types::{LedgerStats, NewUser, TransferRecord, TxnId, UserId},
    codec, Config, Error, Result,
};
use std::sync::Arc;
use std::time::Instant;

/// Main ledger interface
pub struct Ledger {
    /// Store handle, shared by all operations
    storage: Arc<Storage>,

    /// Secret gating user creation
    admin_secret: AdminSecret,

    /// Balance granted at user creation
    initial_grant: i64,

    /// Re-executions allowed after transient contention
    max_retries: u32,

    /// Password hashing parameters
    hasher: PasswordHasherConfig,

    /// Metrics
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let storage = Arc::new(Storage::open(&config)?);
        Self::new(storage, &config)
    }

    /// Build a ledger around an already opened store
    pub fn new(storage: Arc<Storage>, config: &Config) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        Ok(Self {
            storage,
            admin_secret: config.admin_secret.clone(),
            initial_grant: config.initial_grant,
            max_retries: config.store.max_retries,
            hasher: PasswordHasherConfig::new(&config.hashing)?,
            metrics,
        })
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Create a user with a fresh random password and the initial grant.
    ///
    /// The returned password is the only copy; it is never stored or logged.
    pub fn create_user(&self, admin_secret: &str) -> Result<NewUser> {
        self.instrumented("create_user", || {
            if !credentials::admin_secret_matches(admin_secret, &self.admin_secret) {
                tracing::warn!("User creation rejected: bad admin secret");
                return Err(Error::Forbidden);
            }

            let password = credentials::generate_password();
            let hash = self.hasher.hash(&password)?;

            let user_id = self.with_retry(|| {
                self.storage.write(|txn| {
                    let user_id = credentials::next_user_id(txn)?;
                    credentials::put(txn, user_id, hash.clone())?;
                    balances::initialize(txn, user_id, self.initial_grant)?;
                    Ok(user_id)
                })
            })?;

            self.metrics.users_created.inc();
            tracing::info!(user_id = %user_id, grant = self.initial_grant, "User created");

            Ok(NewUser { user_id, password })
        })
    }

    /// Current balance of a user
    pub fn get_balance(&self, user_id: UserId) -> Result<i64> {
        self.instrumented("get_balance", || {
            self.storage.read(|view| balances::get(view, user_id))
        })
    }

    /// A committed transfer record
    pub fn get_transaction(&self, txn_id: TxnId) -> Result<TransferRecord> {
        self.instrumented("get_transaction", || {
            self.storage.read(|view| journal::get(view, txn_id))
        })
    }

    /// Move `amount` tokens from `src` to `dst`, authenticated by `src`'s password.
    ///
    /// Debit, credit and journal append commit together or not at all.
    pub fn create_transfer(
        &self,
        src: UserId,
        dst: UserId,
        amount: i64,
        password: &str,
    ) -> Result<TxnId> {
        self.instrumented("create_transfer", || {
            if amount <= 0 {
                return Err(Error::InvalidArgument("amount must be positive".into()));
            }
            if src == dst {
                return Err(Error::InvalidArgument(
                    "source and destination must differ".into(),
                ));
            }

            let txn_id = self.with_retry(|| {
                self.storage.write(|txn| {
                    credentials::verify(txn, src, password)?;

                    journal::lock(txn)?;

                    let balance = balances::get_for_update(txn, src)?;
                    if amount > balance {
                        return Err(Error::InsufficientFunds(src));
                    }

                    balances::apply_delta(txn, src, -amount)?;
                    balances::apply_delta(txn, dst, amount)?;

                    let txn_id = journal::next_id(txn)?;
                    let record = TransferRecord {
                        src_user_id: src,
                        dst_user_id: dst,
                        amount,
                    };
                    journal::append(txn, txn_id, &record)?;
                    Ok(txn_id)
                })
            })?;

            self.metrics.record_transfer(amount);
            tracing::info!(
                txn_id = %txn_id,
                src = %src,
                dst = %dst,
                amount,
                "Transfer committed"
            );

            Ok(txn_id)
        })
    }

    /// Sum of all balances, read from one snapshot.
    ///
    /// Equals `users * initial_grant` as long as the grant was never changed.
    pub fn total_supply(&self) -> Result<i128> {
        self.storage.read(sum_balances)
    }

    /// Aggregate counters from one snapshot
    pub fn stats(&self) -> Result<LedgerStats> {
        self.storage.read(|view| {
            Ok(LedgerStats {
                user_count: view.sequence(credentials::USER_SEQUENCE)?,
                latest_txn_id: journal::latest_id(view)?.get(),
                total_supply: sum_balances(view)?,
            })
        })
    }

    /// Re-run `op` from the start while the store reports transient contention
    fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    self.metrics.retries.inc();
                    tracing::debug!(attempt, error = %err, "Retrying after store contention");
                }
                result => return result,
            }
        }
    }

    fn instrumented<T>(&self, operation: &'static str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = op();
        self.metrics
            .observe_duration(operation, start.elapsed().as_secs_f64());

        if let Err(ref err) = result {
            self.metrics.record_failure(operation, err.kind());
            tracing::debug!(operation, error = %err, "Operation failed");
        }
        result
    }
}

fn sum_balances(view: &StoreView<'_>) -> Result<i128> {
    let mut total: i128 = 0;
    view.for_each(KeySpace::Balances, |_, value| {
        total += i128::from(codec::decode_balance(value)?);
        Ok(())
    })?;
    Ok(total)
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("initial_grant", &self.initial_grant)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}
