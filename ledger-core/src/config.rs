//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Tokens granted to every new user
pub const DEFAULT_INITIAL_GRANT: i64 = 1_000_000;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Secret that gates user creation
    pub admin_secret: AdminSecret,

    /// HTTP listen address
    pub listen_addr: String,

    /// Starting balance for new users
    pub initial_grant: i64,

    /// Serve `/metrics`
    pub metrics_enabled: bool,

    /// Store configuration
    pub store: StoreConfig,

    /// Password hashing cost
    pub hashing: HashingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            admin_secret: AdminSecret::default(),
            listen_addr: "0.0.0.0:8080".to_string(),
            initial_grant: DEFAULT_INITIAL_GRANT,
            metrics_enabled: true,
            store: StoreConfig::default(),
            hashing: HashingConfig::default(),
        }
    }
}

/// Admin secret; never printed
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Wrap a secret value
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret bytes
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// True when no secret was configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminSecret(<redacted>)")
    }
}

/// RocksDB and transaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bounded wait for a row lock (milliseconds)
    pub lock_timeout_ms: i64,

    /// Re-executions of an operation after transient contention
    pub max_retries: u32,

    /// fsync the WAL on every commit
    pub sync_writes: bool,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            max_retries: 3,
            sync_writes: true,
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

/// Argon2id cost parameters used when hashing new passwords
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost (KiB)
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Overlay environment variables on top of this configuration
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(secret) = std::env::var("LEDGER_ADMIN_SECRET") {
            self.admin_secret = AdminSecret::new(secret);
        }

        if let Ok(addr) = std::env::var("LEDGER_LISTEN_ADDR") {
            self.listen_addr = addr;
        }

        if let Ok(timeout) = std::env::var("LEDGER_LOCK_TIMEOUT_MS") {
            self.store.lock_timeout_ms = timeout.parse().map_err(|_| {
                crate::Error::Config(format!("LEDGER_LOCK_TIMEOUT_MS is not an integer: {}", timeout))
            })?;
        }

        Ok(self)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.admin_secret.is_empty() {
            return Err(crate::Error::Config("admin secret must be set".to_string()));
        }
        if self.initial_grant <= 0 {
            return Err(crate::Error::Config("initial grant must be positive".to_string()));
        }
        if self.store.lock_timeout_ms <= 0 {
            return Err(crate::Error::Config("lock timeout must be positive".to_string()));
        }
        Ok(())
    }
}
