//! Credential store
//!
//! Maps user id to an Argon2id password hash. Plaintext passwords only
//! exist in memory: generated here, returned once to the caller, and
//! compared through Argon2's constant-time verifier.

use crate::{
    codec,
    config::{AdminSecret, HashingConfig},
    storage::{KeySpace, KvRead, StoreTxn},
    types::{CredentialRecord, UserId},
    Error, Result,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Sequence that allocates user ids
pub const USER_SEQUENCE: &str = "users";

/// Random bytes per generated password (256 bits)
const PASSWORD_BYTES: usize = 32;

/// Hashes and verifies passwords
#[derive(Debug, Clone)]
pub struct PasswordHasherConfig {
    params: Params,
}

impl PasswordHasherConfig {
    /// Build from configured cost parameters
    pub fn new(config: &HashingConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| Error::Config(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    /// Hash a password with a fresh salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| Error::Hashing)
    }
}

/// Verify a candidate against a stored PHC hash
///
/// Cost parameters are read from the hash itself.
pub fn verify_password(candidate: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|_| Error::Corruption("bad password hash".into()))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

/// Generate a random password from the OS CSPRNG
pub fn generate_password() -> String {
    let mut bytes = [0u8; PASSWORD_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Compare a presented admin secret to the configured one.
///
/// Both sides are hashed first so neither content nor length leaks through timing.
pub fn admin_secret_matches(presented: &str, expected: &AdminSecret) -> bool {
    if expected.is_empty() {
        return false;
    }
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.expose());
    presented.as_slice().ct_eq(expected.as_slice()).into()
}

/// Allocate the next user id. Rolled back with the enclosing transaction.
pub fn next_user_id(txn: &StoreTxn<'_>) -> Result<UserId> {
    txn.next_sequence(USER_SEQUENCE).map(UserId)
}

/// Write the credential for a new user
pub fn put(txn: &StoreTxn<'_>, user_id: UserId, password_hash: String) -> Result<()> {
    let key = codec::encode_id(user_id.get());
    if txn.get_for_update(KeySpace::Credentials, &key)?.is_some() {
        return Err(Error::AlreadyExists(format!("credential for user {}", user_id)));
    }

    let record = CredentialRecord {
        hash: password_hash,
    };
    txn.put(KeySpace::Credentials, &key, &codec::encode_record(&record)?)
}

/// Check a candidate password for `user_id`
pub fn verify(kv: &impl KvRead, user_id: UserId, candidate: &str) -> Result<()> {
    let bytes = kv
        .get(KeySpace::Credentials, &codec::encode_id(user_id.get()))?
        .ok_or(Error::UserNotFound(user_id))?;
    let record: CredentialRecord = codec::decode_record(&bytes)?;

    if verify_password(candidate, &record.hash)? {
        Ok(())
    } else {
        tracing::debug!(user_id = %user_id, "Password mismatch");
        Err(Error::Unauthorized)
    }
}
