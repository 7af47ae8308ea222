//! Hashing and random-secret primitives handed to identity operations.
//!
//! Identities never reach for a process-wide helper; every operation that
//! needs a secret or a hash receives a [`Security`] implementation through
//! its [`crate::identity::IdentityContext`].

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::distr::{Alphanumeric, SampleString};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Invalid password hash format: {0}")]
    MalformedHash(String),
}

pub trait Security: Send + Sync {
    /// Random printable string used for auth keys.
    fn generate_random_string(&self) -> String;

    /// Random hex key used for activation/recovery links.
    fn generate_random_key(&self) -> String;

    fn generate_password_hash(&self, password: &str) -> Result<String, SecurityError>;

    /// `Ok(false)` on mismatch; `Err` only when `hash` cannot be parsed.
    fn validate_password(&self, password: &str, hash: &str) -> Result<bool, SecurityError>;
}

/// Argon2id hashing with configurable cost, OS randomness for secrets.
#[derive(Debug, Clone)]
pub struct Argon2Security {
    params: Params,
    string_length: usize,
    key_length: usize,
}

impl Argon2Security {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, SecurityError> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| SecurityError::InvalidParams(e.to_string()))?;

        Ok(Self {
            params,
            string_length: config.random_string_length,
            key_length: config.random_key_length,
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Security for Argon2Security {
    fn generate_random_string(&self) -> String {
        Alphanumeric.sample_string(&mut rand::rng(), self.string_length)
    }

    fn generate_random_key(&self) -> String {
        use rand::RngCore;
        use std::fmt::Write;

        let mut bytes = vec![0u8; self.key_length];
        rand::rng().fill_bytes(&mut bytes);

        bytes
            .iter()
            .fold(String::with_capacity(self.key_length * 2), |mut acc, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            })
    }

    fn generate_password_hash(&self, password: &str) -> Result<String, SecurityError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SecurityError::Hash(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn validate_password(&self, password: &str, hash: &str) -> Result<bool, SecurityError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| SecurityError::MalformedHash(e.to_string()))?;

        // Parameters are read back from the PHC string, not from self.
        Ok(self
            .hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
