//! One-way password hashing and verification.
//!
//! # Responsibility
//! - Produce salted Argon2id PHC strings for new credentials.
//! - Verify plaintext candidates against stored Argon2 or bcrypt hashes.
//! - Classify stored values as hashed or legacy plaintext for migration.
//!
//! # Invariants
//! - Work factor is fixed by `MEMORY_COST_KIB`/`TIME_COST`/`PARALLELISM`.
//! - `verify_password` never errors and never logs its inputs.
//! - Every `verify_password` call costs at least one Argon2 verification,
//!   whatever the shape of the stored value.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use once_cell::sync::Lazy;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 4;
const PARALLELISM: u32 = 1;

/// Modular-crypt prefixes written by bcrypt implementations.
const BCRYPT_PREFIXES: &[&str] = &["$2a$", "$2b$", "$2y$"];

// Verified against when there is no usable stored hash, so every login
// failure path costs one full hash verification.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("diary-core-unknown-account").ok());

pub type CredentialResult<T> = Result<T, CredentialError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Password was empty.
    InvalidInput(&'static str),
    /// Hasher backend failure.
    Hash(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid credential input: {message}"),
            Self::Hash(message) => write!(f, "password hashing failed: {message}"),
        }
    }
}

impl Error for CredentialError {}

/// Hashes `password` with a fresh random salt.
///
/// Two calls with the same password return different strings; both verify.
///
/// # Errors
/// - `CredentialError::InvalidInput` when `password` is empty.
/// - `CredentialError::Hash` when the Argon2 backend rejects the input.
pub fn hash_password(password: &str) -> CredentialResult<String> {
    if password.is_empty() {
        return Err(CredentialError::InvalidInput("password cannot be empty"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| CredentialError::Hash(err.to_string()))?;
    Ok(hash.to_string())
}

/// Returns whether `password` matches `stored_hash`.
///
/// Accepts Argon2 PHC strings and bcrypt modular-crypt strings. Empty inputs,
/// plaintext and malformed hash strings yield `false` after the same work as
/// a real verification.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if is_bcrypt(stored_hash) {
        return match bcrypt::verify(password, stored_hash) {
            Ok(matched) => matched && !password.is_empty(),
            Err(_) => verify_unknown_account(password),
        };
    }

    match PasswordHash::new(stored_hash) {
        Ok(parsed) if is_argon2(&parsed) => {
            verify_argon2(password, &parsed) && !password.is_empty()
        }
        _ => verify_unknown_account(password),
    }
}

/// Burns one verification against a fixed hash and returns `false`.
pub(crate) fn verify_unknown_account(password: &str) -> bool {
    if let Some(parsed) = DUMMY_HASH
        .as_deref()
        .and_then(|dummy| PasswordHash::new(dummy).ok())
    {
        let _ = verify_argon2(password, &parsed);
    }
    false
}

/// Returns whether a stored credential is already in a recognized hash format.
///
/// Argon2 PHC strings and bcrypt modular-crypt strings count as hashed;
/// anything else is treated as legacy plaintext.
pub fn is_hashed(stored: &str) -> bool {
    if is_bcrypt(stored) {
        return true;
    }
    PasswordHash::new(stored)
        .map(|parsed| is_argon2(&parsed))
        .unwrap_or(false)
}

/// Returns whether a verified hash should be replaced with a current one.
///
/// True for bcrypt strings and for Argon2 strings written with other
/// parameters. Plaintext never verifies, so it is left to the migration sweep.
pub fn needs_rehash(stored: &str) -> bool {
    if is_bcrypt(stored) {
        return true;
    }
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    if parsed.algorithm.as_str() != "argon2id" {
        return is_argon2(&parsed);
    }
    match Params::try_from(&parsed) {
        Ok(params) => {
            params.m_cost() != MEMORY_COST_KIB
                || params.t_cost() != TIME_COST
                || params.p_cost() != PARALLELISM
        }
        Err(_) => false,
    }
}

fn is_bcrypt(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix))
}

fn is_argon2(parsed: &PasswordHash<'_>) -> bool {
    parsed.algorithm.as_str().starts_with("argon2")
}

fn verify_argon2(password: &str, parsed: &PasswordHash<'_>) -> bool {
    // Params and algorithm come from the PHC string itself.
    Argon2::default()
        .verify_password(password.as_bytes(), parsed)
        .is_ok()
}

fn hasher() -> CredentialResult<Argon2<'static>> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|err| CredentialError::Hash(err.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}
