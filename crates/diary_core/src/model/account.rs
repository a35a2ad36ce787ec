//! Account domain model.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Store-generated numeric account identity.
pub type AccountId = i64;

/// Persisted account row.
///
/// `password_hash` is normally an Argon2 PHC string; before the credential
/// sweep it may still hold a legacy plaintext value.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
}

impl Debug for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Boundary validation failures for account input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyUsername,
    EmptyPassword,
}

impl Display for AccountValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username cannot be empty"),
            Self::EmptyPassword => write!(f, "password cannot be empty"),
        }
    }
}

impl Error for AccountValidationError {}

/// Checks the only constraints the core owns: both fields are non-empty.
///
/// Length and character rules belong to the presentation layer.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), AccountValidationError> {
    if username.trim().is_empty() {
        return Err(AccountValidationError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(AccountValidationError::EmptyPassword);
    }
    Ok(())
}
