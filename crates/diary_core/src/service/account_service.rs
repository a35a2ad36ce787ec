//! Account directory: signup, login and logout.
//!
//! # Responsibility
//! - Hash new credentials and persist accounts.
//! - Authenticate against stored hashes and populate the session.
//! - Upgrade bcrypt or outdated Argon2 hashes after a successful login.
//!
//! # Invariants
//! - Unknown usernames and wrong passwords produce the same
//!   `AccountError::InvalidCredentials` and cost one hash verification each.
//! - A failed signup never touches the existing account row.

use crate::credential::{
    hash_password, needs_rehash, verify_password, verify_unknown_account, CredentialError,
};
use crate::model::account::{validate_credentials, Account, AccountId, AccountValidationError};
use crate::repo::account_repo::AccountRepository;
use crate::repo::RepoError;
use crate::session::Session;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum AccountError {
    /// Empty username or password at signup.
    Validation(AccountValidationError),
    /// Signup conflict.
    DuplicateUsername(String),
    /// Login failure. Deliberately silent about which check failed.
    InvalidCredentials,
    /// Hasher rejected the password.
    Credential(CredentialError),
    /// Storage failure.
    Repo(RepoError),
}

impl Display for AccountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateUsername(username) => write!(f, "username already exists: {username}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::DuplicateUsername(_) | Self::InvalidCredentials => None,
        }
    }
}

impl From<RepoError> for AccountError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateUsername(username) => Self::DuplicateUsername(username),
            other => Self::Repo(other),
        }
    }
}

impl From<AccountValidationError> for AccountError {
    fn from(value: AccountValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CredentialError> for AccountError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

/// Account use-case service bound to one session.
pub struct AccountService<A: AccountRepository> {
    repo: A,
    session: Arc<Session>,
}

impl<A: AccountRepository> AccountService<A> {
    pub fn new(repo: A, session: Arc<Session>) -> Self {
        Self { repo, session }
    }

    /// Creates an account with a freshly hashed password.
    ///
    /// # Errors
    /// - `AccountError::Validation` for empty input.
    /// - `AccountError::DuplicateUsername` when the name is taken.
    pub fn signup(&self, username: &str, password: &str) -> Result<AccountId, AccountError> {
        validate_credentials(username, password)?;
        let password_hash = hash_password(password)?;

        match self.repo.create_account(username, &password_hash) {
            Ok(id) => {
                info!("event=signup module=account status=ok account_id={id}");
                Ok(id)
            }
            Err(RepoError::DuplicateUsername(name)) => {
                info!("event=signup module=account status=rejected error_code=duplicate_username");
                Err(AccountError::DuplicateUsername(name))
            }
            Err(err) => {
                warn!("event=signup module=account status=error error_code=storage error={err}");
                Err(err.into())
            }
        }
    }

    /// Verifies credentials and makes `username` the session's current user.
    ///
    /// On failure the session is left as it was.
    pub fn login(&self, username: &str, password: &str) -> Result<(), AccountError> {
        let account = self.repo.find_by_username(username)?;
        let verified = match account.as_ref() {
            Some(account) => verify_password(password, &account.password_hash),
            None => verify_unknown_account(password),
        };

        let Some(account) = account.filter(|_| verified) else {
            info!("event=login module=account status=rejected error_code=invalid_credentials");
            return Err(AccountError::InvalidCredentials);
        };

        if needs_rehash(&account.password_hash) {
            self.upgrade_hash(&account, password);
        }

        self.session.set_current_user(username);
        info!("event=login module=account status=ok");
        Ok(())
    }

    /// Clears the session. Returns the username that was logged in.
    pub fn logout(&self) -> Option<String> {
        let previous = self.session.clear();
        info!(
            "event=logout module=account status=ok had_session={}",
            previous.is_some()
        );
        previous
    }

    pub fn current_user(&self) -> Option<String> {
        self.session.current_user()
    }

    // Best effort: the login already succeeded, so failures are only logged.
    fn upgrade_hash(&self, account: &Account, password: &str) {
        let replacement = match hash_password(password) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(
                    "event=rehash module=account status=error account_id={} error={err}",
                    account.id
                );
                return;
            }
        };

        match self
            .repo
            .replace_password_hash(account.id, &account.password_hash, &replacement)
        {
            Ok(true) => info!("event=rehash module=account status=ok account_id={}", account.id),
            Ok(false) => info!(
                "event=rehash module=account status=skipped error_code=changed_concurrently account_id={}",
                account.id
            ),
            Err(err) => warn!(
                "event=rehash module=account status=error account_id={} error={err}",
                account.id
            ),
        }
    }
}
