//! Current authenticated identity for one running process.
//!
//! # Responsibility
//! - Hold the username set by the last successful login.
//! - Resolve that username to its durable account id on demand.
//!
//! # Invariants
//! - Writes happen under a lock, so a login on one thread is visible to
//!   every entry operation issued afterwards on any thread.
//! - Resolution never substitutes a placeholder id; it fails instead.

use crate::model::account::AccountId;
use crate::repo::account_repo::AccountRepository;
use crate::repo::RepoError;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{PoisonError, RwLock};

#[derive(Debug)]
pub enum SessionError {
    /// Nobody is logged in.
    NoCurrentUser,
    /// The session names a user that has no account row.
    UserNotFound(String),
    /// Lookup hit a storage failure.
    Repo(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCurrentUser => write!(f, "no user is logged in"),
            Self::UserNotFound(username) => {
                write!(f, "session user `{username}` has no matching account")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Injectable holder for the current username.
///
/// Share it between services with `Arc<Session>`; tests can create as many
/// independent sessions as they need.
#[derive(Debug, Default)]
pub struct Session {
    current_user: RwLock<Option<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current user. An empty username clears the session.
    pub fn set_current_user(&self, username: &str) {
        let value = if username.is_empty() {
            None
        } else {
            Some(username.to_string())
        };
        *self
            .current_user
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn current_user(&self) -> Option<String> {
        self.current_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the session and returns the username that was set, if any.
    pub fn clear(&self) -> Option<String> {
        self.current_user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Maps the current username to its account id.
    ///
    /// # Errors
    /// - `SessionError::NoCurrentUser` when the session is empty.
    /// - `SessionError::UserNotFound` when the account no longer exists.
    /// - `SessionError::Repo` on storage failure.
    pub fn resolve_current_user_id(
        &self,
        accounts: &impl AccountRepository,
    ) -> Result<AccountId, SessionError> {
        let Some(username) = self.current_user() else {
            debug!("event=identity_resolve module=session status=error error_code=no_current_user");
            return Err(SessionError::NoCurrentUser);
        };

        match accounts.find_id_by_username(&username)? {
            Some(id) => {
                debug!("event=identity_resolve module=session status=ok account_id={id}");
                Ok(id)
            }
            None => {
                warn!("event=identity_resolve module=session status=error error_code=user_not_found");
                Err(SessionError::UserNotFound(username))
            }
        }
    }
}
