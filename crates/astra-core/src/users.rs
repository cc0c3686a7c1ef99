//! Identity store: one record per email, kept in a concurrent map.
//!
//! Constructed once at process start and handed to request handlers through
//! application state — no module-level globals. Records are never deleted;
//! there is no delete path in the API.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
}

/// One registered account. `password_hash` is an argon2id PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub joined_at: DateTime<Utc>,
}

/// In-memory identity store keyed by email.
pub struct UserStore {
    users: DashMap<String, UserRecord>,
    // Most recently registered email; the unauthenticated profile endpoint
    // falls back to this account to match the reference wire behavior.
    latest: RwLock<Option<String>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            latest: RwLock::new(None),
        }
    }

    /// Register a new account. The entry API makes the duplicate check and
    /// the insert one atomic step, so concurrent registrations of the same
    /// email cannot both succeed.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, UserError> {
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            joined_at: Utc::now(),
        };

        match self.users.entry(email.to_string()) {
            Entry::Occupied(_) => Err(UserError::DuplicateEmail(email.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                *self.latest.write().expect("latest lock poisoned") = Some(email.to_string());
                tracing::info!(email = %email, "Registered account");
                Ok(record)
            }
        }
    }

    pub fn find(&self, email: &str) -> Option<UserRecord> {
        self.users.get(email).map(|r| r.clone())
    }

    /// Update the display name; returns the updated record, or None for an
    /// unknown email.
    pub fn update_name(&self, email: &str, name: &str) -> Option<UserRecord> {
        self.users.get_mut(email).map(|mut r| {
            r.name = name.to_string();
            r.clone()
        })
    }

    /// The most recently registered account, if any.
    pub fn latest_registered(&self) -> Option<UserRecord> {
        let email = self.latest.read().expect("latest lock poisoned").clone()?;
        self.find(&email)
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
