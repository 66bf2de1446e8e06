//! Username/password checking.
//!
//! Credential storage lives outside this crate; the server wires in a
//! `CredentialBackend`. `StaticCredentials` is the built-in table.

use std::collections::HashMap;

use super::constant_time_eq;

/// Resolves a username/password pair to an accept/reject decision.
pub trait CredentialBackend: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Fixed in-memory credential table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the single built-in `admin` / `password` account.
    pub fn with_default_admin() -> Self {
        Self::new().with_user("admin", "password")
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.insert(username.to_string(), password.to_string());
        self
    }
}

impl CredentialBackend for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(expected) => constant_time_eq(expected.as_bytes(), password.as_bytes()),
            None => false,
        }
    }
}
