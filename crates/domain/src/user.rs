//! User record.

use common::UserId;
use serde::{Deserialize, Serialize};

/// A plain user record.
///
/// Carries no credential or framework surface; the administrator
/// capability is a separate check performed by the authentication
/// collaborator, decoupled from the persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl User {
    /// Creates a new user record.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            name: name.into(),
        }
    }
}
