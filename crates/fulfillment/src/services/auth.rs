//! Authentication collaborator and explicit caller identity.
//!
//! The orchestrator never reads ambient security state: the boundary
//! resolves the session into a [`Caller`] value once and passes it to every
//! operation explicitly.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::User;

/// Trait for the authentication collaborator.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Returns the user for the current session, if any.
    async fn current_user(&self) -> Option<User>;

    /// Returns true if the current session has administrator capability.
    async fn is_administrator(&self) -> bool;
}

/// Resolved caller identity passed explicitly into orchestrator operations.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    user: Option<User>,
    admin: bool,
}

impl Caller {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A regular authenticated user.
    pub fn user(user: User) -> Self {
        Self {
            user: Some(user),
            admin: false,
        }
    }

    /// An authenticated user with administrator capability.
    pub fn administrator(user: User) -> Self {
        Self {
            user: Some(user),
            admin: true,
        }
    }

    /// Resolves the caller from the authentication collaborator.
    pub async fn resolve<A: AuthService + ?Sized>(auth: &A) -> Self {
        Self {
            user: auth.current_user().await,
            admin: auth.is_administrator().await,
        }
    }

    /// Returns the resolved user, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns true if the caller has administrator capability.
    pub fn is_administrator(&self) -> bool {
        self.admin
    }
}

#[derive(Debug, Default)]
struct InMemoryAuthState {
    user: Option<User>,
    admin: bool,
}

/// In-memory authentication service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthService {
    state: Arc<RwLock<InMemoryAuthState>>,
}

impl InMemoryAuthService {
    /// Creates a new service with no signed-in user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs a user in.
    pub fn sign_in(&self, user: User) {
        self.state.write().unwrap().user = Some(user);
    }

    /// Signs the current user out and drops administrator capability.
    pub fn sign_out(&self) {
        let mut state = self.state.write().unwrap();
        state.user = None;
        state.admin = false;
    }

    /// Grants or revokes administrator capability for the session.
    pub fn set_administrator(&self, admin: bool) {
        self.state.write().unwrap().admin = admin;
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn current_user(&self) -> Option<User> {
        self.state.read().unwrap().user.clone()
    }

    async fn is_administrator(&self) -> bool {
        self.state.read().unwrap().admin
    }
}
