//! Identity port: validate that an order's owner exists.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use common::UserId;

/// Errors that can occur when interacting with the identity port.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity backend is unavailable.
    #[error("Identity backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for owner validation at order-creation time.
///
/// Optional per deployment: an engine without an identity port skips
/// owner validation entirely.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Returns true if a user with the given identifier exists.
    async fn exists(&self, user_id: UserId) -> Result<bool, IdentityError>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashSet<UserId>,
    fail_on_lookup: bool,
}

/// In-memory identity backend for tests and standalone deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityService {
    /// Creates a new empty in-memory identity service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a known user.
    pub fn register(&self, user_id: UserId) {
        self.state.write().unwrap().users.insert(user_id);
    }

    /// Configures the backend to fail on the next lookup.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }
}

#[async_trait]
impl IdentityPort for InMemoryIdentityService {
    async fn exists(&self, user_id: UserId) -> Result<bool, IdentityError> {
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(IdentityError::Unavailable(
                "simulated backend failure".to_string(),
            ));
        }
        Ok(state.users.contains(&user_id))
    }
}
