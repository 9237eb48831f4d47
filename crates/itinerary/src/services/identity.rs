//! Identity service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Public author details resolved from the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: UserId,
    pub display_name: String,
}

/// Failures of the identity service, distinct from a negative validation.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service has no such user.
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// The HTTP call failed.
    #[error("Identity transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The identity service could not answer.
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// Capability exposed by the external identity service.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    /// Returns whether the user exists and is active.
    async fn validate_user(&self, id: UserId) -> Result<bool, IdentityError>;

    /// Resolves the public author details of a user.
    async fn get_author_info(&self, id: UserId) -> Result<AuthorInfo, IdentityError>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashMap<UserId, (String, bool)>,
}

/// In-memory identity service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityValidator {
    state: Arc<RwLock<InMemoryIdentityState>>,
    fail: Arc<AtomicBool>,
    validations: Arc<AtomicUsize>,
}

impl InMemoryIdentityValidator {
    /// Creates a new in-memory identity service with no users.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active user and returns its id.
    pub async fn register(&self, display_name: &str) -> UserId {
        let id = UserId::new();
        self.state
            .write()
            .await
            .users
            .insert(id, (display_name.to_string(), true));
        id
    }

    /// Marks a registered user as inactive; validation then answers `false`.
    pub async fn deactivate(&self, id: UserId) {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.1 = false;
        }
    }

    /// Configures every call to fail as if the service were down.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `validate_user` calls received.
    pub fn validation_count(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityValidator for InMemoryIdentityValidator {
    async fn validate_user(&self, id: UserId) -> Result<bool, IdentityError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.users.get(&id).is_some_and(|(_, active)| *active))
    }

    async fn get_author_info(&self, id: UserId) -> Result<AuthorInfo, IdentityError> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .users
            .get(&id)
            .map(|(display_name, _)| AuthorInfo {
                id,
                display_name: display_name.clone(),
            })
            .ok_or(IdentityError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_user_is_valid() {
        let identity = InMemoryIdentityValidator::new();
        let id = identity.register("alice").await;

        assert!(identity.validate_user(id).await.unwrap());
        assert!(!identity.validate_user(UserId::new()).await.unwrap());
        assert_eq!(identity.validation_count(), 2);
    }

    #[tokio::test]
    async fn deactivated_user_is_invalid_but_still_has_author_info() {
        let identity = InMemoryIdentityValidator::new();
        let id = identity.register("bob").await;
        identity.deactivate(id).await;

        assert!(!identity.validate_user(id).await.unwrap());
        let info = identity.get_author_info(id).await.unwrap();
        assert_eq!(info.display_name, "bob");
    }

    #[tokio::test]
    async fn unknown_author_is_typed_not_found() {
        let identity = InMemoryIdentityValidator::new();
        let id = UserId::new();

        let result = identity.get_author_info(id).await;
        assert!(matches!(result, Err(IdentityError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn outage_is_an_error_not_a_negative_answer() {
        let identity = InMemoryIdentityValidator::new();
        let id = identity.register("carol").await;
        identity.set_fail(true);

        assert!(matches!(
            identity.validate_user(id).await,
            Err(IdentityError::Unavailable(_))
        ));
    }
}
