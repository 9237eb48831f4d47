//! HTTP client for the external identity service.

use async_trait::async_trait;
use common::UserId;
use reqwest::StatusCode;
use serde::Deserialize;

use super::identity::{AuthorInfo, IdentityError, IdentityValidator};

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    success: bool,
}

/// Identity service reached over HTTP.
///
/// - `GET {base}/users/{id}/validate` → `{"success": bool}`
/// - `GET {base}/users/{id}/author` → `{"id": ..., "display_name": ...}`
///
/// A 404 means the user does not exist; other non-success statuses are
/// reported as [`IdentityError::Unavailable`].
#[derive(Debug, Clone)]
pub struct HttpIdentityValidator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityValidator {
    /// Creates a client for the identity service at `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn user_url(&self, id: UserId, action: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, id, action)
    }
}

#[async_trait]
impl IdentityValidator for HttpIdentityValidator {
    #[tracing::instrument(skip(self), err)]
    async fn validate_user(&self, id: UserId) -> Result<bool, IdentityError> {
        let response = self.client.get(self.user_url(id, "validate")).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                let body: ValidateResponse = response.json().await?;
                Ok(body.success)
            }
            status => Err(IdentityError::Unavailable(format!(
                "validate returned {status}"
            ))),
        }
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_author_info(&self, id: UserId) -> Result<AuthorInfo, IdentityError> {
        let response = self.client.get(self.user_url(id, "author")).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(IdentityError::NotFound(id)),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(IdentityError::Unavailable(format!(
                "author lookup returned {status}"
            ))),
        }
    }
}
