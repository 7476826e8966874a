use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Operator token required")]
    NotAuthenticated,

    #[error("Operator token rejected: {0}")]
    InvalidCredentials(String),

    #[error("auth.method = \"api_key\" but no api_key is configured")]
    MissingApiKey,
}

/// Decides who is behind an operator request.
///
/// Customer routes never reach an authenticator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Short name reported in logs, metrics and `/config`.
    fn method_name(&self) -> &'static str;
}
