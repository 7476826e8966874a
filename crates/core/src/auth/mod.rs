mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::config::{AuthConfig, AuthMethod};

/// Build the authenticator guarding operator routes.
pub fn create_authenticator(config: &AuthConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    let authenticator: Arc<dyn Authenticator> = match config.method {
        AuthMethod::None => Arc::new(NoneAuthenticator::new()),
        AuthMethod::ApiKey => match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Arc::new(ApiKeyAuthenticator::new(key.to_string())),
            _ => return Err(AuthError::MissingApiKey),
        },
    };
    Ok(authenticator)
}
