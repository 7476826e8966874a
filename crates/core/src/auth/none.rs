use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that lets every operator request through as anonymous.
/// Must be chosen explicitly with `method = "none"`.
#[derive(Debug, Default)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_none_authenticator_ignores_credentials() {
        let auth = NoneAuthenticator::new();
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer whatever".to_string());
        let request = AuthRequest {
            headers,
            source_ip: "10.0.0.2".parse().unwrap(),
        };

        let identity = auth.authenticate(&request).await.unwrap();
        assert_eq!(identity, Identity::anonymous());
        assert_eq!(auth.method_name(), "none");
    }
}
