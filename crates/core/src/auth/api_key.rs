//! Shared-token authentication for operator and admin endpoints.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Name of the cookie the dashboard stores the token in.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticator that validates requests against a configured token.
///
/// Accepts the token from, in order:
/// - `Authorization: Bearer <token>` header
/// - `X-API-Key: <token>` header
/// - `token` cookie
pub struct ApiKeyAuthenticator {
    expected_key: String,
    user_id: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        // Identify the caller by a fingerprint of the token, never the token itself.
        let digest = Sha256::digest(api_key.as_bytes());
        let fingerprint: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        Self {
            expected_key: api_key,
            user_id: format!("operator-{}", fingerprint),
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.header("authorization") {
            let token = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "));
            if let Some(token) = token {
                return Some(token.trim());
            }
        }

        request
            .header("x-api-key")
            .or_else(|| request.cookie(TOKEN_COOKIE))
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided_key.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                user_id: self.user_id.clone(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid token".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("Authorization", "Bearer counter-token")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert!(identity.user_id.starts_with("operator-"));
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_token_cookie_valid() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("Cookie", "lang=id; token=counter-token")]);

        let identity = auth.authenticate(&request).await.unwrap();
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("X-API-Key", "counter-token")]);

        assert!(auth.authenticate(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_bearer_lowercase() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("Authorization", "bearer counter-token")]);

        assert!(auth.authenticate(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_cookie_token() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("Cookie", "token=stale")]);

        let result = auth.authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let result = auth.authenticate(&make_request(vec![])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_user_id_does_not_leak_token() {
        let auth = ApiKeyAuthenticator::new("counter-token".to_string());
        let request = make_request(vec![("Authorization", "Bearer counter-token")]);
        let identity = auth.authenticate(&request).await.unwrap();
        assert!(!identity.user_id.contains("counter-token"));
        assert_eq!(identity.user_id.len(), "operator-".len() + 8);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"tokem"));
        assert!(!constant_time_eq(b"token", b"toke"));
        assert!(constant_time_eq(b"", b""));
    }
}
