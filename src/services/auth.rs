use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::settings;

/// The caller resolved from a bearer credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedHeader,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token has been revoked")]
    TokenRevoked,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// False when every request may proceed without a credential.
    fn requires_token(&self) -> bool {
        true
    }
}

/// Resolves the `Authorization` header value to an identity.
pub async fn authenticate(
    verifier: &dyn IdentityVerifier,
    header: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = match header {
        Some(value) => value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MalformedHeader)?,
        None if verifier.requires_token() => return Err(AuthError::MissingHeader),
        None => "",
    };

    verifier.verify_token(token).await
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Deserialize)]
struct LookupError {
    error: LookupErrorBody,
}

#[derive(Deserialize)]
struct LookupErrorBody {
    message: String,
}

/// Checks ID tokens against the Firebase identity toolkit.
pub struct FirebaseVerifier {
    api_key: String,
    url: String,
    client: reqwest::Client,
}

impl FirebaseVerifier {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            url: format!("{}/v1/accounts:lookup", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }
}

fn classify_rejection(message: &str) -> AuthError {
    if message.starts_with("TOKEN_EXPIRED") {
        AuthError::TokenExpired
    } else if message.starts_with("USER_DISABLED") {
        AuthError::TokenRevoked
    } else {
        AuthError::InvalidToken(message.to_string())
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !status.is_success() {
            return match serde_json::from_str::<LookupError>(&body) {
                Ok(rejection) if status.is_client_error() => {
                    Err(classify_rejection(&rejection.error.message))
                }
                _ => Err(AuthError::Provider(format!("HTTP {}", status))),
            };
        }

        let lookup: LookupResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Provider(e.to_string()))?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::InvalidToken("unknown account".to_string()))?;

        if user.disabled {
            return Err(AuthError::TokenRevoked);
        }

        Ok(Identity {
            user_id: user.local_id,
            email: user.email,
        })
    }
}

/// Development mode: every request acts as one fixed user.
pub struct DevVerifier {
    user_id: String,
}

impl DevVerifier {
    pub fn new(user_id: String) -> Self {
        Self { user_id }
    }
}

#[async_trait]
impl IdentityVerifier for DevVerifier {
    async fn verify_token(&self, _token: &str) -> Result<Identity, AuthError> {
        Ok(Identity {
            user_id: self.user_id.clone(),
            email: Some(format!("{}@corail.dev", self.user_id)),
        })
    }

    fn requires_token(&self) -> bool {
        false
    }
}

pub fn build_verifier(auth: &settings::Auth) -> Arc<dyn IdentityVerifier> {
    match &auth.api_key {
        Some(api_key) if !api_key.is_empty() => {
            log::info!("Verifying tokens against {}.", auth.base_url);
            Arc::new(FirebaseVerifier::new(api_key.clone(), &auth.base_url))
        }
        _ => {
            log::warn!(
                "No auth api key configured, every request acts as {}.",
                auth.dev_user_id
            );
            Arc::new(DevVerifier::new(auth.dev_user_id.clone()))
        }
    }
}

/// Maps `token-<user>` to `<user>` with email `<user>@test.corail`.
#[cfg(test)]
pub struct StaticVerifier;

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        match token {
            "expired" => Err(AuthError::TokenExpired),
            "revoked" => Err(AuthError::TokenRevoked),
            _ => token
                .strip_prefix("token-")
                .map(|user| Identity {
                    user_id: user.to_string(),
                    email: Some(format!("{}@test.corail", user)),
                })
                .ok_or_else(|| AuthError::InvalidToken(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_header_is_required() {
        let verifier = StaticVerifier;

        assert!(matches!(
            authenticate(&verifier, None).await,
            Err(AuthError::MissingHeader)
        ));
        assert!(matches!(
            authenticate(&verifier, Some("Basic abc")).await,
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            authenticate(&verifier, Some("Bearer ")).await,
            Err(AuthError::MalformedHeader)
        ));
        assert_eq!(
            authenticate(&verifier, Some("Bearer token-alice"))
                .await
                .unwrap()
                .user_id,
            "alice"
        );
    }

    #[tokio::test]
    async fn dev_mode_needs_no_header() {
        let verifier = DevVerifier::new("dev-user-001".to_string());

        let identity = authenticate(&verifier, None).await.unwrap();
        assert_eq!(identity.user_id, "dev-user-001");
    }

    #[test]
    fn provider_rejections_are_classified() {
        assert!(matches!(
            classify_rejection("TOKEN_EXPIRED"),
            AuthError::TokenExpired
        ));
        assert!(matches!(
            classify_rejection("USER_DISABLED : The user account has been disabled"),
            AuthError::TokenRevoked
        ));
        assert!(matches!(
            classify_rejection("INVALID_ID_TOKEN"),
            AuthError::InvalidToken(_)
        ));
    }

    #[test]
    fn missing_api_key_selects_dev_mode() {
        let verifier = build_verifier(&settings::Auth::default());
        assert!(!verifier.requires_token());

        let verifier = build_verifier(&settings::Auth {
            api_key: Some("key".to_string()),
            ..settings::Auth::default()
        });
        assert!(verifier.requires_token());
    }
}
