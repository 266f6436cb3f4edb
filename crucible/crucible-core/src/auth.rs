//! Caller identity: local admin sessions and the external SSO lookup.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Role reported by the identity provider for privileged (staff) users.
pub const STAFF_ROLE: &str = "Staff";

/// Claims carried by a local admin session token.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Claims>;
}

fn hs256_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // `exp` is optional, but checked whenever a token carries one
    validation.required_spec_claims.clear();
    validation
}

pub struct Hs256Verifier {
    key: DecodingKey,
}

impl Hs256Verifier {
    pub fn new(secret: String) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl TokenVerifier for Hs256Verifier {
    async fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.key, &hs256_validation())
            .ok()
            .map(|d| d.claims)
    }
}

/// User-info payload returned by the SSO identity provider.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct IdentityPayload {
    pub user: String,
    #[serde(rename = "type")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl IdentityPayload {
    pub fn is_staff(&self) -> bool {
        self.role == STAFF_ROLE
    }
}

/// External identity lookup. `None` means there is no usable SSO session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_identity(&self, token: &str) -> Option<IdentityPayload>;
}

/// Used when no SSO integration is configured: nobody has a session.
pub struct NoIdentityProvider;

#[async_trait]
impl IdentityProvider for NoIdentityProvider {
    async fn resolve_identity(&self, _token: &str) -> Option<IdentityPayload> {
        None
    }
}

/// Verifies SSO tokens that are HS256-signed user-info payloads.
pub struct SignedIdentityProvider {
    key: DecodingKey,
}

impl SignedIdentityProvider {
    pub fn new(secret: String) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl IdentityProvider for SignedIdentityProvider {
    async fn resolve_identity(&self, token: &str) -> Option<IdentityPayload> {
        match decode::<IdentityPayload>(token, &self.key, &hs256_validation()) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("rejected SSO token: {}", e);
                None
            }
        }
    }
}

/// Asks the SSO server's user-info endpoint who owns the token.
pub struct UserInfoIdentityProvider {
    url: String,
    client: reqwest::Client,
}

impl UserInfoIdentityProvider {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, token: &str) -> reqwest::Result<Option<IdentityPayload>> {
        let resp = self.client.get(&self.url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), "SSO user-info lookup refused token");
            return Ok(None);
        }
        resp.json().await.map(Some)
    }
}

#[async_trait]
impl IdentityProvider for UserInfoIdentityProvider {
    async fn resolve_identity(&self, token: &str) -> Option<IdentityPayload> {
        match self.fetch(token).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(url = %self.url, "SSO user-info lookup failed: {}", e);
                None
            }
        }
    }
}

/// Who is asking, as far as resource operations are concerned.
#[derive(Clone, Debug, Default)]
pub struct CallerContext {
    /// Verified local session; any session holder is an administrator.
    pub session: Option<Claims>,
    /// Raw SSO token, resolved lazily through the identity provider.
    pub sso_token: Option<String>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin(user: impl Into<String>) -> Self {
        Self {
            session: Some(Claims {
                sub: user.into(),
                exp: None,
            }),
            sso_token: None,
        }
    }

    pub fn with_sso_token(mut self, token: impl Into<String>) -> Self {
        self.sso_token = Some(token.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_some()
    }
}
