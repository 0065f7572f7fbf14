use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::User;
use crate::config::AuthConfig;
use crate::error::{unauthenticated_error, upstream_error, Error};

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<User, Error>;
}

pub type DynAuthenticator = Arc<dyn Authenticator>;

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    app_metadata: Metadata,
    #[serde(default)]
    user_metadata: Metadata,
}

impl IdentityResponse {
    // app metadata is set server side; user metadata may only claim the
    // self-service roles
    fn roles(&self) -> Vec<String> {
        let role = match (&self.app_metadata.role, &self.user_metadata.role) {
            (Some(role), _) => role.as_str(),
            (None, Some(role)) if role == "driver" || role == "customer" => role.as_str(),
            _ => "customer",
        };

        vec![role.to_string()]
    }
}

impl From<IdentityResponse> for User {
    fn from(identity: IdentityResponse) -> Self {
        let roles = identity.roles();

        Self {
            id: identity.id,
            email: identity.email.unwrap_or_default(),
            roles,
        }
    }
}

/// Verifies tokens against a Supabase-compatible auth server.
pub struct SupabaseAuthenticator {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl SupabaseAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            key: config.key.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for SupabaseAuthenticator {
    #[tracing::instrument(skip_all)]
    async fn authenticate(&self, token: &str) -> Result<User, Error> {
        let res = self
            .client
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.key)
            .bearer_auth(token)
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code == 401 || status_code == 403 {
            return Err(unauthenticated_error());
        } else if status_code != 200 {
            tracing::warn!("auth provider responded with {}", status_code);
            return Err(upstream_error());
        }

        let identity: IdentityResponse = res.json().await?;

        Ok(identity.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(value: serde_json::Value) -> User {
        serde_json::from_value::<IdentityResponse>(value)
            .unwrap()
            .into()
    }

    #[test]
    fn app_metadata_role_wins() {
        let user = identity(json!({
            "id": "6f1c1f4e-9f59-4b0e-a1f3-33c0b7f2a1d1",
            "email": "admin@example.com",
            "app_metadata": { "role": "admin" },
            "user_metadata": { "role": "driver" }
        }));

        assert_eq!(user.roles, vec!["admin".to_string()]);
        assert_eq!(user.email, "admin@example.com");
    }

    #[test]
    fn user_metadata_cannot_claim_admin() {
        let user = identity(json!({
            "id": "6f1c1f4e-9f59-4b0e-a1f3-33c0b7f2a1d1",
            "user_metadata": { "role": "admin" }
        }));

        assert_eq!(user.roles, vec!["customer".to_string()]);
    }

    #[test]
    fn drivers_sign_up_through_user_metadata() {
        let user = identity(json!({
            "id": "6f1c1f4e-9f59-4b0e-a1f3-33c0b7f2a1d1",
            "email": "driver@example.com",
            "app_metadata": {},
            "user_metadata": { "role": "driver" }
        }));

        assert_eq!(user.roles, vec!["driver".to_string()]);
    }
}
