use axum::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::header::AUTHORIZATION;
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DynAuthenticator;
use crate::entities::Role;
use crate::error::{unauthenticated_error, unexpected_error, Error};

/// Authenticated caller, resolved from the bearer token on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl User {
    pub fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }

    /// The role a new profile is registered under.
    pub fn primary_role(&self) -> Role {
        if self.has_role("admin".into()) {
            Role::Admin
        } else if self.has_role("driver".into()) {
            Role::Driver
        } else {
            Role::Customer
        }
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id.to_string())
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}

pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token.trim()).filter(|token| !token.is_empty())
}

#[async_trait]
impl<B> FromRequest<B> for User
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let authenticator = req
            .extensions()
            .get::<DynAuthenticator>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("authenticator extension missing");
                unexpected_error()
            })?;

        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(unauthenticated_error)?
            .to_string();

        authenticator.authenticate(&token).await
    }
}
