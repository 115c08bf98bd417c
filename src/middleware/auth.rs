use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    error::ApiError,
    models::auth::{AuthenticatedOwner, Claims},
};

impl<S> FromRequestParts<S> for AuthenticatedOwner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".into()))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("JWT secret extension missing")))?;

        decode_access_token(token, &secret.0)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
    }
}

impl AuthenticatedOwner {
    /// Owners may only act on their own account.
    pub fn ensure_owner(&self, owner_id: i64) -> Result<(), ApiError> {
        if self.owner_id != owner_id {
            return Err(ApiError::Forbidden("You can only modify your own account".into()));
        }
        Ok(())
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub fn decode_access_token(token: &str, secret: &str) -> Result<AuthenticatedOwner, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedOwner {
        owner_id: claims.sub.parse()?,
        email: claims.email,
    })
}
