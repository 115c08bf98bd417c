use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;

use crate::{
    error::ApiError,
    models::{
        auth::{AuthResponse, Claims, LoginRequest, RegisterRequest},
        owner::{CreateOwnerRequest, Owner},
    },
    services::owners::OwnerService,
};

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".into())
}

pub struct AuthService;

impl AuthService {
    pub async fn register(
        pool: &PgPool,
        req: &RegisterRequest,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<AuthResponse> {
        let owner = OwnerService::create(
            pool,
            &CreateOwnerRequest {
                name: req.name.clone(),
                email: req.email.clone(),
                password: Some(req.password.clone()),
                parent_type: req.parent_type.clone(),
                photo: req.photo.clone(),
                notifications_enabled: None,
            },
        )
        .await?;
        let token = Self::generate_access_token(&owner, jwt_secret, ttl_seconds)?;
        Ok(AuthResponse { token, owner })
    }

    /// Verifies the password against the stored bcrypt hash. OAuth-only
    /// accounts have no hash and cannot log in with a password.
    pub async fn login(
        pool: &PgPool,
        req: &LoginRequest,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<AuthResponse> {
        let owner = OwnerService::find_by_email(pool, req.email.trim())
            .await?
            .ok_or_else(invalid_credentials)?;

        let hash = owner.password_hash.as_deref().ok_or_else(invalid_credentials)?;
        let valid = bcrypt::verify(&req.password, hash).map_err(|_| invalid_credentials())?;
        if !valid {
            return Err(invalid_credentials().into());
        }

        let token = Self::generate_access_token(&owner, jwt_secret, ttl_seconds)?;
        Ok(AuthResponse { token, owner })
    }

    pub fn generate_access_token(owner: &Owner, secret: &str, ttl_seconds: u64) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: owner.id.to_string(),
            email: owner.email.clone(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }
}
