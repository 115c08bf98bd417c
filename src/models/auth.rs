use serde::{Deserialize, Serialize};

use super::owner::Owner;
use crate::error::ApiError;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // owner id
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT, available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedOwner {
    pub owner_id: i64,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub parent_type: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    Google,
    Facebook,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
            OAuthProvider::Apple => "apple",
        }
    }

    pub fn authorize_url(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Facebook => "https://www.facebook.com/v18.0/dialog/oauth",
            OAuthProvider::Apple => "https://appleid.apple.com/auth/authorize",
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Facebook => "https://graph.facebook.com/v18.0/oauth/access_token",
            OAuthProvider::Apple => "https://appleid.apple.com/auth/token",
        }
    }

    pub fn scope(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "openid email profile",
            OAuthProvider::Facebook => "email,public_profile",
            OAuthProvider::Apple => "name email",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "facebook" => Ok(OAuthProvider::Facebook),
            "apple" => Ok(OAuthProvider::Apple),
            _ => Err(ApiError::bad_request(format!("Unsupported provider: {s}"))),
        }
    }
}

/// Provider profile reduced to the fields the app uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedProfile {
    pub provider: OAuthProvider,
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub provider: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Payload handed to the client route after a successful OAuth login.
#[derive(Debug, Serialize)]
pub struct OAuthSession {
    pub token: String,
    pub owner_id: i64,
    #[serde(flatten)]
    pub profile: NormalizedProfile,
}
