use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::normalize_token;
use crate::error::ApiError;

/// What kind of pet parent the account identifies as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    Dog,
    Cat,
    Both,
    Other,
}

impl ParentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentType::Dog => "dog",
            ParentType::Cat => "cat",
            ParentType::Both => "both",
            ParentType::Other => "other",
        }
    }
}

impl std::str::FromStr for ParentType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "dog" | "perro" | "perros" => Ok(ParentType::Dog),
            "cat" | "gato" | "gatos" => Ok(ParentType::Cat),
            "both" | "ambos" => Ok(ParentType::Both),
            "other" | "otro" => Ok(ParentType::Other),
            _ => Err(ApiError::bad_request(format!("Unknown parent type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub parent_type: String,
    pub photo: Option<String>,
    pub notifications_enabled: bool,
    pub oauth_provider: Option<String>,
    #[serde(skip_serializing)]
    pub oauth_subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOwnerRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub parent_type: Option<String>,
    pub photo: Option<String>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOwnerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub parent_type: Option<String>,
    pub photo: Option<String>,
    pub notifications_enabled: Option<bool>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trimmed, lowercased email. Rejects inner whitespace, a second `@`, and
/// values without a local part or a dotted domain.
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.chars().any(char::is_whitespace) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(email)
        }
        _ => Err(ApiError::bad_request("Invalid email address")),
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_type_aliases() {
        assert_eq!("Perro".parse::<ParentType>().unwrap(), ParentType::Dog);
        assert_eq!("ambos".parse::<ParentType>().unwrap(), ParentType::Both);
        assert!("hamster".parse::<ParentType>().is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("bad user@example.com").is_err());
        assert!(normalize_email("ana@@example.com").is_err());
        assert!(normalize_email("ana@example.").is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let owner = Owner {
            id: 1,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: Some("$2b$12$hash".into()),
            parent_type: "dog".into(),
            photo: None,
            notifications_enabled: true,
            oauth_provider: None,
            oauth_subject: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&owner).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
    }
}
