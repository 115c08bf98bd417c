use anyhow::Context;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::{Config, OAuthClient},
    error::ApiError,
    models::auth::{NormalizedProfile, OAuthProvider, OAuthSession},
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
}

fn client_for(config: &Config, provider: OAuthProvider) -> Result<&OAuthClient, ApiError> {
    let client = match provider {
        OAuthProvider::Google => config.google.as_ref(),
        OAuthProvider::Facebook => config.facebook.as_ref(),
        OAuthProvider::Apple => config.apple.as_ref(),
    };
    client.ok_or_else(|| ApiError::bad_request(format!("{} login is not configured", provider.as_str())))
}

/// Random value tying a callback to the browser that started the flow.
pub fn new_state() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Reduces a provider's profile payload to the fields the app uses.
/// Returns `None` when the payload has no stable user id. An email the
/// provider marks as unverified is dropped, so it can never be used to link
/// an existing account.
pub fn normalize_profile(provider: OAuthProvider, raw: &Value) -> Option<NormalizedProfile> {
    let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    // Google sends a bool, Apple's id_token a "true"/"false" string.
    let email_verified = match raw.get("email_verified") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => provider == OAuthProvider::Facebook,
    };

    let (id, photo) = match provider {
        OAuthProvider::Google => (text("sub").or_else(|| text("id")), text("picture")),
        OAuthProvider::Facebook => (
            text("id"),
            raw.pointer("/picture/data/url")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        OAuthProvider::Apple => (text("sub"), None),
    };

    let name = match provider {
        // Apple only sends the name on first consent, outside the id_token.
        OAuthProvider::Apple => text("name").or_else(|| {
            let first = raw.pointer("/name/firstName").and_then(Value::as_str)?;
            let last = raw.pointer("/name/lastName").and_then(Value::as_str).unwrap_or("");
            Some(format!("{first} {last}").trim().to_string())
        }),
        _ => text("name"),
    };

    Some(NormalizedProfile {
        provider,
        id: id?,
        email: text("email")
            .filter(|_| email_verified)
            .map(|e| e.to_lowercase()),
        name,
        photo,
    })
}

/// Client route the OAuth popup lands on, carrying either the session JSON or
/// an error message.
pub fn callback_redirect(client_url: &str, outcome: Result<&OAuthSession, &str>) -> String {
    let base = format!("{}/auth/callback", client_url.trim_end_matches('/'));
    let (key, value) = match outcome {
        Ok(session) => ("data", serde_json::to_string(session).unwrap_or_default()),
        Err(message) => ("error", message.to_string()),
    };
    match Url::parse_with_params(&base, &[(key, value.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

pub struct OAuthService;

impl OAuthService {
    /// Provider consent URL for the popup to open. `state` comes back on the
    /// callback and must match what the browser holds.
    pub fn authorize_url(
        config: &Config,
        provider: OAuthProvider,
        state: &str,
    ) -> Result<String, ApiError> {
        let client = client_for(config, provider)?;
        let redirect_uri = config.oauth_redirect_uri(provider.as_str());

        let mut params = vec![
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", provider.scope()),
            ("state", state),
        ];
        if provider == OAuthProvider::Apple {
            params.push(("response_mode", "query"));
        }

        let url = Url::parse_with_params(provider.authorize_url(), &params)
            .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(url.to_string())
    }

    /// Exchanges the authorization code and fetches the normalized profile.
    pub async fn fetch_profile(
        http: &Client,
        config: &Config,
        provider: OAuthProvider,
        code: &str,
    ) -> anyhow::Result<NormalizedProfile> {
        let client = client_for(config, provider)?;
        let redirect_uri = config.oauth_redirect_uri(provider.as_str());

        let tokens: TokenResponse = http
            .post(provider.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()
            .context("Token exchange rejected")?
            .json()
            .await
            .context("Unreadable token response")?;

        let raw: Value = match provider {
            OAuthProvider::Google => {
                let access_token = tokens.access_token.context("No access token in response")?;
                http.get("https://www.googleapis.com/oauth2/v3/userinfo")
                    .bearer_auth(access_token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?
            }
            OAuthProvider::Facebook => {
                let access_token = tokens.access_token.context("No access token in response")?;
                http.get("https://graph.facebook.com/me")
                    .query(&[
                        ("fields", "id,name,email,picture.type(large)"),
                        ("access_token", access_token.as_str()),
                    ])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?
            }
            OAuthProvider::Apple => {
                // The id_token comes straight from Apple's token endpoint over TLS.
                let id_token = tokens.id_token.context("No id_token in response")?;
                let mut validation = Validation::new(Algorithm::RS256);
                validation.insecure_disable_signature_validation();
                validation.validate_aud = false;
                validation.validate_exp = false;
                validation.required_spec_claims.clear();
                decode::<Value>(&id_token, &DecodingKey::from_secret(&[]), &validation)?.claims
            }
        };

        let profile = normalize_profile(provider, &raw)
            .ok_or_else(|| anyhow::anyhow!("{} profile has no user id", provider.as_str()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn google_profile_is_normalized() {
        let raw = json!({
            "sub": "1089",
            "email": "Ana@Gmail.com",
            "email_verified": true,
            "name": "Ana Pérez",
            "picture": "https://lh3.googleusercontent.com/a.png"
        });
        let profile = normalize_profile(OAuthProvider::Google, &raw).unwrap();
        assert_eq!(profile.id, "1089");
        assert_eq!(profile.email.as_deref(), Some("ana@gmail.com"));
        assert_eq!(profile.photo.as_deref(), Some("https://lh3.googleusercontent.com/a.png"));
    }

    #[test]
    fn facebook_picture_is_nested() {
        let raw = json!({
            "id": "77",
            "name": "Luis",
            "picture": { "data": { "url": "https://fb.example/p.jpg" } }
        });
        let profile = normalize_profile(OAuthProvider::Facebook, &raw).unwrap();
        assert_eq!(profile.id, "77");
        assert_eq!(profile.photo.as_deref(), Some("https://fb.example/p.jpg"));
        assert!(profile.email.is_none());
    }

    #[test]
    fn apple_name_is_assembled_from_parts() {
        let raw = json!({
            "sub": "001.abc",
            "email": "x@privaterelay.appleid.com",
            "email_verified": "true",
            "name": { "firstName": "Sofía", "lastName": "Ruiz" }
        });
        let profile = normalize_profile(OAuthProvider::Apple, &raw).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Sofía Ruiz"));
        assert!(profile.photo.is_none());
    }

    #[test]
    fn unverified_email_is_dropped() {
        let raw = json!({ "sub": "5", "email": "victim@example.com", "email_verified": false });
        let profile = normalize_profile(OAuthProvider::Google, &raw).unwrap();
        assert!(profile.email.is_none());

        let raw = json!({ "sub": "6", "email": "someone@example.com" });
        assert!(normalize_profile(OAuthProvider::Google, &raw).unwrap().email.is_none());

        let raw = json!({ "sub": "7", "email": "x@example.com", "email_verified": "false" });
        assert!(normalize_profile(OAuthProvider::Apple, &raw).unwrap().email.is_none());
    }

    #[test]
    fn states_are_random() {
        let a = new_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, new_state());
    }

    #[test]
    fn profile_without_id_is_rejected() {
        assert!(normalize_profile(OAuthProvider::Google, &json!({ "email": "a@b.co" })).is_none());
    }

    #[test]
    fn error_redirect_is_url_encoded() {
        let url = callback_redirect("http://localhost:5173/", Err("access denied"));
        assert_eq!(url, "http://localhost:5173/auth/callback?error=access+denied");
    }

    #[test]
    fn success_redirect_carries_session_json() {
        let session = OAuthSession {
            token: "jwt".into(),
            owner_id: 5,
            profile: NormalizedProfile {
                provider: OAuthProvider::Google,
                id: "1".into(),
                email: Some("a@b.co".into()),
                name: Some("A B".into()),
                photo: None,
            },
        };
        let url = Url::parse(&callback_redirect("https://app.example", Ok(&session))).unwrap();
        assert_eq!(url.path(), "/auth/callback");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "data");
        let data: Value = serde_json::from_str(&value).unwrap();
        assert_eq!(data["token"], "jwt");
        assert_eq!(data["owner_id"], 5);
        assert_eq!(data["provider"], "google");
        assert_eq!(data["email"], "a@b.co");
    }
}
