use std::env;

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub host: String,
    pub port: u16,
    pub client_url: String,
    pub api_public_url: String,
    // OAuth providers (each optional)
    pub google: Option<OAuthClient>,
    pub facebook: Option<OAuthClient>,
    pub apple: Option<OAuthClient>,
    // SMTP (optional)
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    // Reminders
    pub reminder_poll_secs: u64,
    pub reminder_lead_days: i64,
    /// Run the dispatcher inside the API process. Turn off when the
    /// `send-reminders` job handles delivery.
    pub reminder_dispatcher_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: database_url()?,
            redis_url: optional("REDIS_URL"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "604800".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            api_public_url: env::var("API_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            google: oauth_client("GOOGLE"),
            facebook: oauth_client("FACEBOOK"),
            apple: oauth_client("APPLE"),
            smtp_host: optional("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_username: optional("SMTP_USERNAME"),
            smtp_password: optional("SMTP_PASSWORD"),
            smtp_from: optional("SMTP_FROM"),
            reminder_poll_secs: env::var("REMINDER_POLL_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            reminder_lead_days: env::var("REMINDER_LEAD_DAYS")
                .unwrap_or_else(|_| "1".into())
                .parse()?,
            reminder_dispatcher_enabled: match optional("REMINDER_DISPATCHER_ENABLED") {
                Some(v) => parse_flag(&v)?,
                None => true,
            },
        })
    }

    /// Redirect URI registered with every OAuth provider.
    pub fn oauth_redirect_uri(&self, provider: &str) -> String {
        format!(
            "{}/api/auth/callback?provider={provider}",
            self.api_public_url.trim_end_matches('/')
        )
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` parts.
fn database_url() -> anyhow::Result<String> {
    if let Some(url) = optional("DATABASE_URL") {
        return Ok(url);
    }
    let user = required("DB_USER")?;
    let password = env::var("DB_PASSWORD").unwrap_or_default();
    let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".into());
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".into());
    let database = required("DB_DATABASE")?;
    Ok(build_database_url(&user, &password, &host, &port, &database))
}

fn build_database_url(user: &str, password: &str, host: &str, port: &str, database: &str) -> String {
    if password.is_empty() {
        format!("postgres://{user}@{host}:{port}/{database}")
    } else {
        format!("postgres://{user}:{password}@{host}:{port}/{database}")
    }
}

fn oauth_client(prefix: &str) -> Option<OAuthClient> {
    Some(OAuthClient {
        client_id: optional(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: optional(&format!("{prefix}_CLIENT_SECRET"))?,
    })
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid boolean value: {}", other),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_from_parts() {
        assert_eq!(
            build_database_url("vet", "s3cret", "db", "5432", "mascotas"),
            "postgres://vet:s3cret@db:5432/mascotas"
        );
        assert_eq!(
            build_database_url("vet", "", "localhost", "5433", "mascotas"),
            "postgres://vet@localhost:5433/mascotas"
        );
    }

    #[test]
    fn dispatcher_flag_values() {
        assert!(parse_flag("true").unwrap());
        assert!(parse_flag(" 1 ").unwrap());
        assert!(!parse_flag("OFF").unwrap());
        assert!(!parse_flag("false").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
