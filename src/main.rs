use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petcare_api::{
    config::Config,
    db, routes,
    services::{email::EmailService, reminder_scheduler},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis = match config.redis_url.as_deref() {
        Some(url) => match RedisClient::open(url)?.get_multiplexed_async_connection().await {
            Ok(conn) => {
                info!("Redis connected");
                Some(conn)
            }
            Err(e) => {
                warn!("Redis unavailable, login rate limiting disabled: {}", e);
                None
            }
        },
        None => {
            info!("REDIS_URL not set, login rate limiting disabled");
            None
        }
    };

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured, reminders will only be logged");
    }

    if config.reminder_dispatcher_enabled {
        reminder_scheduler::start(pool.clone(), email.clone(), config.reminder_poll_secs);
        info!("Reminder dispatcher running every {}s", config.reminder_poll_secs);
    } else {
        info!("Reminder dispatcher disabled (REMINDER_DISPATCHER_ENABLED=false)");
    }

    let state = AppState {
        db: pool,
        redis,
        config: config.clone(),
        email,
        http: reqwest::Client::new(),
    };

    // The web client and local development servers.
    let client_url = config.client_url.trim_end_matches('/').to_string();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        o == client_url || o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1")
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let app = routes::router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    info!("petcare API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
