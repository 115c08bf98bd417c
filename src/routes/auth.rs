use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath},
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::{
            AuthResponse, AuthenticatedOwner, LoginRequest, OAuthCallbackQuery, OAuthProvider,
            OAuthSession, RegisterRequest,
        },
        owner::Owner,
    },
    services::{
        auth::AuthService,
        oauth::{self, callback_redirect, OAuthService},
        owners::OwnerService,
    },
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = AuthService::register(
        &state.db,
        &body,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // 5 attempts per 15 min per email
    let rate_key = format!("rate:login:{}", body.email.trim().to_lowercase());
    check_rate_limit(state.redis.as_ref(), &rate_key, 5, 900).await?;

    let response = AuthService::login(
        &state.db,
        &body,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await?;
    Ok(Json(response))
}

pub async fn me(
    State(state): State<AppState>,
    owner: AuthenticatedOwner,
) -> Result<Json<Owner>, ApiError> {
    Ok(Json(OwnerService::get(&state.db, owner.owner_id).await?))
}

const STATE_COOKIE: &str = "oauth_state";

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

fn state_cookie(value: &str, max_age: u32) -> String {
    format!("{STATE_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/api/auth; Max-Age={max_age}")
}

/// Sends the popup to the provider's consent screen. The `state` sent to the
/// provider is also kept in a ten-minute cookie for the callback to check.
pub async fn oauth_start(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider: OAuthProvider = provider.parse()?;
    let oauth_state = oauth::new_state();
    let url = OAuthService::authorize_url(&state.config, provider, &oauth_state)?;
    Ok((
        [(header::SET_COOKIE, state_cookie(&oauth_state, 600))],
        Redirect::to(&url),
    ))
}

/// Provider redirect target. Always answers with a redirect to the client,
/// carrying either the session or an error message, and clears the state
/// cookie.
pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<OAuthCallbackQuery>, QueryRejection>,
) -> Response {
    let client_url = state.config.client_url.as_str();
    let target = match query {
        Ok(Query(query)) => {
            let expected = get_cookie(&headers, STATE_COOKIE);
            callback_target(&state, &query, expected.as_deref()).await
        }
        Err(_) => callback_redirect(client_url, Err("Invalid callback parameters")),
    };
    (
        [(header::SET_COOKIE, state_cookie("", 0))],
        Redirect::to(&target),
    )
        .into_response()
}

async fn callback_target(
    state: &AppState,
    query: &OAuthCallbackQuery,
    expected_state: Option<&str>,
) -> String {
    let client_url = state.config.client_url.as_str();

    if let Some(error) = query.error.as_deref() {
        tracing::info!("OAuth provider returned an error: {}", error);
        return callback_redirect(client_url, Err(error));
    }

    let provider = match query.provider.as_deref().map(str::parse::<OAuthProvider>) {
        Some(Ok(provider)) => provider,
        _ => return callback_redirect(client_url, Err("Unsupported provider")),
    };
    let Some(code) = query.code.as_deref() else {
        return callback_redirect(client_url, Err("Missing authorization code"));
    };
    match (query.state.as_deref(), expected_state) {
        (Some(got), Some(expected)) if !got.is_empty() && got == expected => {}
        _ => {
            tracing::warn!("OAuth callback via {} with a mismatched state", provider.as_str());
            return callback_redirect(client_url, Err("Invalid OAuth state"));
        }
    }

    match complete_oauth(state, provider, code).await {
        Ok(session) => callback_redirect(client_url, Ok(&session)),
        Err(e) => {
            tracing::warn!("OAuth login via {} failed: {:#}", provider.as_str(), e);
            callback_redirect(client_url, Err("Authentication failed"))
        }
    }
}

async fn complete_oauth(
    state: &AppState,
    provider: OAuthProvider,
    code: &str,
) -> anyhow::Result<OAuthSession> {
    let profile = OAuthService::fetch_profile(&state.http, &state.config, provider, code).await?;
    let owner = OwnerService::upsert_oauth(&state.db, &profile).await?;
    let token = AuthService::generate_access_token(
        &owner,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )?;
    Ok(OAuthSession {
        token,
        owner_id: owner.id,
        profile,
    })
}
