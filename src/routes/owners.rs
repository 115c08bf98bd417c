use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath},
    models::{
        animal::Animal,
        auth::AuthenticatedOwner,
        owner::{CreateOwnerRequest, Owner, UpdateOwnerRequest},
    },
    services::{animals::AnimalService, owners::OwnerService},
    AppState,
};

pub async fn list_owners(State(state): State<AppState>) -> Result<Json<Vec<Owner>>, ApiError> {
    Ok(Json(OwnerService::list(&state.db).await?))
}

pub async fn get_owner(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Owner>, ApiError> {
    Ok(Json(OwnerService::get(&state.db, id).await?))
}

pub async fn list_owner_animals(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<Animal>>, ApiError> {
    OwnerService::get(&state.db, id).await?;
    Ok(Json(AnimalService::list(&state.db, Some(id)).await?))
}

pub async fn create_owner(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOwnerRequest>,
) -> Result<(StatusCode, Json<Owner>), ApiError> {
    let owner = OwnerService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(owner)))
}

/// Account changes (including the password) need the owner's own token.
pub async fn update_owner(
    State(state): State<AppState>,
    caller: AuthenticatedOwner,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateOwnerRequest>,
) -> Result<Json<Owner>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(OwnerService::update(&state.db, id, &body).await?))
}

pub async fn delete_owner(
    State(state): State<AppState>,
    caller: AuthenticatedOwner,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    caller.ensure_owner(id)?;
    OwnerService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
