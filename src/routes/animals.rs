use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Local;

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        animal::{Animal, AnimalListQuery, AnimalOwner, CreateAnimalRequest, LinkOwnerRequest, UpdateAnimalRequest},
        calendar::{CalendarEntry, CalendarQuery},
    },
    services::{animals::AnimalService, calendar::CalendarService},
    AppState,
};

pub async fn list_animals(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnimalListQuery>,
) -> Result<Json<Vec<Animal>>, ApiError> {
    let animals = AnimalService::list(&state.db, query.id_dueno).await?;
    Ok(Json(animals))
}

pub async fn get_animal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Animal>, ApiError> {
    Ok(Json(AnimalService::get(&state.db, id).await?))
}

pub async fn create_animal(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateAnimalRequest>,
) -> Result<(StatusCode, Json<Animal>), ApiError> {
    let animal = AnimalService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(animal)))
}

pub async fn update_animal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateAnimalRequest>,
) -> Result<Json<Animal>, ApiError> {
    Ok(Json(AnimalService::update(&state.db, id, &body).await?))
}

pub async fn delete_animal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    AnimalService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_owners(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<AnimalOwner>>, ApiError> {
    Ok(Json(AnimalService::list_owners(&state.db, id).await?))
}

pub async fn link_owner(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<LinkOwnerRequest>,
) -> Result<Json<Vec<AnimalOwner>>, ApiError> {
    AnimalService::link_owner(&state.db, id, &body).await?;
    Ok(Json(AnimalService::list_owners(&state.db, id).await?))
}

pub async fn unlink_owner(
    State(state): State<AppState>,
    ApiPath((id, owner_id)): ApiPath<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    AnimalService::unlink_owner(&state.db, id, owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn animal_calendar(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> Result<Json<Vec<CalendarEntry>>, ApiError> {
    let today = query.desde.unwrap_or_else(|| Local::now().date_naive());
    let entries = CalendarService::for_animal(&state.db, id, today, query.dias).await?;
    Ok(Json(entries))
}
