use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath, ApiQuery},
    models::weight::{CreateWeightRequest, UpdateWeightRequest, WeightQuery, WeightRecord},
    services::weights::WeightService,
    AppState,
};

pub async fn list_weights(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WeightQuery>,
) -> Result<Json<Vec<WeightRecord>>, ApiError> {
    Ok(Json(WeightService::list(&state.db, query.id_animal).await?))
}

pub async fn get_weight(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<WeightRecord>, ApiError> {
    Ok(Json(WeightService::get(&state.db, id).await?))
}

pub async fn latest_weight(
    State(state): State<AppState>,
    ApiPath(animal_id): ApiPath<i64>,
) -> Result<Json<WeightRecord>, ApiError> {
    Ok(Json(WeightService::latest(&state.db, animal_id).await?))
}

pub async fn create_weight(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateWeightRequest>,
) -> Result<(StatusCode, Json<WeightRecord>), ApiError> {
    let record = WeightService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_weight(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateWeightRequest>,
) -> Result<Json<WeightRecord>, ApiError> {
    Ok(Json(WeightService::update(&state.db, id, &body).await?))
}

pub async fn delete_weight(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    WeightService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
