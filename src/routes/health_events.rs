use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath, ApiQuery},
    models::health_event::{
        CreateHealthEventRequest, EventType, HealthEvent, HealthEventQuery, UpdateHealthEventRequest,
    },
    services::health_events::HealthEventService,
    AppState,
};

pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HealthEventQuery>,
) -> Result<Json<Vec<HealthEvent>>, ApiError> {
    let event_type = query.tipo.as_deref().map(str::parse::<EventType>).transpose()?;
    let events = HealthEventService::list(&state.db, query.id_animal, event_type).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<HealthEvent>, ApiError> {
    Ok(Json(HealthEventService::get(&state.db, id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateHealthEventRequest>,
) -> Result<(StatusCode, Json<HealthEvent>), ApiError> {
    let event =
        HealthEventService::create(&state.db, &body, state.config.reminder_lead_days).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateHealthEventRequest>,
) -> Result<Json<HealthEvent>, ApiError> {
    let event =
        HealthEventService::update(&state.db, id, &body, state.config.reminder_lead_days).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    HealthEventService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
