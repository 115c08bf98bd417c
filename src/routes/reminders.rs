use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    middleware::extract::{ApiJson, ApiPath, ApiQuery},
    models::reminder::{CreateReminderRequest, Reminder, ReminderQuery},
    services::reminders::ReminderService,
    AppState,
};

pub async fn list_reminders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReminderQuery>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    let reminders = ReminderService::list(&state.db, query.id_dueno, query.pendientes).await?;
    Ok(Json(reminders))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Reminder>), ApiError> {
    let reminder = ReminderService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    ReminderService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
