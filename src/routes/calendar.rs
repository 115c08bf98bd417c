use axum::{
    extract::State,
    Json,
};
use chrono::Local;

use crate::{
    error::ApiError,
    middleware::extract::ApiQuery,
    models::calendar::{CalendarEntry, CalendarQuery},
    services::calendar::CalendarService,
    AppState,
};

/// Upcoming events and next doses across an owner's animals (or all animals).
pub async fn upcoming(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> Result<Json<Vec<CalendarEntry>>, ApiError> {
    let today = query.desde.unwrap_or_else(|| Local::now().date_naive());
    let entries = CalendarService::for_owner(&state.db, query.id_dueno, today, query.dias).await?;
    Ok(Json(entries))
}
