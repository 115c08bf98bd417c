use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: i64,
    pub owner_id: i64,
    pub animal_id: i64,
    pub health_event_id: Option<i64>,
    pub title: String,
    pub remind_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Delivery attempts so far.
    pub attempts: i32,
    /// Set once delivery was given up.
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A reminder that is due, joined with everything needed to deliver it.
#[derive(Debug, Clone, FromRow)]
pub struct DueReminder {
    pub id: i64,
    pub title: String,
    pub remind_at: DateTime<Utc>,
    pub owner_name: String,
    pub owner_email: String,
    pub animal_name: String,
    /// Attempts including the one in progress.
    pub attempts: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    #[serde(alias = "id_dueno")]
    pub owner_id: i64,
    #[serde(alias = "id_animal")]
    pub animal_id: i64,
    #[serde(alias = "id_evento")]
    pub health_event_id: Option<i64>,
    pub title: String,
    pub remind_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderQuery {
    pub id_dueno: Option<i64>,
    /// Only reminders not yet delivered.
    #[serde(default)]
    pub pendientes: bool,
}
