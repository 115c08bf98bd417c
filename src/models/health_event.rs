use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::normalize_token;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Vaccination,
    Medicine,
    Antiparasitic,
    VetVisit,
    Other,
    Symptoms,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Vaccination => "vaccination",
            EventType::Medicine => "medicine",
            EventType::Antiparasitic => "antiparasitic",
            EventType::VetVisit => "vet_visit",
            EventType::Other => "other",
            EventType::Symptoms => "symptoms",
        }
    }

    /// Recurrence assumed when the client does not send one.
    pub fn default_recurrence(&self) -> Recurrence {
        match self {
            EventType::Vaccination => Recurrence::Yearly,
            _ => Recurrence::None,
        }
    }
}

/// Hygiene has no column value of its own and is stored as `other`.
impl std::str::FromStr for EventType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "vaccination" | "vaccine" | "vacuna" | "vacunacion" => Ok(EventType::Vaccination),
            "medicine" | "medication" | "medicina" | "medicamento" => Ok(EventType::Medicine),
            "antiparasitic" | "antiparasitario" | "desparasitacion" => Ok(EventType::Antiparasitic),
            "vet_visit" | "vet" | "veterinario" | "visita_veterinaria" => Ok(EventType::VetVisit),
            "symptoms" | "sintomas" | "sintoma" => Ok(EventType::Symptoms),
            "other" | "otro" | "hygiene" | "higiene" => Ok(EventType::Other),
            _ => Err(ApiError::bad_request(format!("Unknown event type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Quarterly => "quarterly",
            Recurrence::Yearly => "yearly",
        }
    }

    /// The next occurrence after `from`. Month steps clamp to the end of the
    /// month, so Feb 29 plus a year lands on Feb 28.
    pub fn next_after(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => from.checked_add_days(Days::new(1)),
            Recurrence::Weekly => from.checked_add_days(Days::new(7)),
            Recurrence::Monthly => from.checked_add_months(Months::new(1)),
            Recurrence::Quarterly => from.checked_add_months(Months::new(3)),
            Recurrence::Yearly => from.checked_add_months(Months::new(12)),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "none" | "ninguna" | "unica" | "una_vez" | "once" => Ok(Recurrence::None),
            "daily" | "diaria" | "diario" => Ok(Recurrence::Daily),
            "weekly" | "semanal" => Ok(Recurrence::Weekly),
            "monthly" | "mensual" => Ok(Recurrence::Monthly),
            "quarterly" | "trimestral" => Ok(Recurrence::Quarterly),
            "yearly" | "annual" | "anual" => Ok(Recurrence::Yearly),
            _ => Err(ApiError::bad_request(format!("Unknown recurrence: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealthEvent {
    pub id: i64,
    pub animal_id: i64,
    pub name: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub photo: Option<String>,
    pub event_type: String,
    pub recurrence: String,
    pub next_due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHealthEventRequest {
    #[serde(alias = "id_animal")]
    pub animal_id: i64,
    pub name: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub photo: Option<String>,
    pub event_type: String,
    pub recurrence: Option<String>,
    pub next_due: Option<NaiveDate>,
    /// Schedule an email reminder for every owner before `next_due`.
    #[serde(default, alias = "recordatorio")]
    pub reminder: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateHealthEventRequest {
    pub name: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub photo: Option<String>,
    pub event_type: Option<String>,
    pub recurrence: Option<String>,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthEventQuery {
    pub id_animal: Option<i64>,
    pub tipo: Option<String>,
}

/// Next-due date for an event: an explicit value wins, otherwise the
/// recurrence (or the type's default recurrence) is applied to the event date.
pub fn resolve_next_due(
    event_type: EventType,
    event_date: NaiveDate,
    recurrence: Option<Recurrence>,
    explicit: Option<NaiveDate>,
) -> Option<NaiveDate> {
    explicit.or_else(|| {
        recurrence
            .unwrap_or_else(|| event_type.default_recurrence())
            .next_after(event_date)
    })
}
