use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeightRecord {
    pub id: i64,
    pub animal_id: i64,
    pub kg: f64,
    pub recorded_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWeightRequest {
    #[serde(alias = "id_animal")]
    pub animal_id: i64,
    pub kg: f64,
    /// Defaults to today.
    #[serde(alias = "fecha")]
    pub recorded_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWeightRequest {
    pub kg: Option<f64>,
    #[serde(alias = "fecha")]
    pub recorded_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeightQuery {
    pub id_animal: Option<i64>,
}

pub fn validate_kg(kg: f64) -> Result<(), ApiError> {
    if !kg.is_finite() || kg <= 0.0 {
        return Err(ApiError::bad_request("Weight must be greater than 0 kg"));
    }
    Ok(())
}
