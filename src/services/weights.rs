use sqlx::PgPool;

use crate::{
    db::UpdateBuilder,
    error::ApiError,
    models::weight::{validate_kg, CreateWeightRequest, UpdateWeightRequest, WeightRecord},
};

const WEIGHT_COLUMNS: &str = "id, animal_id, kg, recorded_on, created_at";

pub struct WeightService;

impl WeightService {
    pub async fn list(pool: &PgPool, animal_id: Option<i64>) -> anyhow::Result<Vec<WeightRecord>> {
        let records = sqlx::query_as::<_, WeightRecord>(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_records
             WHERE ($1::BIGINT IS NULL OR animal_id = $1)
             ORDER BY recorded_on DESC, id DESC"
        ))
        .bind(animal_id)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<WeightRecord> {
        let record = sqlx::query_as::<_, WeightRecord>(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Weight record not found"))?;
        Ok(record)
    }

    /// Most recent record by date; ties go to the last one inserted.
    pub async fn latest(pool: &PgPool, animal_id: i64) -> anyhow::Result<WeightRecord> {
        let record = sqlx::query_as::<_, WeightRecord>(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_records
             WHERE animal_id = $1
             ORDER BY recorded_on DESC, id DESC
             LIMIT 1"
        ))
        .bind(animal_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No weight recorded for this animal"))?;
        Ok(record)
    }

    pub async fn create(pool: &PgPool, req: &CreateWeightRequest) -> anyhow::Result<WeightRecord> {
        validate_kg(req.kg)?;
        let record = sqlx::query_as::<_, WeightRecord>(&format!(
            "INSERT INTO weight_records (animal_id, kg, recorded_on)
             VALUES ($1, $2, COALESCE($3, CURRENT_DATE))
             RETURNING {WEIGHT_COLUMNS}"
        ))
        .bind(req.animal_id)
        .bind(req.kg)
        .bind(req.recorded_on)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    pub async fn update(pool: &PgPool, id: i64, req: &UpdateWeightRequest) -> anyhow::Result<WeightRecord> {
        if let Some(kg) = req.kg {
            validate_kg(kg)?;
        }
        let mut update = UpdateBuilder::new("weight_records");
        update.set("kg", req.kg).set("recorded_on", req.recorded_on);

        let mut query = update
            .finish(false, id, WEIGHT_COLUMNS)
            .ok_or_else(|| ApiError::bad_request("No fields to update"))?;
        let record = query
            .build_query_as::<WeightRecord>()
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Weight record not found"))?;
        Ok(record)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM weight_records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Weight record not found").into());
        }
        Ok(())
    }
}
