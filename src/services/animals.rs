use chrono::Local;
use sqlx::PgPool;

use crate::{
    db::UpdateBuilder,
    error::ApiError,
    models::animal::{
        age_in_years, Animal, AnimalOwner, AnimalStatus, CreateAnimalRequest, LinkOwnerRequest,
        Sex, Size, UpdateAnimalRequest,
    },
    services::breeds,
};

const SELECT_ANIMAL: &str = "SELECT a.id, a.breed_id, b.name AS breed, a.name, a.age, a.sex,
        a.birth_date, a.color, a.size, a.photo, a.status, a.created_at, a.updated_at
     FROM animals a
     LEFT JOIN breeds b ON b.id = a.breed_id";

fn parse_opt<T: std::str::FromStr<Err = ApiError>>(raw: Option<&str>) -> Result<Option<T>, ApiError> {
    raw.map(str::parse).transpose()
}

fn require_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    Ok(name)
}

pub struct AnimalService;

impl AnimalService {
    pub async fn list(pool: &PgPool, owner_id: Option<i64>) -> anyhow::Result<Vec<Animal>> {
        let animals = match owner_id {
            Some(owner_id) => {
                sqlx::query_as::<_, Animal>(&format!(
                    "{SELECT_ANIMAL}
                     JOIN animal_owners ao ON ao.animal_id = a.id
                     WHERE ao.owner_id = $1
                     ORDER BY ao.is_primary DESC, a.name"
                ))
                .bind(owner_id)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Animal>(&format!("{SELECT_ANIMAL} ORDER BY a.name, a.id"))
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(animals)
    }

    pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<Animal> {
        let animal = sqlx::query_as::<_, Animal>(&format!("{SELECT_ANIMAL} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Animal not found"))?;
        Ok(animal)
    }

    /// Creates the animal, resolving its breed and, when given, linking the
    /// owner as primary. All in one transaction.
    pub async fn create(pool: &PgPool, req: &CreateAnimalRequest) -> anyhow::Result<Animal> {
        let name = require_name(&req.name)?;
        let sex = parse_opt::<Sex>(req.sex.as_deref())?;
        let size = parse_opt::<Size>(req.size.as_deref())?;
        let status = parse_opt::<AnimalStatus>(req.status.as_deref())?.unwrap_or(AnimalStatus::Active);
        let age = req.age.or_else(|| {
            req.birth_date
                .and_then(|birth| age_in_years(birth, Local::now().date_naive()))
        });

        let mut tx = pool.begin().await?;

        let breed_id = match req.breed.as_deref() {
            Some(breed) => breeds::get_or_create(&mut *tx, breed).await?,
            None => None,
        };

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO animals (breed_id, name, age, sex, birth_date, color, size, photo, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(breed_id)
        .bind(name)
        .bind(age)
        .bind(sex.map(|s| s.as_str()))
        .bind(req.birth_date)
        .bind(&req.color)
        .bind(size.map(|s| s.as_str()))
        .bind(&req.photo)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(owner_id) = req.owner_id {
            sqlx::query(
                "INSERT INTO animal_owners (animal_id, owner_id, is_primary) VALUES ($1, $2, TRUE)",
            )
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Animal {} created (breed_id={:?})", id, breed_id);
        Self::get(pool, id).await
    }

    pub async fn update(pool: &PgPool, id: i64, req: &UpdateAnimalRequest) -> anyhow::Result<Animal> {
        if req.is_empty() {
            return Err(ApiError::bad_request("No fields to update").into());
        }
        let name = req.name.as_deref().map(require_name).transpose()?.map(str::to_string);
        let sex = parse_opt::<Sex>(req.sex.as_deref())?;
        let size = parse_opt::<Size>(req.size.as_deref())?;
        let status = parse_opt::<AnimalStatus>(req.status.as_deref())?;
        // Age follows a new birth date unless the client sets it explicitly.
        let age = req.age.or_else(|| {
            req.birth_date
                .and_then(|birth| age_in_years(birth, Local::now().date_naive()))
        });

        let mut tx = pool.begin().await?;
        let breed_id = match req.breed.as_deref() {
            Some(breed) => breeds::get_or_create(&mut *tx, breed).await?,
            None => None,
        };

        let mut update = UpdateBuilder::new("animals");
        update
            .set("name", name)
            .set("breed_id", breed_id)
            .set("age", age)
            .set("sex", sex.map(|s| s.as_str()))
            .set("birth_date", req.birth_date)
            .set("color", req.color.clone())
            .set("size", size.map(|s| s.as_str()))
            .set("photo", req.photo.clone())
            .set("status", status.map(|s| s.as_str()));

        let mut query = update
            .finish(true, id, "id")
            .ok_or_else(|| ApiError::bad_request("No fields to update"))?;

        query
            .build_query_scalar::<i64>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Animal not found"))?;

        tx.commit().await?;
        Self::get(pool, id).await
    }

    /// Events, weights, reminders and owner links go with it (FK cascade).
    pub async fn delete(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM animals WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Animal not found").into());
        }
        Ok(())
    }

    pub async fn list_owners(pool: &PgPool, animal_id: i64) -> anyhow::Result<Vec<AnimalOwner>> {
        let owners = sqlx::query_as::<_, AnimalOwner>(
            "SELECT o.id AS owner_id, o.name, o.email, ao.is_primary
             FROM animal_owners ao
             JOIN owners o ON o.id = ao.owner_id
             WHERE ao.animal_id = $1
             ORDER BY ao.is_primary DESC, o.name",
        )
        .bind(animal_id)
        .fetch_all(pool)
        .await?;
        Ok(owners)
    }

    /// Links an owner; marking them primary demotes any previous primary owner.
    pub async fn link_owner(
        pool: &PgPool,
        animal_id: i64,
        req: &LinkOwnerRequest,
    ) -> anyhow::Result<()> {
        let mut tx = pool.begin().await?;
        if req.is_primary {
            sqlx::query("UPDATE animal_owners SET is_primary = FALSE WHERE animal_id = $1")
                .bind(animal_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            "INSERT INTO animal_owners (animal_id, owner_id, is_primary)
             VALUES ($1, $2, $3)
             ON CONFLICT (animal_id, owner_id) DO UPDATE SET is_primary = EXCLUDED.is_primary",
        )
        .bind(animal_id)
        .bind(req.owner_id)
        .bind(req.is_primary)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn unlink_owner(pool: &PgPool, animal_id: i64, owner_id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM animal_owners WHERE animal_id = $1 AND owner_id = $2")
            .bind(animal_id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Owner is not linked to this animal").into());
        }
        Ok(())
    }
}
