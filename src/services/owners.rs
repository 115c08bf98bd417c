use sqlx::PgPool;

use crate::{
    db::UpdateBuilder,
    error::ApiError,
    models::{
        auth::NormalizedProfile,
        owner::{
            normalize_email, validate_password, CreateOwnerRequest, Owner, ParentType,
            UpdateOwnerRequest,
        },
    },
};

const OWNER_COLUMNS: &str = "id, name, email, password_hash, parent_type, photo, notifications_enabled,
    oauth_provider, oauth_subject, created_at, updated_at";

const BCRYPT_COST: u32 = 12;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub struct OwnerService;

impl OwnerService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Owner>> {
        let owners = sqlx::query_as::<_, Owner>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners ORDER BY name, id"
        ))
        .fetch_all(pool)
        .await?;
        Ok(owners)
    }

    pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<Owner> {
        let owner = sqlx::query_as::<_, Owner>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Owner not found"))?;
        Ok(owner)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(owner)
    }

    pub async fn create(pool: &PgPool, req: &CreateOwnerRequest) -> anyhow::Result<Owner> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required").into());
        }
        let email = normalize_email(&req.email)?;
        let parent_type = req
            .parent_type
            .as_deref()
            .map(str::parse::<ParentType>)
            .transpose()?
            .unwrap_or(ParentType::Other);
        let password_hash = match req.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let owner = sqlx::query_as::<_, Owner>(&format!(
            "INSERT INTO owners (name, email, password_hash, parent_type, photo, notifications_enabled)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE))
             RETURNING {OWNER_COLUMNS}"
        ))
        .bind(name)
        .bind(&email)
        .bind(password_hash)
        .bind(parent_type.as_str())
        .bind(&req.photo)
        .bind(req.notifications_enabled)
        .fetch_one(pool)
        .await?;

        tracing::info!("Owner {} registered", owner.id);
        Ok(owner)
    }

    pub async fn update(pool: &PgPool, id: i64, req: &UpdateOwnerRequest) -> anyhow::Result<Owner> {
        let name = match req.name.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::bad_request("Name is required").into()),
            other => other.map(str::to_string),
        };
        let email = req.email.as_deref().map(normalize_email).transpose()?;
        let parent_type = req
            .parent_type
            .as_deref()
            .map(str::parse::<ParentType>)
            .transpose()?;
        let password_hash = match req.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let mut update = UpdateBuilder::new("owners");
        update
            .set("name", name)
            .set("email", email)
            .set("password_hash", password_hash)
            .set("parent_type", parent_type.map(|p| p.as_str()))
            .set("photo", req.photo.clone())
            .set("notifications_enabled", req.notifications_enabled);

        let mut query = update
            .finish(true, id, OWNER_COLUMNS)
            .ok_or_else(|| ApiError::bad_request("No fields to update"))?;

        let owner = query
            .build_query_as::<Owner>()
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Owner not found"))?;
        Ok(owner)
    }

    /// Deletes the owner and their relationship rows. Animals left without any
    /// owner are deleted too; co-owned animals stay with their other owners.
    pub async fn delete(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        let mut tx = pool.begin().await?;

        let orphaned = sqlx::query(
            "DELETE FROM animals a
             WHERE a.id IN (SELECT animal_id FROM animal_owners WHERE owner_id = $1)
               AND NOT EXISTS (
                   SELECT 1 FROM animal_owners other
                   WHERE other.animal_id = a.id AND other.owner_id <> $1
               )",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM owners WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Err(ApiError::not_found("Owner not found").into());
        }

        tx.commit().await?;
        tracing::info!("Owner {} deleted with {} unshared animal(s)", id, orphaned);
        Ok(())
    }

    /// Finds the owner for an OAuth login, by provider subject first and then
    /// by email, creating a password-less account when neither matches.
    pub async fn upsert_oauth(pool: &PgPool, profile: &NormalizedProfile) -> anyhow::Result<Owner> {
        let provider = profile.provider.as_str();

        let existing = sqlx::query_as::<_, Owner>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE oauth_provider = $1 AND oauth_subject = $2"
        ))
        .bind(provider)
        .bind(&profile.id)
        .fetch_optional(pool)
        .await?;
        if let Some(owner) = existing {
            return Ok(owner);
        }

        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .transpose()?
            .ok_or_else(|| ApiError::bad_request("The provider did not share an email address"))?;

        let owner = sqlx::query_as::<_, Owner>(&format!(
            "INSERT INTO owners (name, email, photo, oauth_provider, oauth_subject)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT ((lower(email))) DO UPDATE
                SET oauth_provider = EXCLUDED.oauth_provider,
                    oauth_subject  = EXCLUDED.oauth_subject,
                    photo          = COALESCE(owners.photo, EXCLUDED.photo),
                    updated_at     = NOW()
             RETURNING {OWNER_COLUMNS}"
        ))
        .bind(profile.name.as_deref().unwrap_or(&email))
        .bind(&email)
        .bind(&profile.photo)
        .bind(provider)
        .bind(&profile.id)
        .fetch_one(pool)
        .await?;

        tracing::info!("Owner {} signed in with {}", owner.id, provider);
        Ok(owner)
    }
}

