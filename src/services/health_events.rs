use sqlx::PgPool;

use crate::{
    db::UpdateBuilder,
    error::ApiError,
    models::health_event::{
        resolve_next_due, CreateHealthEventRequest, EventType, HealthEvent, Recurrence,
        UpdateHealthEventRequest,
    },
    services::reminders::{reminder_time, ReminderService},
};

const EVENT_COLUMNS: &str = "id, animal_id, name, event_date, event_time, notes, photo,
    event_type, recurrence, next_due, created_at, updated_at";

pub struct HealthEventService;

impl HealthEventService {
    pub async fn list(
        pool: &PgPool,
        animal_id: Option<i64>,
        event_type: Option<EventType>,
    ) -> anyhow::Result<Vec<HealthEvent>> {
        let events = sqlx::query_as::<_, HealthEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM health_events
             WHERE ($1::BIGINT IS NULL OR animal_id = $1)
               AND ($2::TEXT IS NULL OR event_type = $2)
             ORDER BY event_date DESC, event_time DESC NULLS LAST, id DESC"
        ))
        .bind(animal_id)
        .bind(event_type.map(|t| t.as_str()))
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    /// Every event of the given animals, oldest first.
    pub async fn list_for_animals(pool: &PgPool, animal_ids: &[i64]) -> anyhow::Result<Vec<HealthEvent>> {
        let events = sqlx::query_as::<_, HealthEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM health_events
             WHERE animal_id = ANY($1)
             ORDER BY event_date, event_time NULLS FIRST, id"
        ))
        .bind(animal_ids)
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<HealthEvent> {
        let event = sqlx::query_as::<_, HealthEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM health_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Health event not found"))?;
        Ok(event)
    }

    /// Inserts the event with its computed next-due date and, when asked,
    /// schedules a reminder for each owner of the animal.
    pub async fn create(
        pool: &PgPool,
        req: &CreateHealthEventRequest,
        reminder_lead_days: i64,
    ) -> anyhow::Result<HealthEvent> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required").into());
        }
        let event_type: EventType = req.event_type.parse()?;
        let recurrence = req
            .recurrence
            .as_deref()
            .map(str::parse::<Recurrence>)
            .transpose()?;
        let next_due = resolve_next_due(event_type, req.event_date, recurrence, req.next_due);
        let recurrence = recurrence.unwrap_or_else(|| event_type.default_recurrence());

        let mut tx = pool.begin().await?;

        let event = sqlx::query_as::<_, HealthEvent>(&format!(
            "INSERT INTO health_events
                (animal_id, name, event_date, event_time, notes, photo, event_type, recurrence, next_due)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(req.animal_id)
        .bind(name)
        .bind(req.event_date)
        .bind(req.event_time)
        .bind(&req.notes)
        .bind(&req.photo)
        .bind(event_type.as_str())
        .bind(recurrence.as_str())
        .bind(next_due)
        .fetch_one(&mut *tx)
        .await?;

        if req.reminder {
            match next_due.and_then(|due| reminder_time(due, reminder_lead_days)) {
                Some(remind_at) => {
                    let scheduled =
                        ReminderService::schedule_for_event(&mut *tx, &event, remind_at).await?;
                    tracing::info!(
                        "Scheduled {} reminder(s) for health event {} at {}",
                        scheduled,
                        event.id,
                        remind_at
                    );
                }
                None => tracing::debug!(
                    "Reminder requested for health event {} without a next-due date",
                    event.id
                ),
            }
        }

        tx.commit().await?;
        Ok(event)
    }

    /// Applies the present fields. When the date, type or recurrence change and
    /// no explicit next-due date is sent, next-due is recomputed from the
    /// merged values.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        req: &UpdateHealthEventRequest,
        reminder_lead_days: i64,
    ) -> anyhow::Result<HealthEvent> {
        let name = match req.name.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::bad_request("Name is required").into()),
            other => other.map(str::to_string),
        };
        let event_type = req
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()?;
        let recurrence = req
            .recurrence
            .as_deref()
            .map(str::parse::<Recurrence>)
            .transpose()?;

        let mut update = UpdateBuilder::new("health_events");
        update
            .set("name", name)
            .set("event_date", req.event_date)
            .set("event_time", req.event_time)
            .set("notes", req.notes.clone())
            .set("photo", req.photo.clone())
            .set("event_type", event_type.map(|t| t.as_str()))
            .set("recurrence", recurrence.map(|r| r.as_str()));
        if update.is_empty() && req.next_due.is_none() {
            return Err(ApiError::bad_request("No fields to update").into());
        }

        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, HealthEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM health_events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Health event not found"))?;

        let schedule_changed =
            req.event_date.is_some() || event_type.is_some() || recurrence.is_some();
        // Outer None leaves the column alone; Some(None) clears it.
        let next_due = match req.next_due {
            Some(explicit) => Some(Some(explicit)),
            None if schedule_changed => {
                let merged_type = match event_type {
                    Some(t) => t,
                    None => current.event_type.parse()?,
                };
                let merged_recurrence = match recurrence {
                    Some(r) => r,
                    None => current.recurrence.parse()?,
                };
                let merged_date = req.event_date.unwrap_or(current.event_date);
                Some(resolve_next_due(merged_type, merged_date, Some(merged_recurrence), None))
            }
            None => None,
        };
        update.set("next_due", next_due);

        let mut query = update
            .finish(true, id, EVENT_COLUMNS)
            .ok_or_else(|| ApiError::bad_request("No fields to update"))?;
        let event = query
            .build_query_as::<HealthEvent>()
            .fetch_one(&mut *tx)
            .await?;

        if event.next_due != current.next_due {
            let scheduled =
                ReminderService::reschedule_for_event(&mut *tx, &event, reminder_lead_days).await?;
            tracing::debug!(
                "Health event {} next due moved to {:?}, {} reminder(s) rescheduled",
                event.id,
                event.next_due,
                scheduled
            );
        }

        tx.commit().await?;
        Ok(event)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM health_events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Health event not found").into());
        }
        Ok(())
    }
}
