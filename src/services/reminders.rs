use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::ApiError,
    models::{
        health_event::HealthEvent,
        reminder::{CreateReminderRequest, DueReminder, Reminder},
    },
    services::email::EmailService,
};

/// Hour of day (UTC) reminders go out.
const REMINDER_HOUR: u32 = 9;

/// Delivery attempts before a reminder is given up.
pub const MAX_ATTEMPTS: i32 = 5;

/// First retry delay; doubles per attempt up to `RETRY_MAX_SECS`.
const RETRY_BASE_SECS: f64 = 300.0;
const RETRY_MAX_SECS: f64 = 6.0 * 3600.0;

/// Pending, due, not backed off, and the owner accepts notifications.
/// Expects `r` (reminders) and `o` (owners) in scope and `$1` = now.
const PENDING: &str = "r.sent_at IS NULL AND r.failed_at IS NULL AND r.remind_at <= $1
    AND COALESCE(r.next_attempt_at, r.remind_at) <= $1 AND o.notifications_enabled";

const REMINDER_COLUMNS: &str =
    "id, owner_id, animal_id, health_event_id, title, remind_at, sent_at, attempts, failed_at, created_at";

/// When to remind about something due on `due`: `lead_days` before, at 09:00 UTC.
pub fn reminder_time(due: NaiveDate, lead_days: i64) -> Option<DateTime<Utc>> {
    let day = if lead_days >= 0 {
        due.checked_sub_days(Days::new(lead_days as u64))?
    } else {
        due.checked_add_days(Days::new(lead_days.unsigned_abs()))?
    };
    let time = NaiveTime::from_hms_opt(REMINDER_HOUR, 0, 0)?;
    Some(day.and_time(time).and_utc())
}

/// Outcome of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderService;

impl ReminderService {
    pub async fn list(
        pool: &PgPool,
        owner_id: Option<i64>,
        pending_only: bool,
    ) -> anyhow::Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS}
             FROM reminders
             WHERE ($1::BIGINT IS NULL OR owner_id = $1)
               AND (NOT $2 OR (sent_at IS NULL AND failed_at IS NULL))
             ORDER BY remind_at, id"
        ))
        .bind(owner_id)
        .bind(pending_only)
        .fetch_all(pool)
        .await?;
        Ok(reminders)
    }

    pub async fn create(pool: &PgPool, req: &CreateReminderRequest) -> anyhow::Result<Reminder> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(ApiError::bad_request("Title is required").into());
        }
        let reminder = sqlx::query_as::<_, Reminder>(&format!(
            "INSERT INTO reminders (owner_id, animal_id, health_event_id, title, remind_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(req.owner_id)
        .bind(req.animal_id)
        .bind(req.health_event_id)
        .bind(title)
        .bind(req.remind_at)
        .fetch_one(pool)
        .await?;
        Ok(reminder)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Reminder not found").into());
        }
        Ok(())
    }

    /// One reminder per owner of the event's animal. Returns how many were created.
    pub async fn schedule_for_event(
        conn: &mut PgConnection,
        event: &HealthEvent,
        remind_at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let title = format!("{} due on {}", event.name, event.next_due.unwrap_or(event.event_date));
        let result = sqlx::query(
            "INSERT INTO reminders (owner_id, animal_id, health_event_id, title, remind_at)
             SELECT owner_id, animal_id, $2, $3, $4
             FROM animal_owners
             WHERE animal_id = $1",
        )
        .bind(event.animal_id)
        .bind(event.id)
        .bind(title)
        .bind(remind_at)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Unsent reminders whose time has come, for owners who accept
    /// notifications. Read-only; `claim_due` is what dispatch uses.
    pub async fn due(pool: &PgPool, now: DateTime<Utc>, limit: i64) -> anyhow::Result<Vec<DueReminder>> {
        let reminders = sqlx::query_as::<_, DueReminder>(&format!(
            "SELECT r.id, r.title, r.remind_at, o.name AS owner_name, o.email AS owner_email,
                    a.name AS animal_name, r.attempts
             FROM reminders r
             JOIN owners o  ON o.id = r.owner_id
             JOIN animals a ON a.id = r.animal_id
             WHERE {PENDING}
             ORDER BY COALESCE(r.next_attempt_at, r.remind_at), r.id
             LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(reminders)
    }

    /// Claims up to `limit` due reminders for delivery.
    ///
    /// Each claimed row gets its attempt counted and `next_attempt_at` pushed
    /// out by an exponential backoff, so a concurrent dispatcher skips it
    /// (`SKIP LOCKED` while the claim runs, the pushed time afterwards) and a
    /// failing reminder stops holding the head of the queue.
    pub async fn claim_due(pool: &PgPool, now: DateTime<Utc>, limit: i64) -> anyhow::Result<Vec<DueReminder>> {
        let reminders = sqlx::query_as::<_, DueReminder>(&format!(
            "WITH picked AS (
                 SELECT r.id
                 FROM reminders r
                 JOIN owners o ON o.id = r.owner_id
                 WHERE {PENDING}
                 ORDER BY COALESCE(r.next_attempt_at, r.remind_at), r.id
                 LIMIT $2
                 FOR UPDATE OF r SKIP LOCKED
             )
             UPDATE reminders r
             SET attempts = r.attempts + 1,
                 next_attempt_at = $1 + make_interval(secs => LEAST($3 * power(2, r.attempts), $4))
             FROM picked, owners o, animals a
             WHERE r.id = picked.id AND o.id = r.owner_id AND a.id = r.animal_id
             RETURNING r.id, r.title, r.remind_at, o.name AS owner_name, o.email AS owner_email,
                       a.name AS animal_name, r.attempts"
        ))
        .bind(now)
        .bind(limit)
        .bind(RETRY_BASE_SECS)
        .bind(RETRY_MAX_SECS)
        .fetch_all(pool)
        .await?;
        Ok(reminders)
    }

    pub async fn mark_sent(pool: &PgPool, id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE reminders SET sent_at = NOW(), next_attempt_at = NULL WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Records a failed attempt. The backoff was already applied by the
    /// claim; after `MAX_ATTEMPTS` the reminder is given up.
    pub async fn mark_failed(pool: &PgPool, reminder: &DueReminder) -> anyhow::Result<bool> {
        if reminder.attempts < MAX_ATTEMPTS {
            return Ok(false);
        }
        sqlx::query("UPDATE reminders SET failed_at = NOW() WHERE id = $1")
            .bind(reminder.id)
            .execute(pool)
            .await?;
        Ok(true)
    }

    /// Drops the event's undelivered reminders and, when the event had
    /// reminders and still has a next-due date, schedules fresh ones for it.
    pub async fn reschedule_for_event(
        conn: &mut PgConnection,
        event: &HealthEvent,
        lead_days: i64,
    ) -> anyhow::Result<u64> {
        let had_reminders: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reminders WHERE health_event_id = $1)",
        )
        .bind(event.id)
        .fetch_one(&mut *conn)
        .await?;
        if !had_reminders {
            return Ok(0);
        }

        sqlx::query("DELETE FROM reminders WHERE health_event_id = $1 AND sent_at IS NULL")
            .bind(event.id)
            .execute(&mut *conn)
            .await?;

        match event.next_due.and_then(|due| reminder_time(due, lead_days)) {
            Some(remind_at) => Self::schedule_for_event(conn, event, remind_at).await,
            None => Ok(0),
        }
    }

    /// Delivers every due reminder. Without SMTP the reminder is only logged,
    /// and still marked sent. A failed send is retried on a later pass.
    pub async fn dispatch_due(
        pool: &PgPool,
        email: Option<&EmailService>,
        limit: i64,
    ) -> anyhow::Result<DispatchReport> {
        let due = Self::claim_due(pool, Utc::now(), limit).await?;
        let mut report = DispatchReport {
            due: due.len(),
            ..Default::default()
        };

        for reminder in due {
            let delivered = match email {
                Some(svc) => svc
                    .send_reminder(
                        &reminder.owner_email,
                        &reminder.owner_name,
                        &reminder.animal_name,
                        &reminder.title,
                    )
                    .await,
                None => {
                    tracing::info!(
                        "Reminder {} for {} <{}>: {} ({})",
                        reminder.id,
                        reminder.owner_name,
                        reminder.owner_email,
                        reminder.title,
                        reminder.animal_name
                    );
                    Ok(())
                }
            };

            match delivered {
                Ok(()) => {
                    Self::mark_sent(pool, reminder.id).await?;
                    report.sent += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    if Self::mark_failed(pool, &reminder).await? {
                        tracing::error!(
                            "Reminder {} given up after {} attempts: {:#}",
                            reminder.id,
                            reminder.attempts,
                            e
                        );
                    } else {
                        tracing::warn!(
                            "Reminder {} could not be sent (attempt {}): {:#}",
                            reminder.id,
                            reminder.attempts,
                            e
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}
