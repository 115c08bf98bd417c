use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::email::EmailService;
use crate::services::reminders::ReminderService;

/// Reminders handled per pass; the rest wait for the next tick.
const BATCH_SIZE: i64 = 200;

/// Spawn a background task that wakes up every `interval_secs` and delivers
/// every reminder whose time has come.
pub fn start(pool: PgPool, email: Option<Arc<EmailService>>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            match ReminderService::dispatch_due(&pool, email.as_deref(), BATCH_SIZE).await {
                Ok(report) if report.due > 0 => info!(
                    "Reminder dispatch: {} due, {} sent, {} failed",
                    report.due, report.sent, report.failed
                ),
                Ok(_) => {}
                Err(e) => warn!("Reminder dispatch error: {:#}", e),
            }
        }
    });
}
