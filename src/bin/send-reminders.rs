/// Deliver every reminder that is due, once, and exit.
/// Meant for hosts that run the API with REMINDER_DISPATCHER_ENABLED=false
/// (e.g., via cron job: */15 * * * * /app/send-reminders). Rows are claimed
/// before sending, so overlapping runs never deliver the same reminder twice.
///
/// Usage: send-reminders [--dry-run] [--limit N]
///   --dry-run  : List due reminders without sending or marking them
///   --limit N  : Maximum reminders handled in this run (default 500)

use chrono::Utc;
use clap::Parser;

use petcare_api::{
    config::Config,
    db,
    services::{email::EmailService, reminders::ReminderService},
};

#[derive(Parser)]
#[command(name = "send-reminders", about = "Send due pet-care reminders")]
struct Args {
    /// List due reminders without sending them
    #[arg(long)]
    dry_run: bool,

    /// Maximum reminders handled in this run
    #[arg(long, default_value_t = 500)]
    limit: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    if args.dry_run {
        let due = ReminderService::due(&pool, Utc::now(), args.limit).await?;
        tracing::info!("{} reminders due", due.len());
        for r in due {
            tracing::info!(
                "[dry-run] #{} {} -> {} <{}> ({}, due {})",
                r.id,
                r.title,
                r.owner_name,
                r.owner_email,
                r.animal_name,
                r.remind_at
            );
        }
        return Ok(());
    }

    let email = EmailService::new(&config);
    if email.is_none() {
        tracing::warn!("SMTP not configured, reminders will only be logged");
    }

    let report = ReminderService::dispatch_due(&pool, email.as_ref(), args.limit).await?;
    tracing::info!(
        "Reminder run completed: {} due, {} sent, {} failed",
        report.due,
        report.sent,
        report.failed
    );

    Ok(())
}
