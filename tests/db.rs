//! Database-backed tests. They need a Postgres server reachable through
//! `DATABASE_URL`; run them with `cargo test -- --ignored`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use petcare_api::{
    config::Config,
    error::ApiError,
    models::{
        animal::{CreateAnimalRequest, LinkOwnerRequest, UpdateAnimalRequest},
        calendar::EntryKind,
        health_event::{CreateHealthEventRequest, UpdateHealthEventRequest},
        owner::{CreateOwnerRequest, Owner},
        weight::CreateWeightRequest,
    },
    services::{
        animals::AnimalService,
        calendar::CalendarService,
        email::EmailService,
        health_events::HealthEventService,
        owners::OwnerService,
        reminders::{ReminderService, MAX_ATTEMPTS},
        weights::WeightService,
    },
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn animal(name: &str, breed: Option<&str>, owner_id: Option<i64>) -> CreateAnimalRequest {
    CreateAnimalRequest {
        name: name.into(),
        breed: breed.map(str::to_string),
        age: None,
        sex: Some("hembra".into()),
        birth_date: None,
        color: None,
        size: Some("mediano".into()),
        photo: None,
        status: None,
        owner_id,
    }
}

async fn owner(pool: &PgPool, email: &str) -> Owner {
    OwnerService::create(
        pool,
        &CreateOwnerRequest {
            name: "Ana".into(),
            email: email.into(),
            password: None,
            parent_type: Some("perro".into()),
            photo: None,
            notifications_enabled: None,
        },
    )
    .await
    .unwrap()
}

fn vaccination(animal_id: i64, date: NaiveDate, reminder: bool) -> CreateHealthEventRequest {
    CreateHealthEventRequest {
        animal_id,
        name: "Rabia".into(),
        event_date: date,
        event_time: None,
        notes: None,
        photo: None,
        event_type: "vacuna".into(),
        recurrence: None,
        next_due: None,
        reminder,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn breeds_are_reused_case_insensitively(pool: PgPool) {
    let a = AnimalService::create(&pool, &animal("Luna", Some("Labrador"), None))
        .await
        .unwrap();
    let b = AnimalService::create(&pool, &animal("Sol", Some("  labrador "), None))
        .await
        .unwrap();
    assert!(a.breed_id.is_some());
    assert_eq!(a.breed_id, b.breed_id);

    let breeds: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM breeds")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(breeds, 1);

    let c = AnimalService::create(&pool, &animal("Nube", Some("   "), None))
        .await
        .unwrap();
    assert!(c.breed_id.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn update_of_missing_animal_is_not_found(pool: PgPool) {
    let err = AnimalService::update(
        &pool,
        9999,
        &UpdateAnimalRequest {
            name: Some("Rex".into()),
            breed: Some("Husky".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));

    let breeds: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM breeds")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(breeds, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn update_keeps_absent_fields(pool: PgPool) {
    let created = AnimalService::create(&pool, &animal("Luna", Some("Beagle"), None))
        .await
        .unwrap();
    let updated = AnimalService::update(
        &pool,
        created.id,
        &UpdateAnimalRequest {
            color: Some("tricolor".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.name, "Luna");
    assert_eq!(updated.breed.as_deref(), Some("Beagle"));
    assert_eq!(updated.size.as_deref(), Some("medium"));
    assert_eq!(updated.color.as_deref(), Some("tricolor"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_owner_removes_only_orphaned_animals(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let luis = owner(&pool, "luis@example.com").await;

    let solo = AnimalService::create(&pool, &animal("Solo", None, Some(ana.id)))
        .await
        .unwrap();
    let shared = AnimalService::create(&pool, &animal("Compartido", None, Some(ana.id)))
        .await
        .unwrap();
    AnimalService::link_owner(
        &pool,
        shared.id,
        &LinkOwnerRequest {
            owner_id: luis.id,
            is_primary: false,
        },
    )
    .await
    .unwrap();

    OwnerService::delete(&pool, ana.id).await.unwrap();

    assert!(AnimalService::get(&pool, solo.id).await.is_err());
    let owners = AnimalService::list_owners(&pool, shared.id).await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].owner_id, luis.id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn duplicate_email_is_a_client_error(pool: PgPool) {
    owner(&pool, "ana@example.com").await;
    let err = OwnerService::create(
        &pool,
        &CreateOwnerRequest {
            name: "Otra Ana".into(),
            email: "ANA@example.com".into(),
            password: None,
            parent_type: None,
            photo: None,
            notifications_enabled: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn latest_weight_is_the_most_recent_record(pool: PgPool) {
    let luna = AnimalService::create(&pool, &animal("Luna", None, None))
        .await
        .unwrap();

    let err = WeightService::latest(&pool, luna.id).await.unwrap_err();
    assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));

    for (kg, date) in [(10.5, d(2025, 1, 10)), (12.0, d(2025, 3, 1)), (11.2, d(2025, 2, 1))] {
        WeightService::create(
            &pool,
            &CreateWeightRequest {
                animal_id: luna.id,
                kg,
                recorded_on: Some(date),
            },
        )
        .await
        .unwrap();
    }

    let latest = WeightService::latest(&pool, luna.id).await.unwrap();
    assert_eq!(latest.kg, 12.0);
    assert_eq!(latest.recorded_on, d(2025, 3, 1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn vaccination_schedules_next_dose_and_reminder(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let luna = AnimalService::create(&pool, &animal("Luna", None, Some(ana.id)))
        .await
        .unwrap();

    let event = HealthEventService::create(&pool, &vaccination(luna.id, d(2024, 3, 15), true), 1)
        .await
        .unwrap();
    assert_eq!(event.recurrence, "yearly");
    assert_eq!(event.next_due, Some(d(2025, 3, 15)));

    let reminders = ReminderService::list(&pool, Some(ana.id), true).await.unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].remind_at.to_rfc3339(), "2025-03-14T09:00:00+00:00");

    let calendar = CalendarService::for_owner(&pool, Some(ana.id), d(2025, 1, 1), Some(120))
        .await
        .unwrap();
    assert_eq!(calendar.len(), 1);
    assert_eq!(calendar[0].kind, EntryKind::NextDue);
    assert_eq!(calendar[0].date, d(2025, 3, 15));
    assert_eq!(calendar[0].animal_name, "Luna");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn moving_the_event_date_recomputes_next_due(pool: PgPool) {
    let luna = AnimalService::create(&pool, &animal("Luna", None, None))
        .await
        .unwrap();
    let event = HealthEventService::create(&pool, &vaccination(luna.id, d(2024, 3, 15), false), 1)
        .await
        .unwrap();

    let moved = HealthEventService::update(
        &pool,
        event.id,
        &UpdateHealthEventRequest {
            event_date: Some(d(2024, 6, 1)),
            ..Default::default()
        },
        1,
    )
    .await
    .unwrap();
    assert_eq!(moved.next_due, Some(d(2025, 6, 1)));

    let once = HealthEventService::update(
        &pool,
        event.id,
        &UpdateHealthEventRequest {
            recurrence: Some("none".into()),
            ..Default::default()
        },
        1,
    )
    .await
    .unwrap();
    assert_eq!(once.next_due, None);

    // The event never asked for reminders, so none appear on the way.
    let reminders = ReminderService::list(&pool, None, false).await.unwrap();
    assert!(reminders.is_empty());
}

/// Inserts an owner directly, bypassing request validation.
async fn raw_owner(pool: &PgPool, email: &str, notifications_enabled: bool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO owners (name, email, notifications_enabled) VALUES ('Luis', $1, $2) RETURNING id",
    )
    .bind(email)
    .bind(notifications_enabled)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// An animal of `owner_id` with a vaccination whose reminder is long overdue.
async fn overdue_reminder(pool: &PgPool, owner_id: i64, name: &str, year: i32) -> i64 {
    let pet = AnimalService::create(pool, &animal(name, None, Some(owner_id)))
        .await
        .unwrap();
    let event = HealthEventService::create(pool, &vaccination(pet.id, d(year, 1, 10), true), 1)
        .await
        .unwrap();
    sqlx::query_scalar("SELECT id FROM reminders WHERE health_event_id = $1")
        .bind(event.id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn delivery_state(
    pool: &PgPool,
    id: i64,
) -> (i32, Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    sqlx::query_as("SELECT attempts, next_attempt_at, sent_at, failed_at FROM reminders WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// SMTP settings that build a transport without ever connecting.
fn smtp_config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: None,
        jwt_secret: "test-secret".into(),
        jwt_expiry_seconds: 3600,
        host: "127.0.0.1".into(),
        port: 0,
        client_url: "http://localhost:5173".into(),
        api_public_url: "http://localhost:3000".into(),
        google: None,
        facebook: None,
        apple: None,
        smtp_host: Some("localhost".into()),
        smtp_port: Some(2525),
        smtp_username: Some("mailer".into()),
        smtp_password: Some("secret".into()),
        smtp_from: Some("PetCare <no-reply@petcare.example>".into()),
        reminder_poll_secs: 60,
        reminder_lead_days: 1,
        reminder_dispatcher_enabled: false,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn moving_the_next_due_reschedules_pending_reminders(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let luna = AnimalService::create(&pool, &animal("Luna", None, Some(ana.id)))
        .await
        .unwrap();
    let event = HealthEventService::create(&pool, &vaccination(luna.id, d(2024, 3, 15), true), 1)
        .await
        .unwrap();

    HealthEventService::update(
        &pool,
        event.id,
        &UpdateHealthEventRequest {
            event_date: Some(d(2024, 6, 1)),
            ..Default::default()
        },
        1,
    )
    .await
    .unwrap();
    let pending = ReminderService::list(&pool, Some(ana.id), true).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].remind_at.to_rfc3339(), "2025-05-31T09:00:00+00:00");
    assert!(pending[0].title.contains("2025-06-01"));

    // Renaming alone leaves the schedule alone.
    HealthEventService::update(
        &pool,
        event.id,
        &UpdateHealthEventRequest {
            name: Some("Rabia (refuerzo)".into()),
            ..Default::default()
        },
        1,
    )
    .await
    .unwrap();
    let again = ReminderService::list(&pool, Some(ana.id), true).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].id, pending[0].id);

    HealthEventService::update(
        &pool,
        event.id,
        &UpdateHealthEventRequest {
            recurrence: Some("none".into()),
            ..Default::default()
        },
        1,
    )
    .await
    .unwrap();
    let pending = ReminderService::list(&pool, Some(ana.id), true).await.unwrap();
    assert!(pending.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn dispatch_without_smtp_logs_and_marks_sent(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let quiet = raw_owner(&pool, "luis@example.com", false).await;
    let sent = overdue_reminder(&pool, ana.id, "Luna", 2020).await;
    let muted = overdue_reminder(&pool, quiet, "Sol", 2020).await;

    let due = ReminderService::due(&pool, Utc::now(), 50).await.unwrap();
    assert_eq!(due.iter().map(|r| r.id).collect::<Vec<_>>(), vec![sent]);

    let report = ReminderService::dispatch_due(&pool, None, 50).await.unwrap();
    assert_eq!((report.due, report.sent, report.failed), (1, 1, 0));

    let (attempts, next_attempt_at, sent_at, _) = delivery_state(&pool, sent).await;
    assert_eq!(attempts, 1);
    assert!(next_attempt_at.is_none());
    assert!(sent_at.is_some());

    let (attempts, _, sent_at, _) = delivery_state(&pool, muted).await;
    assert_eq!(attempts, 0);
    assert!(sent_at.is_none());

    let report = ReminderService::dispatch_due(&pool, None, 50).await.unwrap();
    assert_eq!(report.due, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn claimed_reminders_are_not_claimed_twice(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let id = overdue_reminder(&pool, ana.id, "Luna", 2020).await;
    let now = Utc::now();

    let first = ReminderService::claim_due(&pool, now, 10).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].attempts, 1);
    assert!(ReminderService::claim_due(&pool, now, 10).await.unwrap().is_empty());

    // Left unconfirmed, it comes back once the backoff has passed.
    let later = ReminderService::claim_due(&pool, now + Duration::minutes(6), 10)
        .await
        .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].id, id);
    assert_eq!(later[0].attempts, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failing_reminder_backs_off_without_blocking_others(pool: PgPool) {
    let broken = raw_owner(&pool, "bad user@example.com", true).await;
    let ana = owner(&pool, "ana@example.com").await;
    let stuck = overdue_reminder(&pool, broken, "Sol", 2019).await;
    let fine = overdue_reminder(&pool, ana.id, "Luna", 2020).await;
    let email = EmailService::new(&smtp_config()).unwrap();

    let report = ReminderService::dispatch_due(&pool, Some(&email), 1).await.unwrap();
    assert_eq!((report.due, report.sent, report.failed), (1, 0, 1));

    let (attempts, next_attempt_at, sent_at, failed_at) = delivery_state(&pool, stuck).await;
    assert_eq!(attempts, 1);
    assert!(next_attempt_at.unwrap() > Utc::now());
    assert!(sent_at.is_none());
    assert!(failed_at.is_none());

    let next = ReminderService::claim_due(&pool, Utc::now(), 1).await.unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, fine);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn reminder_is_given_up_after_max_attempts(pool: PgPool) {
    let broken = raw_owner(&pool, "bad user@example.com", true).await;
    let id = overdue_reminder(&pool, broken, "Sol", 2020).await;
    sqlx::query("UPDATE reminders SET attempts = $2 WHERE id = $1")
        .bind(id)
        .bind(MAX_ATTEMPTS - 1)
        .execute(&pool)
        .await
        .unwrap();
    let email = EmailService::new(&smtp_config()).unwrap();

    let report = ReminderService::dispatch_due(&pool, Some(&email), 10).await.unwrap();
    assert_eq!(report.failed, 1);

    let (attempts, _, sent_at, failed_at) = delivery_state(&pool, id).await;
    assert_eq!(attempts, MAX_ATTEMPTS);
    assert!(sent_at.is_none());
    assert!(failed_at.is_some());

    let much_later = Utc::now() + Duration::days(2);
    assert!(ReminderService::claim_due(&pool, much_later, 10).await.unwrap().is_empty());
    assert!(ReminderService::list(&pool, Some(broken), true).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn new_primary_owner_demotes_the_previous_one(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let luis = owner(&pool, "luis@example.com").await;
    let luna = AnimalService::create(&pool, &animal("Luna", None, Some(ana.id)))
        .await
        .unwrap();

    AnimalService::link_owner(
        &pool,
        luna.id,
        &LinkOwnerRequest {
            owner_id: luis.id,
            is_primary: true,
        },
    )
    .await
    .unwrap();

    let owners = AnimalService::list_owners(&pool, luna.id).await.unwrap();
    assert_eq!(owners.len(), 2);
    let primaries: Vec<i64> = owners
        .iter()
        .filter(|o| o.is_primary)
        .map(|o| o.owner_id)
        .collect();
    assert_eq!(primaries, vec![luis.id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn calendar_for_one_animal(pool: PgPool) {
    let ana = owner(&pool, "ana@example.com").await;
    let luna = AnimalService::create(&pool, &animal("Luna", None, Some(ana.id)))
        .await
        .unwrap();
    let sol = AnimalService::create(&pool, &animal("Sol", None, Some(ana.id)))
        .await
        .unwrap();
    HealthEventService::create(&pool, &vaccination(luna.id, d(2024, 3, 15), false), 1)
        .await
        .unwrap();
    HealthEventService::create(&pool, &vaccination(sol.id, d(2024, 2, 1), false), 1)
        .await
        .unwrap();

    let entries = CalendarService::for_animal(&pool, luna.id, d(2025, 1, 1), Some(120))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].animal_name, "Luna");
    assert_eq!(entries[0].date, d(2025, 3, 15));

    let err = CalendarService::for_animal(&pool, 9999, d(2025, 1, 1), None)
        .await
        .unwrap_err();
    assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
}
