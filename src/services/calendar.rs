use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use sqlx::PgPool;

use crate::{
    models::{
        animal::Animal,
        calendar::{CalendarEntry, EntryKind},
        health_event::HealthEvent,
    },
    services::{animals::AnimalService, health_events::HealthEventService},
};

/// Merges the events of several animals into one upcoming-events list.
///
/// An event contributes its own date and its next-due date, each only when it
/// falls on or after `today` (and within `horizon_days` when given). Entries
/// are deduplicated on (animal, name, date, kind) and ordered by date, then
/// time (untimed first), then animal name.
pub fn upcoming(
    animal_names: &HashMap<i64, String>,
    events: &[HealthEvent],
    today: NaiveDate,
    horizon_days: Option<u32>,
) -> Vec<CalendarEntry> {
    let until = horizon_days.and_then(|days| today.checked_add_days(Days::new(days.into())));
    let in_window = |date: NaiveDate| date >= today && until.map_or(true, |end| date <= end);

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for event in events {
        let Some(animal_name) = animal_names.get(&event.animal_id) else {
            continue;
        };

        let candidates = [
            Some((event.event_date, event.event_time, EntryKind::Event)),
            event.next_due.map(|due| (due, None, EntryKind::NextDue)),
        ];

        for (date, time, kind) in candidates.into_iter().flatten() {
            if !in_window(date) {
                continue;
            }
            let key = (event.animal_id, event.name.to_lowercase(), date, kind);
            if !seen.insert(key) {
                continue;
            }
            entries.push(CalendarEntry {
                animal_id: event.animal_id,
                animal_name: animal_name.clone(),
                event_id: event.id,
                name: event.name.clone(),
                event_type: event.event_type.clone(),
                date,
                time,
                kind,
            });
        }
    }

    entries.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.time.cmp(&b.time))
            .then_with(|| a.animal_name.cmp(&b.animal_name))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    entries
}

pub struct CalendarService;

impl CalendarService {
    pub async fn for_owner(
        pool: &PgPool,
        owner_id: Option<i64>,
        today: NaiveDate,
        horizon_days: Option<u32>,
    ) -> anyhow::Result<Vec<CalendarEntry>> {
        let animals = AnimalService::list(pool, owner_id).await?;
        Self::for_animals(pool, &animals, today, horizon_days).await
    }

    pub async fn for_animal(
        pool: &PgPool,
        animal_id: i64,
        today: NaiveDate,
        horizon_days: Option<u32>,
    ) -> anyhow::Result<Vec<CalendarEntry>> {
        let animal = AnimalService::get(pool, animal_id).await?;
        Self::for_animals(pool, &[animal], today, horizon_days).await
    }

    async fn for_animals(
        pool: &PgPool,
        animals: &[Animal],
        today: NaiveDate,
        horizon_days: Option<u32>,
    ) -> anyhow::Result<Vec<CalendarEntry>> {
        if animals.is_empty() {
            return Ok(Vec::new());
        }
        let names: HashMap<i64, String> = animals.iter().map(|a| (a.id, a.name.clone())).collect();
        let ids: Vec<i64> = names.keys().copied().collect();
        let events = HealthEventService::list_for_animals(pool, &ids).await?;
        Ok(upcoming(&names, &events, today, horizon_days))
    }
}
