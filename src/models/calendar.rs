use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The event itself, on the date it was recorded for.
    Event,
    /// The follow-up dose computed from the event's recurrence.
    NextDue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub animal_id: i64,
    pub animal_name: String,
    pub event_id: i64,
    pub name: String,
    pub event_type: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub kind: EntryKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub id_dueno: Option<i64>,
    /// Reference "today"; defaults to the server's local date.
    pub desde: Option<NaiveDate>,
    /// Horizon in days after `desde`; unbounded when absent.
    pub dias: Option<u32>,
}
