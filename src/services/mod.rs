pub mod animals;
pub mod auth;
pub mod breeds;
pub mod calendar;
pub mod email;
pub mod health_events;
pub mod oauth;
pub mod owners;
pub mod reminder_scheduler;
pub mod reminders;
pub mod weights;
