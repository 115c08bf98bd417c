pub mod animals;
pub mod auth;
pub mod calendar;
pub mod health;
pub mod health_events;
pub mod owners;
pub mod reminders;
pub mod weights;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{middleware::auth::JwtSecret, AppState};

/// Paths a client may use for the owner resource: `/api/dueño` arrives
/// percent-encoded, the ASCII spelling is kept as an alias.
const OWNER_SEGMENTS: [&str; 2] = ["due%C3%B1o", "dueno"];

/// Full API router. CORS is layered on by the binary.
pub fn router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    let mut api = Router::new()
        .route("/health", get(health::health_check))
        // Animals
        .route("/api/animal", get(animals::list_animals).post(animals::create_animal))
        .route(
            "/api/animal/{id}",
            get(animals::get_animal)
                .put(animals::update_animal)
                .delete(animals::delete_animal),
        )
        .route("/api/animal/{id}/calendario", get(animals::animal_calendar))
        // Health events
        .route(
            "/api/evento-salud",
            get(health_events::list_events).post(health_events::create_event),
        )
        .route(
            "/api/evento-salud/{id}",
            get(health_events::get_event)
                .put(health_events::update_event)
                .delete(health_events::delete_event),
        )
        // Weights
        .route("/api/peso", get(weights::list_weights).post(weights::create_weight))
        .route(
            "/api/peso/{id}",
            get(weights::get_weight)
                .put(weights::update_weight)
                .delete(weights::delete_weight),
        )
        .route("/api/peso/animal/{id_animal}/ultimo", get(weights::latest_weight))
        // Calendar & reminders
        .route("/api/calendario", get(calendar::upcoming))
        .route(
            "/api/recordatorio",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        .route("/api/recordatorio/{id}", delete(reminders::delete_reminder))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/oauth/{provider}", get(auth::oauth_start))
        .route("/api/auth/callback", get(auth::oauth_callback));

    for segment in OWNER_SEGMENTS {
        api = api
            .route(
                &format!("/api/{segment}"),
                get(owners::list_owners).post(owners::create_owner),
            )
            .route(
                &format!("/api/{segment}/{{id}}"),
                get(owners::get_owner)
                    .put(owners::update_owner)
                    .delete(owners::delete_owner),
            )
            .route(&format!("/api/{segment}/{{id}}/animal"), get(owners::list_owner_animals))
            .route(
                &format!("/api/animal/{{id}}/{segment}"),
                get(animals::list_owners).post(animals::link_owner),
            )
            .route(
                &format!("/api/animal/{{id}}/{segment}/{{owner_id}}"),
                delete(animals::unlink_owner),
            );
    }

    api.layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
