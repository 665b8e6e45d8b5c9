use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::SchedulingState;

/// Appointment booking and lifecycle routes. All require authentication.
pub fn appointment_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Dentist schedule, availability and working-rule administration routes.
pub fn dentist_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route("/{dentist_id}/schedule/{date}", get(handlers::resolve_schedule))
        .route("/{dentist_id}/free-slots/{date}", get(handlers::free_slots))
        .route("/{dentist_id}/days-off", get(handlers::days_off))
        .route("/{dentist_id}/working-rules", get(handlers::list_working_rules))
        .route("/{dentist_id}/working-rules", put(handlers::upsert_working_rule))
        .route("/{dentist_id}/working-rules/{rule_id}", delete(handlers::delete_working_rule))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
