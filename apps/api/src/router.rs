use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use scheduling_cell::router::{appointment_routes, dentist_routes};
use scheduling_cell::SchedulingState;

pub fn create_router(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Dental Clinic API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/dentists", dentist_routes(state))
}
