use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::civil;
use crate::models::{
    BookAppointmentRequest, RejectAppointmentRequest, SchedulingError, WorkingRuleSpec,
};
use crate::state::SchedulingState;

fn to_app_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::Validation(msg) => AppError::ValidationError(msg),
        SchedulingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
        SchedulingError::Role(msg) => AppError::Forbidden(msg),
        SchedulingError::InvalidServices => AppError::BadRequest(e.to_string()),
        SchedulingError::NotWorking
        | SchedulingError::OutOfHours
        | SchedulingError::PastBooking
        | SchedulingError::LeadTimeTooShort
        | SchedulingError::HorizonExceeded => AppError::Unprocessable(e.to_string()),
        SchedulingError::Conflict => AppError::Conflict(e.to_string()),
        SchedulingError::IllegalState(_) => AppError::Conflict(e.to_string()),
        SchedulingError::Database(msg) => AppError::Database(msg),
    }
}

fn parse_date(raw: &str) -> Result<chrono::NaiveDate, AppError> {
    civil::parse_ymd(raw)
        .ok_or_else(|| AppError::BadRequest(format!("date must be YYYY-MM-DD: {}", raw)))
}

/// Administrative surface of a dentist's calendar: the dentist
/// themselves or an admin.
fn ensure_calendar_admin(user: &User, dentist_id: Uuid) -> Result<(), AppError> {
    if user.is_admin() || user.id == dentist_id.to_string() {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "not authorized to manage this dentist's working rules".to_string(),
    ))
}

// ==============================================================================
// SCHEDULE & AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn resolve_schedule(
    State(state): State<Arc<SchedulingState>>,
    Path((dentist_id, date)): Path<(Uuid, String)>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;

    let schedule = state
        .schedule
        .resolve(dentist_id, date)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "date": date,
        "schedule": schedule,
    })))
}

#[axum::debug_handler]
pub async fn free_slots(
    State(state): State<Arc<SchedulingState>>,
    Path((dentist_id, date)): Path<(Uuid, String)>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;

    let free_ranges = state
        .slots
        .free_ranges(dentist_id, date)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "date": date,
        "free_ranges": free_ranges,
    })))
}

#[axum::debug_handler]
pub async fn days_off(
    State(state): State<Arc<SchedulingState>>,
    Path(dentist_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let days_off = state
        .schedule
        .days_off(dentist_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "days_off": days_off,
    })))
}

// ==============================================================================
// WORKING RULE ADMINISTRATION
// ==============================================================================

#[axum::debug_handler]
pub async fn list_working_rules(
    State(state): State<Arc<SchedulingState>>,
    Path(dentist_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_calendar_admin(&user, dentist_id)?;

    let rules = state
        .schedule
        .rules(dentist_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({ "working_rules": rules })))
}

#[axum::debug_handler]
pub async fn upsert_working_rule(
    State(state): State<Arc<SchedulingState>>,
    Path(dentist_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(spec): Json<WorkingRuleSpec>,
) -> Result<Json<Value>, AppError> {
    ensure_calendar_admin(&user, dentist_id)?;

    let rule = state
        .schedule
        .upsert_working_rule(dentist_id, spec)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "working_rule": rule,
    })))
}

#[axum::debug_handler]
pub async fn delete_working_rule(
    State(state): State<Arc<SchedulingState>>,
    Path((dentist_id, rule_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_calendar_admin(&user, dentist_id)?;

    state
        .schedule
        .delete_working_rule(dentist_id, rule_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .admission
        .book(&user, request)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested, awaiting confirmation"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .get(appointment_id)
        .await
        .map_err(to_app_error)?
        .ok_or_else(|| AppError::NotFound("appointment not found".to_string()))?;

    let is_participant = user.id == appointment.customer_id.to_string()
        || user.id == appointment.dentist_id.to_string();
    if !is_participant && !user.can_act_for_others() {
        return Err(AppError::Forbidden(
            "not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .confirm(appointment_id, &user)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RejectAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .reject(appointment_id, &user, &request.reason)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state
        .lifecycle
        .delete(appointment_id, &user)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({ "success": true })))
}
