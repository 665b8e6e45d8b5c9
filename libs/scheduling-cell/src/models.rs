use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// WORKING RULES
// ==============================================================================

/// Half-open wall-clock interval `[start, end)` a dentist can be booked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Recurring weekly pattern keyed on weekday codes.
    Fixed,
    /// One-off override for a single calendar date.
    Special,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingRule {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub kind: RuleKind,
    /// Weekday codes 1..7, Sunday = 1. Fixed rules only.
    pub working_days: Option<BTreeSet<u8>>,
    /// Civil date the rule applies to. Special rules only.
    pub date: Option<NaiveDate>,
    pub is_closed: bool,
    pub morning: Option<ShiftWindow>,
    pub afternoon: Option<ShiftWindow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of resolving a dentist's schedule for one civil date.
///
/// The three non-working variants all mean zero availability to booking
/// callers, but the schedule read API keeps them distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedSchedule {
    Working {
        morning: Option<ShiftWindow>,
        afternoon: Option<ShiftWindow>,
    },
    /// Explicitly closed by a special rule.
    ClosedDate,
    /// The weekday is outside the fixed rule's working days.
    DayOff,
    /// The dentist has no working rule at all.
    NotScheduled,
}

impl ResolvedSchedule {
    pub fn has_availability(&self) -> bool {
        match self {
            ResolvedSchedule::Working { morning, afternoon } => {
                morning.is_some() || afternoon.is_some()
            }
            _ => false,
        }
    }

    /// Morning and afternoon windows; both `None` unless working.
    pub fn windows(&self) -> (Option<ShiftWindow>, Option<ShiftWindow>) {
        match self {
            ResolvedSchedule::Working { morning, afternoon } => (*morning, *afternoon),
            _ => (None, None),
        }
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub dentist_id: Uuid,
    /// Instant of clinic-local midnight on the booked civil date.
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_ids: Vec<Uuid>,
    pub note: Option<String>,
    pub status: AppointmentStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Half-open overlap test against another interval.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// Events handed to the notification sink after a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentEvent {
    Created,
    Confirmed,
    Rejected,
    Deleted,
}

impl AppointmentEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentEvent::Created => "created",
            AppointmentEvent::Confirmed => "confirmed",
            AppointmentEvent::Rejected => "rejected",
            AppointmentEvent::Deleted => "deleted",
        }
    }
}

// ==============================================================================
// COLLABORATOR DATA
// ==============================================================================

/// Catalog entry for a billable dental service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DentalService {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i64,
}

// ==============================================================================
// REQUEST / RESPONSE DTOS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ShiftWindowSpec {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkingRuleSpec {
    pub kind: RuleKind,
    pub working_days: Option<BTreeSet<u8>>,
    /// "YYYY-MM-DD", special rules only.
    pub date: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
    pub morning: Option<ShiftWindowSpec>,
    pub afternoon: Option<ShiftWindowSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub dentist_id: Uuid,
    pub customer_id: Uuid,
    /// "YYYY-MM-DD" in clinic civil time.
    pub date: String,
    /// "HH:MM" wall-clock start.
    pub start_time: String,
    pub service_ids: Vec<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: String,
}

/// A bookable sub-interval of a shift, rendered as clinic wall-clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRange {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaysOffResponse {
    pub weekly_off_days: BTreeSet<u8>,
    pub explicit_closed_dates: Vec<NaiveDate>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Actor lacks the required capability: {0}")]
    Role(String),

    #[error("Service selection is empty or does not resolve to a positive duration")]
    InvalidServices,

    #[error("Dentist is not working on the requested date")]
    NotWorking,

    #[error("Requested interval falls outside the dentist's shift hours")]
    OutOfHours,

    #[error("Appointment start must not be in the past")]
    PastBooking,

    #[error("Same-day bookings require at least 30 minutes of lead time")]
    LeadTimeTooShort,

    #[error("Bookings may be placed at most 3 calendar months ahead")]
    HorizonExceeded,

    #[error("Appointment conflicts with an existing booking")]
    Conflict,

    #[error("Appointment cannot be decided in current status: {0}")]
    IllegalState(AppointmentStatus),

    #[error("Database error: {0}")]
    Database(String),
}
