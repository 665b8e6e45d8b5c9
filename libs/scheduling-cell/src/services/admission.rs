use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Months, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::User;

use crate::civil;
use crate::models::{
    Appointment, AppointmentEvent, AppointmentStatus, BookAppointmentRequest, SchedulingError,
    ShiftWindow,
};
use crate::ports::{AppointmentStore, Clock, Notifier, ProfileDirectory, ServiceCatalog};
use crate::services::schedule::ScheduleService;

/// Minimum lead time for bookings placed on the current civil day.
pub const SAME_DAY_LEAD_TIME_MINUTES: i64 = 30;
/// How far ahead bookings may be placed.
pub const BOOKING_HORIZON_MONTHS: u32 = 3;

/// Validates and admits new appointments. The conflict check and the
/// insert run under a per-dentist async lock, so concurrent admissions
/// for the same dentist are serialised and the loser observes the
/// winner's booking.
pub struct BookingAdmissionService {
    schedule: Arc<ScheduleService>,
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn ServiceCatalog>,
    directory: Arc<dyn ProfileDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    dentist_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl BookingAdmissionService {
    pub fn new(
        schedule: Arc<ScheduleService>,
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn ServiceCatalog>,
        directory: Arc<dyn ProfileDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedule,
            appointments,
            catalog,
            directory,
            notifier,
            clock,
            dentist_locks: Mutex::new(HashMap::new()),
        }
    }

    fn admission_lock(&self, dentist_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.dentist_locks.lock().unwrap();
        locks
            .entry(dentist_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Admit a new appointment. Checks run in order and the first
    /// failure terminates; nothing is written before every check has
    /// passed.
    pub async fn book(
        &self,
        actor: &User,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking request for dentist {} by actor {}",
            request.dentist_id, actor.id
        );

        // A customer books only for themselves; staff and admins book on
        // behalf of any customer.
        let self_booking = actor.is_customer() && actor.id == request.customer_id.to_string();
        if !self_booking && !actor.can_act_for_others() {
            return Err(SchedulingError::Role(
                "customers may only book appointments for themselves".to_string(),
            ));
        }

        if !self.directory.dentist_exists(request.dentist_id).await? {
            return Err(SchedulingError::NotFound("dentist".to_string()));
        }
        if !self.directory.customer_exists(request.customer_id).await? {
            return Err(SchedulingError::NotFound("customer".to_string()));
        }

        let date = civil::parse_ymd(&request.date).ok_or_else(|| {
            SchedulingError::Validation(format!("date must be YYYY-MM-DD: {}", request.date))
        })?;
        let start_local = civil::parse_hhmm(&request.start_time).ok_or_else(|| {
            SchedulingError::Validation(format!(
                "start_time must be HH:MM: {}",
                request.start_time
            ))
        })?;

        // Services must all resolve and sum to a positive duration.
        if request.service_ids.is_empty() {
            return Err(SchedulingError::InvalidServices);
        }
        let services = self.catalog.fetch(&request.service_ids).await?;
        if services.len() != request.service_ids.len() {
            return Err(SchedulingError::InvalidServices);
        }
        let duration_minutes: i64 = services.iter().map(|s| s.duration_minutes).sum();
        if duration_minutes <= 0 {
            return Err(SchedulingError::InvalidServices);
        }

        let start = civil::combine(date, start_local);
        let end = start + Duration::minutes(duration_minutes);

        self.check_temporal_bounds(start, date)?;

        let resolved = self.schedule.resolve(request.dentist_id, date).await?;
        if !resolved.has_availability() {
            return Err(SchedulingError::NotWorking);
        }

        // The whole interval must sit inside one shift window; spanning
        // both shifts or hanging over either edge is out of hours.
        let (morning, afternoon) = resolved.windows();
        let start_minute = civil::minute_of_day(start_local);
        let end_minute = start_minute + duration_minutes;
        let contained = [morning, afternoon]
            .into_iter()
            .flatten()
            .any(|window| interval_within_window(window, start_minute, end_minute));
        if !contained {
            return Err(SchedulingError::OutOfHours);
        }

        // Conflict check and insert are serialised per dentist to close
        // the check-then-act race between concurrent admissions.
        let lock = self.admission_lock(request.dentist_id);
        let guard = lock.lock().await;

        let date_instant = civil::midnight_instant(date);
        let existing = self
            .appointments
            .active_for_date(request.dentist_id, date_instant)
            .await?;
        if let Some(conflicting) = existing.iter().find(|a| a.overlaps(start, end)) {
            debug!(
                "Booking conflict: requested {}-{} overlaps appointment {}",
                start, end, conflicting.id
            );
            return Err(SchedulingError::Conflict);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            dentist_id: request.dentist_id,
            date: date_instant,
            start_time: start,
            end_time: end,
            service_ids: request.service_ids,
            note: request.note,
            status: AppointmentStatus::Pending,
            confirmed_at: None,
            confirmed_by: None,
            rejected_at: None,
            rejected_by: None,
            reject_reason: None,
            created_at: self.clock.now(),
        };
        let saved = self.appointments.insert(&appointment).await?;
        drop(guard);

        info!(
            "Appointment {} admitted for dentist {} at {}",
            saved.id, saved.dentist_id, saved.start_time
        );

        // Post-commit and best-effort: a failed notification never rolls
        // back or masks the admission result.
        if let Err(e) = self.notifier.notify(&saved, AppointmentEvent::Created).await {
            warn!(
                "Failed to deliver created notification for appointment {}: {}",
                saved.id, e
            );
        }

        Ok(saved)
    }

    fn check_temporal_bounds(
        &self,
        start: DateTime<Utc>,
        date: chrono::NaiveDate,
    ) -> Result<(), SchedulingError> {
        let now = self.clock.now();

        if start < now {
            return Err(SchedulingError::PastBooking);
        }

        if civil::local_date(now) == date
            && start < now + Duration::minutes(SAME_DAY_LEAD_TIME_MINUTES)
        {
            return Err(SchedulingError::LeadTimeTooShort);
        }

        let horizon = now + Months::new(BOOKING_HORIZON_MONTHS);
        if start > horizon {
            return Err(SchedulingError::HorizonExceeded);
        }

        Ok(())
    }
}

fn interval_within_window(window: ShiftWindow, start_minute: i64, end_minute: i64) -> bool {
    let window_start = civil::minute_of_day(window.start);
    let window_end = civil::minute_of_day(window.end);
    window_start <= start_minute && end_minute <= window_end
}
