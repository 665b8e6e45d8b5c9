use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentEvent, AppointmentStatus, SchedulingError};
use crate::ports::{AppointmentStore, Clock, Notifier};

/// Drives the pending -> confirmed | rejected decision machine. Both
/// decisions are terminal; deletion is an administrative operation
/// orthogonal to status.
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            notifier,
            clock,
        }
    }

    pub async fn confirm(&self, id: Uuid, actor: &User) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.load_pending(id, actor).await?;

        appointment.status = AppointmentStatus::Confirmed;
        appointment.confirmed_at = Some(self.clock.now());
        appointment.confirmed_by = Some(actor_id(actor)?);
        appointment.rejected_at = None;
        appointment.rejected_by = None;
        appointment.reject_reason = None;

        let saved = self.appointments.update(&appointment).await?;
        info!("Appointment {} confirmed by {}", saved.id, actor.id);

        self.emit(&saved, AppointmentEvent::Confirmed).await;
        Ok(saved)
    }

    pub async fn reject(
        &self,
        id: Uuid,
        actor: &User,
        reason: &str,
    ) -> Result<Appointment, SchedulingError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(SchedulingError::Validation(
                "rejection requires a reason".to_string(),
            ));
        }

        let mut appointment = self.load_pending(id, actor).await?;

        appointment.status = AppointmentStatus::Rejected;
        appointment.rejected_at = Some(self.clock.now());
        appointment.rejected_by = Some(actor_id(actor)?);
        appointment.reject_reason = Some(reason.to_string());
        appointment.confirmed_at = None;
        appointment.confirmed_by = None;

        let saved = self.appointments.update(&appointment).await?;
        info!("Appointment {} rejected by {}", saved.id, actor.id);

        self.emit(&saved, AppointmentEvent::Rejected).await;
        Ok(saved)
    }

    /// Administrative removal, allowed in any status.
    pub async fn delete(&self, id: Uuid, actor: &User) -> Result<(), SchedulingError> {
        if !actor.is_admin() {
            return Err(SchedulingError::Role(
                "only administrators may delete appointments".to_string(),
            ));
        }

        let appointment = self
            .appointments
            .get(id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound("appointment".to_string()))?;

        self.appointments.delete(id).await?;
        info!("Appointment {} deleted by {}", id, actor.id);

        self.emit(&appointment, AppointmentEvent::Deleted).await;
        Ok(())
    }

    async fn load_pending(&self, id: Uuid, actor: &User) -> Result<Appointment, SchedulingError> {
        if !(actor.is_dentist() || actor.can_act_for_others()) {
            return Err(SchedulingError::Role(
                "only dentists or staff may decide appointments".to_string(),
            ));
        }

        let appointment = self
            .appointments
            .get(id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound("appointment".to_string()))?;

        if appointment.status != AppointmentStatus::Pending {
            return Err(SchedulingError::IllegalState(appointment.status));
        }

        Ok(appointment)
    }

    async fn emit(&self, appointment: &Appointment, event: AppointmentEvent) {
        if let Err(e) = self.notifier.notify(appointment, event).await {
            warn!(
                "Failed to deliver {} notification for appointment {}: {}",
                event.as_str(),
                appointment.id,
                e
            );
        }
    }
}

fn actor_id(actor: &User) -> Result<Uuid, SchedulingError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| SchedulingError::Validation("actor id is not a UUID".to_string()))
}
