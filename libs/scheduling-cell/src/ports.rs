//! Seams to the collaborators the scheduling engine depends on. Each has
//! a Supabase-backed production implementation in `stores` and in-memory
//! fakes in the test suites.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentEvent, DentalService, SchedulingError, WorkingRule,
};

#[async_trait]
pub trait WorkingRuleStore: Send + Sync {
    /// The dentist's single fixed rule, if any.
    async fn fixed_rule(&self, dentist_id: Uuid) -> Result<Option<WorkingRule>, SchedulingError>;

    /// The special rule for `(dentist, date)`, if any.
    async fn special_rule(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<WorkingRule>, SchedulingError>;

    async fn rules_for_dentist(&self, dentist_id: Uuid)
        -> Result<Vec<WorkingRule>, SchedulingError>;

    /// Insert or replace: one fixed rule per dentist, one special rule
    /// per `(dentist, date)`.
    async fn upsert(&self, rule: WorkingRule) -> Result<WorkingRule, SchedulingError>;

    async fn delete(&self, dentist_id: Uuid, rule_id: Uuid) -> Result<(), SchedulingError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Non-rejected appointments of a dentist on one civil date,
    /// keyed by the clinic-local midnight instant, ordered by start.
    async fn active_for_date(
        &self,
        dentist_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError>;

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError>;

    async fn delete(&self, id: Uuid) -> Result<(), SchedulingError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Resolve service ids to catalog entries. Unknown ids are absent
    /// from the result rather than an error.
    async fn fetch(&self, ids: &[Uuid]) -> Result<Vec<DentalService>, SchedulingError>;
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn dentist_exists(&self, id: Uuid) -> Result<bool, SchedulingError>;

    async fn customer_exists(&self, id: Uuid) -> Result<bool, SchedulingError>;
}

/// Sink for post-commit appointment events. Delivery is best-effort;
/// callers log failures and never let them affect the committed result.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        appointment: &Appointment,
        event: AppointmentEvent,
    ) -> anyhow::Result<()>;
}

/// Injected time source so temporal admission checks are deterministic
/// under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
