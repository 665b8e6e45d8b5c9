//! Shared fixtures for the scheduling-cell test suites: in-memory
//! collaborator fakes, a fixed clock, and a pre-wired service harness.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use scheduling_cell::civil;
use scheduling_cell::models::{
    Appointment, AppointmentEvent, AppointmentStatus, BookAppointmentRequest, DentalService,
    RuleKind, SchedulingError, ShiftWindowSpec, WorkingRule, WorkingRuleSpec,
};
use scheduling_cell::ports::{
    AppointmentStore, Clock, Notifier, ProfileDirectory, ServiceCatalog, WorkingRuleStore,
};
use scheduling_cell::services::admission::BookingAdmissionService;
use scheduling_cell::services::lifecycle::AppointmentLifecycleService;
use scheduling_cell::services::schedule::ScheduleService;
use scheduling_cell::services::slots::FreeSlotService;
use shared_models::auth::User;

// ==============================================================================
// IN-MEMORY COLLABORATOR FAKES
// ==============================================================================

#[derive(Default)]
pub struct InMemoryWorkingRuleStore {
    rules: Mutex<Vec<WorkingRule>>,
}

#[async_trait]
impl WorkingRuleStore for InMemoryWorkingRuleStore {
    async fn fixed_rule(&self, dentist_id: Uuid) -> Result<Option<WorkingRule>, SchedulingError> {
        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|r| r.dentist_id == dentist_id && r.kind == RuleKind::Fixed)
            .cloned())
    }

    async fn special_rule(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<WorkingRule>, SchedulingError> {
        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|r| {
                r.dentist_id == dentist_id && r.kind == RuleKind::Special && r.date == Some(date)
            })
            .cloned())
    }

    async fn rules_for_dentist(
        &self,
        dentist_id: Uuid,
    ) -> Result<Vec<WorkingRule>, SchedulingError> {
        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .filter(|r| r.dentist_id == dentist_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, rule: WorkingRule) -> Result<WorkingRule, SchedulingError> {
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|r| {
            !(r.dentist_id == rule.dentist_id
                && r.kind == rule.kind
                && (rule.kind == RuleKind::Fixed || r.date == rule.date))
        });
        rules.push(rule.clone());
        Ok(rule)
    }

    async fn delete(&self, dentist_id: Uuid, rule_id: Uuid) -> Result<(), SchedulingError> {
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|r| !(r.dentist_id == dentist_id && r.id == rule_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn all(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn active_for_date(
        &self,
        dentist_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.lock().unwrap();
        let mut result: Vec<Appointment> = appointments
            .iter()
            .filter(|a| {
                a.dentist_id == dentist_id
                    && a.date == date
                    && a.status != AppointmentStatus::Rejected
            })
            .cloned()
            .collect();
        result.sort_by_key(|a| a.start_time);
        Ok(result)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.lock().unwrap();
        appointments.push(appointment.clone());
        Ok(appointment.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.lock().unwrap();
        let slot = appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| SchedulingError::NotFound("appointment".to_string()))?;
        *slot = appointment.clone();
        Ok(appointment.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), SchedulingError> {
        let mut appointments = self.appointments.lock().unwrap();
        appointments.retain(|a| a.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticServiceCatalog {
    services: Mutex<HashMap<Uuid, DentalService>>,
}

impl StaticServiceCatalog {
    pub fn add(&self, name: &str, duration_minutes: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.services.lock().unwrap().insert(
            id,
            DentalService {
                id,
                name: name.to_string(),
                duration_minutes,
            },
        );
        id
    }
}

#[async_trait]
impl ServiceCatalog for StaticServiceCatalog {
    async fn fetch(&self, ids: &[Uuid]) -> Result<Vec<DentalService>, SchedulingError> {
        let services = self.services.lock().unwrap();
        Ok(ids.iter().filter_map(|id| services.get(id).cloned()).collect())
    }
}

/// Directory where every id resolves; existence failures are exercised
/// through `ClosedDirectory`.
pub struct OpenDirectory;

#[async_trait]
impl ProfileDirectory for OpenDirectory {
    async fn dentist_exists(&self, _id: Uuid) -> Result<bool, SchedulingError> {
        Ok(true)
    }

    async fn customer_exists(&self, _id: Uuid) -> Result<bool, SchedulingError> {
        Ok(true)
    }
}

/// Directory where nothing resolves.
pub struct ClosedDirectory;

#[async_trait]
impl ProfileDirectory for ClosedDirectory {
    async fn dentist_exists(&self, _id: Uuid) -> Result<bool, SchedulingError> {
        Ok(false)
    }

    async fn customer_exists(&self, _id: Uuid) -> Result<bool, SchedulingError> {
        Ok(false)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(Uuid, AppointmentEvent)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(Uuid, AppointmentEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        appointment: &Appointment,
        event: AppointmentEvent,
    ) -> anyhow::Result<()> {
        self.events.lock().unwrap().push((appointment.id, event));
        Ok(())
    }
}

/// A sink that always fails delivery; committed results must survive it.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _appointment: &Appointment,
        _event: AppointmentEvent,
    ) -> anyhow::Result<()> {
        anyhow::bail!("notification sink unavailable")
    }
}

pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

// ==============================================================================
// HARNESS
// ==============================================================================

pub fn ymd(value: &str) -> NaiveDate {
    civil::parse_ymd(value).expect("test date must be YYYY-MM-DD")
}

/// Instant of a clinic wall-clock moment, "YYYY-MM-DD" + "HH:MM".
pub fn at_local(date: &str, time: &str) -> DateTime<Utc> {
    civil::combine(ymd(date), civil::parse_hhmm(time).expect("test time must be HH:MM"))
}

pub fn customer_user(id: Uuid) -> User {
    user_with_role(id, "customer")
}

pub fn dentist_user(id: Uuid) -> User {
    user_with_role(id, "dentist")
}

pub fn staff_user() -> User {
    user_with_role(Uuid::new_v4(), "staff")
}

pub fn admin_user() -> User {
    user_with_role(Uuid::new_v4(), "admin")
}

fn user_with_role(id: Uuid, role: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{}@clinic.test", role)),
        role: Some(role.to_string()),
        metadata: None,
        created_at: None,
    }
}

pub fn window(start: &str, end: &str) -> ShiftWindowSpec {
    ShiftWindowSpec {
        start: start.to_string(),
        end: end.to_string(),
    }
}

pub struct TestHarness {
    pub rules: Arc<InMemoryWorkingRuleStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub catalog: Arc<StaticServiceCatalog>,
    pub notifier: Arc<RecordingNotifier>,
    pub schedule: Arc<ScheduleService>,
    pub slots: Arc<FreeSlotService>,
    pub admission: Arc<BookingAdmissionService>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub now: DateTime<Utc>,
}

impl TestHarness {
    /// Harness pinned to Monday 2025-06-02 09:00 clinic time.
    pub fn new() -> Self {
        Self::at(at_local("2025-06-02", "09:00"))
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        let rules = Arc::new(InMemoryWorkingRuleStore::default());
        let appointments = Arc::new(InMemoryAppointmentStore::default());
        let catalog = Arc::new(StaticServiceCatalog::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));

        let schedule = Arc::new(ScheduleService::new(
            rules.clone() as Arc<dyn WorkingRuleStore>,
            clock.clone(),
        ));
        let slots = Arc::new(FreeSlotService::new(
            schedule.clone(),
            appointments.clone() as Arc<dyn AppointmentStore>,
        ));
        let admission = Arc::new(BookingAdmissionService::new(
            schedule.clone(),
            appointments.clone() as Arc<dyn AppointmentStore>,
            catalog.clone() as Arc<dyn ServiceCatalog>,
            Arc::new(OpenDirectory),
            notifier.clone() as Arc<dyn Notifier>,
            clock.clone(),
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            appointments.clone() as Arc<dyn AppointmentStore>,
            notifier.clone() as Arc<dyn Notifier>,
            clock,
        ));

        Self {
            rules,
            appointments,
            catalog,
            notifier,
            schedule,
            slots,
            admission,
            lifecycle,
            now,
        }
    }

    /// Weekday pattern with the standard morning shift, Monday-Friday
    /// (codes 2-6) unless overridden.
    pub async fn add_fixed_rule(
        &self,
        dentist_id: Uuid,
        working_days: &[u8],
        morning: Option<(&str, &str)>,
        afternoon: Option<(&str, &str)>,
    ) -> WorkingRule {
        let spec = WorkingRuleSpec {
            kind: RuleKind::Fixed,
            working_days: Some(working_days.iter().copied().collect()),
            date: None,
            is_closed: false,
            morning: morning.map(|(s, e)| window(s, e)),
            afternoon: afternoon.map(|(s, e)| window(s, e)),
        };
        self.schedule
            .upsert_working_rule(dentist_id, spec)
            .await
            .expect("fixed rule must validate")
    }

    pub async fn add_special_rule(
        &self,
        dentist_id: Uuid,
        date: &str,
        is_closed: bool,
        morning: Option<(&str, &str)>,
        afternoon: Option<(&str, &str)>,
    ) -> WorkingRule {
        let spec = WorkingRuleSpec {
            kind: RuleKind::Special,
            working_days: None,
            date: Some(date.to_string()),
            is_closed,
            morning: morning.map(|(s, e)| window(s, e)),
            afternoon: afternoon.map(|(s, e)| window(s, e)),
        };
        self.schedule
            .upsert_working_rule(dentist_id, spec)
            .await
            .expect("special rule must validate")
    }

    pub fn booking_request(
        &self,
        dentist_id: Uuid,
        customer_id: Uuid,
        date: &str,
        start_time: &str,
        service_ids: Vec<Uuid>,
    ) -> BookAppointmentRequest {
        BookAppointmentRequest {
            dentist_id,
            customer_id,
            date: date.to_string(),
            start_time: start_time.to_string(),
            service_ids,
            note: None,
        }
    }
}
