use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::ports::{
    AppointmentStore, Clock, Notifier, ProfileDirectory, ServiceCatalog, SystemClock,
    WorkingRuleStore,
};
use crate::services::admission::BookingAdmissionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::schedule::ScheduleService;
use crate::services::slots::FreeSlotService;
use crate::stores::{
    SupabaseAppointmentStore, SupabaseProfileDirectory, SupabaseServiceCatalog,
    SupabaseWorkingRuleStore, WebhookNotifier,
};

/// Long-lived service graph for the scheduling cell. Built once at
/// startup: the admission service carries the per-dentist locks, so it
/// must outlive individual requests.
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub schedule: Arc<ScheduleService>,
    pub slots: Arc<FreeSlotService>,
    pub admission: Arc<BookingAdmissionService>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl SchedulingState {
    /// Production wiring: Supabase-backed stores, webhook notifier,
    /// system clock.
    pub fn from_config(config: Arc<AppConfig>) -> Arc<Self> {
        let supabase = Arc::new(SupabaseClient::new(&config));

        let rules: Arc<dyn WorkingRuleStore> =
            Arc::new(SupabaseWorkingRuleStore::new(Arc::clone(&supabase)));
        let appointments: Arc<dyn AppointmentStore> =
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase)));
        let catalog: Arc<dyn ServiceCatalog> =
            Arc::new(SupabaseServiceCatalog::new(Arc::clone(&supabase)));
        let directory: Arc<dyn ProfileDirectory> =
            Arc::new(SupabaseProfileDirectory::new(supabase));
        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(&config));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        Self::assemble(config, rules, appointments, catalog, directory, notifier, clock)
    }

    /// Wiring seam for tests and alternative backends.
    pub fn assemble(
        config: Arc<AppConfig>,
        rules: Arc<dyn WorkingRuleStore>,
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn ServiceCatalog>,
        directory: Arc<dyn ProfileDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let schedule = Arc::new(ScheduleService::new(rules, Arc::clone(&clock)));
        let slots = Arc::new(FreeSlotService::new(
            Arc::clone(&schedule),
            Arc::clone(&appointments),
        ));
        let admission = Arc::new(BookingAdmissionService::new(
            Arc::clone(&schedule),
            Arc::clone(&appointments),
            catalog,
            directory,
            Arc::clone(&notifier),
            Arc::clone(&clock),
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            Arc::clone(&appointments),
            notifier,
            clock,
        ));

        Arc::new(Self {
            config,
            schedule,
            slots,
            admission,
            lifecycle,
            appointments,
        })
    }
}
