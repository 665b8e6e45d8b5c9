//! Supabase-backed implementations of the collaborator seams, plus the
//! webhook notification sink. All persistence goes through the shared
//! PostgREST client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::civil;
use crate::models::{
    Appointment, AppointmentEvent, DentalService, RuleKind, SchedulingError, ShiftWindow,
    WorkingRule,
};
use crate::ports::{
    AppointmentStore, Notifier, ProfileDirectory, ServiceCatalog, WorkingRuleStore,
};

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

// ==============================================================================
// WORKING RULES
// ==============================================================================

/// Row shape of the `working_rules` table; shift bounds travel as
/// "HH:MM" strings.
#[derive(Debug, Serialize, Deserialize)]
struct WorkingRuleRow {
    id: Uuid,
    dentist_id: Uuid,
    kind: RuleKind,
    working_days: Option<Vec<u8>>,
    date: Option<NaiveDate>,
    is_closed: bool,
    morning_start: Option<String>,
    morning_end: Option<String>,
    afternoon_start: Option<String>,
    afternoon_end: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn window_from_row(
    start: &Option<String>,
    end: &Option<String>,
) -> Result<Option<ShiftWindow>, SchedulingError> {
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = civil::parse_hhmm(start).ok_or_else(|| {
                SchedulingError::Database(format!("malformed shift time in working rule: {}", start))
            })?;
            let end = civil::parse_hhmm(end).ok_or_else(|| {
                SchedulingError::Database(format!("malformed shift time in working rule: {}", end))
            })?;
            Ok(Some(ShiftWindow { start, end }))
        }
        _ => Ok(None),
    }
}

impl WorkingRuleRow {
    fn into_rule(self) -> Result<WorkingRule, SchedulingError> {
        let morning = window_from_row(&self.morning_start, &self.morning_end)?;
        let afternoon = window_from_row(&self.afternoon_start, &self.afternoon_end)?;

        Ok(WorkingRule {
            id: self.id,
            dentist_id: self.dentist_id,
            kind: self.kind,
            working_days: self.working_days.map(|days| days.into_iter().collect()),
            date: self.date,
            is_closed: self.is_closed,
            morning,
            afternoon,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn from_rule(rule: &WorkingRule) -> Self {
        Self {
            id: rule.id,
            dentist_id: rule.dentist_id,
            kind: rule.kind,
            working_days: rule
                .working_days
                .as_ref()
                .map(|days| days.iter().copied().collect()),
            date: rule.date,
            is_closed: rule.is_closed,
            morning_start: rule.morning.map(|w| civil::format_hhmm(w.start)),
            morning_end: rule.morning.map(|w| civil::format_hhmm(w.end)),
            afternoon_start: rule.afternoon.map(|w| civil::format_hhmm(w.start)),
            afternoon_end: rule.afternoon.map(|w| civil::format_hhmm(w.end)),
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

pub struct SupabaseWorkingRuleStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseWorkingRuleStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_rows(&self, path: &str) -> Result<Vec<WorkingRule>, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value::<WorkingRuleRow>(row)
                    .map_err(|e| {
                        SchedulingError::Database(format!("failed to parse working rule: {}", e))
                    })
                    .and_then(WorkingRuleRow::into_rule)
            })
            .collect()
    }
}

#[async_trait]
impl WorkingRuleStore for SupabaseWorkingRuleStore {
    async fn fixed_rule(&self, dentist_id: Uuid) -> Result<Option<WorkingRule>, SchedulingError> {
        let path = format!(
            "/rest/v1/working_rules?dentist_id=eq.{}&kind=eq.fixed",
            dentist_id
        );
        Ok(self.fetch_rows(&path).await?.into_iter().next())
    }

    async fn special_rule(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<WorkingRule>, SchedulingError> {
        let path = format!(
            "/rest/v1/working_rules?dentist_id=eq.{}&kind=eq.special&date=eq.{}",
            dentist_id, date
        );
        Ok(self.fetch_rows(&path).await?.into_iter().next())
    }

    async fn rules_for_dentist(
        &self,
        dentist_id: Uuid,
    ) -> Result<Vec<WorkingRule>, SchedulingError> {
        let path = format!(
            "/rest/v1/working_rules?dentist_id=eq.{}&order=kind.asc,date.asc",
            dentist_id
        );
        self.fetch_rows(&path).await
    }

    async fn upsert(&self, rule: WorkingRule) -> Result<WorkingRule, SchedulingError> {
        debug!("Upserting {:?} working rule for dentist {}", rule.kind, rule.dentist_id);

        // Replace the dentist's existing rule for the same slot, if any.
        let existing = match rule.kind {
            RuleKind::Fixed => self.fixed_rule(rule.dentist_id).await?,
            RuleKind::Special => {
                // Validation guarantees special rules carry a date.
                let date = rule.date.ok_or_else(|| {
                    SchedulingError::Database("special rule without date".to_string())
                })?;
                self.special_rule(rule.dentist_id, date).await?
            }
        };

        let mut row = WorkingRuleRow::from_rule(&rule);
        let result: Vec<Value> = if let Some(existing) = existing {
            row.id = existing.id;
            row.created_at = existing.created_at;
            let path = format!("/rest/v1/working_rules?id=eq.{}", existing.id);
            self.supabase
                .request_with_headers(
                    Method::PATCH,
                    &path,
                    None,
                    Some(serde_json::to_value(&row).map_err(|e| SchedulingError::Database(e.to_string()))?),
                    Some(representation_headers()),
                )
                .await
                .map_err(|e| SchedulingError::Database(e.to_string()))?
        } else {
            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/working_rules",
                    None,
                    Some(serde_json::to_value(&row).map_err(|e| SchedulingError::Database(e.to_string()))?),
                    Some(representation_headers()),
                )
                .await
                .map_err(|e| SchedulingError::Database(e.to_string()))?
        };

        let saved = result
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("working rule write returned no row".to_string()))?;

        serde_json::from_value::<WorkingRuleRow>(saved)
            .map_err(|e| SchedulingError::Database(format!("failed to parse working rule: {}", e)))?
            .into_rule()
    }

    async fn delete(&self, dentist_id: Uuid, rule_id: Uuid) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/working_rules?id=eq.{}&dentist_id=eq.{}",
            rule_id, dentist_id
        );
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        Ok(())
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn parse_rows(result: Vec<Value>) -> Result<Vec<Appointment>, SchedulingError> {
        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Database(format!("failed to parse appointment: {}", e))
                })
            })
            .collect()
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn active_for_date(
        &self,
        dentist_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let encoded_date = urlencoding::encode(&date.to_rfc3339()).into_owned();
        let path = format!(
            "/rest/v1/appointments?dentist_id=eq.{}&date=eq.{}&status=neq.rejected&order=start_time.asc",
            dentist_id, encoded_date
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Self::parse_rows(result)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(serde_json::to_value(appointment).map_err(|e| SchedulingError::Database(e.to_string()))?),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Self::parse_rows(result)?
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("appointment insert returned no row".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(Self::parse_rows(result)?.into_iter().next())
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(serde_json::to_value(appointment).map_err(|e| SchedulingError::Database(e.to_string()))?),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Self::parse_rows(result)?
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("appointment update returned no row".to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        Ok(())
    }
}

// ==============================================================================
// SERVICE CATALOG / PROFILES
// ==============================================================================

pub struct SupabaseServiceCatalog {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseServiceCatalog {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl ServiceCatalog for SupabaseServiceCatalog {
    async fn fetch(&self, ids: &[Uuid]) -> Result<Vec<DentalService>, SchedulingError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/services?id=in.({})", id_list);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Database(format!("failed to parse service: {}", e))
                })
            })
            .collect()
    }
}

pub struct SupabaseProfileDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseProfileDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn role_exists(&self, id: Uuid, role: &str) -> Result<bool, SchedulingError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&role=eq.{}&select=id", id, role);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        Ok(!result.is_empty())
    }
}

#[async_trait]
impl ProfileDirectory for SupabaseProfileDirectory {
    async fn dentist_exists(&self, id: Uuid) -> Result<bool, SchedulingError> {
        self.role_exists(id, "dentist").await
    }

    async fn customer_exists(&self, id: Uuid) -> Result<bool, SchedulingError> {
        self.role_exists(id, "customer").await
    }
}

// ==============================================================================
// NOTIFICATION SINK
// ==============================================================================

/// Delivers appointment events to the configured webhook. An empty URL
/// disables delivery; callers already treat every failure as non-fatal.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.notification_webhook_url.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        appointment: &Appointment,
        event: AppointmentEvent,
    ) -> anyhow::Result<()> {
        if self.webhook_url.is_empty() {
            debug!(
                "Notification webhook not configured, dropping {} event for appointment {}",
                event.as_str(),
                appointment.id
            );
            return Ok(());
        }

        let payload = json!({
            "event": event.as_str(),
            "appointment": appointment,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Notification webhook returned {} for appointment {}",
                status, appointment.id
            );
            anyhow::bail!("notification webhook returned {}", status);
        }

        Ok(())
    }
}
