use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::civil;
use crate::models::{
    DaysOffResponse, ResolvedSchedule, RuleKind, SchedulingError, ShiftWindow, ShiftWindowSpec,
    WorkingRule, WorkingRuleSpec,
};
use crate::ports::{Clock, WorkingRuleStore};

fn hhmm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Resolves dentist schedules and owns the administrative surface for
/// working rules.
pub struct ScheduleService {
    rules: Arc<dyn WorkingRuleStore>,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(rules: Arc<dyn WorkingRuleStore>, clock: Arc<dyn Clock>) -> Self {
        Self { rules, clock }
    }

    /// Effective schedule for `(dentist, date)`. A special rule wins
    /// verbatim over the fixed rule, including explicit closures,
    /// regardless of the date's weekday.
    pub async fn resolve(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> Result<ResolvedSchedule, SchedulingError> {
        if let Some(special) = self.rules.special_rule(dentist_id, date).await? {
            debug!("Special rule {} overrides fixed schedule on {}", special.id, date);
            if special.is_closed {
                return Ok(ResolvedSchedule::ClosedDate);
            }
            return Ok(ResolvedSchedule::Working {
                morning: special.morning,
                afternoon: special.afternoon,
            });
        }

        let Some(fixed) = self.rules.fixed_rule(dentist_id).await? else {
            return Ok(ResolvedSchedule::NotScheduled);
        };

        if fixed.is_closed {
            return Ok(ResolvedSchedule::ClosedDate);
        }

        let weekday = civil::weekday_code(date);
        let works_today = fixed
            .working_days
            .as_ref()
            .map(|days| days.contains(&weekday))
            .unwrap_or(false);

        if !works_today {
            return Ok(ResolvedSchedule::DayOff);
        }

        Ok(ResolvedSchedule::Working {
            morning: fixed.morning,
            afternoon: fixed.afternoon,
        })
    }

    /// Create or replace a dentist's working rule after validating every
    /// structural invariant.
    pub async fn upsert_working_rule(
        &self,
        dentist_id: Uuid,
        spec: WorkingRuleSpec,
    ) -> Result<WorkingRule, SchedulingError> {
        let (date, morning, afternoon) = validate_rule_spec(&spec)?;

        let now = self.clock.now();
        let rule = WorkingRule {
            id: Uuid::new_v4(),
            dentist_id,
            kind: spec.kind,
            working_days: spec.working_days,
            date,
            is_closed: spec.is_closed,
            morning,
            afternoon,
            created_at: now,
            updated_at: now,
        };

        let saved = self.rules.upsert(rule).await?;
        info!("Working rule {} saved for dentist {}", saved.id, dentist_id);
        Ok(saved)
    }

    pub async fn delete_working_rule(
        &self,
        dentist_id: Uuid,
        rule_id: Uuid,
    ) -> Result<(), SchedulingError> {
        self.rules.delete(dentist_id, rule_id).await?;
        info!("Working rule {} deleted for dentist {}", rule_id, dentist_id);
        Ok(())
    }

    pub async fn rules(&self, dentist_id: Uuid) -> Result<Vec<WorkingRule>, SchedulingError> {
        self.rules.rules_for_dentist(dentist_id).await
    }

    /// Weekly off-days implied by the fixed rule plus the explicitly
    /// closed special dates.
    pub async fn days_off(&self, dentist_id: Uuid) -> Result<DaysOffResponse, SchedulingError> {
        let all_rules = self.rules.rules_for_dentist(dentist_id).await?;

        let working_days: BTreeSet<u8> = all_rules
            .iter()
            .find(|rule| rule.kind == RuleKind::Fixed && !rule.is_closed)
            .and_then(|rule| rule.working_days.clone())
            .unwrap_or_default();

        let weekly_off_days: BTreeSet<u8> =
            (1..=7).filter(|day| !working_days.contains(day)).collect();

        let mut explicit_closed_dates: Vec<NaiveDate> = all_rules
            .iter()
            .filter(|rule| rule.kind == RuleKind::Special && rule.is_closed)
            .filter_map(|rule| rule.date)
            .collect();
        explicit_closed_dates.sort();

        Ok(DaysOffResponse {
            weekly_off_days,
            explicit_closed_dates,
        })
    }
}

fn parse_window(
    label: &str,
    spec: &ShiftWindowSpec,
    earliest: NaiveTime,
    latest: NaiveTime,
) -> Result<ShiftWindow, SchedulingError> {
    let start = civil::parse_hhmm(&spec.start).ok_or_else(|| {
        SchedulingError::Validation(format!("{} start must be HH:MM: {}", label, spec.start))
    })?;
    let end = civil::parse_hhmm(&spec.end).ok_or_else(|| {
        SchedulingError::Validation(format!("{} end must be HH:MM: {}", label, spec.end))
    })?;

    if start >= end {
        return Err(SchedulingError::Validation(format!(
            "{} shift start must be before its end",
            label
        )));
    }
    if start < earliest || end > latest {
        return Err(SchedulingError::Validation(format!(
            "{} shift must lie within {}-{}",
            label,
            civil::format_hhmm(earliest),
            civil::format_hhmm(latest)
        )));
    }

    Ok(ShiftWindow { start, end })
}

type ValidatedSpec = (Option<NaiveDate>, Option<ShiftWindow>, Option<ShiftWindow>);

fn validate_rule_spec(spec: &WorkingRuleSpec) -> Result<ValidatedSpec, SchedulingError> {
    let date = match (spec.kind, spec.date.as_deref()) {
        (RuleKind::Fixed, None) => None,
        (RuleKind::Fixed, Some(_)) => {
            return Err(SchedulingError::Validation(
                "fixed rules must not carry a date".to_string(),
            ));
        }
        (RuleKind::Special, Some(raw)) => Some(civil::parse_ymd(raw).ok_or_else(|| {
            SchedulingError::Validation(format!("date must be YYYY-MM-DD: {}", raw))
        })?),
        (RuleKind::Special, None) => {
            return Err(SchedulingError::Validation(
                "special rules require a date".to_string(),
            ));
        }
    };

    match (spec.kind, &spec.working_days) {
        (RuleKind::Fixed, Some(days)) => {
            if days.is_empty() {
                return Err(SchedulingError::Validation(
                    "fixed rules require at least one working day".to_string(),
                ));
            }
            if let Some(bad) = days.iter().find(|day| !(1u8..=7).contains(*day)).copied() {
                return Err(SchedulingError::Validation(format!(
                    "weekday codes run 1 (Sunday) to 7 (Saturday), got {}",
                    bad
                )));
            }
        }
        (RuleKind::Fixed, None) => {
            return Err(SchedulingError::Validation(
                "fixed rules require working days".to_string(),
            ));
        }
        (RuleKind::Special, Some(_)) => {
            return Err(SchedulingError::Validation(
                "special rules must not carry working days".to_string(),
            ));
        }
        (RuleKind::Special, None) => {}
    }

    let morning = spec
        .morning
        .as_ref()
        .map(|window| parse_window("morning", window, hhmm(6, 0), hhmm(12, 0)))
        .transpose()?;
    let afternoon = spec
        .afternoon
        .as_ref()
        .map(|window| parse_window("afternoon", window, hhmm(12, 0), hhmm(21, 0)))
        .transpose()?;

    if spec.is_closed && (morning.is_some() || afternoon.is_some()) {
        return Err(SchedulingError::Validation(
            "a closed rule must not carry shift windows".to_string(),
        ));
    }
    if !spec.is_closed && morning.is_none() && afternoon.is_none() {
        return Err(SchedulingError::Validation(
            "an open rule requires at least one shift window".to_string(),
        ));
    }

    Ok((date, morning, afternoon))
}
