mod support;

use assert_matches::assert_matches;
use uuid::Uuid;

use scheduling_cell::models::{
    ResolvedSchedule, RuleKind, SchedulingError, WorkingRuleSpec,
};

use support::*;

const WEEKDAYS: &[u8] = &[2, 3, 4, 5, 6];

fn fixed_spec(
    working_days: &[u8],
    morning: Option<(&str, &str)>,
    afternoon: Option<(&str, &str)>,
) -> WorkingRuleSpec {
    WorkingRuleSpec {
        kind: RuleKind::Fixed,
        working_days: Some(working_days.iter().copied().collect()),
        date: None,
        is_closed: false,
        morning: morning.map(|(s, e)| window(s, e)),
        afternoon: afternoon.map(|(s, e)| window(s, e)),
    }
}

// ==============================================================================
// RESOLUTION
// ==============================================================================

#[tokio::test]
async fn fixed_rule_applies_on_working_days_only() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), Some(("13:00", "17:00")))
        .await;

    let monday = harness.schedule.resolve(dentist, ymd("2025-06-09")).await.unwrap();
    match monday {
        ResolvedSchedule::Working { morning, afternoon } => {
            assert!(morning.is_some());
            assert!(afternoon.is_some());
        }
        other => panic!("expected a working schedule, got {:?}", other),
    }

    let sunday = harness.schedule.resolve(dentist, ymd("2025-06-08")).await.unwrap();
    assert_eq!(sunday, ResolvedSchedule::DayOff);
}

#[tokio::test]
async fn unknown_dentist_resolves_to_not_scheduled() {
    let harness = TestHarness::new();
    let resolved = harness
        .schedule
        .resolve(Uuid::new_v4(), ymd("2025-06-09"))
        .await
        .unwrap();
    assert_eq!(resolved, ResolvedSchedule::NotScheduled);
    assert!(!resolved.has_availability());
}

#[tokio::test]
async fn scenario_c_special_closure_overrides_fixed_thursday() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    // Thursdays are normally working days.
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), None)
        .await;
    harness
        .add_special_rule(dentist, "2025-12-25", true, None, None)
        .await;

    let resolved = harness
        .schedule
        .resolve(dentist, ymd("2025-12-25"))
        .await
        .unwrap();
    assert_eq!(resolved, ResolvedSchedule::ClosedDate);

    let free = harness
        .slots
        .free_ranges(dentist, ymd("2025-12-25"))
        .await
        .unwrap();
    assert!(free.is_empty());
}

#[tokio::test]
async fn special_working_rule_overrides_a_weekly_day_off() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), None)
        .await;
    // Sunday 2025-06-15 is off by weekday, but a special rule opens an
    // afternoon shift; special wins regardless of the weekday set.
    harness
        .add_special_rule(dentist, "2025-06-15", false, None, Some(("13:00", "16:00")))
        .await;

    let resolved = harness
        .schedule
        .resolve(dentist, ymd("2025-06-15"))
        .await
        .unwrap();
    match resolved {
        ResolvedSchedule::Working { morning, afternoon } => {
            assert!(morning.is_none());
            assert!(afternoon.is_some());
        }
        other => panic!("special rule should open the day, got {:?}", other),
    }
}

#[tokio::test]
async fn resolution_is_pure_given_unchanged_rules() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), None)
        .await;

    let first = harness.schedule.resolve(dentist, ymd("2025-06-09")).await.unwrap();
    let second = harness.schedule.resolve(dentist, ymd("2025-06-09")).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn upserting_replaces_the_previous_rule() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), None)
        .await;
    // Second upsert narrows the week; there must still be exactly one
    // fixed rule.
    harness
        .add_fixed_rule(dentist, &[2, 3], Some(("09:00", "11:00")), None)
        .await;

    let rules = harness.schedule.rules(dentist).await.unwrap();
    assert_eq!(rules.len(), 1);

    let wednesday = harness.schedule.resolve(dentist, ymd("2025-06-11")).await.unwrap();
    assert_eq!(wednesday, ResolvedSchedule::DayOff);
}

// ==============================================================================
// VALIDATION
// ==============================================================================

#[tokio::test]
async fn closed_rules_must_not_carry_windows() {
    let harness = TestHarness::new();
    let spec = WorkingRuleSpec {
        kind: RuleKind::Special,
        working_days: None,
        date: Some("2025-12-25".to_string()),
        is_closed: true,
        morning: Some(window("08:00", "12:00")),
        afternoon: None,
    };
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), spec).await,
        Err(SchedulingError::Validation(_))
    );
}

#[tokio::test]
async fn open_rules_require_at_least_one_window() {
    let harness = TestHarness::new();
    let spec = WorkingRuleSpec {
        kind: RuleKind::Fixed,
        working_days: Some([2, 3].into_iter().collect()),
        date: None,
        is_closed: false,
        morning: None,
        afternoon: None,
    };
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), spec).await,
        Err(SchedulingError::Validation(_))
    );
}

#[tokio::test]
async fn shift_windows_must_respect_their_bounds() {
    let harness = TestHarness::new();

    // Morning must start no earlier than 06:00.
    let early = fixed_spec(WEEKDAYS, Some(("05:30", "11:00")), None);
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), early).await,
        Err(SchedulingError::Validation(_))
    );

    // Afternoon must end by 21:00.
    let late = fixed_spec(WEEKDAYS, None, Some(("13:00", "21:30")));
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), late).await,
        Err(SchedulingError::Validation(_))
    );

    // Start must precede end.
    let inverted = fixed_spec(WEEKDAYS, Some(("11:00", "09:00")), None);
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), inverted).await,
        Err(SchedulingError::Validation(_))
    );

    // Exactly on the bounds is allowed.
    let exact = fixed_spec(WEEKDAYS, Some(("06:00", "12:00")), Some(("12:00", "21:00")));
    assert!(harness.schedule.upsert_working_rule(Uuid::new_v4(), exact).await.is_ok());
}

#[tokio::test]
async fn weekday_codes_and_rule_shape_are_validated() {
    let harness = TestHarness::new();

    let bad_code = fixed_spec(&[0, 2], Some(("08:00", "12:00")), None);
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), bad_code).await,
        Err(SchedulingError::Validation(_))
    );

    let empty_days = fixed_spec(&[], Some(("08:00", "12:00")), None);
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), empty_days).await,
        Err(SchedulingError::Validation(_))
    );

    // A fixed rule must not carry a date.
    let dated_fixed = WorkingRuleSpec {
        date: Some("2025-06-09".to_string()),
        ..fixed_spec(WEEKDAYS, Some(("08:00", "12:00")), None)
    };
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), dated_fixed).await,
        Err(SchedulingError::Validation(_))
    );

    // A special rule requires one.
    let undated_special = WorkingRuleSpec {
        kind: RuleKind::Special,
        working_days: None,
        date: None,
        is_closed: true,
        morning: None,
        afternoon: None,
    };
    assert_matches!(
        harness.schedule.upsert_working_rule(Uuid::new_v4(), undated_special).await,
        Err(SchedulingError::Validation(_))
    );
}

// ==============================================================================
// DAYS OFF
// ==============================================================================

#[tokio::test]
async fn days_off_combines_weekly_pattern_and_closures() {
    let harness = TestHarness::new();
    let dentist = Uuid::new_v4();
    harness
        .add_fixed_rule(dentist, WEEKDAYS, Some(("08:00", "12:00")), None)
        .await;
    harness
        .add_special_rule(dentist, "2025-12-25", true, None, None)
        .await;
    harness
        .add_special_rule(dentist, "2025-06-16", true, None, None)
        .await;
    // An open special rule is not a closure.
    harness
        .add_special_rule(dentist, "2025-06-15", false, None, Some(("13:00", "16:00")))
        .await;

    let days_off = harness.schedule.days_off(dentist).await.unwrap();
    assert_eq!(days_off.weekly_off_days, [1, 7].into_iter().collect());
    assert_eq!(
        days_off.explicit_closed_dates,
        vec![ymd("2025-06-16"), ymd("2025-12-25")]
    );
}

#[tokio::test]
async fn days_off_without_a_fixed_rule_is_the_whole_week() {
    let harness = TestHarness::new();
    let days_off = harness.schedule.days_off(Uuid::new_v4()).await.unwrap();
    assert_eq!(days_off.weekly_off_days.len(), 7);
    assert!(days_off.explicit_closed_dates.is_empty());
}
