use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::civil;
use crate::models::{FreeRange, SchedulingError, ShiftWindow};
use crate::ports::AppointmentStore;
use crate::services::schedule::ScheduleService;

/// Half-open `[start, end)` interval in minutes since local midnight.
pub type MinuteRange = (i64, i64);

/// Merge booked intervals into maximal disjoint busy blocks. Malformed
/// intervals (`end <= start`) are discarded; overlapping and adjacent
/// blocks coalesce.
pub fn merge_busy(mut intervals: Vec<MinuteRange>) -> Vec<MinuteRange> {
    intervals.retain(|(start, end)| end > start);
    intervals.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<MinuteRange> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, current_end)) if start <= *current_end => {
                *current_end = (*current_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    merged
}

/// Subtract merged busy blocks from one shift window, yielding the free
/// sub-ranges in order. `merged` must be sorted and disjoint, as
/// produced by [`merge_busy`].
pub fn subtract_from_shift(shift: MinuteRange, merged: &[MinuteRange]) -> Vec<MinuteRange> {
    let (shift_start, shift_end) = shift;
    let mut free = Vec::new();
    let mut cursor = shift_start;

    for &(block_start, block_end) in merged {
        // Clip the block to the shift.
        let clipped_start = block_start.max(shift_start);
        let clipped_end = block_end.min(shift_end);
        if clipped_end <= clipped_start {
            continue;
        }

        if clipped_start > cursor {
            free.push((cursor, clipped_start));
        }
        cursor = cursor.max(clipped_end);
    }

    if cursor < shift_end {
        free.push((cursor, shift_end));
    }

    free
}

fn window_minutes(window: ShiftWindow) -> MinuteRange {
    (
        civil::minute_of_day(window.start),
        civil::minute_of_day(window.end),
    )
}

/// Computes bookable free ranges for a dentist's day from the resolved
/// schedule and the existing non-rejected bookings.
pub struct FreeSlotService {
    schedule: Arc<ScheduleService>,
    appointments: Arc<dyn AppointmentStore>,
}

impl FreeSlotService {
    pub fn new(schedule: Arc<ScheduleService>, appointments: Arc<dyn AppointmentStore>) -> Self {
        Self {
            schedule,
            appointments,
        }
    }

    /// Free ranges within the dentist's shifts on `date`, morning first,
    /// rendered as clinic wall-clock bounds. Zero-availability schedules
    /// yield an empty list.
    pub async fn free_ranges(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<FreeRange>, SchedulingError> {
        let resolved = self.schedule.resolve(dentist_id, date).await?;
        if !resolved.has_availability() {
            debug!("No availability for dentist {} on {}", dentist_id, date);
            return Ok(vec![]);
        }
        let (morning, afternoon) = resolved.windows();

        let booked = self
            .appointments
            .active_for_date(dentist_id, civil::midnight_instant(date))
            .await?;

        let busy: Vec<MinuteRange> = booked
            .iter()
            .map(|appointment| {
                (
                    civil::minute_of_day(civil::local_time(appointment.start_time)),
                    civil::minute_of_day(civil::local_time(appointment.end_time)),
                )
            })
            .collect();
        let merged = merge_busy(busy);

        let mut ranges = Vec::new();
        for window in [morning, afternoon].into_iter().flatten() {
            for (start, end) in subtract_from_shift(window_minutes(window), &merged) {
                ranges.push(FreeRange {
                    start: civil::format_hhmm(civil::time_from_minute(start)),
                    end: civil::format_hhmm(civil::time_from_minute(end)),
                });
            }
        }

        debug!(
            "Computed {} free ranges for dentist {} on {}",
            ranges.len(),
            dentist_id,
            date
        );
        Ok(ranges)
    }
}
