//! Phase durations and calendar dates for the template plan.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Phase;
use crate::timeline;

/// Plan length used when no usable timeline was given
pub const DEFAULT_TOTAL_WEEKS: u32 = 12;

/// Weeks per month when converting a preferred timeline
const WEEKS_PER_MONTH: u32 = 4;

/// Total plan length in weeks for a free-form duration string
pub fn total_weeks(estimated_duration: &str) -> u32 {
    if estimated_duration.trim().is_empty() {
        return DEFAULT_TOTAL_WEEKS;
    }
    timeline::months_in(estimated_duration)
        .map(|months| months.saturating_mul(WEEKS_PER_MONTH))
        .unwrap_or(DEFAULT_TOTAL_WEEKS)
}

/// Weeks allotted to a phase.
///
/// Each phase gets a rounded share of the total with a floor, so the phases
/// do not necessarily add up to `total_weeks`.
pub fn phase_weeks(phase: Phase, total_weeks: u32) -> u32 {
    let (share, floor) = match phase {
        Phase::InitialSetup => (0.2, 2),
        Phase::Development => (0.4, 4),
        Phase::Testing => (0.25, 2),
        Phase::Deployment => (0.15, 1),
    };
    let rounded = (total_weeks as f64 * share).round() as u32;
    rounded.max(floor)
}

/// One phase placed on the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseWindow {
    pub phase: Phase,
    pub weeks: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The four phases laid end to end from a start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Requested length; the phases themselves may cover more or less
    pub total_weeks: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub phases: Vec<PhaseWindow>,
}

impl Schedule {
    /// Lays out the phases sequentially starting at `start`
    pub fn build(estimated_duration: &str, start: DateTime<Utc>) -> Self {
        let total = total_weeks(estimated_duration);
        let mut cursor = start;
        let phases = Phase::ALL
            .iter()
            .map(|&phase| {
                let weeks = phase_weeks(phase, total);
                let end = add_weeks(cursor, weeks);
                let window = PhaseWindow {
                    phase,
                    weeks,
                    start: cursor,
                    end,
                };
                cursor = end;
                window
            })
            .collect();

        Self {
            total_weeks: total,
            start,
            end: cursor,
            phases,
        }
    }

    /// Sum of the phase lengths, saturating at `u32::MAX`
    pub fn scheduled_weeks(&self) -> u32 {
        self.phases
            .iter()
            .fold(0u32, |total, p| total.saturating_add(p.weeks))
    }
}

/// Adds weeks, saturating at the latest representable date
fn add_weeks(from: DateTime<Utc>, weeks: u32) -> DateTime<Utc> {
    Duration::try_weeks(weeks as i64)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_total_weeks() {
        assert_eq!(total_weeks("6 months"), 24);
        assert_eq!(total_weeks("3 mo"), 12);
        assert_eq!(total_weeks(""), DEFAULT_TOTAL_WEEKS);
        assert_eq!(total_weeks("asap"), DEFAULT_TOTAL_WEEKS);
        assert_eq!(total_weeks("0 months"), 0);
    }

    #[test]
    fn test_oversized_timeline_saturates() {
        assert_eq!(total_weeks("5000000000 months"), u32::MAX);

        let schedule = Schedule::build("5000000000 months", fixed_now());
        assert_eq!(schedule.total_weeks, u32::MAX);
        assert_eq!(schedule.scheduled_weeks(), u32::MAX);
        assert_eq!(schedule.end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_phase_weeks_default_total() {
        // 12 weeks: 2.4 -> 2, 4.8 -> 5, 3.0 -> 3, 1.8 -> 2
        assert_eq!(phase_weeks(Phase::InitialSetup, 12), 2);
        assert_eq!(phase_weeks(Phase::Development, 12), 5);
        assert_eq!(phase_weeks(Phase::Testing, 12), 3);
        assert_eq!(phase_weeks(Phase::Deployment, 12), 2);
    }

    #[test]
    fn test_phase_weeks_floors() {
        assert_eq!(phase_weeks(Phase::InitialSetup, 4), 2);
        assert_eq!(phase_weeks(Phase::Development, 4), 4);
        assert_eq!(phase_weeks(Phase::Testing, 0), 2);
        assert_eq!(phase_weeks(Phase::Deployment, 0), 1);
    }

    #[test]
    fn test_phase_allocation_is_not_normalized() {
        // Known drift: 12 requested weeks become 12 scheduled only by luck,
        // 4 requested weeks become 9 because of the floors.
        let short = Schedule::build("1 month", fixed_now());
        assert_eq!(short.total_weeks, 4);
        assert_eq!(short.scheduled_weeks(), 9);

        let long = Schedule::build("6 months", fixed_now());
        assert_eq!(long.total_weeks, 24);
        // 4.8 -> 5, 9.6 -> 10, 6, 3.6 -> 4
        assert_eq!(long.scheduled_weeks(), 25);
    }

    #[test]
    fn test_phases_are_sequential() {
        let schedule = Schedule::build("3 months", fixed_now());
        assert_eq!(schedule.phases.len(), 4);
        assert_eq!(schedule.phases[0].start, fixed_now());
        for pair in schedule.phases.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(schedule.end, schedule.phases[3].end);
        assert_eq!(
            schedule.end - schedule.start,
            Duration::weeks(schedule.scheduled_weeks() as i64)
        );
    }

    #[test]
    fn test_schedule_is_reproducible() {
        assert_eq!(
            Schedule::build("6 months", fixed_now()),
            Schedule::build("6 months", fixed_now())
        );
    }

    #[test]
    fn test_huge_timeline_saturates() {
        let schedule = Schedule::build("4000000000 months", fixed_now());
        assert_eq!(schedule.end, DateTime::<Utc>::MAX_UTC);
    }
}
