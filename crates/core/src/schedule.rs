//! Iteration calendar generation.
//!
//! Three named strategies produce dated windows for a team:
//!
//! * [`generate_biweekly`] -- two-week sprints that always end on a Friday.
//!   The end date is snapped forward, so successive windows can be more
//!   than 14 days apart.
//! * [`generate_monthly`] -- calendar months for two consecutive years,
//!   used by maintenance ("sustentacao") teams.
//! * [`generate_fixed_five_day_sprints`] -- one-week, Monday-to-Friday
//!   sprints advancing exactly seven days at a time.
//!
//! The two sprint generators differ in cadence and naming and are kept as
//! separate strategies. All functions are pure.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::SprintCadence;

/// Month abbreviations used for monthly iteration names.
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

/// Raw length of a biweekly sprint before Friday snapping.
const BIWEEKLY_SPAN_DAYS: u64 = 13;

/// Gap from a sprint's Friday to the next sprint's Monday.
const WEEKEND_GAP_DAYS: u64 = 3;

/// A named, dated iteration window. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationWindow {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Which generator a team's iterations come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStrategy {
    Biweekly,
    Monthly,
    WeeklyFiveDay,
}

impl ScheduleStrategy {
    /// Maintenance teams always get monthly windows; everyone else gets the
    /// requested sprint cadence.
    pub fn for_request(is_sustentacao: bool, cadence: SprintCadence) -> Self {
        if is_sustentacao {
            return Self::Monthly;
        }
        match cadence {
            SprintCadence::Biweekly => Self::Biweekly,
            SprintCadence::WeeklyFiveDay => Self::WeeklyFiveDay,
        }
    }

    /// Produce the windows for this strategy.
    ///
    /// `count` is ignored by the monthly strategy, which always yields 24
    /// windows starting with January of `start`'s year.
    pub fn windows(self, start: NaiveDate, count: u32) -> Vec<IterationWindow> {
        match self {
            Self::Biweekly => generate_biweekly(start, count),
            Self::Monthly => generate_monthly(start.year()),
            Self::WeeklyFiveDay => generate_fixed_five_day_sprints(start, count),
        }
    }
}

/// Move `date` forward to the next Monday. A Monday is returned unchanged.
pub fn next_monday(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_sunday() as u64;
    let shift = match weekday {
        0 => 1,
        1 => 0,
        wd => 8 - wd,
    };
    date + Days::new(shift)
}

/// Move `date` forward to the nearest Friday on or after it.
fn snap_to_friday(date: NaiveDate) -> NaiveDate {
    if date.weekday() == Weekday::Fri {
        return date;
    }
    let weekday = date.weekday().num_days_from_sunday() as u64;
    let shift = if weekday < 5 { 5 - weekday } else { 12 - weekday };
    date + Days::new(shift)
}

/// Biweekly sprints named `Sprint 1..=count`, Monday to Friday.
pub fn generate_biweekly(start: NaiveDate, count: u32) -> Vec<IterationWindow> {
    let mut current = next_monday(start);
    let mut windows = Vec::with_capacity(count as usize);

    for i in 1..=count {
        let end = snap_to_friday(current + Days::new(BIWEEKLY_SPAN_DAYS));
        windows.push(IterationWindow {
            name: format!("Sprint {i}"),
            start_date: current,
            end_date: end,
        });
        current = end + Days::new(WEEKEND_GAP_DAYS);
    }

    windows
}

/// Calendar-month windows for `start_year` and the following year.
pub fn generate_monthly(start_year: i32) -> Vec<IterationWindow> {
    let mut windows = Vec::with_capacity(24);

    for year in [start_year, start_year + 1] {
        for (index, abbreviation) in MONTH_ABBREVIATIONS.iter().enumerate() {
            let month = index as u32 + 1;
            let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
                continue;
            };
            let Some(last) = last_day_of_month(first) else {
                continue;
            };
            windows.push(IterationWindow {
                name: format!("{abbreviation}-{year}"),
                start_date: first,
                end_date: last,
            });
        }
    }

    windows
}

/// The day before the first of the following month.
fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Weekly five-business-day sprints named `SPRINT-001..`.
pub fn generate_fixed_five_day_sprints(start: NaiveDate, count: u32) -> Vec<IterationWindow> {
    let mut monday = next_monday(start);
    let mut windows = Vec::with_capacity(count as usize);

    for i in 1..=count {
        windows.push(IterationWindow {
            name: format!("SPRINT-{i:03}"),
            start_date: monday,
            end_date: monday + Days::new(4),
        });
        monday = monday + Days::new(7);
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -----------------------------------------------------------------------
    // Monday normalisation
    // -----------------------------------------------------------------------

    #[test]
    fn monday_is_unchanged() {
        assert_eq!(next_monday(date(2025, 1, 6)), date(2025, 1, 6));
    }

    #[test]
    fn sunday_moves_one_day() {
        assert_eq!(next_monday(date(2025, 1, 5)), date(2025, 1, 6));
    }

    #[test]
    fn midweek_moves_to_following_monday() {
        // Wednesday -> +5, Saturday -> +2
        assert_eq!(next_monday(date(2025, 1, 8)), date(2025, 1, 13));
        assert_eq!(next_monday(date(2025, 1, 11)), date(2025, 1, 13));
    }

    // -----------------------------------------------------------------------
    // Biweekly
    // -----------------------------------------------------------------------

    #[test]
    fn biweekly_example_snaps_end_to_friday() {
        let windows = generate_biweekly(date(2025, 1, 6), 2);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].name, "Sprint 1");
        assert_eq!(windows[0].start_date, date(2025, 1, 6));
        assert_eq!(windows[0].end_date, date(2025, 1, 24));
        assert_eq!(windows[1].name, "Sprint 2");
        assert_eq!(windows[1].start_date, date(2025, 1, 27));
        assert_eq!(windows[1].end_date.weekday(), Weekday::Fri);
    }

    #[test]
    fn biweekly_windows_are_monday_to_friday_and_increasing() {
        for start in [date(2024, 2, 25), date(2025, 3, 12), date(2025, 12, 27)] {
            let windows = generate_biweekly(start, 26);
            assert_eq!(windows.len(), 26);

            for w in &windows {
                assert_eq!(w.start_date.weekday(), Weekday::Mon, "{w:?}");
                assert_eq!(w.end_date.weekday(), Weekday::Fri, "{w:?}");
                assert!(w.start_date < w.end_date);
            }
            for pair in windows.windows(2) {
                assert!(pair[0].end_date < pair[1].start_date);
            }
        }
    }

    #[test]
    fn biweekly_sunday_start_begins_next_day() {
        let windows = generate_biweekly(date(2025, 3, 2), 1);
        assert_eq!(windows[0].start_date, date(2025, 3, 3));
    }

    #[test]
    fn biweekly_is_deterministic() {
        let a = generate_biweekly(date(2025, 5, 14), 10);
        let b = generate_biweekly(date(2025, 5, 14), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn biweekly_zero_count_is_empty() {
        assert!(generate_biweekly(date(2025, 1, 6), 0).is_empty());
    }

    // -----------------------------------------------------------------------
    // Monthly
    // -----------------------------------------------------------------------

    #[test]
    fn monthly_produces_two_years() {
        let windows = generate_monthly(2025);
        assert_eq!(windows.len(), 24);
        assert_eq!(windows[0].name, "JAN-2025");
        assert_eq!(windows[11].name, "DEZ-2025");
        assert_eq!(windows[12].name, "JAN-2026");
        assert_eq!(windows[23].end_date, date(2026, 12, 31));
    }

    #[test]
    fn monthly_february_respects_leap_years() {
        let leap = generate_monthly(2024);
        assert_eq!(leap[1].name, "FEV-2024");
        assert_eq!(leap[1].start_date, date(2024, 2, 1));
        assert_eq!(leap[1].end_date, date(2024, 2, 29));

        let common = generate_monthly(2023);
        assert_eq!(common[1].end_date, date(2023, 2, 28));
        // 2024 is the second year here.
        assert_eq!(common[13].end_date, date(2024, 2, 29));
    }

    #[test]
    fn monthly_windows_are_contiguous_within_a_year() {
        let windows = generate_monthly(2025);
        for year in windows.chunks(12) {
            for pair in year.windows(2) {
                assert_eq!(pair[0].end_date.succ_opt().unwrap(), pair[1].start_date);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Weekly five-day
    // -----------------------------------------------------------------------

    #[test]
    fn five_day_sprints_advance_one_week() {
        let windows = generate_fixed_five_day_sprints(date(2025, 1, 8), 3);

        assert_eq!(windows[0].name, "SPRINT-001");
        assert_eq!(windows[0].start_date, date(2025, 1, 13));
        assert_eq!(windows[0].end_date, date(2025, 1, 17));
        assert_eq!(windows[1].start_date, date(2025, 1, 20));
        assert_eq!(windows[2].name, "SPRINT-003");
    }

    #[test]
    fn five_day_sprint_names_are_zero_padded() {
        let windows = generate_fixed_five_day_sprints(date(2025, 1, 6), 12);
        assert_eq!(windows[9].name, "SPRINT-010");
    }

    // -----------------------------------------------------------------------
    // Strategy selection
    // -----------------------------------------------------------------------

    #[test]
    fn sustentacao_always_selects_monthly() {
        assert_eq!(
            ScheduleStrategy::for_request(true, SprintCadence::WeeklyFiveDay),
            ScheduleStrategy::Monthly
        );
        assert_eq!(
            ScheduleStrategy::for_request(false, SprintCadence::Biweekly),
            ScheduleStrategy::Biweekly
        );
    }

    #[test]
    fn monthly_strategy_ignores_count() {
        let windows = ScheduleStrategy::Monthly.windows(date(2025, 6, 15), 3);
        assert_eq!(windows.len(), 24);
        assert_eq!(windows[0].name, "JAN-2025");
    }
}
