//! Bikram Sambat calendar support.
//!
//! Registration dates, fiscal years and vaccination schedules in the source
//! deployments run on the Bikram Sambat (BS) calendar. Month lengths vary per
//! year and follow no closed formula, so they come from a fixed table covering
//! the operational window. All date arithmetic in the crate goes through this
//! module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid BS date: {0}")]
    InvalidDate(String),

    #[error("Unparseable BS date: {0}")]
    Parse(String),
}

pub type CalendarResult<T> = Result<T, CalendarError>;

/// First year covered by the month-length table.
const FIRST_TABLE_YEAR: i32 = 2075;

/// Days in each BS month for years 2075-2090.
const MONTH_LENGTHS: [[u32; 12]; 16] = [
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2075
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2076
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2077
    [31, 31, 31, 32, 31, 31, 30, 29, 30, 29, 30, 30], // 2078
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2079
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2080
    [31, 31, 32, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2081
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2082
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 30, 29, 31], // 2083
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2084
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2085
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2086
    [31, 31, 32, 31, 31, 31, 30, 30, 29, 30, 30, 30], // 2087
    [30, 31, 32, 32, 30, 31, 30, 30, 29, 30, 30, 30], // 2088
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2089
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2090
];

/// Days in a given BS month.
///
/// Years outside the table clamp to the nearest tabulated year, so arithmetic
/// stays total. The clamp keeps out-of-window dates approximate; see DESIGN.md
/// for the accuracy question.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    debug_assert!((1..=12).contains(&month));
    let last = FIRST_TABLE_YEAR + MONTH_LENGTHS.len() as i32 - 1;
    let clamped = year.clamp(FIRST_TABLE_YEAR, last);
    MONTH_LENGTHS[(clamped - FIRST_TABLE_YEAR) as usize][(month - 1) as usize]
}

/// A date in the Bikram Sambat calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct BsDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl BsDate {
    /// Create a validated BS date.
    pub fn new(year: i32, month: u32, day: u32) -> CalendarResult<Self> {
        if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
            return Err(CalendarError::InvalidDate(format!(
                "{:04}-{:02}-{:02}",
                year, month, day
            )));
        }
        Ok(Self { year, month, day })
    }

    /// Add a number of days, rolling months and years as needed.
    pub fn add_days(&self, days: u32) -> BsDate {
        let mut year = self.year;
        let mut month = self.month;
        let mut day = self.day + days;
        loop {
            let len = days_in_month(year, month);
            if day <= len {
                break;
            }
            day -= len;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        BsDate { year, month, day }
    }
}

impl std::fmt::Display for BsDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl std::str::FromStr for BsDate {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let parse = |p: Option<&str>| -> Result<i64, CalendarError> {
            p.ok_or_else(|| CalendarError::Parse(s.into()))?
                .parse()
                .map_err(|_| CalendarError::Parse(s.into()))
        };
        let year = parse(parts.next())? as i32;
        let month = parse(parts.next())? as u32;
        let day = parse(parts.next())? as u32;
        BsDate::new(year, month, day)
    }
}

/// Post-exposure dose days of the standard intramuscular regimen.
const REGIMEN_DOSE_DAYS: [u32; 5] = [0, 3, 7, 14, 28];

/// One dose in a vaccination schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccineDose {
    /// Days after the first dose (0, 3, 7, 14, 28)
    pub day_offset: u32,
    /// Target date for this dose
    pub due: BsDate,
    /// Whether the dose was administered
    pub given: bool,
}

/// A multi-dose vaccination schedule anchored to a start date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccinationSchedule {
    pub doses: Vec<VaccineDose>,
}

impl VaccinationSchedule {
    /// Build the five-dose post-exposure schedule from the exposure
    /// registration date.
    pub fn essen_regimen(start: BsDate) -> Self {
        let doses = REGIMEN_DOSE_DAYS
            .iter()
            .map(|&offset| VaccineDose {
                day_offset: offset,
                due: start.add_days(offset),
                given: false,
            })
            .collect();
        Self { doses }
    }

    /// Mark the dose at the given offset as administered.
    ///
    /// Returns false when no dose with that offset exists.
    pub fn mark_given(&mut self, day_offset: u32) -> bool {
        match self.doses.iter_mut().find(|d| d.day_offset == day_offset) {
            Some(dose) => {
                dose.given = true;
                true
            }
            None => false,
        }
    }

    /// The earliest dose not yet administered.
    pub fn next_due(&self) -> Option<&VaccineDose> {
        self.doses.iter().find(|d| !d.given)
    }

    /// Whether every dose has been administered.
    pub fn is_complete(&self) -> bool {
        self.doses.iter().all(|d| d.given)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_date() {
        assert!(BsDate::new(2080, 1, 31).is_ok());
        assert!(BsDate::new(2080, 13, 1).is_err());
        assert!(BsDate::new(2080, 1, 0).is_err());
        // 2080 Baishakh has 31 days
        assert!(BsDate::new(2080, 1, 32).is_err());
    }

    #[test]
    fn test_add_days_within_month() {
        let d = BsDate::new(2080, 1, 1).unwrap();
        assert_eq!(d.add_days(14), BsDate::new(2080, 1, 15).unwrap());
    }

    #[test]
    fn test_add_days_rolls_month() {
        let d = BsDate::new(2080, 1, 30).unwrap();
        // Baishakh 2080 has 31 days, so +3 lands on Jestha 2
        assert_eq!(d.add_days(3), BsDate::new(2080, 2, 2).unwrap());
    }

    #[test]
    fn test_add_days_rolls_year() {
        let d = BsDate::new(2080, 12, 29).unwrap();
        // Chaitra 2080 has 30 days
        assert_eq!(d.add_days(2), BsDate::new(2081, 1, 1).unwrap());
    }

    #[test]
    fn test_out_of_table_year_clamps() {
        // Years past the table reuse the last tabulated year's lengths
        assert_eq!(days_in_month(2095, 1), days_in_month(2090, 1));
        assert_eq!(days_in_month(2000, 5), days_in_month(2075, 5));
    }

    #[test]
    fn test_display_parse_round_trip() {
        let d = BsDate::new(2082, 4, 15).unwrap();
        let parsed: BsDate = d.to_string().parse().unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn test_essen_regimen_offsets() {
        let start = BsDate::new(2081, 1, 10).unwrap();
        let schedule = VaccinationSchedule::essen_regimen(start);

        assert_eq!(schedule.doses.len(), 5);
        assert_eq!(schedule.doses[0].due, start);
        assert_eq!(schedule.doses[1].due, BsDate::new(2081, 1, 13).unwrap());
        assert_eq!(schedule.doses[4].due, start.add_days(28));
        assert!(!schedule.is_complete());
    }

    #[test]
    fn test_schedule_crosses_month_boundary() {
        // Baishakh 2081 has 31 days; day 28 lands in Jestha
        let start = BsDate::new(2081, 1, 20).unwrap();
        let schedule = VaccinationSchedule::essen_regimen(start);
        assert_eq!(schedule.doses[4].due, BsDate::new(2081, 2, 17).unwrap());
    }

    #[test]
    fn test_mark_given_and_next_due() {
        let start = BsDate::new(2081, 1, 10).unwrap();
        let mut schedule = VaccinationSchedule::essen_regimen(start);

        assert!(schedule.mark_given(0));
        assert!(schedule.mark_given(3));
        assert!(!schedule.mark_given(5));

        let next = schedule.next_due().unwrap();
        assert_eq!(next.day_offset, 7);

        for offset in [7, 14, 28] {
            assert!(schedule.mark_given(offset));
        }
        assert!(schedule.is_complete());
        assert!(schedule.next_due().is_none());
    }

    proptest! {
        /// Adding days never produces an invalid day-of-month and is
        /// monotonic in the offset.
        #[test]
        fn add_days_stays_valid(start_day in 1u32..=29, offset in 0u32..400) {
            let d = BsDate::new(2080, 1, start_day).unwrap();
            let later = d.add_days(offset);
            prop_assert!(later.month >= 1 && later.month <= 12);
            prop_assert!(later.day >= 1);
            prop_assert!(later.day <= days_in_month(later.year, later.month));
            prop_assert!(later >= d);
        }
    }
}
