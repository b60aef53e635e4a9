//! # Compliance Window
//!
//! Acknowledgments expire: one older than the re-acknowledgment period no
//! longer counts. A dashboard request may narrow the window further with a
//! start and end date, but can never widen it past the cutoff.

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Inclusive date range an acknowledgment must fall in to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplianceWindow {
    /// First counted day.
    pub start: NaiveDate,
    /// Last counted day, unbounded when `None`.
    pub end: Option<NaiveDate>,
}

/// Parse a `YYYY-MM-DD` query value, ignoring blanks and garbage.
pub fn parse_date_param(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Longest honored re-acknowledgment period, in days (about a century).
pub const MAX_REACK_DAYS: u32 = 36_500;

/// First day on which an acknowledgment still counts.
///
/// `reack_days` is clamped to [`MAX_REACK_DAYS`] so the cutoff is always a
/// positive-year date SQLite can compare.
pub fn reack_cutoff(today: NaiveDate, reack_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(reack_days.min(MAX_REACK_DAYS))))
        .unwrap_or(today)
}

impl ComplianceWindow {
    /// Build the window for `today`.
    ///
    /// `start = max(reack_cutoff, start_date)`; `end = end_date`.
    /// Unparseable dates are ignored rather than rejected.
    pub fn resolve(
        today: NaiveDate,
        reack_days: u32,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Self {
        let cutoff = reack_cutoff(today, reack_days);
        let start = match parse_date_param(start_date) {
            Some(requested) if requested > cutoff => requested,
            _ => cutoff,
        };
        Self {
            start,
            end: parse_date_param(end_date),
        }
    }

    /// Whether `day` falls inside the window.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && self.end.map_or(true, |end| day <= end)
    }

    /// `start` as a SQL date literal.
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `end` as a SQL date literal, if bounded.
    pub fn end_param(&self) -> Option<String> {
        self.end.map(|d| d.format("%Y-%m-%d").to_string())
    }
}
