//! Date-range parsing.
//!
//! A range spec is one of (letters case-insensitive):
//!
//! - `<N>d` — the trailing N days, ending now
//! - `YYYY` — a full calendar year in UTC
//! - `Q{1..4}-YYYY` — a calendar quarter in UTC
//! - `YYYY-MM-DD:YYYY-MM-DD` — an inclusive custom window
//!
//! Parsing emits a canonical label (`90d`, `2025`, `Q1-2025`,
//! `2025-01-01:2025-03-31`) which is the primary key component of snapshots.
//! Round-tripping a canonical label through [`DateRange::parse`] with the
//! same reference instant yields an equal range.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RangeError, RangeResult};

/// A concrete `[start, end]` collection window with its canonical label.
///
/// Immutable once parsed. The label never changes, even when the window is
/// shifted for an environment offset — the label keys the snapshot, the
/// shifted bounds drive the upstream queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    label: String,
}

impl DateRange {
    /// Parse a range spec against a reference instant.
    ///
    /// `now` anchors the `<N>d` form and is injected so parsing stays
    /// deterministic under test.
    pub fn parse(spec: &str, now: DateTime<Utc>) -> RangeResult<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(invalid(spec, "empty spec"));
        }

        if let Some(days) = trimmed.strip_suffix(['d', 'D']) {
            return Self::parse_trailing_days(spec, days, now);
        }

        if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Self::parse_year(spec, trimmed);
        }

        if trimmed.starts_with(['q', 'Q']) {
            return Self::parse_quarter(spec, trimmed);
        }

        if trimmed.contains(':') {
            return Self::parse_custom(spec, trimmed);
        }

        Err(invalid(spec, "unrecognized form"))
    }

    fn parse_trailing_days(spec: &str, days: &str, now: DateTime<Utc>) -> RangeResult<Self> {
        let n: i64 = days
            .parse()
            .map_err(|_| invalid(spec, "day count is not a number"))?;
        if n <= 0 {
            return Err(invalid(spec, "day count must be positive"));
        }
        Ok(Self {
            start: now - Duration::days(n),
            end: now,
            label: format!("{n}d"),
        })
    }

    fn parse_year(spec: &str, year: &str) -> RangeResult<Self> {
        let y: i32 = year.parse().map_err(|_| invalid(spec, "bad year"))?;
        let start = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(|| invalid(spec, "bad year"))?;
        let end = NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(|| invalid(spec, "bad year"))?;
        Ok(Self {
            start: day_start(start),
            end: day_end(end),
            label: format!("{y}"),
        })
    }

    fn parse_quarter(spec: &str, trimmed: &str) -> RangeResult<Self> {
        let body = &trimmed[1..];
        let (q, y) = body
            .split_once('-')
            .ok_or_else(|| invalid(spec, "expected Q<N>-<YYYY>"))?;
        let quarter: u32 = q.parse().map_err(|_| invalid(spec, "bad quarter"))?;
        if !(1..=4).contains(&quarter) {
            return Err(invalid(spec, "quarter must be 1-4"));
        }
        let year: i32 = y.parse().map_err(|_| invalid(spec, "bad year"))?;
        let first_month = (quarter - 1) * 3 + 1;
        let start = NaiveDate::from_ymd_opt(year, first_month, 1)
            .ok_or_else(|| invalid(spec, "bad quarter start"))?;
        let end = last_day_of_month(year, first_month + 2)
            .ok_or_else(|| invalid(spec, "bad quarter end"))?;
        Ok(Self {
            start: day_start(start),
            end: day_end(end),
            label: format!("Q{quarter}-{year}"),
        })
    }

    fn parse_custom(spec: &str, trimmed: &str) -> RangeResult<Self> {
        let (a, b) = trimmed
            .split_once(':')
            .ok_or_else(|| invalid(spec, "expected start:end"))?;
        let start = NaiveDate::parse_from_str(a, "%Y-%m-%d")
            .map_err(|e| invalid(spec, &format!("bad start date: {e}")))?;
        let end = NaiveDate::parse_from_str(b, "%Y-%m-%d")
            .map_err(|e| invalid(spec, &format!("bad end date: {e}")))?;
        if start > end {
            return Err(invalid(spec, "start is after end"));
        }
        Ok(Self {
            start: day_start(start),
            end: day_end(end),
            label: format!("{}:{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
        })
    }

    /// Inclusive window start.
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive window end.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Canonical label, the snapshot key component.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Window length in whole days.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }

    /// Window length in weeks (fractional).
    pub fn weeks(&self) -> f64 {
        self.days() as f64 / 7.0
    }

    /// Whether an instant falls inside the window (inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// The effective window for an environment with `time_offset_days = k`:
    /// both ends move back by `k` days. The label is unchanged — offsets
    /// affect what gets queried, not how the snapshot is keyed.
    pub fn shifted(&self, offset_days: i64) -> Self {
        Self {
            start: self.start - Duration::days(offset_days),
            end: self.end - Duration::days(offset_days),
            label: self.label.clone(),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn invalid(spec: &str, reason: &str) -> RangeError {
    RangeError::Invalid {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"))
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).expect("end of day exists"))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}
