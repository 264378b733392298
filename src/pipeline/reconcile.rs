//! Hour reconciliation: derive the authoritative elapsed-hours value for a
//! work item.
//!
//! The OCR-reported total is trusted first, but only inside a plausibility
//! window: misreads are typically either empty/zero or absurdly large from
//! column misalignment, while genuine shift totals stay well under 100
//! hours. Implausible or unparseable values fall back to recomputing the
//! elapsed time from the entry's from/to date-time fields. There is no
//! third fallback; if the dates cannot be parsed either, the entry is a
//! data-quality failure and the error propagates to the caller.
//!
//! `total` and `machine_hours` are treated as mutually exclusive sources,
//! `total` first. Whether machine hours should ever be summed with labor
//! hours instead is an open domain question; this module keeps them as
//! alternatives.

use crate::invoice::WorkItem;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::debug;

/// Upper bound of the plausibility window for OCR-reported hour totals.
/// Values at or above this are assumed to be misreads.
pub const MAX_PLAUSIBLE_HOURS: f64 = 100.0;

/// A work item whose hours could not be reconciled from any source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A `DD.MM.YYYY` date field did not parse.
    #[error("work item {id}: invalid {field} '{value}', expected DD.MM.YYYY")]
    InvalidDate {
        id: u32,
        field: &'static str,
        value: String,
    },

    /// An `HH:mm` time field did not parse.
    #[error("work item {id}: invalid {field} '{value}', expected HH:mm")]
    InvalidTime {
        id: u32,
        field: &'static str,
        value: String,
    },
}

/// Reconcile the elapsed hours for one work item.
///
/// 1. Parse `total` (falling back to `machine_hours` when `total` is blank)
///    as a decimal, accepting comma or period separators. A value in
///    `(0, 100)` is authoritative, even when it disagrees with the
///    from/to computation.
/// 2. Otherwise compute `(to - from)` from the date-time fields, rounded to
///    two decimal places.
pub fn reconcile_hours(item: &WorkItem) -> Result<f64, ReconcileError> {
    if let Some(hours) = plausible_ocr_hours(item) {
        debug!("Work item {} - total hours parsed directly: {}", item.id, hours);
        return Ok(hours);
    }

    let from = parse_date_time(item.id, &item.from_date, "fromDate", &item.from_period, "fromPeriod")?;
    let to = parse_date_time(item.id, &item.to_date, "toDate", &item.to_period, "toPeriod")?;

    let elapsed_hours = (to - from).num_minutes() as f64 / 60.0;
    let rounded = (elapsed_hours * 100.0).round() / 100.0;

    debug!(
        "Work item {} - hours derived from period since the OCR total is missing or implausible: \
         ocr='{}', derived={}, {} {} <--> {} {}",
        item.id, item.total, rounded, item.from_date, item.from_period, item.to_date, item.to_period
    );
    Ok(rounded)
}

/// The OCR-reported value, if it parses and falls inside the plausibility
/// window.
fn plausible_ocr_hours(item: &WorkItem) -> Option<f64> {
    let raw = if item.total.trim().is_empty() {
        item.machine_hours.trim()
    } else {
        item.total.trim()
    };

    let value: f64 = raw.replace(',', ".").parse().ok()?;
    (value > 0.0 && value < MAX_PLAUSIBLE_HOURS).then_some(value)
}

fn parse_date_time(
    id: u32,
    date: &str,
    date_field: &'static str,
    time: &str,
    time_field: &'static str,
) -> Result<NaiveDateTime, ReconcileError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%d.%m.%Y").map_err(|_| {
        ReconcileError::InvalidDate {
            id,
            field: date_field,
            value: date.to_string(),
        }
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| {
        ReconcileError::InvalidTime {
            id,
            field: time_field,
            value: time.to_string(),
        }
    })?;
    Ok(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(total: &str, machine: &str, from: (&str, &str), to: (&str, &str)) -> WorkItem {
        WorkItem {
            id: 1,
            employee: "Kari Nordmann".into(),
            department: None,
            project: None,
            activity: None,
            pay_type: None,
            extras: String::new(),
            from_date: from.0.into(),
            to_date: to.0.into(),
            from_period: from.1.into(),
            to_period: to.1.into(),
            total: total.into(),
            machine_hours: machine.into(),
            page_number: 1,
        }
    }

    #[test]
    fn plausible_ocr_value_wins_even_over_disagreeing_period() {
        // Period says 8h, OCR says 7.5; a plausible OCR value is trusted.
        let item = item("7.5", "", ("03.02.2025", "07:00"), ("03.02.2025", "15:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 7.5);
    }

    #[test]
    fn comma_separator_is_accepted() {
        let item = item("8,25", "", ("03.02.2025", "07:00"), ("03.02.2025", "15:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 8.25);
    }

    #[test]
    fn machine_hours_is_the_fallback_source() {
        let item = item("", "6,0", ("03.02.2025", "07:00"), ("03.02.2025", "15:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 6.0);
    }

    #[test]
    fn implausibly_large_value_falls_back_to_period() {
        // 800 hours is a column misread; the 8-hour shift wins.
        let item = item("800", "", ("03.02.2025", "07:00"), ("03.02.2025", "15:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 8.0);
    }

    #[test]
    fn hundred_is_already_implausible() {
        let item = item("100", "", ("03.02.2025", "07:00"), ("03.02.2025", "15:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 8.0);
    }

    #[test]
    fn zero_and_empty_fall_back_to_period() {
        let zero = item("0", "", ("03.02.2025", "22:00"), ("04.02.2025", "06:00"));
        assert_eq!(reconcile_hours(&zero).unwrap(), 8.0);

        let empty = item("", "", ("03.02.2025", "22:00"), ("04.02.2025", "06:00"));
        assert_eq!(reconcile_hours(&empty).unwrap(), 8.0);
    }

    #[test]
    fn unparseable_value_falls_back_to_period() {
        let item = item("8t", "", ("03.02.2025", "07:00"), ("03.02.2025", "14:30"));
        assert_eq!(reconcile_hours(&item).unwrap(), 7.5);
    }

    #[test]
    fn derived_hours_round_to_two_decimals() {
        // 7h40m = 7.666... -> 7.67
        let item = item("", "", ("03.02.2025", "07:00"), ("03.02.2025", "14:40"));
        assert_eq!(reconcile_hours(&item).unwrap(), 7.67);
    }

    #[test]
    fn night_shift_crosses_midnight() {
        let item = item("", "", ("28.02.2025", "23:00"), ("01.03.2025", "07:00"));
        assert_eq!(reconcile_hours(&item).unwrap(), 8.0);
    }

    #[test]
    fn bad_date_propagates_as_error() {
        let item = item("", "", ("2025-02-03", "07:00"), ("03.02.2025", "15:00"));
        let err = reconcile_hours(&item).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InvalidDate {
                id: 1,
                field: "fromDate",
                value: "2025-02-03".into()
            }
        );
    }

    #[test]
    fn bad_time_propagates_as_error() {
        let item = item("", "", ("03.02.2025", "07:00"), ("03.02.2025", "kl 15"));
        let err = reconcile_hours(&item).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTime { field: "toPeriod", .. }));
    }
}
