use crate::error::{Result, UsageForecastError};
use chrono::{Datelike, Days, NaiveDate};

/// Every date from `start` to `end`, both inclusive, in daily steps.
/// Returns an empty vector when `end` precedes `start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Returns `day_count` consecutive dates beginning at `start`.
pub fn date_run(start: NaiveDate, day_count: u32) -> Vec<NaiveDate> {
    start.iter_days().take(day_count as usize).collect()
}

/// Last date of a run of `day_count` days starting at `start`.
pub fn run_end(start: NaiveDate, day_count: u32) -> Option<NaiveDate> {
    let offset = u64::from(day_count.checked_sub(1)?);
    start.checked_add_days(Days::new(offset))
}

/// Whole days between two dates, `end - start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// 0 = Monday .. 6 = Sunday
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

pub fn weekday_name(index: u32) -> &'static str {
    match index {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        6 => "Sun",
        _ => "?",
    }
}

pub fn validate_contract_days(days: i64) -> Result<u32> {
    if days <= 0 {
        return Err(UsageForecastError::InvalidContractDays(days));
    }
    u32::try_from(days).map_err(|_| UsageForecastError::InvalidContractDays(days))
}

pub fn validate_busy_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(UsageForecastError::InvalidBusyMonth(month));
    }
    Ok(())
}

pub fn validate_busy_factor(factor: f64) -> Result<()> {
    if !factor.is_finite() || factor < 1.0 {
        return Err(UsageForecastError::InvalidBusyFactor(factor));
    }
    Ok(())
}

pub fn validate_annual_volume(metric: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(UsageForecastError::InvalidVolume {
            metric: metric.to_string(),
            value,
        });
    }
    Ok(())
}

/// Parses a numeric cell. Thousands separators are ignored; empty, non-numeric
/// and non-finite cells are treated as missing.
pub fn parse_count(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
