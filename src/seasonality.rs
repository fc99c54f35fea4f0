use crate::error::Result;
use crate::utils::{validate_busy_factor, validate_busy_month};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

/// Busy-month multiplier applied to baseline forecasts.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalCalendar {
    busy_months: BTreeSet<u32>,
    busy_factor: f64,
}

impl SeasonalCalendar {
    pub fn new(busy_months: BTreeSet<u32>, busy_factor: f64) -> Result<Self> {
        for month in &busy_months {
            validate_busy_month(*month)?;
        }
        validate_busy_factor(busy_factor)?;

        Ok(Self {
            busy_months,
            busy_factor,
        })
    }

    /// No busy months; every factor is 1.0.
    pub fn flat() -> Self {
        Self {
            busy_months: BTreeSet::new(),
            busy_factor: 1.0,
        }
    }

    pub fn is_busy_month(&self, month: u32) -> bool {
        self.busy_months.contains(&month)
    }

    pub fn factor_for_month(&self, month: u32) -> f64 {
        if self.is_busy_month(month) {
            self.busy_factor
        } else {
            1.0
        }
    }

    pub fn factor_for(&self, date: NaiveDate) -> f64 {
        self.factor_for_month(date.month())
    }
}
