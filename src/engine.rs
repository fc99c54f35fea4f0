use crate::baseline::WeekdayBaseline;
use crate::calendar::UsageHistory;
use crate::error::Result;
use crate::schema::ForecastHorizon;
use crate::seasonality::SeasonalCalendar;
use crate::utils::weekday_index;
use chrono::{Datelike, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueOrigin {
    /// Taken from the usage log for that date
    Observed,
    /// Weekday baseline times the seasonal factor
    Modelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricForecast {
    pub value: f64,
    pub origin: ValueOrigin,
    /// Unadjusted weekday mean; `None` when the weekday was never observed
    pub baseline: Option<f64>,
}

/// One forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub weekday: u32,
    pub month: u32,
    pub seasonal_factor: f64,
    /// In configured metric order
    pub metrics: Vec<MetricForecast>,
}

impl ForecastRecord {
    pub fn value(&self, metric_idx: usize) -> f64 {
        self.metrics.get(metric_idx).map(|m| m.value).unwrap_or(0.0)
    }
}

pub struct Forecaster<'a> {
    baseline: &'a WeekdayBaseline,
    history: &'a UsageHistory,
    seasons: &'a SeasonalCalendar,
}

impl<'a> Forecaster<'a> {
    pub fn new(
        baseline: &'a WeekdayBaseline,
        history: &'a UsageHistory,
        seasons: &'a SeasonalCalendar,
    ) -> Self {
        Self {
            baseline,
            history,
            seasons,
        }
    }

    /// Forecasts a single day. Observed values win over the model; the
    /// seasonal factor only scales modelled values.
    pub fn forecast_day(&self, date: NaiveDate) -> ForecastRecord {
        let weekday = weekday_index(date);
        let seasonal_factor = self.seasons.factor_for(date);

        let metrics = (0..self.history.metrics().len())
            .map(|idx| {
                let baseline = self.baseline.mean(weekday, idx);
                match self.history.observed(date, idx) {
                    Some(observed) => MetricForecast {
                        value: observed,
                        origin: ValueOrigin::Observed,
                        baseline,
                    },
                    None => MetricForecast {
                        value: baseline.unwrap_or(0.0) * seasonal_factor,
                        origin: ValueOrigin::Modelled,
                        baseline,
                    },
                }
            })
            .collect();

        ForecastRecord {
            date,
            weekday,
            month: date.month(),
            seasonal_factor,
            metrics,
        }
    }

    pub fn forecast_dates(&self, dates: &[NaiveDate]) -> Vec<ForecastRecord> {
        dates.iter().map(|date| self.forecast_day(*date)).collect()
    }

    /// Forecasts every day of the horizon, either a rolling run of days or a
    /// contract period.
    pub fn forecast(&self, horizon: &ForecastHorizon) -> Result<Vec<ForecastRecord>> {
        horizon.validate()?;
        let dates = horizon.dates();
        let records = self.forecast_dates(&dates);

        let observed_days = records
            .iter()
            .filter(|r| r.metrics.iter().any(|m| m.origin == ValueOrigin::Observed))
            .count();
        info!(
            "Forecast {} days from {} to {} ({} days backed by observed values)",
            records.len(),
            horizon.start(),
            horizon.end()?,
            observed_days
        );

        Ok(records)
    }
}
