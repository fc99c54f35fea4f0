use crate::error::{Result, UsageForecastError};
use crate::utils::{
    date_range, date_run, days_between, run_end, validate_annual_volume, validate_busy_factor,
    validate_busy_month, validate_contract_days,
};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_PROFILE_COLUMN: &str = "Profile";
pub const DEFAULT_PROFILE_LABEL: &str = "Grand Total";
pub const DEFAULT_DATE_COLUMN: &str = "Date";
pub const DEFAULT_CHANNEL_COLUMN: &str = "Omnichannel Events";
pub const DEFAULT_BUSY_FACTOR: f64 = 1.2;
pub const MAX_ROLLING_DAYS: u32 = 365;
/// Five years, leap days included.
pub const MAX_CONTRACT_DAYS: i64 = 1827;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MetricQuota {
    #[schemars(description = "Header of the numeric column to forecast (e.g. 'Visits', 'All Inbound Events')")]
    pub column: String,

    #[schemars(description = "Contracted volume for the whole contract period. Pro-rated into a flat daily entitlement.")]
    pub annual_volume: f64,
}

impl MetricQuota {
    pub fn new(column: impl Into<String>, annual_volume: f64) -> Self {
        Self {
            column: column.into(),
            annual_volume,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastHorizon {
    #[schemars(description = "Rolling forecast of `days` consecutive days beginning at `start` (1 to 365 days).")]
    Rolling { start: NaiveDate, days: u32 },

    #[schemars(description = "Fixed contract period from `start` to `end`, both inclusive, at most five years long. Quota is pro-rated over (end - start) days.")]
    Contract { start: NaiveDate, end: NaiveDate },
}

impl ForecastHorizon {
    pub fn validate(&self) -> Result<()> {
        match self {
            ForecastHorizon::Rolling { days, .. } => {
                if !(1..=MAX_ROLLING_DAYS).contains(days) {
                    return Err(UsageForecastError::InvalidHorizon(format!(
                        "rolling horizon must cover 1 to {} days, got {}",
                        MAX_ROLLING_DAYS, days
                    )));
                }
            }
            ForecastHorizon::Contract { start, end } => {
                if end < start {
                    return Err(UsageForecastError::InvalidHorizon(format!(
                        "contract end {} is before contract start {}",
                        end, start
                    )));
                }
                let length = days_between(*start, *end);
                if length > MAX_CONTRACT_DAYS {
                    return Err(UsageForecastError::InvalidHorizon(format!(
                        "contract period must be at most {} days, got {}",
                        MAX_CONTRACT_DAYS, length
                    )));
                }
            }
        }
        self.contract_days().map(|_| ())
    }

    pub fn start(&self) -> NaiveDate {
        match self {
            ForecastHorizon::Rolling { start, .. } | ForecastHorizon::Contract { start, .. } => {
                *start
            }
        }
    }

    pub fn end(&self) -> Result<NaiveDate> {
        match self {
            ForecastHorizon::Rolling { start, days } => run_end(*start, *days).ok_or_else(|| {
                UsageForecastError::InvalidHorizon(format!(
                    "rolling horizon of {} days from {} has no end date",
                    days, start
                ))
            }),
            ForecastHorizon::Contract { end, .. } => Ok(*end),
        }
    }

    /// Every day covered by the horizon, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self {
            ForecastHorizon::Rolling { start, days } => date_run(*start, *days),
            ForecastHorizon::Contract { start, end } => date_range(*start, *end),
        }
    }

    /// Number of days the annual volumes are spread over.
    pub fn contract_days(&self) -> Result<u32> {
        match self {
            ForecastHorizon::Rolling { days, .. } => validate_contract_days(i64::from(*days)),
            ForecastHorizon::Contract { start, end } => {
                validate_contract_days(days_between(*start, *end))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ForecastConfig {
    #[schemars(description = "Column holding the segment label of each row")]
    pub profile_column: String,

    #[schemars(description = "Only rows whose profile column equals this label exactly are used")]
    pub profile_label: String,

    #[schemars(description = "Column holding the calendar date of each row")]
    pub date_column: String,

    #[schemars(description = "Channel placeholder column. Copied from history when present, 0 on forecast rows.")]
    pub channel_column: String,

    #[schemars(description = "Metrics to forecast with their contracted volumes. The first entry is the primary metric.")]
    pub metrics: Vec<MetricQuota>,

    #[schemars(description = "Calendar months (1-12) in which the busy factor applies to the baseline forecast")]
    pub busy_months: BTreeSet<u32>,

    #[schemars(description = "Multiplier for busy months, at least 1.0 (the usual range is 1.0 to 2.0)")]
    pub busy_factor: f64,

    #[schemars(description = "Forecast horizon. When absent, the contract spans the first to the last historical date.")]
    pub horizon: Option<ForecastHorizon>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            profile_column: DEFAULT_PROFILE_COLUMN.to_string(),
            profile_label: DEFAULT_PROFILE_LABEL.to_string(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            channel_column: DEFAULT_CHANNEL_COLUMN.to_string(),
            metrics: vec![
                MetricQuota::new("Visits", 10_000_000.0),
                MetricQuota::new("All Inbound Events", 25_000_000.0),
            ],
            busy_months: [3, 4, 9, 10, 12].into_iter().collect(),
            busy_factor: DEFAULT_BUSY_FACTOR,
            horizon: None,
        }
    }
}

impl ForecastConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_horizon(mut self, horizon: ForecastHorizon) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn metric_columns(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.column.clone()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(UsageForecastError::NoMetrics);
        }
        for metric in &self.metrics {
            validate_annual_volume(&metric.column, metric.annual_volume)?;
        }
        for month in &self.busy_months {
            validate_busy_month(*month)?;
        }
        validate_busy_factor(self.busy_factor)?;
        if let Some(horizon) = &self.horizon {
            horizon.validate()?;
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ForecastConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
