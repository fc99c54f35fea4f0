//! # Usage Quota Forecaster
//!
//! Turns a daily usage log (visits, inbound events, ...) into a forecast of
//! daily volumes tracked against a contracted quota.
//!
//! ## Core Concepts
//!
//! - **Profile filter**: only the aggregate `Grand Total` row of each date is used
//! - **Weekday baseline**: the historical mean of each metric per weekday
//! - **Seasonal factor**: a multiplier on the baseline for configured busy months
//! - **Actuals first**: dates with an observed value keep it instead of the model
//! - **Quota tracking**: annual volumes pro-rated into a flat daily entitlement,
//!   with cumulative consumption capped at the annual volume
//!
//! Every run is a full recomputation from raw bytes and configuration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use usage_quota_forecaster::*;
//! use chrono::NaiveDate;
//!
//! let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
//!     start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
//! });
//!
//! let raw = std::fs::read("usage.csv")?;
//! let report = process_usage_log(&raw, &config)?;
//! let xlsx = to_xlsx_bytes(&report)?;
//! ```

pub mod baseline;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod quota;
pub mod report;
pub mod schema;
pub mod seasonality;
pub mod utils;

pub use baseline::WeekdayBaseline;
pub use calendar::{enrich, parse_date, UsageHistory, UsageRecord};
pub use engine::{ForecastRecord, Forecaster, MetricForecast, ValueOrigin};
pub use error::{Result, UsageForecastError};
pub use export::{to_xlsx_bytes, write_csv, DEFAULT_FILE_NAME, XLSX_MIME_TYPE};
pub use ingestion::{decode_bytes, ingest, NormalizedInput, SourceEncoding, UsageTable};
pub use quota::{cumulative_sum, QuotaSchedule, QuotaTracker};
pub use report::{
    ForecastReport, MetricColumns, ReportAssembler, ReportCell, ReportRow, Segment,
    REPORT_DATE_FORMAT,
};
pub use schema::*;
pub use seasonality::SeasonalCalendar;

use log::{debug, info};
use std::path::Path;

pub struct UsageForecastProcessor;

impl UsageForecastProcessor {
    /// Runs the whole pipeline. The first fatal error ends the run; nothing
    /// downstream of it executes.
    pub fn process(raw: &[u8], config: &ForecastConfig) -> Result<ForecastReport> {
        config.validate()?;

        let metric_columns = config.metric_columns();
        let input = ingest(
            raw,
            &config.profile_column,
            &config.profile_label,
            &config.date_column,
            &metric_columns,
        )?;
        info!(
            "Retained {} '{}' rows ({:?} input, {} malformed lines skipped)",
            input.table.len(),
            config.profile_label,
            input.encoding,
            input.table.skipped_lines()
        );

        let history = enrich(
            &input.table,
            &config.date_column,
            &metric_columns,
            Some(config.channel_column.as_str()),
        )?;
        let baseline = WeekdayBaseline::from_history(&history);
        debug!("Weekday baseline covers {} weekdays", baseline.len());

        let horizon = resolve_horizon(config, &history)?;
        let tracker = QuotaTracker::new(i64::from(horizon.contract_days()?), &config.metrics)?;
        let seasons = SeasonalCalendar::new(config.busy_months.clone(), config.busy_factor)?;

        let forecasts = Forecaster::new(&baseline, &history, &seasons).forecast(&horizon)?;
        let report = ReportAssembler::new(&history, &baseline, &tracker, config.channel_column.as_str())
            .assemble(&forecasts);

        Ok(report)
    }

    pub fn process_file(path: impl AsRef<Path>, config: &ForecastConfig) -> Result<ForecastReport> {
        let raw = std::fs::read(path)?;
        Self::process(&raw, config)
    }
}

pub fn process_usage_log(raw: &[u8], config: &ForecastConfig) -> Result<ForecastReport> {
    UsageForecastProcessor::process(raw, config)
}

/// The configured horizon, or a contract spanning the first to the last
/// historical date when none is configured.
fn resolve_horizon(config: &ForecastConfig, history: &UsageHistory) -> Result<ForecastHorizon> {
    let horizon = match &config.horizon {
        Some(horizon) => horizon.clone(),
        None => {
            let (Some(start), Some(end)) = (history.first_date(), history.last_date()) else {
                return Err(UsageForecastError::NoDatedRows(config.date_column.clone()));
            };
            ForecastHorizon::Contract { start, end }
        }
    };
    horizon.validate()?;
    Ok(horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LOG: &str = "Profile,Date,Visits,All Inbound Events\n\
        Grand Total,2024-01-01,100,1000\n\
        Web,2024-01-01,40,400\n\
        Grand Total,2024-01-02,200,2000\n\
        Grand Total,2024-01-08,300,3000\n";

    #[test]
    fn test_end_to_end_processing() {
        let report = process_usage_log(LOG.as_bytes(), &ForecastConfig::default()).unwrap();

        // contract defaults to the historical window: Jan 1 to Jan 8
        assert_eq!(report.rows.len(), 8);
        assert_eq!(report.contract_days, 7);
        assert_eq!(report.historical_rows().count(), 3);

        let last = report.final_row().unwrap();
        assert_eq!(last.metrics[0].cumulative_forecast, 600.0);
        assert_eq!(last.metrics[0].cumulative_quota, 10_000_000.0);
    }

    #[test]
    fn test_single_day_history_without_horizon_is_rejected() {
        let log = "Profile,Date,Visits,All Inbound Events\nGrand Total,2024-01-01,1,1\n";
        let err = process_usage_log(log.as_bytes(), &ForecastConfig::default()).unwrap_err();
        assert!(matches!(err, UsageForecastError::InvalidContractDays(0)));
    }

    #[test]
    fn test_invalid_config_stops_before_parsing() {
        let config = ForecastConfig {
            busy_factor: 0.5,
            ..ForecastConfig::default()
        };
        let err = process_usage_log(b"not,a,usage,log", &config).unwrap_err();
        assert!(matches!(err, UsageForecastError::InvalidBusyFactor(_)));
    }

    #[test]
    fn test_explicit_rolling_horizon() {
        let config = ForecastConfig::default().with_horizon(ForecastHorizon::Rolling {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            days: 29,
        });
        let report = process_usage_log(LOG.as_bytes(), &config).unwrap();
        assert_eq!(report.rows.len(), 29);
        assert_eq!(report.historical_rows().count(), 0);
        assert_eq!(report.contract_days, 29);
    }
}
