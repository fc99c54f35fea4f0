//! Merges the observed and forecast segments into the final chronological
//! table and fixes its column layout.
//!
//! Column order:
//!
//! | # | column |
//! |---|---|
//! | 1 | Weekday (0 = Monday) |
//! | 2 | Date (`YYYY/MM/DD`) |
//! | 3.. | raw value of each metric |
//! | | channel placeholder |
//! | | Average Point |
//! | | Seasonal Factor |
//! | | Forecast `<metric>` for each metric |
//! | | Daily Quota `<metric>` for each metric |
//! | | Cumulative Forecast `<metric>` for each metric |
//! | | Cumulative Quota `<metric>` for each metric |

use crate::baseline::WeekdayBaseline;
use crate::calendar::UsageHistory;
use crate::engine::ForecastRecord;
use crate::quota::{cumulative_sum, QuotaTracker};
use crate::utils::weekday_name;
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

pub const REPORT_DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Historical,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricColumns {
    /// Observed value on historical rows, unadjusted weekday mean on forecast rows
    pub raw: Option<f64>,
    pub forecast: f64,
    pub daily_quota: f64,
    pub cumulative_forecast: f64,
    pub cumulative_quota: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub segment: Segment,
    pub weekday: u32,
    pub date: NaiveDate,
    pub channel: Option<f64>,
    pub average_point: Option<f64>,
    pub seasonal_factor: f64,
    pub metrics: Vec<MetricColumns>,
}

impl ReportRow {
    pub fn formatted_date(&self) -> String {
        self.date.format(REPORT_DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportCell {
    Number(f64),
    Text(String),
    Empty,
}

impl From<Option<f64>> for ReportCell {
    fn from(value: Option<f64>) -> Self {
        value.map(ReportCell::Number).unwrap_or(ReportCell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub metrics: Vec<String>,
    pub channel_column: String,
    pub contract_days: u32,
    pub baseline: WeekdayBaseline,
    pub rows: Vec<ReportRow>,
}

impl ForecastReport {
    pub fn historical_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.segment == Segment::Historical)
    }

    pub fn forecast_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.segment == Segment::Forecast)
    }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    pub fn column_headers(&self) -> Vec<String> {
        let mut headers = vec!["Weekday".to_string(), "Date".to_string()];
        headers.extend(self.metrics.iter().cloned());
        headers.push(self.channel_column.clone());
        headers.push("Average Point".to_string());
        headers.push("Seasonal Factor".to_string());
        for prefix in [
            "Forecast",
            "Daily Quota",
            "Cumulative Forecast",
            "Cumulative Quota",
        ] {
            headers.extend(self.metrics.iter().map(|m| format!("{} {}", prefix, m)));
        }
        headers
    }

    /// Cells of one row, aligned with [`ForecastReport::column_headers`].
    pub fn row_cells(&self, row: &ReportRow) -> Vec<ReportCell> {
        let mut cells = vec![
            ReportCell::Number(f64::from(row.weekday)),
            ReportCell::Text(row.formatted_date()),
        ];
        cells.extend(row.metrics.iter().map(|m| ReportCell::from(m.raw)));
        cells.push(row.channel.into());
        cells.push(row.average_point.into());
        cells.push(ReportCell::Number(row.seasonal_factor));
        cells.extend(row.metrics.iter().map(|m| ReportCell::Number(m.forecast)));
        cells.extend(row.metrics.iter().map(|m| ReportCell::Number(m.daily_quota)));
        cells.extend(
            row.metrics
                .iter()
                .map(|m| ReportCell::Number(m.cumulative_forecast)),
        );
        cells.extend(
            row.metrics
                .iter()
                .map(|m| ReportCell::Number(m.cumulative_quota)),
        );
        cells
    }

    pub fn baseline_headers(&self) -> Vec<String> {
        let mut headers = vec!["Weekday".to_string(), "Day".to_string(), "Observations".to_string()];
        headers.extend(self.metrics.iter().map(|m| format!("Mean {}", m)));
        headers
    }

    pub fn baseline_cells(&self) -> Vec<Vec<ReportCell>> {
        self.baseline
            .weekdays()
            .map(|weekday| {
                let mut cells = vec![
                    ReportCell::Number(f64::from(weekday)),
                    ReportCell::Text(weekday_name(weekday).to_string()),
                    ReportCell::Number(self.baseline.observations(weekday) as f64),
                ];
                cells.extend(
                    (0..self.metrics.len()).map(|idx| ReportCell::from(self.baseline.mean(weekday, idx))),
                );
                cells
            })
            .collect()
    }

    pub fn final_row(&self) -> Option<&ReportRow> {
        self.rows.last()
    }
}

pub struct ReportAssembler<'a> {
    history: &'a UsageHistory,
    baseline: &'a WeekdayBaseline,
    tracker: &'a QuotaTracker,
    channel_column: String,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(
        history: &'a UsageHistory,
        baseline: &'a WeekdayBaseline,
        tracker: &'a QuotaTracker,
        channel_column: impl Into<String>,
    ) -> Self {
        Self {
            history,
            baseline,
            tracker,
            channel_column: channel_column.into(),
        }
    }

    /// Horizon dates with a logged row form the historical segment, the rest
    /// the forecast segment. Each date appears once and the cumulative
    /// columns run across both segments without resetting.
    pub fn assemble(&self, forecasts: &[ForecastRecord]) -> ForecastReport {
        let mut ordered: Vec<&ForecastRecord> = forecasts.iter().collect();
        ordered.sort_by_key(|f| f.date);

        let metric_count = self.history.metrics().len();
        let average_point = self.history.metric_mean(0);

        // per metric, indexed by horizon position
        let cumulative_forecasts: Vec<Vec<f64>> = (0..metric_count)
            .map(|idx| {
                let values: Vec<f64> = ordered.iter().map(|f| f.value(idx)).collect();
                cumulative_sum(&values)
            })
            .collect();
        let cumulative_quotas: Vec<Vec<f64>> = (0..metric_count)
            .map(|idx| self.tracker.cumulative_quota(idx, ordered.len()))
            .collect();

        let mut rows = Vec::with_capacity(ordered.len());

        for (position, forecast) in ordered.into_iter().enumerate() {
            let observed = self.history.record_on(forecast.date);

            let metrics = (0..metric_count)
                .map(|idx| {
                    let raw = match observed {
                        Some(record) => record.value(idx),
                        None => forecast.metrics.get(idx).and_then(|m| m.baseline),
                    };
                    MetricColumns {
                        raw,
                        forecast: forecast.value(idx),
                        daily_quota: self.tracker.daily_entitlement(idx),
                        cumulative_forecast: cumulative_forecasts[idx][position],
                        cumulative_quota: cumulative_quotas[idx][position],
                    }
                })
                .collect();

            let row = match observed {
                Some(record) => ReportRow {
                    segment: Segment::Historical,
                    weekday: forecast.weekday,
                    date: forecast.date,
                    channel: record.channel,
                    average_point: None,
                    seasonal_factor: forecast.seasonal_factor,
                    metrics,
                },
                None => ReportRow {
                    segment: Segment::Forecast,
                    weekday: forecast.weekday,
                    date: forecast.date,
                    channel: Some(0.0),
                    average_point,
                    seasonal_factor: forecast.seasonal_factor,
                    metrics,
                },
            };
            rows.push(row);
        }

        let report = ForecastReport {
            metrics: self.history.metrics().to_vec(),
            channel_column: self.channel_column.clone(),
            contract_days: self.tracker.contract_days(),
            baseline: self.baseline.clone(),
            rows,
        };

        info!(
            "Assembled report: {} historical rows, {} forecast rows",
            report.historical_rows().count(),
            report.forecast_rows().count()
        );

        report
    }
}
