use crate::error::{Result, UsageForecastError};
use crate::ingestion::UsageTable;
use crate::utils::{mean, parse_count, weekday_index};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y年%m月%d日",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a date cell in any of the common locale layouts.
/// Returns `None` when no layout matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// One dated row of the usage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
    /// Metric values in configured metric order; `None` where the cell was
    /// empty or not numeric.
    pub values: Vec<Option<f64>>,
    pub channel: Option<f64>,
}

impl UsageRecord {
    pub fn new(date: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self {
            date,
            weekday: weekday_index(date),
            values,
            channel: None,
        }
    }

    pub fn value(&self, metric_idx: usize) -> Option<f64> {
        self.values.get(metric_idx).copied().flatten()
    }

    /// Fills cells still missing here from a later row logged for the same
    /// date.
    fn fill_gaps_from(&mut self, other: &UsageRecord) {
        for (slot, value) in self.values.iter_mut().zip(&other.values) {
            if slot.is_none() {
                *slot = *value;
            }
        }
        if self.channel.is_none() {
            self.channel = other.channel;
        }
    }
}

/// Date-sorted historical records plus one merged record per date.
#[derive(Debug, Clone, Default)]
pub struct UsageHistory {
    metrics: Vec<String>,
    records: Vec<UsageRecord>,
    by_date: BTreeMap<NaiveDate, UsageRecord>,
}

impl UsageHistory {
    /// Every record feeds the baseline. Rows sharing a date collapse into one
    /// observation taking, per cell, the first non-missing value in log order.
    pub fn new(metrics: Vec<String>, mut records: Vec<UsageRecord>) -> Self {
        // stable, so log order survives within a date
        records.sort_by_key(|r| r.date);

        let mut by_date: BTreeMap<NaiveDate, UsageRecord> = BTreeMap::new();
        for record in &records {
            match by_date.entry(record.date) {
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                }
                Entry::Occupied(mut slot) => {
                    debug!("Merging duplicate row for {}", record.date);
                    slot.get_mut().fill_gaps_from(record);
                }
            }
        }

        Self {
            metrics,
            records,
            by_date,
        }
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next_back().copied()
    }

    /// Merged observation for a date.
    pub fn record_on(&self, date: NaiveDate) -> Option<&UsageRecord> {
        self.by_date.get(&date)
    }

    /// Observed value of a metric on a date, if that date was recorded and
    /// the cell held a number.
    pub fn observed(&self, date: NaiveDate, metric_idx: usize) -> Option<f64> {
        self.record_on(date).and_then(|r| r.value(metric_idx))
    }

    /// Mean of one metric over every record, skipping missing cells.
    pub fn metric_mean(&self, metric_idx: usize) -> Option<f64> {
        let values: Vec<f64> = self.records.iter().filter_map(|r| r.value(metric_idx)).collect();
        mean(&values)
    }
}

/// Turns the filtered table into dated records. Rows whose date does not
/// parse are dropped; an input where no row survives is fatal.
pub fn enrich(
    table: &UsageTable,
    date_column: &str,
    metric_columns: &[String],
    channel_column: Option<&str>,
) -> Result<UsageHistory> {
    let date_idx = table.require_column(date_column)?;
    let metric_idx = table.require_columns(metric_columns)?;
    let channel_idx = channel_column.and_then(|c| table.column_index(c));

    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0;

    for row in table.rows() {
        let Some(date) = parse_date(&row[date_idx]) else {
            debug!("Dropping row with unparseable date '{}'", row[date_idx]);
            dropped += 1;
            continue;
        };

        let values = metric_idx.iter().map(|i| parse_count(&row[*i])).collect();
        let mut record = UsageRecord::new(date, values);
        record.channel = channel_idx.and_then(|i| parse_count(&row[i]));
        records.push(record);
    }

    if records.is_empty() {
        return Err(UsageForecastError::NoDatedRows(date_column.to_string()));
    }

    info!(
        "Enriched {} dated rows ({} dropped for unparseable dates)",
        records.len(),
        dropped
    );

    Ok(UsageHistory::new(metric_columns.to_vec(), records))
}
