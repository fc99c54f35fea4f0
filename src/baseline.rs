use crate::calendar::UsageHistory;
use crate::utils::{mean, weekday_name};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-weekday means of every tracked metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekdayBaseline {
    metrics: Vec<String>,
    /// weekday -> (per-metric mean, `None` when every value was missing)
    means: BTreeMap<u32, Vec<Option<f64>>>,
    observations: BTreeMap<u32, usize>,
}

impl WeekdayBaseline {
    /// Groups the history by weekday and averages each metric, ignoring
    /// missing cells. Weekdays with no rows are left out.
    pub fn from_history(history: &UsageHistory) -> Self {
        let metric_count = history.metrics().len();
        let mut groups: BTreeMap<u32, Vec<Vec<f64>>> = BTreeMap::new();
        let mut observations: BTreeMap<u32, usize> = BTreeMap::new();

        for record in history.records() {
            let group = groups
                .entry(record.weekday)
                .or_insert_with(|| vec![Vec::new(); metric_count]);
            for (idx, values) in group.iter_mut().enumerate() {
                if let Some(v) = record.value(idx) {
                    values.push(v);
                }
            }
            *observations.entry(record.weekday).or_insert(0) += 1;
        }

        let means: BTreeMap<u32, Vec<Option<f64>>> = groups
            .into_iter()
            .map(|(weekday, per_metric)| {
                (weekday, per_metric.iter().map(|v| mean(v)).collect())
            })
            .collect();

        for (weekday, values) in &means {
            debug!("Baseline {}: {:?}", weekday_name(*weekday), values);
        }

        Self {
            metrics: history.metrics().to_vec(),
            means,
            observations,
        }
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Mean for a weekday and metric; 0.0 when the weekday was never observed.
    pub fn get(&self, weekday: u32, metric_idx: usize) -> f64 {
        self.mean(weekday, metric_idx).unwrap_or(0.0)
    }

    pub fn mean(&self, weekday: u32, metric_idx: usize) -> Option<f64> {
        self.means
            .get(&weekday)
            .and_then(|values| values.get(metric_idx).copied().flatten())
    }

    pub fn contains(&self, weekday: u32) -> bool {
        self.means.contains_key(&weekday)
    }

    pub fn weekdays(&self) -> impl Iterator<Item = u32> + '_ {
        self.means.keys().copied()
    }

    pub fn observations(&self, weekday: u32) -> usize {
        self.observations.get(&weekday).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}
