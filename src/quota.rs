//! Flat pro-rating of contracted volumes and cumulative consumption tracking.

use crate::error::Result;
use crate::schema::MetricQuota;
use crate::utils::{validate_annual_volume, validate_contract_days};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSchedule {
    pub metric: String,
    pub annual_volume: f64,
    pub daily_entitlement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaTracker {
    contract_days: u32,
    schedules: Vec<QuotaSchedule>,
}

impl QuotaTracker {
    /// Rejects a non-positive contract length before any division happens.
    pub fn new(contract_days: i64, quotas: &[MetricQuota]) -> Result<Self> {
        let contract_days = validate_contract_days(contract_days)?;

        let schedules = quotas
            .iter()
            .map(|quota| -> Result<QuotaSchedule> {
                validate_annual_volume(&quota.column, quota.annual_volume)?;
                Ok(QuotaSchedule {
                    metric: quota.column.clone(),
                    annual_volume: quota.annual_volume,
                    daily_entitlement: quota.annual_volume / f64::from(contract_days),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            contract_days,
            schedules,
        })
    }

    pub fn contract_days(&self) -> u32 {
        self.contract_days
    }

    pub fn schedules(&self) -> &[QuotaSchedule] {
        &self.schedules
    }

    pub fn daily_entitlement(&self, metric_idx: usize) -> f64 {
        self.schedules
            .get(metric_idx)
            .map(|s| s.daily_entitlement)
            .unwrap_or(0.0)
    }

    /// Entitlement accrued after `day` days, never above the annual volume.
    pub fn cumulative_quota_at(&self, metric_idx: usize, day: usize) -> f64 {
        let Some(schedule) = self.schedules.get(metric_idx) else {
            return 0.0;
        };
        if day >= self.contract_days as usize {
            return schedule.annual_volume;
        }
        (schedule.daily_entitlement * day as f64).min(schedule.annual_volume)
    }

    /// Cumulative entitlement for each of `days` consecutive days, plateauing
    /// at the annual volume once the contract length is reached.
    pub fn cumulative_quota(&self, metric_idx: usize, days: usize) -> Vec<f64> {
        (1..=days)
            .map(|day| self.cumulative_quota_at(metric_idx, day))
            .collect()
    }
}

/// Running total of a series.
pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total)
        })
        .collect()
}
