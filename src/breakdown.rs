//! Churn by contract type and usage by churn status

use crate::data::records_to_frame;
use crate::error::ValidationError;
use crate::record::{ContractType, CustomerRecord};
use polars::prelude::*;
use serde::Serialize;

/// Churned/retained split for one contract type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractChurn {
    pub contract: ContractType,
    pub customers: usize,
    pub churned: usize,
    pub retained: usize,
    /// Churned share, in [0, 1]
    pub churn_rate: f64,
}

/// Churn counts per contract type, ordered Monthly, One-Year, Two-Year
///
/// Contract types with no customers are left out.
pub fn contract_churn(records: &[CustomerRecord]) -> crate::Result<Vec<ContractChurn>> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let grouped = records_to_frame(records)?
        .lazy()
        .group_by([col("contract_code")])
        .agg([
            col("customer_id")
                .count()
                .cast(DataType::Int64)
                .alias("customers"),
            col("churned")
                .cast(DataType::Int64)
                .sum()
                .alias("churned_count"),
        ])
        .sort(["contract_code"], SortMultipleOptions::default())
        .collect()?;

    let codes: Vec<Option<i64>> = grouped.column("contract_code")?.i64()?.into_iter().collect();
    let counts: Vec<Option<i64>> = grouped.column("customers")?.i64()?.into_iter().collect();
    let churned: Vec<Option<i64>> = grouped.column("churned_count")?.i64()?.into_iter().collect();

    let mut rows = Vec::with_capacity(grouped.height());
    for row in 0..grouped.height() {
        let (Some(code), Some(customers), Some(churned)) = (codes[row], counts[row], churned[row])
        else {
            continue;
        };
        let Some(contract) = ContractType::ALL.into_iter().find(|c| c.code() as i64 == code) else {
            continue;
        };
        let customers = customers as usize;
        let churned = churned as usize;
        rows.push(ContractChurn {
            contract,
            customers,
            churned,
            retained: customers - churned,
            churn_rate: churned as f64 / customers as f64,
        });
    }

    tracing::debug!(contracts = rows.len(), "computed contract churn");
    Ok(rows)
}

/// Five-number summary plus mean of monthly usage hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub customers: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl UsageStats {
    /// `None` for an empty slice
    pub fn from_hours(hours: &[f64]) -> Option<Self> {
        if hours.is_empty() {
            return None;
        }
        let mut sorted = hours.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            customers: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min: sorted[0],
            q1: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q3: percentile(&sorted, 75.0),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear-interpolated percentile of sorted, non-empty values; `p` in [0, 100]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Usage distribution of retained versus churned customers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageByChurn {
    pub retained: Option<UsageStats>,
    pub churned: Option<UsageStats>,
}

pub fn usage_by_churn(records: &[CustomerRecord]) -> crate::Result<UsageByChurn> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let churned = usage_hours(records, true);
    let retained = usage_hours(records, false);

    Ok(UsageByChurn {
        retained: UsageStats::from_hours(&retained),
        churned: UsageStats::from_hours(&churned),
    })
}

fn usage_hours(records: &[CustomerRecord], churned: bool) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.churned == churned)
        .map(|r| r.usage_hours as f64)
        .collect()
}
