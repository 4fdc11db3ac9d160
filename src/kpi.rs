//! Churn/retention KPIs and customer lifetime value

use crate::error::ValidationError;
use crate::record::CustomerRecord;
use serde::Serialize;

/// Usage above this many hours per month earns the long lifespan
pub const HIGH_USAGE_THRESHOLD: u32 = 30;
pub const HIGH_USAGE_LIFESPAN_MONTHS: u32 = 12;
pub const LOW_USAGE_LIFESPAN_MONTHS: u32 = 6;

/// Executive summary numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_customers: usize,
    pub churned_customers: usize,
    pub retained_customers: usize,
    /// Percentage, two decimals
    pub churn_rate: f64,
    /// Percentage, two decimals; always `100 - churn_rate`
    pub retention_rate: f64,
}

/// Reduce the dataset to headline counts and rates
pub fn compute_kpis(records: &[CustomerRecord]) -> crate::Result<KpiSummary> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let total_customers = records.len();
    let churned_customers = records.iter().filter(|r| r.churned).count();
    let retained_customers = total_customers - churned_customers;

    let churn_rate = round2(churned_customers as f64 / total_customers as f64 * 100.0);
    let retention_rate = round2(100.0 - churn_rate);

    tracing::debug!(total_customers, churned_customers, churn_rate, "computed KPIs");

    Ok(KpiSummary {
        total_customers,
        churned_customers,
        retained_customers,
        churn_rate,
        retention_rate,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Months a customer is expected to stay, from monthly usage
pub fn predicted_lifespan(usage_hours: u32) -> u32 {
    if usage_hours > HIGH_USAGE_THRESHOLD {
        HIGH_USAGE_LIFESPAN_MONTHS
    } else {
        LOW_USAGE_LIFESPAN_MONTHS
    }
}

pub fn lifetime_value(monthly_charge: f64, lifespan_months: u32) -> f64 {
    monthly_charge * lifespan_months as f64
}

/// Fill `predicted_lifespan` and `lifetime_value` on every record
///
/// Fails without touching any record if one of them lacks a monthly charge.
pub fn enrich_lifetime_values(records: &mut [CustomerRecord]) -> crate::Result<()> {
    if let Some(record) = records.iter().find(|r| r.monthly_charge.is_none()) {
        return Err(ValidationError::MissingCharge {
            customer_id: record.customer_id,
        }
        .into());
    }

    for record in records.iter_mut() {
        let lifespan = predicted_lifespan(record.usage_hours);
        record.predicted_lifespan = Some(lifespan);
        record.lifetime_value = record
            .monthly_charge
            .map(|charge| lifetime_value(charge, lifespan));
    }

    Ok(())
}

/// CLV aggregated by lifespan tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeValueSummary {
    pub high_usage_customers: usize,
    pub low_usage_customers: usize,
    pub mean_clv_high_usage: Option<f64>,
    pub mean_clv_low_usage: Option<f64>,
    /// High-tier mean over low-tier mean
    pub high_to_low_ratio: Option<f64>,
    pub total_clv: f64,
}

/// Summarise records already passed through [`enrich_lifetime_values`]
pub fn summarize_lifetime_values(records: &[CustomerRecord]) -> crate::Result<LifetimeValueSummary> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let mut high = Vec::new();
    let mut low = Vec::new();
    for record in records {
        let (Some(lifespan), Some(value)) = (record.predicted_lifespan, record.lifetime_value) else {
            return Err(ValidationError::MissingCharge {
                customer_id: record.customer_id,
            }
            .into());
        };
        if lifespan == HIGH_USAGE_LIFESPAN_MONTHS {
            high.push(value);
        } else {
            low.push(value);
        }
    }

    let mean_clv_high_usage = mean(&high);
    let mean_clv_low_usage = mean(&low);
    let high_to_low_ratio = match (mean_clv_high_usage, mean_clv_low_usage) {
        (Some(h), Some(l)) if l > 0.0 => Some(h / l),
        _ => None,
    };

    Ok(LifetimeValueSummary {
        high_usage_customers: high.len(),
        low_usage_customers: low.len(),
        mean_clv_high_usage,
        mean_clv_low_usage,
        high_to_low_ratio,
        total_clv: high.iter().chain(low.iter()).sum(),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
