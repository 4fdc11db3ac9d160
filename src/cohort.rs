//! Signup-month × contract-type churn grid

use crate::data::records_to_frame;
use crate::error::ValidationError;
use crate::record::{ContractType, CustomerRecord};
use polars::prelude::*;
use serde::Serialize;

/// Churn statistics for one (month, contract) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortCell {
    pub signup_month: String,
    pub contract: ContractType,
    /// Mean churn flag, in [0, 1]
    pub churn_rate: f64,
    pub customers: usize,
}

/// Sparse pivot of churn rate by cohort; absent pairs have no cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortGrid {
    pub cells: Vec<CohortCell>,
}

impl CohortGrid {
    /// Distinct signup months, ascending
    pub fn months(&self) -> Vec<&str> {
        let mut months: Vec<&str> = self.cells.iter().map(|c| c.signup_month.as_str()).collect();
        months.dedup();
        months
    }

    pub fn get(&self, signup_month: &str, contract: ContractType) -> Option<f64> {
        self.cells
            .iter()
            .find(|c| c.signup_month == signup_month && c.contract == contract)
            .map(|c| c.churn_rate)
    }
}

/// Group records by signup month and contract type
pub fn cohort_churn(records: &[CustomerRecord]) -> crate::Result<CohortGrid> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let grid = records_to_frame(records)?
        .lazy()
        .group_by([col("signup_month"), col("contract_code")])
        .agg([
            col("churned")
                .cast(DataType::Float64)
                .mean()
                .alias("churn_rate"),
            col("customer_id")
                .count()
                .cast(DataType::Int64)
                .alias("customers"),
        ])
        .sort(
            ["signup_month", "contract_code"],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let months: Vec<Option<&str>> = grid.column("signup_month")?.str()?.into_iter().collect();
    let codes: Vec<Option<i64>> = grid.column("contract_code")?.i64()?.into_iter().collect();
    let rates: Vec<Option<f64>> = grid.column("churn_rate")?.f64()?.into_iter().collect();
    let counts: Vec<Option<i64>> = grid.column("customers")?.i64()?.into_iter().collect();

    let mut cells = Vec::with_capacity(grid.height());
    for row in 0..grid.height() {
        let (Some(month), Some(code), Some(churn_rate), Some(customers)) =
            (months[row], codes[row], rates[row], counts[row])
        else {
            continue;
        };
        let Some(contract) = ContractType::ALL.into_iter().find(|c| c.code() as i64 == code) else {
            continue;
        };
        cells.push(CohortCell {
            signup_month: month.to_string(),
            contract,
            churn_rate,
            customers: customers as usize,
        });
    }

    tracing::info!(cells = cells.len(), "computed cohort churn grid");
    Ok(CohortGrid { cells })
}
