//! Geographical churn analysis

use crate::data::records_to_frame;
use crate::error::ValidationError;
use crate::record::{CustomerRecord, Region};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Give every record a uniformly random region
pub fn assign_regions<R: Rng + ?Sized>(records: &mut [CustomerRecord], rng: &mut R) {
    for record in records.iter_mut() {
        record.region = Region::ALL.choose(rng).copied();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionChurn {
    pub region: Region,
    /// Mean churn flag, in [0, 1]
    pub churn_rate: f64,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalReport {
    /// Sorted by region name
    pub regions: Vec<RegionChurn>,
    pub highest_risk: Region,
}

/// Mean churn per region and the region with the highest mean
///
/// Regions are listed in name order, and ties on the maximum go to the
/// alphabetically first region.
pub fn regional_churn(records: &[CustomerRecord]) -> crate::Result<RegionalReport> {
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }
    if let Some(record) = records.iter().find(|r| r.region.is_none()) {
        return Err(ValidationError::MissingRegion {
            customer_id: record.customer_id,
        }
        .into());
    }

    let grouped = records_to_frame(records)?
        .lazy()
        .group_by([col("region")])
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
        .sort(["region"], SortMultipleOptions::default())
        .collect()?;

    let names: Vec<Option<&str>> = grouped.column("region")?.str()?.into_iter().collect();
    let rates: Vec<Option<f64>> = grouped.column("churn_rate")?.f64()?.into_iter().collect();
    let counts: Vec<Option<i64>> = grouped.column("customers")?.i64()?.into_iter().collect();

    let mut regions = Vec::with_capacity(grouped.height());
    for row in 0..grouped.height() {
        let (Some(name), Some(churn_rate), Some(customers)) = (names[row], rates[row], counts[row])
        else {
            continue;
        };
        regions.push(RegionChurn {
            region: name.parse()?,
            churn_rate,
            customers: customers as usize,
        });
    }

    let highest_risk = highest_risk_region(&regions).ok_or(ValidationError::EmptyDataset)?;
    tracing::info!(%highest_risk, regions = regions.len(), "computed regional churn");

    Ok(RegionalReport {
        regions,
        highest_risk,
    })
}

/// Arg-max over churn rate; the earliest entry wins ties
pub fn highest_risk_region(regions: &[RegionChurn]) -> Option<Region> {
    let mut best: Option<&RegionChurn> = None;
    for entry in regions {
        match best {
            Some(current) if entry.churn_rate <= current.churn_rate => {}
            _ => best = Some(entry),
        }
    }
    best.map(|entry| entry.region)
}
