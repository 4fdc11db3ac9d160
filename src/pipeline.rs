//! End-to-end analysis run: dataset, KPIs, enrichment stages, report

use crate::breakdown::{contract_churn, usage_by_churn};
use crate::cli::Args;
use crate::cohort::cohort_churn;
use crate::data::{load_records, save_records};
use crate::generator::generate_records;
use crate::kpi::{compute_kpis, enrich_lifetime_values, summarize_lifetime_values};
use crate::model::{highest_risk_customers, score_churn_risk};
use crate::record::CustomerRecord;
use crate::region::{assign_regions, regional_churn};
use crate::report::{AnalysisReport, RiskEntry};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load or generate the dataset described by `args`
pub fn load_dataset(args: &Args) -> crate::Result<Vec<CustomerRecord>> {
    match &args.input {
        Some(path) => load_records(path),
        None => generate_records(args.generator_config()),
    }
}

/// Run every enabled stage over `records`, enriching them in place
///
/// CLV and risk scoring need a monthly charge on every record; when some are
/// missing those two stages are skipped with a warning instead of failing
/// the run.
pub fn analyze(records: &mut [CustomerRecord], args: &Args) -> crate::Result<AnalysisReport> {
    let kpis = compute_kpis(records)?;
    info!(
        total = kpis.total_customers,
        churn_rate = kpis.churn_rate,
        "computed executive summary"
    );
    let mut report = AnalysisReport::new(kpis);
    report.contracts = Some(contract_churn(records)?);
    report.usage = Some(usage_by_churn(records)?);

    let has_charges = records.iter().all(|r| r.monthly_charge.is_some());
    if has_charges {
        enrich_lifetime_values(records)?;
        report.lifetime_value = Some(summarize_lifetime_values(records)?);
    } else {
        warn!("dataset has records without monthly charge; skipping lifetime value and risk scoring");
    }

    if !args.skip_cohorts {
        report.cohorts = Some(cohort_churn(records)?);
    }

    if !args.skip_risk && has_charges {
        let stage = Instant::now();
        let risk = score_churn_risk(records, &args.scorer_config())?;
        debug!(elapsed_ms = stage.elapsed().as_millis() as u64, "risk scoring finished");
        report.top_risk = highest_risk_customers(records, args.top)
            .into_iter()
            .filter_map(RiskEntry::from_record)
            .collect();
        report.risk = Some(risk);
    }

    if !args.skip_regions {
        match args.region_seed {
            Some(seed) => assign_regions(records, &mut ChaCha8Rng::seed_from_u64(seed)),
            None => {
                warn!("region assignment is unseeded; pass --region-seed for a reproducible result");
                assign_regions(records, &mut rand::thread_rng());
            }
        }
        report.regions = Some(regional_churn(records)?);
    }

    Ok(report)
}

/// Load, analyze and optionally export; returns the report and enriched records
pub fn run(args: &Args) -> crate::Result<(AnalysisReport, Vec<CustomerRecord>)> {
    args.validate()?;
    let start = Instant::now();

    let mut records = load_dataset(args)?;
    info!(records = records.len(), "dataset ready");

    let report = analyze(&mut records, args)?;

    if let Some(path) = &args.export {
        save_records(&records, path)?;
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "analysis complete");
    Ok((report, records))
}
