//! ChurnForge: customer churn and retention analytics
//!
//! This library computes subscription KPIs (churn and retention rates),
//! customer lifetime value, signup cohort churn, churn by contract type,
//! usage by churn status, a random-forest churn risk score and regional
//! churn over a table of customer records.

pub mod breakdown;
pub mod cli;
pub mod cohort;
pub mod data;
pub mod error;
pub mod generator;
pub mod kpi;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod region;
pub mod report;

// Re-export public items for easier access
pub use breakdown::{contract_churn, usage_by_churn, ContractChurn, UsageByChurn, UsageStats};
pub use cli::{Args, OutputFormat};
pub use cohort::{cohort_churn, CohortCell, CohortGrid};
pub use data::{load_records, save_records};
pub use error::ValidationError;
pub use generator::{generate_records, GeneratorConfig, RecordGenerator};
pub use kpi::{compute_kpis, enrich_lifetime_values, predicted_lifespan, KpiSummary};
pub use model::{highest_risk_customers, score_churn_risk, RiskModel, RiskReport, ScorerConfig};
pub use record::{ContractType, CustomerRecord, Region};
pub use region::{assign_regions, regional_churn, RegionalReport};
pub use report::AnalysisReport;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
