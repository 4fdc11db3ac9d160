//! Command-line interface definitions and argument parsing

use crate::error::ValidationError;
use crate::generator::GeneratorConfig;
use crate::model::ScorerConfig;
use clap::{Parser, ValueEnum};

/// Report format written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Customer churn analytics: KPIs, lifetime value, cohorts and risk scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Load customer records from this CSV instead of generating them
    #[arg(short, long)]
    pub input: Option<String>,

    /// Number of synthetic customers to generate
    #[arg(short = 'n', long, default_value = "1000")]
    pub records: usize,

    /// Seed for the synthetic dataset
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Probability that a synthetic customer has churned
    #[arg(long, default_value = "0.22")]
    pub churn_probability: f64,

    /// Seed for region assignment; unseeded when omitted
    #[arg(long)]
    pub region_seed: Option<u64>,

    /// Number of trees in the risk model
    #[arg(short, long, default_value = "100")]
    pub trees: usize,

    /// Maximum depth of each tree
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Fraction of customers held out to measure accuracy
    #[arg(long, default_value = "0.2")]
    pub test_fraction: f64,

    /// Seed for the train/test split and bootstrap samples
    #[arg(long, default_value = "42")]
    pub model_seed: u64,

    /// Number of high-risk customers to list
    #[arg(long, default_value = "5")]
    pub top: usize,

    /// Skip the cohort grid
    #[arg(long)]
    pub skip_cohorts: bool,

    /// Skip risk scoring
    #[arg(long)]
    pub skip_risk: bool,

    /// Skip regional analysis
    #[arg(long)]
    pub skip_regions: bool,

    /// Write the enriched dataset to this CSV
    #[arg(short, long)]
    pub export: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.input.is_none() && self.records == 0 {
            return Err(ValidationError::InvalidParameter("--records must be at least 1".into()).into());
        }
        if !(0.0..=1.0).contains(&self.churn_probability) {
            return Err(ValidationError::InvalidParameter(format!(
                "--churn-probability {} is outside [0, 1]",
                self.churn_probability
            ))
            .into());
        }
        self.scorer_config().validate()
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            seed: self.seed,
            count: self.records,
            churn_probability: self.churn_probability,
            ..Default::default()
        }
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            n_trees: self.trees,
            max_depth: self.max_depth,
            test_fraction: self.test_fraction,
            seed: self.model_seed,
        }
    }
}
