//! Churn risk scoring with a bagged decision-tree ensemble

use crate::error::ValidationError;
use crate::record::CustomerRecord;
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Model inputs, in column order
pub const FEATURE_NAMES: [&str; 3] = ["usage_hours", "monthly_charge", "contract_code"];

/// Risk scorer hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree (unbounded if None)
    pub max_depth: Option<usize>,
    /// Fraction of rows held out for accuracy
    pub test_fraction: f64,
    /// Seed for the split and the bootstrap samples
    pub seed: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.n_trees == 0 {
            return Err(ValidationError::InvalidParameter("forest needs at least one tree".into()).into());
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ValidationError::InvalidParameter(format!(
                "test fraction {} is outside (0, 1)",
                self.test_fraction
            ))
            .into());
        }
        Ok(())
    }
}

/// Random forest of CART trees fitted on bootstrap samples
pub struct RiskModel {
    trees: Vec<DecisionTree<f64, usize>>,
    feature_importances: Vec<f64>,
}

impl RiskModel {
    /// Fit the forest
    ///
    /// # Arguments
    /// * `features` - Feature matrix (n_samples, 3)
    /// * `targets` - Churn labels, 1 for churned
    /// * `config` - Forest size, depth and seed
    pub fn fit(
        features: &Array2<f64>,
        targets: &Array1<usize>,
        config: &ScorerConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        if features.nrows() == 0 {
            return Err(ValidationError::EmptyDataset.into());
        }
        if !has_both_classes(targets) {
            return Err(ValidationError::SingleClass.into());
        }

        let n_samples = features.nrows();
        let n_features = features.ncols();
        let params = DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(config.max_depth);

        let mut trees = Vec::with_capacity(config.n_trees);
        let mut feature_importances = vec![0.0; n_features];

        for i in 0..config.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let dataset = Dataset::new(
                features.select(Axis(0), &indices),
                targets.select(Axis(0), &indices),
            );
            let tree = params.fit(&dataset)?;

            for (total, importance) in feature_importances.iter_mut().zip(tree.feature_importance()) {
                if importance.is_finite() {
                    *total += importance;
                }
            }
            trees.push(tree);
        }

        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            for importance in &mut feature_importances {
                *importance /= sum;
            }
        }

        tracing::debug!(n_trees = trees.len(), n_samples, "fitted risk model");

        Ok(Self {
            trees,
            feature_importances,
        })
    }

    /// Fraction of trees voting churn, per row
    pub fn predict_proba(&self, features: &Array2<f64>) -> Array1<f64> {
        let mut votes = Array1::<f64>::zeros(features.nrows());
        for tree in &self.trees {
            let predictions: Array1<usize> = tree.predict(features);
            for (vote, &label) in votes.iter_mut().zip(predictions.iter()) {
                if label == 1 {
                    *vote += 1.0;
                }
            }
        }
        votes / self.trees.len() as f64
    }

    /// Majority vote
    pub fn predict(&self, features: &Array2<f64>) -> Array1<usize> {
        self.predict_proba(features)
            .mapv(|p| if p > 0.5 { 1 } else { 0 })
    }

    /// Share of correct predictions
    pub fn accuracy(&self, features: &Array2<f64>, targets: &Array1<usize>) -> f64 {
        if targets.is_empty() {
            return 0.0;
        }
        let correct = self
            .predict(features)
            .iter()
            .zip(targets.iter())
            .filter(|(predicted, actual)| predicted == actual)
            .count();
        correct as f64 / targets.len() as f64
    }

    /// Normalized importances, aligned with [`FEATURE_NAMES`]
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn has_both_classes(targets: &Array1<usize>) -> bool {
    targets.iter().any(|&t| t == 1) && targets.iter().any(|&t| t == 0)
}

/// Outcome of a scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    /// Accuracy on the held-out rows only
    pub accuracy: f64,
    pub train_size: usize,
    pub test_size: usize,
    /// Feature name and normalized importance, descending
    pub feature_importances: Vec<(String, f64)>,
}

/// Build the (usage hours, monthly charge, contract code) matrix
pub fn feature_matrix(records: &[CustomerRecord]) -> crate::Result<Array2<f64>> {
    let mut features = Array2::<f64>::zeros((records.len(), FEATURE_NAMES.len()));
    for (mut row, record) in features.outer_iter_mut().zip(records) {
        let charge = record.monthly_charge.ok_or(ValidationError::MissingCharge {
            customer_id: record.customer_id,
        })?;
        row[0] = record.usage_hours as f64;
        row[1] = charge;
        row[2] = record.contract.code() as f64;
    }
    Ok(features)
}

pub fn target_vector(records: &[CustomerRecord]) -> Array1<usize> {
    records.iter().map(|r| usize::from(r.churned)).collect()
}

/// Shuffle row indices and hold out `ceil(n * test_fraction)` of them
///
/// # Returns
/// * `(train_indices, test_indices)`, disjoint and covering `0..n`
pub fn train_test_split(
    n_samples: usize,
    test_fraction: f64,
    seed: u64,
) -> crate::Result<(Vec<usize>, Vec<usize>)> {
    let test_size = (n_samples as f64 * test_fraction).ceil() as usize;
    if test_size == 0 || test_size >= n_samples {
        return Err(ValidationError::InsufficientData(format!(
            "{} records cannot be split with test fraction {}",
            n_samples, test_fraction
        ))
        .into());
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(test_size);
    Ok((train, indices))
}

/// Train on the split, evaluate on the held-out rows and score every record
///
/// Writes `risk_score` onto each record. Training rows are scored too, so
/// scores for those rows are in-sample.
pub fn score_churn_risk(
    records: &mut [CustomerRecord],
    config: &ScorerConfig,
) -> crate::Result<RiskReport> {
    config.validate()?;
    if records.is_empty() {
        return Err(ValidationError::EmptyDataset.into());
    }

    let features = feature_matrix(records)?;
    let targets = target_vector(records);
    if !has_both_classes(&targets) {
        return Err(ValidationError::SingleClass.into());
    }

    let (train_idx, test_idx) = train_test_split(records.len(), config.test_fraction, config.seed)?;
    let train_targets = targets.select(Axis(0), &train_idx);
    if !has_both_classes(&train_targets) {
        return Err(ValidationError::SingleClass.into());
    }

    tracing::info!(
        train = train_idx.len(),
        test = test_idx.len(),
        n_trees = config.n_trees,
        "training churn risk model"
    );
    let model = RiskModel::fit(
        &features.select(Axis(0), &train_idx),
        &train_targets,
        config,
    )?;

    let accuracy = model.accuracy(
        &features.select(Axis(0), &test_idx),
        &targets.select(Axis(0), &test_idx),
    );

    let scores = model.predict_proba(&features);
    for (record, &score) in records.iter_mut().zip(scores.iter()) {
        record.risk_score = Some(score);
    }

    let mut feature_importances: Vec<(String, f64)> = FEATURE_NAMES
        .iter()
        .zip(model.feature_importances())
        .map(|(name, &importance)| (name.to_string(), importance))
        .collect();
    feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    tracing::info!(accuracy, "scored churn risk");

    Ok(RiskReport {
        accuracy,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
        feature_importances,
    })
}

/// Scored records, highest risk first; unscored records are skipped
pub fn highest_risk_customers(records: &[CustomerRecord], n: usize) -> Vec<&CustomerRecord> {
    let mut scored: Vec<&CustomerRecord> = records.iter().filter(|r| r.risk_score.is_some()).collect();
    scored.sort_by(|a, b| {
        let a = a.risk_score.unwrap_or(0.0);
        let b = b.risk_score.unwrap_or(0.0);
        b.total_cmp(&a)
    });
    scored.truncate(n);
    scored
}
