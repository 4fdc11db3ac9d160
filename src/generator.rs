//! Seeded synthetic subscription data
//!
//! `RecordGenerator` yields a finite, reproducible sequence of customer
//! records. Two generators built from the same config produce identical
//! sequences, and `restart` rewinds a generator to its first record.

use crate::error::ValidationError;
use crate::record::{ContractType, CustomerRecord};
use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

/// Synthetic dataset parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// RNG seed
    pub seed: u64,
    /// Number of records to emit
    pub count: usize,
    /// Identifier of the first record; ids are consecutive
    pub first_customer_id: i64,
    /// Earliest signup date
    pub start_date: NaiveDate,
    /// Signup dates are drawn from `start_date + [0, signup_window_days)`
    pub signup_window_days: i64,
    /// Monthly usage hours, upper bound exclusive
    pub usage_hours: Range<u32>,
    /// Monthly charge range; `None` generates records without pricing
    pub monthly_charge: Option<Range<f64>>,
    /// Probability that a record is churned
    pub churn_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            count: 1000,
            first_customer_id: 1001,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            signup_window_days: 365,
            usage_hours: 5..60,
            monthly_charge: Some(20.0..150.0),
            churn_probability: 0.22,
        }
    }
}

impl GeneratorConfig {
    /// Reject ranges and probabilities the sampler cannot draw from
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.churn_probability) {
            return Err(ValidationError::InvalidParameter(format!(
                "churn probability {} is outside [0, 1]",
                self.churn_probability
            ))
            .into());
        }
        if self.usage_hours.is_empty() {
            return Err(ValidationError::InvalidParameter(format!(
                "usage hour range {:?} is empty",
                self.usage_hours
            ))
            .into());
        }
        if let Some(charge) = &self.monthly_charge {
            let drawable =
                charge.start.is_finite() && charge.end.is_finite() && charge.start < charge.end;
            if !drawable {
                return Err(ValidationError::InvalidParameter(format!(
                    "monthly charge range {:?} is empty",
                    charge
                ))
                .into());
            }
        }
        if self.signup_window_days <= 0 {
            return Err(ValidationError::InvalidParameter(format!(
                "signup window must be positive, got {} days",
                self.signup_window_days
            ))
            .into());
        }
        let window_end = Duration::try_days(self.signup_window_days)
            .and_then(|window| self.start_date.checked_add_signed(window));
        if window_end.is_none() {
            return Err(ValidationError::InvalidParameter(format!(
                "signup window of {} days from {} overflows the calendar",
                self.signup_window_days, self.start_date
            ))
            .into());
        }
        Ok(())
    }
}

/// Lazy, finite, restartable record sequence
#[derive(Debug, Clone)]
pub struct RecordGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    emitted: usize,
}

impl RecordGenerator {
    pub fn new(config: GeneratorConfig) -> crate::Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            emitted: 0,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Rewind to the first record
    pub fn restart(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.emitted = 0;
    }

    fn draw(&mut self) -> CustomerRecord {
        let config = &self.config;
        let customer_id = config.first_customer_id + self.emitted as i64;
        let offset = self.rng.gen_range(0..config.signup_window_days);
        let signup_date = config.start_date + Duration::days(offset);
        let usage_hours = self.rng.gen_range(config.usage_hours.clone());
        let monthly_charge = config
            .monthly_charge
            .clone()
            .map(|range| self.rng.gen_range(range));
        let contract = *ContractType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&ContractType::Monthly);
        let churned = self.rng.gen_bool(config.churn_probability);

        CustomerRecord::new(
            customer_id,
            signup_date,
            usage_hours,
            monthly_charge,
            contract,
            churned,
        )
    }
}

impl Iterator for RecordGenerator {
    type Item = CustomerRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted >= self.config.count {
            return None;
        }
        let record = self.draw();
        self.emitted += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.count - self.emitted;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordGenerator {}

/// Generate a full dataset in one call
pub fn generate_records(config: GeneratorConfig) -> crate::Result<Vec<CustomerRecord>> {
    let generator = RecordGenerator::new(config)?;
    tracing::debug!(
        seed = generator.config().seed,
        count = generator.config().count,
        "generating synthetic records"
    );
    Ok(generator.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            seed,
            count: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a: Vec<_> = RecordGenerator::new(small_config(7)).unwrap().collect();
        let b: Vec<_> = RecordGenerator::new(small_config(7)).unwrap().collect();
        assert_eq!(a, b);

        let c: Vec<_> = RecordGenerator::new(small_config(8)).unwrap().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_restart_reproduces() {
        let mut generator = RecordGenerator::new(small_config(3)).unwrap();
        let first: Vec<_> = generator.by_ref().take(10).collect();
        assert_eq!(generator.len(), 40);

        generator.restart();
        let again: Vec<_> = generator.by_ref().take(10).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_finite_and_within_ranges() {
        let config = small_config(11);
        let records: Vec<_> = RecordGenerator::new(config.clone()).unwrap().collect();
        assert_eq!(records.len(), 50);

        let end = config.start_date + Duration::days(config.signup_window_days);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.customer_id, 1001 + i as i64);
            assert!(config.usage_hours.contains(&record.usage_hours));
            let charge = record.monthly_charge.unwrap();
            assert!((20.0..150.0).contains(&charge));
            assert!(record.signup_date >= config.start_date && record.signup_date < end);
        }
    }

    #[test]
    fn test_without_charge() {
        let config = GeneratorConfig {
            monthly_charge: None,
            ..small_config(1)
        };
        let records = generate_records(config).unwrap();
        assert!(records.iter().all(|r| r.monthly_charge.is_none()));
    }

    #[test]
    fn test_invalid_config() {
        let bad_probability = GeneratorConfig {
            churn_probability: 1.5,
            ..Default::default()
        };
        assert!(RecordGenerator::new(bad_probability).is_err());

        let empty_usage = GeneratorConfig {
            usage_hours: 10..10,
            ..Default::default()
        };
        assert!(RecordGenerator::new(empty_usage).is_err());
    }

    #[test]
    fn test_signup_window_past_calendar_is_rejected() {
        for days in [i64::MAX, 10_000_000_000] {
            let config = GeneratorConfig {
                signup_window_days: days,
                ..Default::default()
            };
            let err = generate_records(config).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ValidationError>(),
                Some(ValidationError::InvalidParameter(_))
            ));
        }

        let config = GeneratorConfig {
            count: 50,
            signup_window_days: 36_500,
            ..Default::default()
        };
        assert_eq!(generate_records(config).unwrap().len(), 50);
    }
}
