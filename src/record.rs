//! Customer records and the categorical fields attached to them

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription contract length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "Monthly")]
    Monthly,
    #[serde(rename = "One-Year")]
    OneYear,
    #[serde(rename = "Two-Year")]
    TwoYear,
}

impl ContractType {
    pub const ALL: [ContractType; 3] = [
        ContractType::Monthly,
        ContractType::OneYear,
        ContractType::TwoYear,
    ];

    /// Numeric feature code fed to the risk model
    pub fn code(self) -> u8 {
        match self {
            ContractType::Monthly => 0,
            ContractType::OneYear => 1,
            ContractType::TwoYear => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContractType::Monthly => "Monthly",
            ContractType::OneYear => "One-Year",
            ContractType::TwoYear => "Two-Year",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractType::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownContractType(s.to_string()))
    }
}

/// Sales region used for geographical churn analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::North, Region::South, Region::East, Region::West];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::North => "North",
            Region::South => "South",
            Region::East => "East",
            Region::West => "West",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownRegion(s.to_string()))
    }
}

/// One subscriber row, plus the fields derived from it by later stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub signup_date: NaiveDate,
    /// Monthly usage hours
    pub usage_hours: u32,
    /// Not every dataset variant carries pricing
    pub monthly_charge: Option<f64>,
    pub contract: ContractType,
    pub churned: bool,
    /// Predicted lifespan in months
    pub predicted_lifespan: Option<u32>,
    pub lifetime_value: Option<f64>,
    pub region: Option<Region>,
    /// Churn probability in [0, 1]
    pub risk_score: Option<f64>,
}

impl CustomerRecord {
    pub fn new(
        customer_id: i64,
        signup_date: NaiveDate,
        usage_hours: u32,
        monthly_charge: Option<f64>,
        contract: ContractType,
        churned: bool,
    ) -> Self {
        Self {
            customer_id,
            signup_date,
            usage_hours,
            monthly_charge,
            contract,
            churned,
            predicted_lifespan: None,
            lifetime_value: None,
            region: None,
            risk_score: None,
        }
    }

    /// Cohort key, e.g. `2024-03`
    pub fn signup_month(&self) -> String {
        self.signup_date.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_round_trip_and_codes() {
        for (contract, code) in ContractType::ALL.into_iter().zip(0u8..) {
            assert_eq!(contract.code(), code);
            assert_eq!(contract.as_str().parse::<ContractType>().unwrap(), contract);
        }
        assert_eq!(ContractType::OneYear.to_string(), "One-Year");
    }

    #[test]
    fn test_unknown_contract_is_rejected() {
        let err = "Quarterly".parse::<ContractType>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownContractType("Quarterly".into()));
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(" West ".parse::<Region>().unwrap(), Region::West);
        assert!("Central".parse::<Region>().is_err());
    }

    #[test]
    fn test_signup_month() {
        let record = CustomerRecord::new(
            1,
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            10,
            None,
            ContractType::Monthly,
            false,
        );
        assert_eq!(record.signup_month(), "2024-03");
        assert!(record.risk_score.is_none());
    }
}
