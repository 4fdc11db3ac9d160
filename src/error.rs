//! Validation errors raised by the analytics pipeline

use thiserror::Error;

/// Domain failures that would otherwise surface as NaN rates or panics
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("duplicate customer id {customer_id} at row {row}")]
    DuplicateCustomerId { customer_id: i64, row: usize },

    #[error("customer {customer_id} has no monthly charge")]
    MissingCharge { customer_id: i64 },

    #[error("customer {customer_id} has no region assigned")]
    MissingRegion { customer_id: i64 },

    #[error("churn target contains a single class; both churned and retained customers are required")]
    SingleClass,

    #[error("not enough records to split: {0}")]
    InsufficientData(String),

    #[error("unknown contract type: {0:?}")]
    UnknownContractType(String),

    #[error("unknown region: {0:?}")]
    UnknownRegion(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("missing value in column {column} at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("invalid signup date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid churn flag {value} at row {row}, expected 0 or 1")]
    InvalidChurnFlag { value: i64, row: usize },

    #[error("invalid value {value} in column {column} at row {row}")]
    InvalidValue {
        column: String,
        value: String,
        row: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
