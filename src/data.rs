//! Dataset loading, export and DataFrame conversion using Polars

use crate::error::ValidationError;
use crate::record::{ContractType, CustomerRecord};
use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Columns every input file must provide
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "customer_id",
    "signup_date",
    "usage_hours",
    "contract_type",
    "churned",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build a DataFrame with one row per record, including derived fields
///
/// Columns: `customer_id`, `signup_date`, `signup_month`, `usage_hours`,
/// `monthly_charge`, `contract_type`, `contract_code`, `churned`,
/// `predicted_lifespan`, `lifetime_value`, `region`, `risk_score`.
pub fn records_to_frame(records: &[CustomerRecord]) -> crate::Result<DataFrame> {
    let customer_ids: Vec<i64> = records.iter().map(|r| r.customer_id).collect();
    let signup_dates: Vec<String> = records
        .iter()
        .map(|r| r.signup_date.format(DATE_FORMAT).to_string())
        .collect();
    let signup_months: Vec<String> = records.iter().map(|r| r.signup_month()).collect();
    let usage_hours: Vec<i64> = records.iter().map(|r| r.usage_hours as i64).collect();
    let charges: Vec<Option<f64>> = records.iter().map(|r| r.monthly_charge).collect();
    let contracts: Vec<&str> = records.iter().map(|r| r.contract.as_str()).collect();
    let contract_codes: Vec<i64> = records.iter().map(|r| r.contract.code() as i64).collect();
    let churned: Vec<bool> = records.iter().map(|r| r.churned).collect();
    let lifespans: Vec<Option<i64>> = records
        .iter()
        .map(|r| r.predicted_lifespan.map(i64::from))
        .collect();
    let lifetime_values: Vec<Option<f64>> = records.iter().map(|r| r.lifetime_value).collect();
    let regions: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.region.map(|region| region.as_str()))
        .collect();
    let risk_scores: Vec<Option<f64>> = records.iter().map(|r| r.risk_score).collect();

    let df = DataFrame::new(vec![
        Series::new("customer_id", customer_ids),
        Series::new("signup_date", signup_dates),
        Series::new("signup_month", signup_months),
        Series::new("usage_hours", usage_hours),
        Series::new("monthly_charge", charges),
        Series::new("contract_type", contracts),
        Series::new("contract_code", contract_codes),
        Series::new("churned", churned),
        Series::new("predicted_lifespan", lifespans),
        Series::new("lifetime_value", lifetime_values),
        Series::new("region", regions),
        Series::new("risk_score", risk_scores),
    ])?;

    Ok(df)
}

/// Load customer records from a CSV file
///
/// # Arguments
/// * `file_path` - Path to a CSV with at least the [`REQUIRED_COLUMNS`];
///   `monthly_charge` is read when present
///
/// # Returns
/// * Records in file order, with derived fields unset
pub fn load_records(file_path: impl AsRef<Path>) -> crate::Result<Vec<CustomerRecord>> {
    let file_path = file_path.as_ref();
    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .finish()
        .and_then(|lf| lf.collect())
        .with_context(|| format!("failed to read CSV {}", file_path.display()))?;

    let records = frame_to_records(&df)?;
    tracing::info!(
        path = %file_path.display(),
        records = records.len(),
        "loaded customer records"
    );
    Ok(records)
}

/// Convert a DataFrame with the input schema back into records
pub fn frame_to_records(df: &DataFrame) -> crate::Result<Vec<CustomerRecord>> {
    let present = df.get_column_names();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !present.contains(*name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns(missing).into());
    }

    let dates_series = df.column("signup_date")?.cast(&DataType::String)?;
    let contract_series = df.column("contract_type")?.cast(&DataType::String)?;

    let ids = integer_column(df, "customer_id")?;
    let dates: Vec<Option<&str>> = dates_series.str()?.into_iter().collect();
    let usage = integer_column(df, "usage_hours")?;
    let contracts: Vec<Option<&str>> = contract_series.str()?.into_iter().collect();
    let churn_flags = integer_column(df, "churned")?;

    let charges: Option<Vec<Option<f64>>> = if present.contains(&"monthly_charge") {
        let charge_series = df.column("monthly_charge")?.cast(&DataType::Float64)?;
        let values = charge_series.f64()?.into_iter().collect();
        Some(values)
    } else {
        None
    };

    let mut seen_ids = HashSet::with_capacity(df.height());
    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let customer_id = required(ids[row], "customer_id", row)?;
        if !seen_ids.insert(customer_id) {
            return Err(ValidationError::DuplicateCustomerId { customer_id, row }.into());
        }

        let date_str = required(dates[row], "signup_date", row)?;
        let signup_date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(date_str.to_string()))?;

        let hours = required(usage[row], "usage_hours", row)?;
        let usage_hours = u32::try_from(hours).map_err(|_| ValidationError::InvalidValue {
            column: "usage_hours".into(),
            value: hours.to_string(),
            row,
        })?;

        let contract: ContractType = required(contracts[row], "contract_type", row)?.parse()?;

        let churned = match required(churn_flags[row], "churned", row)? {
            0 => false,
            1 => true,
            value => return Err(ValidationError::InvalidChurnFlag { value, row }.into()),
        };

        let monthly_charge = charges.as_ref().and_then(|values| values[row]);

        records.push(CustomerRecord::new(
            customer_id,
            signup_date,
            usage_hours,
            monthly_charge,
            contract,
            churned,
        ));
    }

    Ok(records)
}

/// Read an integer-valued column without truncating fractional cells
///
/// Integer and boolean columns are widened to i64. Float columns are
/// accepted only when every cell is a whole number, and string columns only
/// when every cell parses as an integer.
fn integer_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let series = df.column(name)?;
    let invalid = |value: String, row: usize| ValidationError::InvalidValue {
        column: name.to_string(),
        value,
        row,
    };

    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let floats = series.cast(&DataType::Float64)?;
            let mut values = Vec::with_capacity(floats.len());
            for (row, cell) in floats.f64()?.into_iter().enumerate() {
                match cell {
                    Some(value) if !value.is_finite() || value.fract() != 0.0 => {
                        return Err(invalid(value.to_string(), row).into())
                    }
                    Some(value) => values.push(Some(value as i64)),
                    None => values.push(None),
                }
            }
            Ok(values)
        }
        DataType::String => {
            let mut values = Vec::with_capacity(series.len());
            for (row, cell) in series.str()?.into_iter().enumerate() {
                match cell {
                    Some(text) => {
                        let value = text
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| invalid(text.to_string(), row))?;
                        values.push(Some(value));
                    }
                    None => values.push(None),
                }
            }
            Ok(values)
        }
        dtype if dtype.is_integer() || *dtype == DataType::Boolean => {
            let integers = series.cast(&DataType::Int64)?;
            let values = integers.i64()?.into_iter().collect();
            Ok(values)
        }
        dtype => Err(invalid(format!("{} column", dtype), 0).into()),
    }
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingValue {
        column: column.to_string(),
        row,
    })
}

/// Write records, including derived fields, to a CSV file
pub fn save_records(records: &[CustomerRecord], file_path: impl AsRef<Path>) -> crate::Result<()> {
    let file_path = file_path.as_ref();
    let mut df = records_to_frame(records)?;
    let mut file = File::create(file_path)
        .with_context(|| format!("failed to create {}", file_path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    tracing::info!(
        path = %file_path.display(),
        records = records.len(),
        "exported enriched dataset"
    );
    Ok(())
}
