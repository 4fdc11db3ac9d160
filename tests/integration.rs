//! Integration tests for ChurnForge

use churnforge::{
    compute_kpis, generate_records, load_records, pipeline, regional_churn, score_churn_risk,
    Args, GeneratorConfig, Region, ScorerConfig, ValidationError,
};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use tempfile::NamedTempFile;

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "customer_id,signup_date,usage_hours,monthly_charge,contract_type,churned"
    )
    .unwrap();

    // Light users on monthly contracts churn
    for i in 0..20 {
        writeln!(file, "{},2024-01-{:02},{},29.99,Monthly,1", 2000 + i, i + 1, 5 + i % 10).unwrap();
    }
    // Heavy users on longer contracts stay
    for i in 0..20 {
        writeln!(file, "{},2024-02-{:02},{},89.5,Two-Year,0", 3000 + i, i + 1, 35 + i % 10).unwrap();
    }

    file
}

#[test]
fn test_end_to_end_seeded_dataset() {
    let records = generate_records(GeneratorConfig::default()).unwrap();
    assert_eq!(records.len(), 1000);

    let kpis = compute_kpis(&records).unwrap();

    // 1000 draws with p = 0.22: sd ≈ 13.1, so ±60 is a wide band
    assert!(
        (160..=280).contains(&kpis.churned_customers),
        "churned count {} far from 220",
        kpis.churned_customers
    );
    assert_eq!(
        kpis.churned_customers,
        records.iter().filter(|r| r.churned).count()
    );
    assert!((kpis.churn_rate + kpis.retention_rate - 100.0).abs() < 1e-9);
}

#[test]
fn test_full_pipeline_from_generator() {
    let args = Args::parse_from(["churnforge", "--trees", "20", "--region-seed", "3"]);
    let (report, records) = pipeline::run(&args).unwrap();

    assert_eq!(report.kpis.total_customers, 1000);

    let clv = report.lifetime_value.as_ref().unwrap();
    assert_eq!(clv.high_usage_customers + clv.low_usage_customers, 1000);

    let risk = report.risk.as_ref().unwrap();
    assert_eq!(risk.test_size, 200);
    assert_eq!(risk.train_size, 800);
    assert!((0.0..=1.0).contains(&risk.accuracy));
    assert_eq!(report.top_risk.len(), 5);
    assert!(report
        .top_risk
        .windows(2)
        .all(|pair| pair[0].risk_score >= pair[1].risk_score));

    let cohorts = report.cohorts.as_ref().unwrap();
    assert_eq!(cohorts.cells.iter().map(|c| c.customers).sum::<usize>(), 1000);

    let regions = report.regions.as_ref().unwrap();
    assert!(Region::ALL.contains(&regions.highest_risk));

    let contracts = report.contracts.as_ref().unwrap();
    assert_eq!(contracts.iter().map(|c| c.customers).sum::<usize>(), 1000);
    assert_eq!(
        contracts.iter().map(|c| c.churned).sum::<usize>(),
        report.kpis.churned_customers
    );

    let usage = report.usage.as_ref().unwrap();
    let retained = usage.retained.as_ref().unwrap();
    let churned = usage.churned.as_ref().unwrap();
    assert_eq!(retained.customers + churned.customers, 1000);
    assert!(churned.min <= churned.q1 && churned.q1 <= churned.median);
    assert!(churned.median <= churned.q3 && churned.q3 <= churned.max);

    let text = report.to_string();
    assert!(text.contains("=== Churn by Contract Type ==="));
    assert!(text.contains("=== Usage by Churn Status ==="));

    for record in &records {
        assert!(record.region.is_some());
        let score = record.risk_score.unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(
            record.lifetime_value.unwrap(),
            record.monthly_charge.unwrap() * record.predicted_lifespan.unwrap() as f64
        );
    }
}

#[test]
fn test_pipeline_is_reproducible_with_seeds() {
    let args = Args::parse_from(["churnforge", "-n", "300", "--trees", "10", "--region-seed", "11"]);
    let (first, _) = pipeline::run(&args).unwrap();
    let (second, _) = pipeline::run(&args).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_pipeline_from_csv_with_export() {
    let input = create_test_csv();
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("enriched.csv");

    let args = Args::parse_from([
        "churnforge",
        "--input",
        input.path().to_str().unwrap(),
        "--trees",
        "10",
        "--region-seed",
        "1",
        "--export",
        export.to_str().unwrap(),
    ]);
    let (report, records) = pipeline::run(&args).unwrap();

    assert_eq!(report.kpis.total_customers, 40);
    assert_eq!(report.kpis.churned_customers, 20);
    assert_eq!(report.kpis.churn_rate, 50.0);
    assert_eq!(report.risk.as_ref().unwrap().test_size, 8);

    let cohorts = report.cohorts.as_ref().unwrap();
    assert_eq!(cohorts.months(), vec!["2024-01", "2024-02"]);

    assert!(export.exists());
    let reloaded = load_records(&export).unwrap();
    assert_eq!(reloaded.len(), records.len());
    assert_eq!(reloaded[0].customer_id, 2000);
    assert_eq!(reloaded[0].monthly_charge, Some(29.99));
}

#[test]
fn test_csv_without_charges_skips_value_stages() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customer_id,signup_date,usage_hours,contract_type,churned").unwrap();
    writeln!(file, "1,2024-03-01,12,Monthly,1").unwrap();
    writeln!(file, "2,2024-03-15,40,One-Year,0").unwrap();

    let args = Args::parse_from([
        "churnforge",
        "--input",
        file.path().to_str().unwrap(),
        "--region-seed",
        "9",
    ]);
    let (report, _) = pipeline::run(&args).unwrap();

    assert!(report.lifetime_value.is_none());
    assert!(report.risk.is_none());
    assert!(report.regions.is_some());
    assert_eq!(report.kpis.retention_rate, 50.0);
}

#[test]
fn test_risk_accuracy_uses_held_out_rows() {
    let mut records = generate_records(GeneratorConfig {
        count: 250,
        ..Default::default()
    })
    .unwrap();
    let config = ScorerConfig {
        n_trees: 10,
        ..Default::default()
    };
    let report = score_churn_risk(&mut records, &config).unwrap();

    assert_eq!(report.test_size, 50);
    assert_eq!(report.train_size + report.test_size, 250);
    assert!(records.iter().all(|r| r.risk_score.is_some()));
}

#[test]
fn test_regions_are_a_fixed_set() {
    let mut records = generate_records(GeneratorConfig::default()).unwrap();
    churnforge::assign_regions(&mut records, &mut ChaCha8Rng::seed_from_u64(2024));
    let report = regional_churn(&records).unwrap();

    assert!(report.regions.len() <= 4);
    assert!(report.regions.iter().all(|r| (0.0..=1.0).contains(&r.churn_rate)));
}

#[test]
fn test_error_handling_empty_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customer_id,signup_date,usage_hours,contract_type,churned").unwrap();

    let args = Args::parse_from(["churnforge", "--input", file.path().to_str().unwrap()]);
    let err = pipeline::run(&args).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::EmptyDataset)
    );
}
