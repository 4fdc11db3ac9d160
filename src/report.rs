//! Text and JSON rendering of analysis results

use crate::breakdown::{ContractChurn, UsageByChurn, UsageStats};
use crate::cohort::CohortGrid;
use crate::kpi::{KpiSummary, LifetimeValueSummary};
use crate::model::RiskReport;
use crate::record::{ContractType, CustomerRecord};
use crate::region::RegionalReport;
use serde::Serialize;
use std::fmt;

/// One row of the high-risk customer table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEntry {
    pub customer_id: i64,
    pub usage_hours: u32,
    pub contract: ContractType,
    pub risk_score: f64,
}

impl RiskEntry {
    pub fn from_record(record: &CustomerRecord) -> Option<Self> {
        Some(Self {
            customer_id: record.customer_id,
            usage_hours: record.usage_hours,
            contract: record.contract,
            risk_score: record.risk_score?,
        })
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub kpis: KpiSummary,
    pub lifetime_value: Option<LifetimeValueSummary>,
    pub cohorts: Option<CohortGrid>,
    pub contracts: Option<Vec<ContractChurn>>,
    pub usage: Option<UsageByChurn>,
    pub risk: Option<RiskReport>,
    pub top_risk: Vec<RiskEntry>,
    pub regions: Option<RegionalReport>,
}

impl AnalysisReport {
    pub fn new(kpis: KpiSummary) -> Self {
        Self {
            kpis,
            lifetime_value: None,
            cohorts: None,
            contracts: None,
            usage: None,
            risk: None,
            top_risk: Vec::new(),
            regions: None,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Plain-text report
impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kpis = &self.kpis;
        writeln!(f, "=== Executive Summary ===")?;
        writeln!(f, "Total Unique Customers: {}", kpis.total_customers)?;
        writeln!(f, "Churned Customers: {}", kpis.churned_customers)?;
        writeln!(f, "Retained Customers: {}", kpis.retained_customers)?;
        writeln!(f, "Retention Rate: {:.2}%", kpis.retention_rate)?;
        writeln!(f, "Churn Rate: {:.2}%", kpis.churn_rate)?;

        if let Some(clv) = &self.lifetime_value {
            writeln!(f, "\n=== Customer Lifetime Value ===")?;
            writeln!(
                f,
                "High usage (12 months): {} customers, mean CLV {}",
                clv.high_usage_customers,
                format_optional(clv.mean_clv_high_usage)
            )?;
            writeln!(
                f,
                "Low usage (6 months):   {} customers, mean CLV {}",
                clv.low_usage_customers,
                format_optional(clv.mean_clv_low_usage)
            )?;
            if let Some(ratio) = clv.high_to_low_ratio {
                writeln!(f, "High/low CLV ratio: {:.2}x", ratio)?;
            }
            writeln!(f, "Total CLV: {:.2}", clv.total_clv)?;
        }

        if let Some(grid) = &self.cohorts {
            writeln!(f, "\n=== Cohort Churn (by signup month) ===")?;
            write!(f, "  Month  ")?;
            for contract in ContractType::ALL {
                write!(f, " | {:>8}", contract.as_str())?;
            }
            writeln!(f)?;
            for month in grid.months() {
                write!(f, "  {:7}", month)?;
                for contract in ContractType::ALL {
                    match grid.get(month, contract) {
                        Some(rate) => write!(f, " | {:>7.1}%", rate * 100.0)?,
                        None => write!(f, " | {:>8}", "-")?,
                    }
                }
                writeln!(f)?;
            }
        }

        if let Some(contracts) = &self.contracts {
            writeln!(f, "\n=== Churn by Contract Type ===")?;
            writeln!(f, "  Contract | Customers | Churned | Retained | Churn")?;
            for row in contracts {
                writeln!(
                    f,
                    "  {:8} | {:9} | {:7} | {:8} | {:5.1}%",
                    row.contract.as_str(),
                    row.customers,
                    row.churned,
                    row.retained,
                    row.churn_rate * 100.0
                )?;
            }
        }

        if let Some(usage) = &self.usage {
            writeln!(f, "\n=== Usage by Churn Status ===")?;
            writeln!(f, "  Status   |     N |  Mean |  Min |   Q1 | Median |   Q3 |  Max")?;
            write_usage_row(f, "Retained", usage.retained.as_ref())?;
            write_usage_row(f, "Churned", usage.churned.as_ref())?;
        }

        if let Some(risk) = &self.risk {
            writeln!(f, "\n=== Churn Risk Model ===")?;
            writeln!(
                f,
                "Held-out accuracy: {:.2}% ({} train / {} test)",
                risk.accuracy * 100.0,
                risk.train_size,
                risk.test_size
            )?;
            writeln!(f, "Feature importances:")?;
            for (name, importance) in &risk.feature_importances {
                writeln!(f, "  {:<15} {:.4}", name, importance)?;
            }
            if !self.top_risk.is_empty() {
                writeln!(f, "Top {} high-risk customers:", self.top_risk.len())?;
                writeln!(f, "  Customer | Usage | Contract | Risk")?;
                for entry in &self.top_risk {
                    writeln!(
                        f,
                        "  {:8} | {:5} | {:8} | {:.2}",
                        entry.customer_id,
                        entry.usage_hours,
                        entry.contract.as_str(),
                        entry.risk_score
                    )?;
                }
            }
        }

        if let Some(regions) = &self.regions {
            writeln!(f, "\n=== Regional Churn ===")?;
            for entry in &regions.regions {
                writeln!(
                    f,
                    "  {:<6} {:6.2}% ({} customers)",
                    entry.region.as_str(),
                    entry.churn_rate * 100.0,
                    entry.customers
                )?;
            }
            writeln!(f, "Highest-risk region: {}", regions.highest_risk)?;
        }

        Ok(())
    }
}

fn write_usage_row(f: &mut fmt::Formatter<'_>, label: &str, stats: Option<&UsageStats>) -> fmt::Result {
    match stats {
        Some(s) => writeln!(
            f,
            "  {:8} | {:5} | {:5.1} | {:4.0} | {:4.1} | {:6.1} | {:4.1} | {:4.0}",
            label, s.customers, s.mean, s.min, s.q1, s.median, s.q3, s.max
        ),
        None => writeln!(f, "  {:8} |     0 | no customers", label),
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortCell;
    use crate::record::Region;
    use crate::region::RegionChurn;

    fn kpis() -> KpiSummary {
        KpiSummary {
            total_customers: 1000,
            churned_customers: 220,
            retained_customers: 780,
            churn_rate: 22.0,
            retention_rate: 78.0,
        }
    }

    #[test]
    fn test_render_summary_only() {
        let text = AnalysisReport::new(kpis()).to_string();
        assert!(text.contains("Total Unique Customers: 1000"));
        assert!(text.contains("Retention Rate: 78.00%"));
        assert!(text.contains("Churn Rate: 22.00%"));
        assert!(!text.contains("Regional Churn"));
        assert!(!text.contains("Churn by Contract Type"));
    }

    #[test]
    fn test_render_all_sections() {
        let mut report = AnalysisReport::new(kpis());
        report.cohorts = Some(CohortGrid {
            cells: vec![CohortCell {
                signup_month: "2024-01".into(),
                contract: ContractType::Monthly,
                churn_rate: 0.25,
                customers: 4,
            }],
        });
        report.contracts = Some(vec![ContractChurn {
            contract: ContractType::OneYear,
            customers: 8,
            churned: 2,
            retained: 6,
            churn_rate: 0.25,
        }]);
        report.usage = Some(UsageByChurn {
            retained: UsageStats::from_hours(&[40.0, 50.0]),
            churned: None,
        });
        report.risk = Some(RiskReport {
            accuracy: 0.75,
            train_size: 800,
            test_size: 200,
            feature_importances: vec![("usage_hours".into(), 1.0)],
        });
        report.top_risk = vec![RiskEntry {
            customer_id: 1042,
            usage_hours: 7,
            contract: ContractType::Monthly,
            risk_score: 0.93,
        }];
        report.regions = Some(RegionalReport {
            regions: vec![RegionChurn {
                region: Region::South,
                churn_rate: 0.3,
                customers: 10,
            }],
            highest_risk: Region::South,
        });

        let text = report.to_string();
        assert!(text.contains("25.0%"));
        assert!(text.contains("One-Year |         8 |       2 |        6 |  25.0%"));
        assert!(text.contains("Usage by Churn Status"));
        assert!(text.contains("Churned  |     0 | no customers"));
        assert!(text.contains("Median"));
        assert!(text.contains("Held-out accuracy: 75.00% (800 train / 200 test)"));
        assert!(text.contains("1042"));
        assert!(text.contains("Highest-risk region: South"));
    }

    #[test]
    fn test_json() {
        let json = AnalysisReport::new(kpis()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kpis"]["churned_customers"], 220);
        assert!(value["risk"].is_null());
        assert!(value["contracts"].is_null());
    }
}
