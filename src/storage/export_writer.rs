use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use super::storage_manager::StorageManager;
use crate::models::{AggregatedMetrics, Recommendation};

pub const METRICS_SHEET: &str = "Metrics";
pub const RECOMMENDATIONS_SHEET: &str = "Recommendations";

/// Where one export landed. Each sheet is a CSV file named after it.
#[derive(Debug, Clone)]
pub struct ExportManifest {
    pub directory: PathBuf,
    pub metrics_path: PathBuf,
    pub recommendations_path: PathBuf,
}

pub struct ExportWriter {
    output_root: PathBuf,
}

impl ExportWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        ExportWriter {
            output_root: output_root.into(),
        }
    }

    pub fn write(
        &self,
        metrics: &AggregatedMetrics,
        recommendations: &[Recommendation],
    ) -> Result<ExportManifest> {
        let directory = StorageManager::generate_export_dir(&self.output_root);
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create export directory: {}", directory.display()))?;

        let metrics_path = directory.join(format!("{}.csv", METRICS_SHEET));
        let mut metrics_frame = metrics_sheet(metrics)?;
        write_sheet(&mut metrics_frame, &metrics_path)?;

        let recommendations_path = directory.join(format!("{}.csv", RECOMMENDATIONS_SHEET));
        let mut recommendations_frame = recommendations_sheet(recommendations)?;
        write_sheet(&mut recommendations_frame, &recommendations_path)?;

        info!(
            "Exported metrics and {} recommendations to {}",
            recommendations.len(),
            directory.display()
        );

        Ok(ExportManifest {
            directory,
            metrics_path,
            recommendations_path,
        })
    }
}

fn metrics_sheet(metrics: &AggregatedMetrics) -> Result<DataFrame> {
    let frame = df!(
        "impressions" => [metrics.impressions],
        "reach" => [metrics.reach],
        "frequency" => [metrics.frequency],
        "conversions" => [metrics.conversions],
        "revenue" => [metrics.revenue],
        "cost" => [metrics.cost],
        "cpc" => [metrics.cpc],
        "conversion_rate" => [metrics.conversion_rate],
        "roas" => [metrics.roas],
        "simulated" => [metrics.simulated]
    )?;
    Ok(frame)
}

fn recommendations_sheet(recommendations: &[Recommendation]) -> Result<DataFrame> {
    let frame = df!(
        "id" => text_column(recommendations, |r| r.id.as_str()),
        "campaign" => text_column(recommendations, |r| r.campaign.as_str()),
        "action" => text_column(recommendations, |r| r.action.as_str()),
        "benefit" => text_column(recommendations, |r| r.benefit.as_str()),
        "explanation" => text_column(recommendations, |r| r.explanation.as_str()),
        "simulated" => recommendations.iter().map(|r| r.simulated).collect::<Vec<bool>>()
    )?;
    Ok(frame)
}

fn text_column<'a>(
    recommendations: &'a [Recommendation],
    get: impl Fn(&'a Recommendation) -> &'a str,
) -> Vec<&'a str> {
    recommendations.iter().map(get).collect()
}

fn write_sheet(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create sheet: {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)
        .with_context(|| format!("Failed to write sheet: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics() -> AggregatedMetrics {
        AggregatedMetrics {
            impressions: 1800,
            reach: 1,
            frequency: 1800.0,
            conversions: 2,
            revenue: 0.0,
            cost: 150.0,
            cpc: 75.0,
            conversion_rate: 0.0011,
            roas: None,
            simulated: true,
        }
    }

    fn sample_recommendation() -> Recommendation {
        Recommendation {
            id: "rec-a".to_string(),
            campaign: "A".to_string(),
            action: "Increase Budget".to_string(),
            benefit: "Predicted ROAS +0.05".to_string(),
            explanation: "Rule-based recommendation".to_string(),
            simulated: true,
        }
    }

    #[test]
    fn test_write_two_sheets() {
        let root = std::env::temp_dir().join(format!("campaign-insights-{}", uuid::Uuid::new_v4()));
        let writer = ExportWriter::new(root.clone());

        let manifest = writer
            .write(&sample_metrics(), &[sample_recommendation()])
            .unwrap();

        let metrics = std::fs::read_to_string(&manifest.metrics_path).unwrap();
        let mut lines = metrics.lines();
        assert_eq!(
            lines.next().unwrap(),
            "impressions,reach,frequency,conversions,revenue,cost,cpc,conversion_rate,roas,simulated"
        );
        assert!(lines.next().unwrap().starts_with("1800,1,"));

        let recommendations = std::fs::read_to_string(&manifest.recommendations_path).unwrap();
        assert!(recommendations.starts_with("id,campaign,action,benefit,explanation,simulated"));
        assert!(recommendations.contains("rec-a"));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_empty_recommendation_sheet_has_header() {
        let frame = recommendations_sheet(&[]).unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.width(), 6);
    }
}
