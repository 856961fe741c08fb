use anyhow::{Context, Result};
use tracing::info;

use crate::config::{DashboardConfig, RulesConfig, SourceKind};
use crate::fetcher::CsvFetcher;
use crate::models::{AggregatedMetrics, AppliedRecommendations, PivotRow, Recommendation, ScatterPoint};
use crate::processor::{
    clamp_limit, Field, GroupAggregator, MetricsAggregator, OrdersTable, RecommendationEngine,
    WindowFilter,
};
use crate::storage::{ExportManifest, ExportWriter};

/// Runs one dashboard request end to end. The order table is read fresh on
/// every call; only the configuration and rule overrides are held.
pub struct DashboardPipeline {
    config: DashboardConfig,
    fetcher: CsvFetcher,
    metrics: MetricsAggregator,
    groups: GroupAggregator,
    recommender: RecommendationEngine,
}

impl DashboardPipeline {
    pub fn new(config: DashboardConfig, rules: RulesConfig) -> Self {
        DashboardPipeline {
            config,
            fetcher: CsvFetcher::new(),
            metrics: MetricsAggregator::new(),
            groups: GroupAggregator::new(),
            recommender: RecommendationEngine::new(rules.rules),
        }
    }

    pub fn metrics(&self, source: SourceKind, window_days: Option<i64>) -> Result<AggregatedMetrics> {
        let table = self.windowed_table(source, window_days)?;
        self.metrics.aggregate(&table)
    }

    pub fn scatter(&self, source: SourceKind, window_days: Option<i64>) -> Result<Vec<ScatterPoint>> {
        let table = self.windowed_table(source, window_days)?;
        self.groups.scatter(&table)
    }

    pub fn pivot(&self, source: SourceKind, window_days: Option<i64>) -> Result<Vec<PivotRow>> {
        let table = self.windowed_table(source, window_days)?;
        self.groups.pivot(&table)
    }

    /// Recommendations look at the whole table, never a window.
    pub fn recommendations(&self, source: SourceKind, limit: Option<i64>) -> Result<Vec<Recommendation>> {
        let table = self.load(source)?;
        let limit = limit.unwrap_or(self.config.analytics.default_recommendation_limit);
        self.recommender.recommend(&table, clamp_limit(limit))
    }

    pub fn apply(&self, ids: Vec<String>) -> AppliedRecommendations {
        self.recommender.apply(ids)
    }

    pub fn export(&self, source: SourceKind) -> Result<ExportManifest> {
        let table = self.load(source)?;
        let metrics = self.metrics.aggregate(&table)?;
        let limit = clamp_limit(self.config.analytics.export_recommendation_limit);
        let recommendations = self.recommender.recommend(&table, limit)?;

        ExportWriter::new(self.config.export.output_dir.clone())
            .write(&metrics, &recommendations)
            .context("Failed to write presentation export")
    }

    fn load(&self, source: SourceKind) -> Result<OrdersTable> {
        let path = self.config.source_path(source);
        info!("Reading {:?} orders from {}", source, path.display());
        self.fetcher.load(path)
    }

    fn windowed_table(&self, source: SourceKind, window_days: Option<i64>) -> Result<OrdersTable> {
        let table = self.load(source)?;
        let window_days = window_days.unwrap_or(self.config.analytics.default_window_days);
        WindowFilter.filter(&table, Field::OrderDate, window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleOverride;
    use std::path::PathBuf;

    const ORDERS_CSV: &str = "order_date,customer_id,product_category,region,quantity,final_amount
2024-03-01,c1,Garden,East,1,200
2024-03-20,c2,Garden,West,2,300
2024-03-28,c3,Kitchen,East,1,1000
2024-03-30,c1,Kitchen,East,1,1000
";

    fn write_fixture(dir: &PathBuf) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("orders.csv");
        std::fs::write(&path, ORDERS_CSV).unwrap();
        path
    }

    fn pipeline_with(rules: Vec<RuleOverride>) -> (DashboardPipeline, PathBuf) {
        let dir = std::env::temp_dir().join(format!("campaign-insights-{}", uuid::Uuid::new_v4()));
        let mut config = DashboardConfig::default();
        config.data.orders_csv = write_fixture(&dir);
        config.export.output_dir = dir.join("exports");
        (DashboardPipeline::new(config, RulesConfig { rules }), dir)
    }

    #[test]
    fn test_metrics_respect_window() {
        let (pipeline, dir) = pipeline_with(Vec::new());

        let all = pipeline.metrics(SourceKind::Orders, Some(365)).unwrap();
        assert_eq!(all.conversions, 4);
        assert_eq!(all.reach, 3);

        let recent = pipeline.metrics(SourceKind::Orders, Some(10)).unwrap();
        assert_eq!(recent.conversions, 3);
        assert_eq!(recent.revenue, 2300.0);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_scatter_and_pivot_within_default_window() {
        let (pipeline, dir) = pipeline_with(Vec::new());

        let points = pipeline.scatter(SourceKind::Orders, None).unwrap();
        assert_eq!(points.len(), 2);
        // Kitchen: revenue 2000 -> cost 1200 over 2 orders
        let kitchen = points.iter().find(|p| p.campaign == "Kitchen").unwrap();
        assert_eq!(kitchen.cost_per_conversion, 600.0);

        let rows = pipeline.pivot(SourceKind::Orders, None).unwrap();
        let east_kitchen = rows
            .iter()
            .find(|r| r.region == "East" && r.category == "Kitchen")
            .unwrap();
        assert_eq!(east_kitchen.revenue, 2000.0);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_recommendations_use_default_limit_and_rules() {
        let (pipeline, dir) = pipeline_with(vec![RuleOverride {
            id: Some("rule-brand".to_string()),
            ..Default::default()
        }]);

        let recs = pipeline.recommendations(SourceKind::Orders, None).unwrap();
        let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rec-garden", "rec-kitchen", "rule-brand"]);
        assert_eq!(recs[1].action, "Decrease Bids");

        assert!(pipeline.recommendations(SourceKind::Orders, Some(-1)).unwrap().is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_export_writes_both_sheets() {
        let (pipeline, dir) = pipeline_with(Vec::new());

        let manifest = pipeline.export(SourceKind::Orders).unwrap();
        assert!(manifest.metrics_path.exists());
        assert!(manifest.recommendations_path.exists());
        assert!(manifest.directory.starts_with(dir.join("exports")));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_source_file_is_an_error() {
        let mut config = DashboardConfig::default();
        config.data.sales_csv = PathBuf::from("/no/such/sales.csv");
        let pipeline = DashboardPipeline::new(config, RulesConfig::default());

        assert!(pipeline.metrics(SourceKind::Sales, None).is_err());
    }
}
