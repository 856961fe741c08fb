use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub analytics: AnalyticsSection,
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Canonical layout (`order_date`, `quantity`, `final_amount`, ...).
    pub orders_csv: PathBuf,
    /// Alias layout (`OrderDate`, `UnitsSold`, `Revenue`, ...).
    pub sales_csv: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSection {
    pub default_window_days: i64,
    pub default_recommendation_limit: i64,
    pub export_recommendation_limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub output_dir: PathBuf,
}

/// Which of the two known CSV layouts to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    #[default]
    Orders,
    Sales,
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dashboard config file: {}", path.display()))?;

        let config: DashboardConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse dashboard config file: {}", path.display()))?;

        Ok(config)
    }

    /// Falls back to defaults only when the file does not exist; a file that
    /// exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Dashboard config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::from_file(path)
    }

    pub fn source_path(&self, source: SourceKind) -> &Path {
        match source {
            SourceKind::Orders => &self.data.orders_csv,
            SourceKind::Sales => &self.data.sales_csv,
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            orders_csv: PathBuf::from("data/demo_data_medium.csv"),
            sales_csv: PathBuf::from("data/demo_data_small.csv"),
        }
    }
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            default_recommendation_limit: 3,
            export_recommendation_limit: 10,
        }
    }
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("configs/rules.json"),
        }
    }
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
        }
    }
}
