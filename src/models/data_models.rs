use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub impressions: i64,
    pub reach: i64,
    pub frequency: f64,
    pub conversions: i64,
    pub revenue: f64,
    pub cost: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
    /// `None` when there was no spend to divide by.
    pub roas: Option<f64>,
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub campaign: String,
    pub cost_per_conversion: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    pub region: String,
    pub category: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub campaign: String,
    pub action: String,
    pub benefit: String,
    pub explanation: String,
    pub simulated: bool,
}

/// A partial recommendation supplied by the rules file. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    pub id: Option<String>,
    pub campaign: Option<String>,
    pub action: Option<String>,
    pub benefit: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRecommendations {
    pub applied: Vec<String>,
    pub simulated: bool,
}
