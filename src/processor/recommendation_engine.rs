use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info};

use super::group_aggregator::{GroupAggregator, ALL_CAMPAIGNS};
use super::metrics_aggregator::OrderTotals;
use super::schema_normalizer::OrdersTable;
use crate::models::{AppliedRecommendations, Recommendation, RuleOverride};

pub const INCREASE_BUDGET: &str = "Increase Budget";
pub const DECREASE_BIDS: &str = "Decrease Bids";

/// Cost per conversion above which bids should come down.
const HIGH_COST_PER_CONVERSION: f64 = 500.0;

const INCREASE_BUDGET_BENEFIT: &str = "Predicted ROAS +0.05";
const DECREASE_BIDS_BENEFIT: &str = "Predicted ROAS +0.08";
const RULE_EXPLANATION: &str = "Rule-based recommendation";

pub struct RecommendationEngine {
    rules: Vec<RuleOverride>,
}

impl RecommendationEngine {
    pub fn new(rules: Vec<RuleOverride>) -> Self {
        RecommendationEngine { rules }
    }

    /// Campaign recommendations followed by rule overrides, deduplicated by id
    /// (first one wins) and cut to `limit`.
    pub fn recommend(&self, table: &OrdersTable, limit: usize) -> Result<Vec<Recommendation>> {
        let campaigns = GroupAggregator::new().campaign_totals(table)?;

        let mut recommendations: Vec<Recommendation> = campaigns
            .iter()
            .map(|(campaign, totals)| recommend_for_campaign(campaign, totals))
            .collect();

        for rule in &self.rules {
            let position = recommendations.len() + 1;
            recommendations.push(recommendation_from_rule(rule, position));
        }

        let candidates = recommendations.len();
        let mut unique = dedup_by_id(recommendations);
        unique.truncate(limit);

        info!(
            "Generated {} recommendations ({} candidates, {} rules, limit {})",
            unique.len(),
            candidates,
            self.rules.len(),
            limit
        );

        Ok(unique)
    }

    /// Echoes the ids a caller chose to apply. Nothing is persisted.
    pub fn apply(&self, ids: Vec<String>) -> AppliedRecommendations {
        debug!("Applying {} recommendations", ids.len());
        AppliedRecommendations {
            applied: ids,
            simulated: true,
        }
    }
}

/// Converts a signed caller-supplied limit; anything at or below zero means none.
pub fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

pub fn recommendation_id(campaign: &str) -> String {
    format!("rec-{}", campaign.to_lowercase().replace(' ', "-"))
}

fn recommend_for_campaign(campaign: &str, totals: &OrderTotals) -> Recommendation {
    let cost_per_conversion = totals.cost_per_conversion();
    let (action, benefit) = if cost_per_conversion > HIGH_COST_PER_CONVERSION {
        (DECREASE_BIDS, DECREASE_BIDS_BENEFIT)
    } else {
        (INCREASE_BUDGET, INCREASE_BUDGET_BENEFIT)
    };

    let explanation = format!(
        "Based on CPC={} and CVR={}, {} is expected to improve efficiency.",
        format_metric(cost_per_conversion, totals.conversions() == 0),
        format_metric(totals.conversion_rate(), totals.impressions() == 0),
        action.to_lowercase()
    );

    Recommendation {
        id: recommendation_id(campaign),
        campaign: campaign.to_string(),
        action: action.to_string(),
        benefit: benefit.to_string(),
        explanation,
        simulated: true,
    }
}

fn recommendation_from_rule(rule: &RuleOverride, position: usize) -> Recommendation {
    Recommendation {
        id: rule
            .id
            .clone()
            .unwrap_or_else(|| format!("rule-{}", position)),
        campaign: rule
            .campaign
            .clone()
            .unwrap_or_else(|| ALL_CAMPAIGNS.to_string()),
        action: rule
            .action
            .clone()
            .unwrap_or_else(|| INCREASE_BUDGET.to_string()),
        benefit: rule
            .benefit
            .clone()
            .unwrap_or_else(|| INCREASE_BUDGET_BENEFIT.to_string()),
        explanation: rule
            .explanation
            .clone()
            .unwrap_or_else(|| RULE_EXPLANATION.to_string()),
        simulated: true,
    }
}

fn dedup_by_id(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    recommendations
        .into_iter()
        .filter(|rec| seen.insert(rec.id.clone()))
        .collect()
}

/// Whole numbers keep one decimal place ("75.0"), everything else prints in
/// shortest form ("0.0011"). A zero standing in for an undefined ratio
/// (`guarded`) prints as a bare "0".
fn format_metric(value: f64, guarded: bool) -> String {
    if guarded {
        "0".to_string()
    } else if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
