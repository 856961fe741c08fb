use anyhow::Result;
use std::collections::HashSet;
use tracing::debug;

use super::schema_normalizer::{Field, OrdersTable};
use crate::models::AggregatedMetrics;

const IMPRESSIONS_PER_UNIT: f64 = 120.0;
const SPEND_SHARE_OF_REVENUE: f64 = 0.6;
const SPEND_PER_UNIT: f64 = 10.0;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Order count, units and revenue of a set of rows, plus the simulated
/// advertising figures derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderTotals {
    pub orders: usize,
    pub quantity: f64,
    pub revenue: f64,
}

impl OrderTotals {
    pub fn add_row(&mut self, quantity: Option<f64>, revenue: Option<f64>) {
        self.orders += 1;
        self.quantity += quantity.unwrap_or(0.0);
        self.revenue += revenue.unwrap_or(0.0);
    }

    pub fn impressions(&self) -> i64 {
        (self.quantity * IMPRESSIONS_PER_UNIT).trunc() as i64
    }

    pub fn conversions(&self) -> i64 {
        self.orders as i64
    }

    /// Branches on the revenue value: a revenue of exactly zero falls back to
    /// the unit-based spend.
    pub fn cost(&self) -> f64 {
        if self.revenue != 0.0 {
            self.revenue * SPEND_SHARE_OF_REVENUE
        } else {
            self.quantity * SPEND_PER_UNIT
        }
    }

    pub fn cost_per_conversion(&self) -> f64 {
        let conversions = self.conversions();
        if conversions != 0 {
            round_to(self.cost() / conversions as f64, 2)
        } else {
            0.0
        }
    }

    pub fn conversion_rate(&self) -> f64 {
        let impressions = self.impressions();
        if impressions != 0 {
            round_to(self.conversions() as f64 / impressions as f64, 4)
        } else {
            0.0
        }
    }

    pub fn roas(&self) -> Option<f64> {
        let cost = self.cost();
        if cost != 0.0 {
            Some(round_to(self.revenue / cost, 2))
        } else {
            None
        }
    }
}

pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn new() -> Self {
        MetricsAggregator
    }

    pub fn aggregate(&self, table: &OrdersTable) -> Result<AggregatedMetrics> {
        let totals = self.totals(table)?;
        let unique_customers = self.unique_customers(table)?;

        let impressions = totals.impressions();
        let reach = match unique_customers {
            Some(count) => count as i64,
            None => std::cmp::max(1, totals.conversions() / 2),
        };
        let frequency = if reach != 0 {
            round_to(impressions as f64 / reach as f64, 2)
        } else {
            0.0
        };

        debug!(
            "Aggregated {} orders: {} units, revenue {:.2}",
            totals.orders, totals.quantity, totals.revenue
        );

        Ok(AggregatedMetrics {
            impressions,
            reach,
            frequency,
            conversions: totals.conversions(),
            revenue: round_to(totals.revenue, 2),
            cost: round_to(totals.cost(), 2),
            cpc: totals.cost_per_conversion(),
            conversion_rate: totals.conversion_rate(),
            roas: totals.roas(),
            simulated: true,
        })
    }

    pub fn totals(&self, table: &OrdersTable) -> Result<OrderTotals> {
        Ok(OrderTotals {
            orders: table.height(),
            quantity: sum_field(table, Field::Quantity)?,
            revenue: sum_field(table, Field::FinalAmount)?,
        })
    }

    /// Distinct non-null customer ids, `None` when neither the id nor the
    /// location column is present.
    fn unique_customers(&self, table: &OrdersTable) -> Result<Option<usize>> {
        let Some(values) = table.text_values(Field::CustomerId)? else {
            return Ok(None);
        };
        let distinct: HashSet<String> = values.into_iter().flatten().collect();
        Ok(Some(distinct.len()))
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_field(table: &OrdersTable, field: Field) -> Result<f64> {
    Ok(table
        .numeric_values(field)?
        .map(|values| values.into_iter().flatten().sum())
        .unwrap_or(0.0))
}
