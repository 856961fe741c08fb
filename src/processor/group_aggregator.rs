use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;

use super::metrics_aggregator::{round_to, MetricsAggregator, OrderTotals};
use super::schema_normalizer::{Field, OrdersTable};
use crate::models::{PivotRow, ScatterPoint};

/// Campaign label used when the table has no category column.
pub const ALL_CAMPAIGNS: &str = "All";

pub struct GroupAggregator;

impl GroupAggregator {
    pub fn new() -> Self {
        GroupAggregator
    }

    /// Cost per conversion and conversion rate per campaign (product category),
    /// in ascending campaign order.
    pub fn scatter(&self, table: &OrdersTable) -> Result<Vec<ScatterPoint>> {
        Ok(self
            .campaign_totals(table)?
            .into_iter()
            .map(|(campaign, totals)| ScatterPoint {
                campaign,
                cost_per_conversion: totals.cost_per_conversion(),
                conversion_rate: totals.conversion_rate(),
            })
            .collect())
    }

    /// Order totals per campaign. Without a category column the whole table
    /// is a single `"All"` campaign.
    pub fn campaign_totals(&self, table: &OrdersTable) -> Result<Vec<(String, OrderTotals)>> {
        let Some(categories) = table.text_values(Field::ProductCategory)? else {
            let totals = MetricsAggregator::new().totals(table)?;
            return Ok(vec![(ALL_CAMPAIGNS.to_string(), totals)]);
        };

        let quantities = table.numeric_values(Field::Quantity)?;
        let amounts = table.numeric_values(Field::FinalAmount)?;

        let mut groups: BTreeMap<String, OrderTotals> = BTreeMap::new();
        for (row, category) in categories.into_iter().enumerate() {
            let Some(category) = category else {
                continue;
            };
            groups
                .entry(category)
                .or_default()
                .add_row(value_at(&quantities, row), value_at(&amounts, row));
        }

        debug!("Grouped orders into {} campaigns", groups.len());

        Ok(groups.into_iter().collect())
    }

    /// Revenue per (region, category) pair. Empty unless region, category and
    /// amount all resolve.
    pub fn pivot(&self, table: &OrdersTable) -> Result<Vec<PivotRow>> {
        let (Some(regions), Some(categories), Some(amounts)) = (
            table.text_values(Field::Region)?,
            table.text_values(Field::ProductCategory)?,
            table.numeric_values(Field::FinalAmount)?,
        ) else {
            debug!("Pivot needs region, category and amount columns");
            return Ok(Vec::new());
        };

        let mut cells: BTreeMap<(String, String), f64> = BTreeMap::new();
        for ((region, category), amount) in regions.into_iter().zip(categories).zip(amounts) {
            let (Some(region), Some(category)) = (region, category) else {
                continue;
            };
            *cells.entry((region, category)).or_insert(0.0) += amount.unwrap_or(0.0);
        }

        Ok(cells
            .into_iter()
            .map(|((region, category), revenue)| PivotRow {
                region,
                category,
                revenue: round_to(revenue, 2),
            })
            .collect())
    }
}

impl Default for GroupAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn value_at(values: &Option<Vec<Option<f64>>>, row: usize) -> Option<f64> {
    values.as_ref().and_then(|values| values.get(row).copied().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_scatter_zero_revenue_group() {
        let frame = df!(
            "product_category" => ["A", "A"],
            "quantity" => [10.0, 5.0],
            "final_amount" => [0.0, 0.0]
        )
        .unwrap();
        let points = GroupAggregator::new().scatter(&OrdersTable::new(frame)).unwrap();

        assert_eq!(
            points,
            vec![ScatterPoint {
                campaign: "A".to_string(),
                cost_per_conversion: 75.0,
                conversion_rate: 0.0011,
            }]
        );
    }

    #[test]
    fn test_scatter_groups_by_alias_category() {
        let frame = df!(
            "ProductCategory" => ["Toys", "Books", "Toys", "Books"],
            "UnitsSold" => [1, 2, 3, 4],
            "Revenue" => [100.0, 0.0, 300.0, 0.0]
        )
        .unwrap();
        let points = GroupAggregator::new().scatter(&OrdersTable::new(frame)).unwrap();

        assert_eq!(points.len(), 2);
        let books = points.iter().find(|p| p.campaign == "Books").unwrap();
        // 6 units, no revenue: cost 60 over 2 orders, 2 / 720 impressions
        assert_eq!(books.cost_per_conversion, 30.0);
        assert_eq!(books.conversion_rate, 0.0028);

        let toys = points.iter().find(|p| p.campaign == "Toys").unwrap();
        // revenue 400 -> cost 240 over 2 orders
        assert_eq!(toys.cost_per_conversion, 120.0);
        assert_eq!(toys.conversion_rate, 0.0042);
    }

    #[test]
    fn test_scatter_without_category_is_single_group() {
        let frame = df!(
            "quantity" => [2.0, 2.0],
            "final_amount" => [50.0, 50.0]
        )
        .unwrap();
        let points = GroupAggregator::new().scatter(&OrdersTable::new(frame)).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].campaign, ALL_CAMPAIGNS);
        assert_eq!(points[0].cost_per_conversion, 30.0);
        assert_eq!(points[0].conversion_rate, 0.0042);
    }

    #[test]
    fn test_scatter_stringifies_numeric_keys_and_skips_nulls() {
        let frame = df!(
            "product_category" => [Some(7), None, Some(7)],
            "quantity" => [1, 1, 1]
        )
        .unwrap();
        let points = GroupAggregator::new().scatter(&OrdersTable::new(frame)).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].campaign, "7");
    }

    #[test]
    fn test_scatter_on_empty_table() {
        let frame = df!(
            "product_category" => Vec::<&str>::new(),
            "quantity" => Vec::<f64>::new()
        )
        .unwrap();
        let points = GroupAggregator::new().scatter(&OrdersTable::new(frame)).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_pivot_sums_revenue_per_pair() {
        let frame = df!(
            "region" => ["East", "West", "East", "East"],
            "product_category" => ["A", "A", "B", "A"],
            "final_amount" => [10.111, 5.0, 7.5, 2.0]
        )
        .unwrap();
        let rows = GroupAggregator::new().pivot(&OrdersTable::new(frame)).unwrap();

        assert_eq!(rows.len(), 3);
        let east_a = rows
            .iter()
            .find(|r| r.region == "East" && r.category == "A")
            .unwrap();
        assert_eq!(east_a.revenue, 12.11);
        let east_b = rows
            .iter()
            .find(|r| r.region == "East" && r.category == "B")
            .unwrap();
        assert_eq!(east_b.revenue, 7.5);
        let west_a = rows
            .iter()
            .find(|r| r.region == "West" && r.category == "A")
            .unwrap();
        assert_eq!(west_a.revenue, 5.0);
    }

    #[test]
    fn test_pivot_uses_location_alias() {
        let frame = df!(
            "Location" => ["Lagos", "Lagos"],
            "ProductCategory" => ["Shoes", "Shoes"],
            "Revenue" => [1.0, 2.0]
        )
        .unwrap();
        let rows = GroupAggregator::new().pivot(&OrdersTable::new(frame)).unwrap();
        assert_eq!(
            rows,
            vec![PivotRow {
                region: "Lagos".to_string(),
                category: "Shoes".to_string(),
                revenue: 3.0,
            }]
        );
    }

    #[test]
    fn test_pivot_without_region_is_empty() {
        let frame = df!(
            "product_category" => ["A"],
            "final_amount" => [1.0]
        )
        .unwrap();
        let rows = GroupAggregator::new().pivot(&OrdersTable::new(frame)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_pivot_without_amount_is_empty() {
        let frame = df!(
            "region" => ["East"],
            "product_category" => ["A"]
        )
        .unwrap();
        let rows = GroupAggregator::new().pivot(&OrdersTable::new(frame)).unwrap();
        assert!(rows.is_empty());
    }
}
