use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

use super::schema_normalizer::{Field, OrdersTable};

const MILLIS_PER_DAY: i64 = 86_400_000;

pub struct WindowFilter;

impl WindowFilter {
    /// Keeps rows dated within `window_days` of the latest date in the table.
    ///
    /// The table comes back unchanged when the date field does not resolve or
    /// holds no parseable dates. Rows with a null date never fall inside an
    /// applied window.
    pub fn filter(&self, table: &OrdersTable, date_field: Field, window_days: i64) -> Result<OrdersTable> {
        let Some(timestamps) = table.timestamps(date_field)? else {
            debug!("No {} column, skipping window", date_field.canonical());
            return Ok(table.clone());
        };

        let Some(max_date) = timestamps.iter().flatten().copied().max() else {
            debug!("{} holds no dates, skipping window", date_field.canonical());
            return Ok(table.clone());
        };

        // Windows reaching past the representable range clamp to it.
        let start = max_date.saturating_sub(window_days.saturating_mul(MILLIS_PER_DAY));
        let keep: Vec<bool> = timestamps
            .iter()
            .map(|ts| ts.is_some_and(|ts| ts >= start))
            .collect();

        let mask = BooleanChunked::new("in_window".into(), keep.as_slice());
        let filtered = table.frame().filter(&mask)?;

        debug!(
            "Window of {} days kept {} of {} rows",
            window_days,
            filtered.height(),
            table.height()
        );

        Ok(table.with_frame(filtered))
    }
}
