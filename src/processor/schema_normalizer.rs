use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Canonical order fields the metric formulas are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OrderDate,
    Quantity,
    FinalAmount,
    CustomerId,
    ProductCategory,
    Region,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::OrderDate,
        Field::Quantity,
        Field::FinalAmount,
        Field::CustomerId,
        Field::ProductCategory,
        Field::Region,
    ];

    pub fn canonical(self) -> &'static str {
        match self {
            Field::OrderDate => "order_date",
            Field::Quantity => "quantity",
            Field::FinalAmount => "final_amount",
            Field::CustomerId => "customer_id",
            Field::ProductCategory => "product_category",
            Field::Region => "region",
        }
    }

    /// Secondary column names, tried in order after the canonical one.
    /// `Location` doubles as the customer-cardinality fallback and the region.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::OrderDate => &["OrderDate"],
            Field::Quantity => &["UnitsSold"],
            Field::FinalAmount => &["Revenue"],
            Field::CustomerId => &["Location"],
            Field::ProductCategory => &["ProductCategory"],
            Field::Region => &["Location"],
        }
    }

    pub fn candidates(self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.canonical()).chain(self.aliases().iter().copied())
    }
}

/// Which physical column backs each canonical field, decided once per table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSchema {
    columns: HashMap<Field, String>,
}

impl ResolvedSchema {
    pub fn resolve(frame: &DataFrame) -> Self {
        let mut columns = HashMap::new();

        for field in Field::ALL {
            if let Some(name) = field.candidates().find(|name| frame.column(name).is_ok()) {
                columns.insert(field, name.to_string());
            }
        }

        ResolvedSchema { columns }
    }

    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }
}

/// An order table together with its resolved schema.
#[derive(Debug, Clone)]
pub struct OrdersTable {
    frame: DataFrame,
    schema: ResolvedSchema,
}

impl OrdersTable {
    pub fn new(frame: DataFrame) -> Self {
        let schema = ResolvedSchema::resolve(&frame);
        OrdersTable { frame, schema }
    }

    /// Wraps a frame derived from this table (same columns, fewer rows).
    pub fn with_frame(&self, frame: DataFrame) -> Self {
        OrdersTable {
            frame,
            schema: self.schema.clone(),
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    #[cfg(test)]
    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Numeric values of a field, `None` when no column resolves.
    pub fn numeric_values(&self, field: Field) -> Result<Option<Vec<Option<f64>>>> {
        let Some(name) = self.schema.column(field) else {
            return Ok(None);
        };
        let column = self.frame.column(name)?;

        let values = match column.dtype() {
            DataType::String => column
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_number))
                .collect(),
            _ => {
                let floats = column.cast(&DataType::Float64)?;
                floats
                    .f64()?
                    .into_iter()
                    .map(|value| value.filter(|v| !v.is_nan()))
                    .collect()
            }
        };

        Ok(Some(values))
    }

    /// Field values stringified the way group keys are, `None` when no column resolves.
    pub fn text_values(&self, field: Field) -> Result<Option<Vec<Option<String>>>> {
        let Some(name) = self.schema.column(field) else {
            return Ok(None);
        };
        let text = self.frame.column(name)?.cast(&DataType::String)?;
        let values = text
            .str()?
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();

        Ok(Some(values))
    }

    /// Millisecond timestamps of a date field, `None` when no column resolves.
    pub fn timestamps(&self, field: Field) -> Result<Option<Vec<Option<i64>>>> {
        let Some(name) = self.schema.column(field) else {
            return Ok(None);
        };
        let column = self.frame.column(name)?;

        let values = match column.dtype() {
            DataType::String => column
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_timestamp))
                .collect(),
            _ => {
                let millis = column
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                    .cast(&DataType::Int64)?;
                millis.i64()?.into_iter().collect()
            }
        };

        Ok(Some(values))
    }
}

pub struct SchemaNormalizer;

impl SchemaNormalizer {
    pub fn new() -> Self {
        SchemaNormalizer
    }

    /// Trims headers, resolves the alias table and coerces typed columns.
    /// Cells that do not parse become nulls instead of failing the load.
    pub fn normalize(&self, mut frame: DataFrame) -> Result<OrdersTable> {
        self.trim_headers(&mut frame)?;

        let schema = ResolvedSchema::resolve(&frame);
        for field in Field::ALL {
            match schema.column(field) {
                Some(name) => debug!("Resolved {} -> {}", field.canonical(), name),
                None => debug!("No column for {}", field.canonical()),
            }
        }

        for field in [Field::Quantity, Field::FinalAmount] {
            if let Some(name) = schema.column(field) {
                self.coerce_numeric_column(&mut frame, name)?;
            }
        }

        if let Some(name) = schema.column(Field::OrderDate) {
            self.coerce_date_column(&mut frame, name)?;
        }

        info!(
            "Normalized order table: {} rows, {} columns",
            frame.height(),
            frame.width()
        );

        Ok(OrdersTable { frame, schema })
    }

    fn trim_headers(&self, frame: &mut DataFrame) -> Result<()> {
        let trimmed: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        frame
            .set_column_names(trimmed)
            .context("Column headers collide after trimming whitespace")?;

        Ok(())
    }

    fn coerce_numeric_column(&self, frame: &mut DataFrame, col_name: &str) -> Result<()> {
        let column = frame.column(col_name)?;
        if column.dtype() != &DataType::String {
            let floats = column.cast(&DataType::Float64)?;
            frame.with_column(floats)?;
            return Ok(());
        }

        let parsed: Vec<Option<f64>> = column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_number))
            .collect();

        let null_count = parsed.iter().filter(|v| v.is_none()).count();
        if null_count > 0 {
            debug!("{} cells in {} are not numeric", null_count, col_name);
        }

        frame.with_column(Series::new(col_name.into(), parsed))?;
        Ok(())
    }

    fn coerce_date_column(&self, frame: &mut DataFrame, col_name: &str) -> Result<()> {
        let column = frame.column(col_name)?;
        if column.dtype() != &DataType::String {
            let dates = column.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
            frame.with_column(dates)?;
            return Ok(());
        }

        let millis: Vec<Option<i64>> = column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_timestamp))
            .collect();

        let dates = Series::new(col_name.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        frame.with_column(dates)?;
        Ok(())
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parses a date or datetime cell to epoch milliseconds. Month-first for slashed dates.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis());
        }
    }

    None
}
