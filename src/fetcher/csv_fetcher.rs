use anyhow::{Context, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

use crate::processor::{OrdersTable, SchemaNormalizer};

/// Cell values that mean "missing" in exported spreadsheets.
const NULL_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "#N/A", "#NA", "<NA>", "null", "NULL", "None", "NaN", "nan", "-NaN", "-nan",
];

/// Reads order exports in either known CSV layout and hands back a
/// normalized table. Every cell is read as text first so that bad cells
/// become nulls during normalization instead of failing the parse.
pub struct CsvFetcher {
    normalizer: SchemaNormalizer,
}

impl CsvFetcher {
    pub fn new() -> Self {
        CsvFetcher {
            normalizer: SchemaNormalizer::new(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<OrdersTable> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read order file: {}", path.display()))?;

        info!("Loaded {} bytes from {}", bytes.len(), path.display());

        self.load_from_bytes(bytes)
            .with_context(|| format!("Failed to parse order file: {}", path.display()))
    }

    pub fn load_from_bytes(&self, bytes: Vec<u8>) -> Result<OrdersTable> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| opts.with_null_values(Some(null_markers())))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        self.normalizer.normalize(frame)
    }
}

fn null_markers() -> NullValues {
    NullValues::AllColumns(NULL_MARKERS.iter().map(|marker| (*marker).into()).collect())
}

impl Default for CsvFetcher {
    fn default() -> Self {
        Self::new()
    }
}
