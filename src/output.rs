//! Output formatting and persistence for the feature table.
//!
//! Supports JSON logging and CSV export.

use std::fs::File;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use tracing::{debug, info};

use crate::rollup::FeatureRow;

/// Logs the feature table as pretty-printed JSON.
pub fn print_json(rows: &[FeatureRow]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

/// Writes the feature table to `path` as CSV, replacing any existing
/// file. Headers use the downstream model's column names.
pub fn write_feature_table(path: &str, rows: &[FeatureRow]) -> Result<()> {
    debug!(path, rows = rows.len(), "Writing feature table");

    let mut writer = WriterBuilder::new().from_writer(File::create(Path::new(path))?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
