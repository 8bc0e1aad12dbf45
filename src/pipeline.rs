//! End-to-end feature table construction.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::dates;
use crate::error::Result;
use crate::facets;
use crate::merge;
use crate::registry::CorridorRegistry;
use crate::rollup::{self, FeatureRow};
use crate::store::CrashStore;

/// Builds the per-corridor, per-shift feature table from 3-year data up
/// to `as_of`.
///
/// A pure function of (store contents, reference file, as-of date): a
/// failed run leaves nothing behind and can be re-invoked with the same
/// date for idempotent recovery.
pub async fn build_feature_table(
    store: &dyn CrashStore,
    registry_path: &Path,
    as_of: NaiveDate,
) -> Result<Vec<FeatureRow>> {
    let window = dates::lookback_window(as_of);
    info!(start = %window.start, end = %window.end, "Aggregation window");

    let registry = CorridorRegistry::load(registry_path)?;
    info!(corridors = registry.len(), "Corridor reference grid loaded");

    let facets = facets::aggregate(store, &window).await?;
    let merged = merge::merge(&registry, &facets);
    info!(rows = merged.len(), "Facets merged onto corridor grid");

    let features = rollup::rollup(&merged)?;
    info!(rows = features.len(), "Feature table ready");
    Ok(features)
}
