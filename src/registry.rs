//! The authoritative corridor reference grid.
//!
//! Loaded once per run from a GeoJSON export of the road network. Only
//! the corridor code and name properties matter here; geometry is
//! ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: CorridorProperties,
}

#[derive(Deserialize)]
struct CorridorProperties {
    /// Corridor code; numeric in most exports but occasionally a numeric
    /// string.
    #[serde(rename = "MVICIV")]
    code: Option<serde_json::Value>,
    #[serde(rename = "MVINOMBRE")]
    name: Option<String>,
}

/// Deduplicated corridor code -> name mapping.
#[derive(Debug)]
pub struct CorridorRegistry {
    names: HashMap<i64, String>,
}

impl CorridorRegistry {
    /// Loads and cleans the reference grid.
    ///
    /// Records without a usable code are discarded. A corridor may have
    /// several records; the first one seen wins, since names are
    /// consistent per code in practice. Codes whose surviving record has
    /// no name are dropped afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::DataIntegrity(format!("corridor reference {}: {e}", path.display()))
        })?;
        let collection: FeatureCollection = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::DataIntegrity(format!("corridor reference {}: {e}", path.display()))
        })?;

        if collection.features.is_empty() {
            return Err(PipelineError::DataIntegrity(
                "corridor reference has no features".to_string(),
            ));
        }
        let total = collection.features.len();

        let mut first_seen: HashMap<i64, Option<String>> = HashMap::new();
        for feature in collection.features {
            let Some(code) = parse_code(feature.properties.code.as_ref()) else {
                continue;
            };
            first_seen.entry(code).or_insert(feature.properties.name);
        }

        let names: HashMap<i64, String> = first_seen
            .into_iter()
            .filter_map(|(code, name)| Some((code, name?)))
            .collect();

        if names.is_empty() {
            return Err(PipelineError::DataIntegrity(
                "corridor reference yields no usable corridors after cleaning".to_string(),
            ));
        }

        debug!(records = total, corridors = names.len(), "Reference grid cleaned");
        Ok(Self { names })
    }

    /// Name of a corridor, or `None` when the code is not actionable.
    pub fn name(&self, code: i64) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn parse_code(value: Option<&serde_json::Value>) -> Option<i64> {
    let code = match value? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    // Zero is the store's stand-in for "unknown corridor"; it never
    // identifies a real one.
    (code != 0).then_some(code)
}
