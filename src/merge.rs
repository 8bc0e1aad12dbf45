//! Joining the facet tables onto the corridor grid.

use std::collections::BTreeMap;

use crate::facets::FacetTables;
use crate::registry::CorridorRegistry;

/// One corridor-name x day x hour row with every facet reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub corridor: String,
    pub day: String,
    pub hour: u8,
    pub accidents: u64,
    pub deaths: u64,
    pub injuries: u64,
    pub vuln_deaths: u64,
    pub vuln_injuries: u64,
}

#[derive(Default)]
struct Totals {
    accidents: u64,
    deaths: u64,
    injuries: u64,
    vuln_deaths: u64,
    vuln_injuries: u64,
}

/// Left-joins every facet onto the accident grid, then the registry.
///
/// The accident facet is the left table; a key present only in another
/// facet has no reports and cannot exist upstream. Missing facet cells
/// default to zero. The injury-only facet and the fatal-report facet
/// count disjoint sets of injured people, so total injuries is their sum;
/// the same reconciliation applies to the two vulnerable-injury sources.
/// Rows whose corridor code has no registry name are dropped, and since
/// several codes can share one name, joined rows are re-summed per
/// (name, day, hour).
pub fn merge(registry: &CorridorRegistry, facets: &FacetTables) -> Vec<MergedRow> {
    let mut grouped: BTreeMap<(String, String, u8), Totals> = BTreeMap::new();

    for (key, &accidents) in &facets.accidents {
        let Some(name) = registry.name(key.code) else {
            continue;
        };

        let injury_only = facets.injuries.get(key).copied().unwrap_or(0);
        let fatal = facets.deaths.get(key).copied().unwrap_or_default();
        let vuln_injury_only = facets.vuln_injuries.get(key).copied().unwrap_or(0);
        let vuln_fatal = facets.vuln_deaths.get(key).copied().unwrap_or_default();

        let entry = grouped
            .entry((name.to_string(), key.day.clone(), key.hour))
            .or_default();
        entry.accidents += accidents;
        entry.deaths += fatal.deaths;
        entry.injuries += injury_only + fatal.injuries;
        entry.vuln_deaths += vuln_fatal.deaths;
        entry.vuln_injuries += vuln_injury_only + vuln_fatal.injuries;
    }

    grouped
        .into_iter()
        .map(|((corridor, day, hour), t)| MergedRow {
            corridor,
            day,
            hour,
            accidents: t.accidents,
            deaths: t.deaths,
            injuries: t.injuries,
            vuln_deaths: t.vuln_deaths,
            vuln_injuries: t.vuln_injuries,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::{FacetKey, FatalCounts};
    use std::collections::HashMap;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn key(code: i64, day: &str, hour: u8) -> FacetKey {
        FacetKey {
            code,
            day: day.to_string(),
            hour,
        }
    }

    fn registry_with(fixture: &str, codes: &[(i64, &str)]) -> CorridorRegistry {
        let features: Vec<String> = codes
            .iter()
            .map(|(code, name)| {
                format!(
                    r#"{{"type": "Feature", "properties": {{"MVICIV": {code}, "MVINOMBRE": "{name}"}}, "geometry": null}}"#
                )
            })
            .collect();
        let body = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(", ")
        );
        let path: PathBuf = env::temp_dir().join(format!("merge_registry_{fixture}.geojson"));
        fs::write(&path, body).unwrap();
        let registry = CorridorRegistry::load(&path).unwrap();
        fs::remove_file(path).unwrap();
        registry
    }

    fn empty_facets() -> FacetTables {
        FacetTables {
            accidents: HashMap::new(),
            injuries: HashMap::new(),
            deaths: HashMap::new(),
            vuln_injuries: HashMap::new(),
            vuln_deaths: HashMap::new(),
        }
    }

    #[test]
    fn test_missing_facets_zero_fill() {
        let registry = registry_with("zero_fill", &[(100, "Av X")]);
        let mut facets = empty_facets();
        facets.accidents.insert(key(100, "LUNES", 14), 5);

        let rows = merge(&registry, &facets);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.corridor, "Av X");
        assert_eq!(row.accidents, 5);
        assert_eq!(row.deaths, 0);
        assert_eq!(row.injuries, 0);
        assert_eq!(row.vuln_deaths, 0);
        assert_eq!(row.vuln_injuries, 0);
    }

    #[test]
    fn test_injury_sources_are_summed() {
        let registry = registry_with("injury_sum", &[(100, "Av X")]);
        let mut facets = empty_facets();
        let k = key(100, "LUNES", 14);
        facets.accidents.insert(k.clone(), 3);
        facets.injuries.insert(k.clone(), 4);
        facets.deaths.insert(
            k.clone(),
            FatalCounts {
                deaths: 1,
                injuries: 2,
            },
        );
        facets.vuln_injuries.insert(k.clone(), 1);
        facets.vuln_deaths.insert(
            k,
            FatalCounts {
                deaths: 1,
                injuries: 1,
            },
        );

        let rows = merge(&registry, &facets);
        let row = &rows[0];
        // 4 on injury-only reports + 2 co-occurring with deaths
        assert_eq!(row.injuries, 6);
        assert_eq!(row.deaths, 1);
        assert_eq!(row.vuln_injuries, 2);
        assert_eq!(row.vuln_deaths, 1);
    }

    #[test]
    fn test_unnamed_corridors_are_dropped() {
        let registry = registry_with("unnamed", &[(100, "Av X")]);
        let mut facets = empty_facets();
        facets.accidents.insert(key(100, "LUNES", 14), 1);
        facets.accidents.insert(key(999, "LUNES", 14), 7);

        let rows = merge(&registry, &facets);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].corridor, "Av X");
    }

    #[test]
    fn test_codes_sharing_a_name_are_summed() {
        let registry = registry_with("shared_name", &[(100, "Av X"), (101, "Av X")]);
        let mut facets = empty_facets();
        facets.accidents.insert(key(100, "LUNES", 14), 2);
        facets.accidents.insert(key(101, "LUNES", 14), 3);

        let rows = merge(&registry, &facets);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].accidents, 5);
    }
}
