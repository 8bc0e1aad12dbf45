//! Shift bucketing and the two-stage feature rollup.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::merge::MergedRow;
use crate::severity;
use crate::shift;

/// Final clustering-ready row: one corridor on one shift. Serialized
/// column names are the ones the downstream model was trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    #[serde(rename = "MVINOMBRE")]
    pub corridor: String,
    #[serde(rename = "HORARIO")]
    pub shift: String,
    #[serde(rename = "accidentes")]
    pub accidents: u64,
    #[serde(rename = "muertes")]
    pub deaths: u64,
    #[serde(rename = "heridos")]
    pub injuries: u64,
    #[serde(rename = "muertes_vulnerables")]
    pub vuln_deaths: u64,
    #[serde(rename = "heridos_vulnerables")]
    pub vuln_injuries: u64,
    #[serde(rename = "vulnerables")]
    pub severity: u8,
}

#[derive(Default, Clone, Copy)]
struct Totals {
    accidents: u64,
    deaths: u64,
    injuries: u64,
    vuln_deaths: u64,
    vuln_injuries: u64,
}

impl Totals {
    fn add(&mut self, other: Totals) {
        self.accidents += other.accidents;
        self.deaths += other.deaths;
        self.injuries += other.injuries;
        self.vuln_deaths += other.vuln_deaths;
        self.vuln_injuries += other.vuln_injuries;
    }
}

/// Rolls merged rows up into the final feature table.
///
/// Stage order matters: corridors are filtered on their window-wide death
/// totals after shift mapping but before the terminal rollup, keeping the
/// methodology's sequencing. Day of week carries no discriminating signal
/// and is summed away in the terminal stage. Severity is computed from
/// the terminal vulnerable totals of each (corridor, shift), never from
/// per-day values.
pub fn rollup(merged: &[MergedRow]) -> Result<Vec<FeatureRow>> {
    // Stage 1-2: hour -> shift, intermediate sum per (corridor, day, shift).
    let mut intermediate: BTreeMap<(String, String, &'static str), Totals> = BTreeMap::new();
    for row in merged {
        let shift = shift::shift_for_hour(row.hour).ok_or_else(|| {
            PipelineError::DataIntegrity(format!("hour {} outside 0..=23", row.hour))
        })?;
        intermediate
            .entry((row.corridor.clone(), row.day.clone(), shift))
            .or_default()
            .add(Totals {
                accidents: row.accidents,
                deaths: row.deaths,
                injuries: row.injuries,
                vuln_deaths: row.vuln_deaths,
                vuln_injuries: row.vuln_injuries,
            });
    }

    // Stage 3: window-wide death totals per corridor. Zero-death
    // corridors are excluded entirely, not zeroed.
    let mut corridor_deaths: BTreeMap<&str, u64> = BTreeMap::new();
    for ((corridor, _, _), totals) in &intermediate {
        *corridor_deaths.entry(corridor.as_str()).or_insert(0) += totals.deaths;
    }

    // Stage 4: terminal rollup per (corridor, shift).
    let mut terminal: BTreeMap<(String, &'static str), Totals> = BTreeMap::new();
    for ((corridor, _day, shift), totals) in &intermediate {
        if corridor_deaths.get(corridor.as_str()).copied().unwrap_or(0) == 0 {
            continue;
        }
        terminal
            .entry((corridor.clone(), *shift))
            .or_default()
            .add(*totals);
    }

    // Stage 5: severity from the rolled-up vulnerable totals.
    let rows: Vec<FeatureRow> = terminal
        .into_iter()
        .map(|((corridor, shift), t)| FeatureRow {
            corridor,
            shift: shift.to_string(),
            accidents: t.accidents,
            deaths: t.deaths,
            injuries: t.injuries,
            vuln_deaths: t.vuln_deaths,
            vuln_injuries: t.vuln_injuries,
            severity: severity::classify(t.vuln_deaths, t.vuln_injuries),
        })
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::EmptyResult(
            "no corridors with deaths in the window".to_string(),
        ));
    }
    Ok(rows)
}
