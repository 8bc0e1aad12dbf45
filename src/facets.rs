//! Windowed accident facet aggregations.
//!
//! Five logically independent aggregations over the crash-record store,
//! each keyed by (corridor code, day of week, hour of day). The SQL keeps
//! the store's schema: one report per row in `siniestros`, injured people
//! in `conheridos`, killed people in `confallecidos`. Vulnerable road
//! users are pedestrians, cyclists and motorcyclists.

use std::collections::HashMap;

use tracing::debug;

use crate::dates::DateWindow;
use crate::error::{PipelineError, Result};
use crate::store::{CrashStore, Table, Value};

/// Key of every facet table: one corridor on one day of week at one hour.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FacetKey {
    pub code: i64,
    pub day: String,
    pub hour: u8,
}

/// Killed people on fatal reports plus the injured people co-occurring on
/// the same reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FatalCounts {
    pub deaths: u64,
    pub injuries: u64,
}

/// The five facet tables produced for one window.
pub struct FacetTables {
    /// Distinct reports per key.
    pub accidents: HashMap<FacetKey, u64>,
    /// Injured people on injury-only reports.
    pub injuries: HashMap<FacetKey, u64>,
    /// Killed people on fatal reports, with their co-occurring injured.
    pub deaths: HashMap<FacetKey, FatalCounts>,
    /// Vulnerable injured people on injury-only reports.
    pub vuln_injuries: HashMap<FacetKey, u64>,
    /// Vulnerable killed people on fatal reports, with co-occurring
    /// vulnerable injured.
    pub vuln_deaths: HashMap<FacetKey, FatalCounts>,
}

/// One of the five accident facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Accidents,
    Injuries,
    Deaths,
    VulnerableInjuries,
    VulnerableDeaths,
}

impl Facet {
    pub fn label(self) -> &'static str {
        match self {
            Facet::Accidents => "accidents",
            Facet::Injuries => "injuries",
            Facet::Deaths => "deaths",
            Facet::VulnerableInjuries => "vulnerable injuries",
            Facet::VulnerableDeaths => "vulnerable deaths",
        }
    }

    /// SQL issued against the store for this facet over `window`. Dates
    /// compare against the first 10 characters of the report timestamp,
    /// exclusive on the lower bound and inclusive on the upper.
    pub fn sql(self, window: &DateWindow) -> String {
        let start = window.start.format("%Y-%m-%d");
        let end = window.end.format("%Y-%m-%d");
        match self {
            Facet::Accidents => format!(
                "SELECT FORMULARIO, CIV, DIA_OCURRENCIA_ACC, HORA_OCURRENCIA_ACC \
                 FROM siniestros \
                 WHERE substring(FECHA_ACC, 1, 10) > '{start}' AND \
                     substring(FECHA_ACC, 1, 10) <= '{end}'"
            ),
            Facet::Injuries => format!(
                "SELECT siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                     siniestros.HORA_OCURRENCIA_ACC, COUNT(conheridos.FORMULARIO) AS heridos \
                 FROM siniestros \
                 JOIN conheridos ON conheridos.FORMULARIO = siniestros.FORMULARIO \
                 WHERE substring(siniestros.FECHA_ACC, 1, 10) > '{start}' AND \
                     substring(siniestros.FECHA_ACC, 1, 10) <= '{end}' AND \
                     siniestros.GRAVEDAD = 'CON HERIDOS' \
                 GROUP BY siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                     siniestros.HORA_OCURRENCIA_ACC"
            ),
            Facet::Deaths => format!(
                "WITH fallecidos AS ( \
                     SELECT siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                         siniestros.HORA_OCURRENCIA_ACC, COUNT(confallecidos.FORMULARIO) AS muertes \
                     FROM siniestros \
                     JOIN confallecidos ON confallecidos.FORMULARIO = siniestros.FORMULARIO \
                     WHERE substring(siniestros.FECHA_ACC, 1, 10) > '{start}' AND \
                         substring(siniestros.FECHA_ACC, 1, 10) <= '{end}' \
                     GROUP BY siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                         siniestros.HORA_OCURRENCIA_ACC \
                 ) \
                 SELECT fallecidos.FORMULARIO, fallecidos.CIV, fallecidos.DIA_OCURRENCIA_ACC, \
                     fallecidos.HORA_OCURRENCIA_ACC, fallecidos.muertes, \
                     COUNT(conheridos.FORMULARIO) AS heridos \
                 FROM fallecidos \
                 LEFT JOIN conheridos ON conheridos.FORMULARIO = fallecidos.FORMULARIO \
                 GROUP BY fallecidos.FORMULARIO, fallecidos.CIV, fallecidos.DIA_OCURRENCIA_ACC, \
                     fallecidos.HORA_OCURRENCIA_ACC, fallecidos.muertes"
            ),
            Facet::VulnerableInjuries => format!(
                "SELECT siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                     siniestros.HORA_OCURRENCIA_ACC, \
                     COUNT(conheridos.FORMULARIO) FILTER (WHERE conheridos.CONDICION IN \
                         ('PEATON', 'CICLISTA', 'MOTOCICLISTA')) AS heridos_vulnerables \
                 FROM siniestros \
                 JOIN conheridos ON conheridos.FORMULARIO = siniestros.FORMULARIO \
                 WHERE substring(siniestros.FECHA_ACC, 1, 10) > '{start}' AND \
                     substring(siniestros.FECHA_ACC, 1, 10) <= '{end}' AND \
                     siniestros.GRAVEDAD = 'CON HERIDOS' \
                 GROUP BY siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                     siniestros.HORA_OCURRENCIA_ACC"
            ),
            Facet::VulnerableDeaths => format!(
                "WITH fallecidos AS ( \
                     SELECT siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                         siniestros.HORA_OCURRENCIA_ACC, \
                         COUNT(confallecidos.FORMULARIO) FILTER (WHERE confallecidos.CONDICION IN \
                             ('PEATON', 'CICLISTA', 'MOTOCICLISTA')) AS muertes_vulnerables \
                     FROM siniestros \
                     JOIN confallecidos ON confallecidos.FORMULARIO = siniestros.FORMULARIO \
                     WHERE substring(siniestros.FECHA_ACC, 1, 10) > '{start}' AND \
                         substring(siniestros.FECHA_ACC, 1, 10) <= '{end}' \
                     GROUP BY siniestros.FORMULARIO, siniestros.CIV, siniestros.DIA_OCURRENCIA_ACC, \
                         siniestros.HORA_OCURRENCIA_ACC \
                 ) \
                 SELECT fallecidos.FORMULARIO, fallecidos.CIV, fallecidos.DIA_OCURRENCIA_ACC, \
                     fallecidos.HORA_OCURRENCIA_ACC, fallecidos.muertes_vulnerables, \
                     COUNT(conheridos.FORMULARIO) FILTER (WHERE conheridos.CONDICION IN \
                         ('PEATON', 'CICLISTA', 'MOTOCICLISTA')) AS heridos_vulnerables \
                 FROM fallecidos \
                 LEFT JOIN conheridos ON conheridos.FORMULARIO = fallecidos.FORMULARIO \
                 GROUP BY fallecidos.FORMULARIO, fallecidos.CIV, fallecidos.DIA_OCURRENCIA_ACC, \
                     fallecidos.HORA_OCURRENCIA_ACC, fallecidos.muertes_vulnerables"
            ),
        }
    }
}

/// Runs the five facet aggregations for `window` concurrently. The merge
/// step needs every facet, so this is a join barrier; the first failure
/// fails the whole run.
pub async fn aggregate(store: &dyn CrashStore, window: &DateWindow) -> Result<FacetTables> {
    let (accidents, injuries, deaths, vuln_injuries, vuln_deaths) = tokio::try_join!(
        fetch(store, Facet::Accidents, window),
        fetch(store, Facet::Injuries, window),
        fetch(store, Facet::Deaths, window),
        fetch(store, Facet::VulnerableInjuries, window),
        fetch(store, Facet::VulnerableDeaths, window),
    )?;

    Ok(FacetTables {
        accidents: count_reports(&accidents)?,
        injuries: sum_people(&injuries, "HERIDOS")?,
        deaths: sum_fatal(&deaths, "MUERTES", "HERIDOS")?,
        vuln_injuries: sum_people(&vuln_injuries, "HERIDOS_VULNERABLES")?,
        vuln_deaths: sum_fatal(&vuln_deaths, "MUERTES_VULNERABLES", "HERIDOS_VULNERABLES")?,
    })
}

async fn fetch(store: &dyn CrashStore, facet: Facet, window: &DateWindow) -> Result<Table> {
    let table = store.query(&facet.sql(window)).await?;
    if table.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "{} facet returned no rows for {} to {}",
            facet.label(),
            window.start,
            window.end
        )));
    }
    debug!(facet = facet.label(), rows = table.len(), "Facet fetched");
    Ok(table)
}

/// Pre-located key columns of one facet table.
struct KeyColumns {
    code: usize,
    day: usize,
    hour: usize,
}

impl KeyColumns {
    fn locate(table: &Table) -> Result<Self> {
        Ok(Self {
            code: table.column("CIV")?,
            day: table.column("DIA_OCURRENCIA_ACC")?,
            hour: table.column("HORA_OCURRENCIA_ACC")?,
        })
    }

    /// Extracts the grouping key, or `None` for rows whose corridor code
    /// is missing or zero. Counting those under one synthetic key would
    /// conflate unrelated accidents, so they are dropped before grouping.
    fn key(&self, row: &[Value]) -> Result<Option<FacetKey>> {
        let Some(code) = row[self.code].as_code()? else {
            return Ok(None);
        };
        Ok(Some(FacetKey {
            code,
            day: row[self.day].as_text()?.to_string(),
            hour: row[self.hour].as_hour()?,
        }))
    }
}

/// Counts one report per row, grouped by key.
pub fn count_reports(table: &Table) -> Result<HashMap<FacetKey, u64>> {
    let cols = KeyColumns::locate(table)?;
    let mut counts = HashMap::new();
    for row in table.rows() {
        if let Some(key) = cols.key(row)? {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Sums one per-report person count per key.
pub fn sum_people(table: &Table, column: &str) -> Result<HashMap<FacetKey, u64>> {
    let cols = KeyColumns::locate(table)?;
    let idx = table.column(column)?;
    let mut sums = HashMap::new();
    for row in table.rows() {
        if let Some(key) = cols.key(row)? {
            *sums.entry(key).or_insert(0) += row[idx].as_count()?;
        }
    }
    Ok(sums)
}

/// Sums a death column and its co-occurring injury column per key.
pub fn sum_fatal(
    table: &Table,
    deaths_column: &str,
    injuries_column: &str,
) -> Result<HashMap<FacetKey, FatalCounts>> {
    let cols = KeyColumns::locate(table)?;
    let deaths_idx = table.column(deaths_column)?;
    let injuries_idx = table.column(injuries_column)?;
    let mut sums: HashMap<FacetKey, FatalCounts> = HashMap::new();
    for row in table.rows() {
        if let Some(key) = cols.key(row)? {
            let entry = sums.entry(key).or_default();
            entry.deaths += row[deaths_idx].as_count()?;
            entry.injuries += row[injuries_idx].as_count()?;
        }
    }
    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: i64, day: &str, hour: u8) -> FacetKey {
        FacetKey {
            code,
            day: day.to_string(),
            hour,
        }
    }

    fn report_row(code: Value, day: &str, hour: i64) -> Vec<Value> {
        vec![
            Value::Text("A-1".to_string()),
            code,
            Value::Text(day.to_string()),
            Value::Int(hour),
        ]
    }

    fn reports_table(rows: Vec<Vec<Value>>) -> Table {
        Table::new(
            vec![
                "formulario".to_string(),
                "civ".to_string(),
                "dia_ocurrencia_acc".to_string(),
                "hora_ocurrencia_acc".to_string(),
            ],
            rows,
        )
    }

    #[test]
    fn test_count_reports_groups_by_key() {
        let table = reports_table(vec![
            report_row(Value::Int(100), "LUNES", 14),
            report_row(Value::Int(100), "LUNES", 14),
            report_row(Value::Int(100), "MARTES", 14),
            report_row(Value::Int(200), "LUNES", 14),
        ]);

        let counts = count_reports(&table).unwrap();
        assert_eq!(counts[&key(100, "LUNES", 14)], 2);
        assert_eq!(counts[&key(100, "MARTES", 14)], 1);
        assert_eq!(counts[&key(200, "LUNES", 14)], 1);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_zero_and_null_codes_never_reach_a_key() {
        let table = reports_table(vec![
            report_row(Value::Int(0), "LUNES", 14),
            report_row(Value::Null, "LUNES", 14),
            report_row(Value::Float(0.0), "LUNES", 14),
            report_row(Value::Int(100), "LUNES", 14),
        ]);

        let counts = count_reports(&table).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&key(100, "LUNES", 14)], 1);
        assert!(counts.keys().all(|k| k.code != 0));
    }

    #[test]
    fn test_sum_people_sums_per_report_counts() {
        let table = Table::new(
            vec![
                "FORMULARIO".to_string(),
                "CIV".to_string(),
                "DIA_OCURRENCIA_ACC".to_string(),
                "HORA_OCURRENCIA_ACC".to_string(),
                "heridos".to_string(),
            ],
            vec![
                vec![
                    Value::Text("A-1".to_string()),
                    Value::Int(100),
                    Value::Text("LUNES".to_string()),
                    Value::Int(8),
                    Value::Int(2),
                ],
                vec![
                    Value::Text("A-2".to_string()),
                    Value::Int(100),
                    Value::Text("LUNES".to_string()),
                    Value::Int(8),
                    Value::Int(3),
                ],
            ],
        );

        let sums = sum_people(&table, "HERIDOS").unwrap();
        assert_eq!(sums[&key(100, "LUNES", 8)], 5);
    }

    #[test]
    fn test_sum_fatal_carries_both_columns() {
        let table = Table::new(
            vec![
                "FORMULARIO".to_string(),
                "CIV".to_string(),
                "DIA_OCURRENCIA_ACC".to_string(),
                "HORA_OCURRENCIA_ACC".to_string(),
                "MUERTES".to_string(),
                "HERIDOS".to_string(),
            ],
            vec![
                vec![
                    Value::Text("A-1".to_string()),
                    Value::Int(100),
                    Value::Text("VIERNES".to_string()),
                    Value::Int(22),
                    Value::Int(1),
                    Value::Int(2),
                ],
                vec![
                    Value::Text("A-2".to_string()),
                    Value::Int(100),
                    Value::Text("VIERNES".to_string()),
                    Value::Int(22),
                    Value::Int(1),
                    Value::Null,
                ],
            ],
        );

        let sums = sum_fatal(&table, "MUERTES", "HERIDOS").unwrap();
        let counts = sums[&key(100, "VIERNES", 22)];
        assert_eq!(counts.deaths, 2);
        assert_eq!(counts.injuries, 2);
    }

    #[test]
    fn test_out_of_range_hour_is_rejected() {
        let table = reports_table(vec![report_row(Value::Int(100), "LUNES", 24)]);
        assert!(count_reports(&table).is_err());
    }

    #[test]
    fn test_sql_embeds_window_bounds() {
        let window = DateWindow {
            start: chrono::NaiveDate::from_ymd_opt(2018, 12, 31).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
        };
        for facet in [
            Facet::Accidents,
            Facet::Injuries,
            Facet::Deaths,
            Facet::VulnerableInjuries,
            Facet::VulnerableDeaths,
        ] {
            let sql = facet.sql(&window);
            assert!(sql.contains("> '2018-12-31'"), "{sql}");
            assert!(sql.contains("<= '2021-12-31'"), "{sql}");
        }
    }
}
