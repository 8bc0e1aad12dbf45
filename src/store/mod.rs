//! Tabular query access to the accident record store.
//!
//! The pipeline only ever sees [`Table`]s with named columns; column
//! names are upper-cased on receipt so lookups are case-insensitive.

mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::{PipelineError, Result};

/// A single cell decoded from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Reads a corridor code. NULL and zero codes identify nothing and
    /// come back as `None` so callers drop the row before grouping.
    pub fn as_code(&self) -> Result<Option<i64>> {
        let code = match self {
            Value::Null => return Ok(None),
            Value::Int(n) => *n,
            Value::Float(f) if f.fract() == 0.0 => *f as i64,
            other => {
                return Err(PipelineError::DataIntegrity(format!(
                    "corridor code from {other:?}"
                )));
            }
        };
        Ok(if code == 0 { None } else { Some(code) })
    }

    /// Reads a non-negative person or report count. NULL counts come from
    /// outer joins and mean zero.
    pub fn as_count(&self) -> Result<u64> {
        match self {
            Value::Null => Ok(0),
            Value::Int(n) if *n >= 0 => Ok(*n as u64),
            Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Ok(*f as u64),
            other => Err(PipelineError::DataIntegrity(format!(
                "count from {other:?}"
            ))),
        }
    }

    /// Reads a required text field, such as the day of week.
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(PipelineError::DataIntegrity(format!(
                "text from {other:?}"
            ))),
        }
    }

    /// Reads an hour of day, rejecting anything outside 0..=23.
    pub fn as_hour(&self) -> Result<u8> {
        let hour = match self {
            Value::Int(n) => (0..=23).contains(n).then_some(*n),
            Value::Float(f) if f.fract() == 0.0 => {
                let n = *f as i64;
                (0..=23).contains(&n).then_some(n)
            }
            Value::Text(s) => s.trim().parse::<i64>().ok().filter(|n| (0..=23).contains(n)),
            Value::Float(_) => None,
            Value::Null => None,
        };
        hour.map(|n| n as u8).ok_or_else(|| {
            PipelineError::DataIntegrity(format!("hour of day from {self:?}"))
        })
    }
}

/// A tabular query result with named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table, upper-casing column names on receipt.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = columns.into_iter().map(|c| c.to_uppercase()).collect();
        Self { columns, rows }
    }

    /// Index of a column, looked up case-insensitively.
    pub fn column(&self, name: &str) -> Result<usize> {
        let upper = name.to_uppercase();
        self.columns
            .iter()
            .position(|c| *c == upper)
            .ok_or_else(|| PipelineError::DataIntegrity(format!("missing column {upper}")))
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Query capability of the relational accident store.
#[async_trait]
pub trait CrashStore: Send + Sync {
    /// Runs a SQL statement and returns the full result set.
    async fn query(&self, sql: &str) -> Result<Table>;
}
