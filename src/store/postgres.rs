//! Postgres-backed [`CrashStore`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::error::{PipelineError, Result};
use crate::store::{CrashStore, Table, Value};

/// Connection pool over the accident store. A query that exceeds the
/// timeout fails the whole pipeline run; there is no partial table.
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("connect: {e}")))?;

        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[async_trait]
impl CrashStore for PgStore {
    async fn query(&self, sql: &str) -> Result<Table> {
        let fetch = sqlx::query(sql).fetch_all(&self.pool);
        let rows = tokio::time::timeout(self.query_timeout, fetch)
            .await
            .map_err(|_| {
                PipelineError::StoreUnavailable(format!(
                    "query timed out after {:?}",
                    self.query_timeout
                ))
            })?
            .map_err(|e| PipelineError::StoreUnavailable(format!("query: {e}")))?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                values.push(decode_cell(row, idx)?);
            }
            decoded.push(values);
        }

        Ok(Table::new(columns, decoded))
    }
}

fn decode_cell(row: &PgRow, idx: usize) -> Result<Value> {
    let column = &row.columns()[idx];
    let type_name = column.type_info().name();

    let decoded = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map_or(Value::Null, |n| Value::Int(i64::from(n)))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map_or(Value::Null, |n| Value::Int(i64::from(n)))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map_or(Value::Null, Value::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map_or(Value::Null, |n| Value::Float(f64::from(n)))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map_or(Value::Null, Value::Float)),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map_or(Value::Null, Value::Text)),
        other => {
            return Err(PipelineError::DataIntegrity(format!(
                "unsupported column type {other} for {}",
                column.name()
            )));
        }
    };

    decoded.map_err(|e| PipelineError::DataIntegrity(format!("decode {}: {e}", column.name())))
}
