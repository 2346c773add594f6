use super::{SourceError, UsageSource, normalize_values};
use crate::usage::UsageRecord;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    Column, Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
};
use std::path::{Path, PathBuf};

/// Reads usage rows from a table in a SQLite database.
///
/// Column names are not fixed: each row becomes a JSON object and goes through
/// the same normalization as log lines, so `session_key` and `sessionKey`
/// columns both work.
#[derive(Clone)]
pub struct SqliteSource {
    pool: SqlitePool,
    path: PathBuf,
    table: String,
}

impl SqliteSource {
    pub fn new(path: impl AsRef<Path>, table: &str) -> Result<Self, SourceError> {
        let table = validate_table_name(table)?;
        let path_buf = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new().filename(&path_buf);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            path: path_buf,
            table,
        })
    }
}

#[async_trait]
impl UsageSource for SqliteSource {
    fn describe(&self) -> String {
        format!("sqlite:{}#{}", self.path.display(), self.table)
    }

    async fn load(&self) -> Result<Vec<UsageRecord>, SourceError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "usage database not found");
            return Ok(Vec::new());
        }

        let query = format!("SELECT * FROM {}", self.table);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let values = rows.iter().map(row_to_json).collect();
        Ok(normalize_values(values, &self.table))
    }
}

pub(super) fn validate_table_name(table: &str) -> Result<String, SourceError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(table.to_string())
    } else {
        Err(SourceError::Unavailable(format!(
            "invalid table name {table:?}"
        )))
    }
}

fn row_to_json(row: &SqliteRow) -> Value {
    let mut object = Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
            value.map(Value::from)
        } else if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
            value.map(Value::from)
        } else if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
            value.map(Value::from)
        } else {
            continue;
        };
        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(object)
}
