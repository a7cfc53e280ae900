//! In-memory datastore
//!
//! Tables are created on first insert and read as empty before that. Ids are
//! assigned per table from an auto-increment counter.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Datastore, Page, Query, Row, SortOrder};
use crate::error::{Result, ServiceError};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: Vec<Row>,
}

/// `Datastore` kept in process memory
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in a table
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Total order over JSON values used for sorting: nulls, then booleans,
/// numbers, strings, and everything else
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let state = tables.entry(table.to_string()).or_default();

        // The batch is all-or-nothing: ids and the counter commit only once
        // every row has been accepted.
        let mut taken: HashSet<i64> = state
            .rows
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .collect();
        let mut next_id = state.next_id;

        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id = match row.get("id") {
                Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                    ServiceError::database(format!("{}: id must be an integer", table))
                })?,
                Some(Value::Null) | None => {
                    next_id += 1;
                    while taken.contains(&next_id) {
                        next_id += 1;
                    }
                    row.insert("id".to_string(), Value::from(next_id));
                    next_id
                }
                Some(other) => {
                    return Err(ServiceError::database(format!(
                        "{}: id must be an integer, got {}",
                        table, other
                    )));
                }
            };

            if !taken.insert(id) {
                return Err(ServiceError::database(format!(
                    "{}: duplicate key id={}",
                    table, id
                )));
            }
            next_id = next_id.max(id);

            let now = now_timestamp();
            row.entry("created_at").or_insert_with(|| Value::from(now.clone()));
            row.entry("updated_at").or_insert_with(|| Value::from(now));
            stored.push(row);
        }

        state.next_id = next_id;
        state.rows.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Page> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|t| t.rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        let total = rows.len();

        if let Some((ref column, order)) = query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let rows = rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(Page { rows, total })
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let Some(state) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in state.rows.iter_mut().filter(|row| query.matches(row)) {
            for (key, value) in &patch {
                if key != "id" {
                    row.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(state) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = state.rows.len();
        state.rows.retain(|row| !query.matches(row));
        Ok(before - state.rows.len())
    }
}
