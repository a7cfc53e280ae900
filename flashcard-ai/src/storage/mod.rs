//! Persistence layer
//!
//! A generic "table" abstraction: rows are JSON objects, reads take equality
//! filters, ordering and offset/limit pagination and report the exact count
//! of matching rows. `MemoryDatastore` is the in-process implementation.

mod memory;

pub use memory::MemoryDatastore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// A stored row
pub type Row = Map<String, Value>;

/// Table holding flashcards
pub const FLASHCARDS_TABLE: &str = "flashcards";

/// Table holding generation metadata
pub const GENERATIONS_TABLE: &str = "generations";

/// Table holding failed generation attempts
pub const ERROR_LOGS_TABLE: &str = "error_logs";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Row selection: equality filters plus ordering and pagination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// `column = value` predicates, all of which must hold
    pub filters: Vec<(String, Value)>,

    /// Optional `id IN (...)` predicate
    pub id_in: Option<Vec<i64>>,

    /// Column to order by and its direction
    pub order: Option<(String, SortOrder)>,

    /// Rows to skip after ordering
    pub offset: usize,

    /// Maximum rows to return, `None` for all
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Restrict to rows whose `id` is in the given set
    pub fn id_in(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.id_in = Some(ids.into_iter().collect());
        self
    }

    /// Order by a column
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    /// Inclusive row range, like `range(from, to)` on SQL-ish builders
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = from;
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    /// Whether a row satisfies every predicate
    pub fn matches(&self, row: &Row) -> bool {
        let filters_hold = self
            .filters
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value);

        let id_holds = match self.id_in {
            Some(ref ids) => row
                .get("id")
                .and_then(Value::as_i64)
                .map(|id| ids.contains(&id))
                .unwrap_or(false),
            None => true,
        };

        filters_hold && id_holds
    }
}

/// One page of rows with the exact number of matches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub total: usize,
}

/// Generic key-column datastore
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert rows, returning them as stored (with `id` and timestamps filled in)
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Select rows matching the query
    async fn select(&self, table: &str, query: &Query) -> Result<Page>;

    /// Merge `patch` into every row matching the filters, returning the updated rows
    async fn update(&self, table: &str, query: &Query, patch: Row) -> Result<Vec<Row>>;

    /// Delete every row matching the filters, returning how many were removed
    async fn delete(&self, table: &str, query: &Query) -> Result<usize>;
}
