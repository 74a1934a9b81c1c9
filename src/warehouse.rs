//! The narrow contract the explorer needs from a cloud warehouse.
//!
//! Everything here is synchronous and may fail: the session drives each call to
//! completion on its worker thread before the next interaction is accepted.

use crate::{ExplorerResult, ServiceAccountKey};

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

/// Mode reported when the warehouse omits one.
pub const DEFAULT_FIELD_MODE: &str = "NULLABLE";

/// One column of a warehouse table, as shown in the schema preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    DEFAULT_FIELD_MODE.to_string()
}

impl TableField {
    pub fn new(name: &str, field_type: &str, mode: &str) -> Self {
        TableField {
            name: name.to_string(),
            field_type: field_type.to_string(),
            mode: mode.to_string(),
        }
    }
}

/// An authenticated, usable link to the warehouse.
pub trait Warehouse: Send + Sync + Debug {
    /// Project the client bills queries to (the one embedded in the key).
    fn project_id(&self) -> &str;

    /// Lists dataset ids of `project`.
    fn list_datasets(&self, project: &str) -> ExplorerResult<Vec<String>>;

    /// Returns the column schema of `table_ref` (`project.dataset.table`).
    fn table_schema(&self, table_ref: &str) -> ExplorerResult<Vec<TableField>>;

    /// Runs a standard-SQL query to completion and returns every fetched row.
    fn run_query(&self, query: &str) -> ExplorerResult<DataFrame>;
}

/// The session owns exactly one of these at a time.
pub type ClientHandle = Arc<dyn Warehouse>;

/// Builds clients from validated key material.
///
/// Construction may involve a network handshake; callers memoize the result.
pub trait WarehouseConnector: Send + Sync {
    fn connect(&self, key: &ServiceAccountKey) -> ExplorerResult<ClientHandle>;
}

/// Splits `project.dataset.table` into its three parts.
pub fn split_table_ref(table_ref: &str) -> Option<(&str, &str, &str)> {
    let mut parts = table_ref.trim_matches('`').splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(d), Some(t)) if !p.is_empty() && !d.is_empty() && !t.is_empty() => {
            Some((p, d, t))
        }
        _ => None,
    }
}
