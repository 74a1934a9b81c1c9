//! Query Executor: dispatches query text to the active client.
//!
//! Results are memoized by the exact query text. Re-submitting a string returns
//! the previously fetched table without contacting the warehouse, which also
//! means data mutated upstream stays stale until the text changes. The cache is
//! unbounded and is only emptied when the session switches clients.

use crate::{
    ClientHandle, ExplorerError, ExplorerResult, TABLE_NAME_COLUMN, TableField, tables_query,
};

use polars::prelude::*;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

/// Context labels shown with the redacted warehouse guidance.
pub const CONTEXT_RUN_QUERY: &str = "Running SQL query";
pub const CONTEXT_LOAD_SCHEMA: &str = "Loading dataset schema";
pub const CONTEXT_LIST_DATASETS: &str = "Listing datasets";
pub const CONTEXT_TABLE_PREVIEW: &str = "Loading table preview";

/// Keyed result cache in front of [`crate::Warehouse::run_query`].
#[derive(Debug, Default)]
pub struct QueryExecutor {
    /// Exact query text -> fetched table.
    cache: HashMap<String, Arc<DataFrame>>,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `query` on `client`, or returns the cached table for identical text.
    ///
    /// Exactly one of table / error comes back. Blank text is the caller's job to
    /// reject; it is sent as-is here.
    ///
    /// ### Errors
    /// * `ExplorerError::NoClient` when `client` is `None` (nothing is contacted).
    /// * `ExplorerError::Query` for every remote or parsing failure. The raw cause
    ///   is logged; failures are not cached.
    pub fn execute(
        &mut self,
        client: Option<&ClientHandle>,
        query: &str,
    ) -> ExplorerResult<Arc<DataFrame>> {
        self.execute_with_context(client, query, CONTEXT_RUN_QUERY)
    }

    fn execute_with_context(
        &mut self,
        client: Option<&ClientHandle>,
        query: &str,
        context: &str,
    ) -> ExplorerResult<Arc<DataFrame>> {
        let client = client.ok_or(ExplorerError::NoClient)?;

        if let Some(df) = self.cache.get(query) {
            debug!("Query cache hit ({} rows): {query:?}", df.height());
            return Ok(Arc::clone(df));
        }

        let df = client
            .run_query(query)
            .map(Arc::new)
            .map_err(|err| ExplorerError::redacted(context, &err))?;

        info!(
            "Query returned {} rows x {} columns",
            df.height(),
            df.width()
        );

        self.cache.insert(query.to_string(), Arc::clone(&df));
        Ok(df)
    }

    /// Table names of `dataset`, read through the same memoized path as user queries.
    pub fn list_tables(
        &mut self,
        client: Option<&ClientHandle>,
        project: &str,
        dataset: &str,
    ) -> ExplorerResult<Vec<String>> {
        let query = tables_query(project, dataset);
        let df = self.execute_with_context(client, &query, CONTEXT_LOAD_SCHEMA)?;

        let names = table_names(&df).map_err(|err| {
            ExplorerError::redacted(CONTEXT_LOAD_SCHEMA, &ExplorerError::from(err))
        })?;

        debug!("Dataset '{dataset}' has {} tables", names.len());
        Ok(names)
    }

    /// Dataset ids of `project`. Not memoized: the list is re-read per client.
    pub fn list_datasets(
        &self,
        client: Option<&ClientHandle>,
        project: &str,
    ) -> ExplorerResult<Vec<String>> {
        let client = client.ok_or(ExplorerError::NoClient)?;
        client
            .list_datasets(project)
            .map_err(|err| ExplorerError::redacted(CONTEXT_LIST_DATASETS, &err))
    }

    /// Column schema of one table for the preview grid.
    pub fn table_schema(
        &self,
        client: Option<&ClientHandle>,
        table_ref: &str,
    ) -> ExplorerResult<Vec<TableField>> {
        let client = client.ok_or(ExplorerError::NoClient)?;
        client
            .table_schema(table_ref)
            .map_err(|err| ExplorerError::redacted(CONTEXT_TABLE_PREVIEW, &err))
    }

    /// Drops every cached result.
    pub fn clear(&mut self) {
        if !self.cache.is_empty() {
            debug!("Clearing {} cached query results", self.cache.len());
        }
        self.cache.clear();
    }

    /// Number of distinct query texts with a cached result.
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}

/// Reads the table-name column as strings, whatever its stored type.
fn table_names(df: &DataFrame) -> PolarsResult<Vec<String>> {
    let column = df.column(TABLE_NAME_COLUMN)?.cast(&DataType::String)?;
    let names = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(names)
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
