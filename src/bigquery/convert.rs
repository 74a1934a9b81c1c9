use crate::TableField;

use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;

/// The subset of `jobs.query` / `jobs.getQueryResults` responses the explorer reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<ResultSchema>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub total_rows: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// One result row: cells in schema order.
#[derive(Debug, Clone, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub f: Vec<Cell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub v: Value,
}

/// Storage type a warehouse column lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Boolean,
    Text,
}

impl ColumnType {
    /// Maps a warehouse field to a storage type. Repeated fields are kept as text.
    pub fn of(field: &TableField) -> Self {
        if field.mode.eq_ignore_ascii_case("REPEATED") {
            return ColumnType::Text;
        }

        match field.field_type.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" => ColumnType::Int64,
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => ColumnType::Float64,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }
}

/// Cell payload as text. Scalars arrive string-encoded; nested records and
/// arrays are kept as their JSON text.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Builds a typed column from text cells. A cell that fails to parse becomes null.
fn typed_column(field: &TableField, cells: &[Option<String>]) -> Column {
    let name: PlSmallStr = field.name.as_str().into();

    match ColumnType::of(field) {
        ColumnType::Int64 => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect();
            Column::new(name, values)
        }
        ColumnType::Float64 => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect();
            Column::new(name, values)
        }
        ColumnType::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_bool))
                .collect();
            Column::new(name, values)
        }
        ColumnType::Text => Column::new(name, cells.to_vec()),
    }
}

/// Converts a page set of warehouse rows to a [`DataFrame`].
///
/// ### Logic
/// 1. Collect the text of cell `i` of every row for field `i` (short rows yield null).
/// 2. Parse each column per its warehouse type; see [`ColumnType::of`].
/// 3. A response without schema fields becomes a frame with no columns that
///    still reports the row count.
pub fn rows_to_dataframe(fields: &[TableField], rows: &[Row]) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let cells: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.f.get(index).and_then(|cell| cell_text(&cell.v)))
                .collect();
            typed_column(field, &cells)
        })
        .collect();

    DataFrame::new(rows.len(), columns)
}
