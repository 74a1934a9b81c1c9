#![warn(clippy::all)]
#![doc = include_str!("../README.md")]

// Modules that make up the BigQuery Explorer library.
mod args;
pub mod bigquery;
mod chart;
mod chart_view;
mod credentials;
mod data_format;
mod error;
mod executor;
mod file_dialog;
mod layout;
mod orchestrator;
mod result_table;
mod schema_change;
mod session;
mod sqls;
mod table_preview;
mod traits;
mod warehouse;

#[cfg(test)]
mod tests_support;

// Publicly expose the contents of these modules.
pub use self::{
    // add to lib
    args::Arguments,
    bigquery::{BigQueryConnector, QueryOptions},
    chart::*,
    chart_view::*,
    credentials::*,
    data_format::*,
    error::*,
    executor::*,
    file_dialog::*,
    layout::*,
    orchestrator::*,
    result_table::*,
    schema_change::*,
    session::*,
    sqls::*,
    table_preview::*,
    traits::*,
    warehouse::*,
};
