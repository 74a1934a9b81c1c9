// https://cloud.google.com/bigquery/docs/reference/standard-sql/query-syntax
// https://cloud.google.com/bigquery/docs/information-schema-tables

/// Project hosting the public datasets browsed by default.
pub const PUBLIC_PROJECT: &str = "bigquery-public-data";

/// Row limit written into the generated preview query.
pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

/// Column holding table names in the `INFORMATION_SCHEMA.TABLES` view.
pub const TABLE_NAME_COLUMN: &str = "table_name";

/// Fully-qualified table reference: `project.dataset.table`.
pub fn table_ref(project: &str, dataset: &str, table: &str) -> String {
    format!("{project}.{dataset}.{table}")
}

/// Table reference quoted for use in a `FROM` clause (and for the copy button).
pub fn quoted_table_ref(project: &str, dataset: &str, table: &str) -> String {
    format!("`{}`", table_ref(project, dataset, table))
}

/// Query listing the tables of `dataset`.
pub fn tables_query(project: &str, dataset: &str) -> String {
    format!(
        "\
SELECT {TABLE_NAME_COLUMN}
FROM `{project}.{dataset}.INFORMATION_SCHEMA.TABLES`"
    )
}

/// Query written into the editor whenever a table is selected.
pub fn default_query(project: &str, dataset: &str, table: &str) -> String {
    format!(
        "\
SELECT *
FROM {}
LIMIT {DEFAULT_PREVIEW_LIMIT};",
        quoted_table_ref(project, dataset, table)
    )
}

/// `true` when the text holds nothing but whitespace.
///
/// Blank queries are rejected before the executor is ever called.
pub fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

#[cfg(test)]
mod tests_sqls {
    use super::*;

    #[test]
    fn default_query_targets_selected_table() {
        let query = default_query(PUBLIC_PROJECT, "samples", "shakespeare");
        assert_eq!(
            query,
            "SELECT *\nFROM `bigquery-public-data.samples.shakespeare`\nLIMIT 10;"
        );
    }

    #[test]
    fn tables_query_reads_information_schema() {
        let query = tables_query(PUBLIC_PROJECT, "austin_bikeshare");
        assert!(query.starts_with("SELECT table_name"));
        assert!(query.contains("`bigquery-public-data.austin_bikeshare.INFORMATION_SCHEMA.TABLES`"));
    }

    #[test]
    fn blank_queries() {
        assert!(is_blank(""));
        assert!(is_blank("  \n\t "));
        assert!(!is_blank(" SELECT 1 "));
    }
}
