//! BigQuery REST implementation of [`Warehouse`].
//!
//! All calls are blocking (`reqwest::blocking`) and must run off the UI thread
//! and outside any async runtime context.

pub mod auth;
pub mod convert;

use crate::{
    ClientHandle, ExplorerError, ExplorerResult, ServiceAccountKey, TableField, Warehouse,
    WarehouseConnector, split_table_ref,
};

use self::{
    auth::TokenProvider,
    convert::{QueryResponse, ResultSchema, rows_to_dataframe},
};

use polars::prelude::DataFrame;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Client-side limit on any single HTTP exchange.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Knobs applied to every client a connector builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Rows fetched per result before the remainder is dropped.
    pub max_rows: usize,
    /// Server-side wait per `jobs.query` / `getQueryResults` call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            max_rows: 10_000,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetItem {
    dataset_reference: DatasetReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    dataset_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct TableResource {
    #[serde(default)]
    schema: ResultSchema,
}

/// Builds [`BigQueryClient`]s; construction performs the first token exchange.
#[derive(Debug, Clone, Default)]
pub struct BigQueryConnector {
    options: QueryOptions,
}

impl BigQueryConnector {
    pub fn new(options: QueryOptions) -> Self {
        BigQueryConnector { options }
    }
}

impl WarehouseConnector for BigQueryConnector {
    fn connect(&self, key: &ServiceAccountKey) -> ExplorerResult<ClientHandle> {
        let client = BigQueryClient::new(key.clone(), self.options.clone())?;

        // Handshake: a key the token endpoint rejects never becomes a client.
        client.auth.token()?;

        Ok(Arc::new(client))
    }
}

/// Authenticated BigQuery client bound to the key's project.
#[derive(Debug)]
pub struct BigQueryClient {
    http: Client,
    auth: TokenProvider,
    options: QueryOptions,
}

impl BigQueryClient {
    pub fn new(key: ServiceAccountKey, options: QueryOptions) -> ExplorerResult<Self> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(BigQueryClient {
            auth: TokenProvider::new(key, http.clone()),
            http,
            options,
        })
    }

    fn url(path: &str) -> String {
        format!("{API_BASE}/{path}")
    }

    /// Sends an authorized request and decodes the JSON answer.
    ///
    /// Error documents become [`ExplorerError::Warehouse`]. A 401 also drops the
    /// cached token so the next call re-authenticates.
    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ExplorerResult<T> {
        let response = request.bearer_auth(self.auth.token()?).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            if status.as_u16() == 401 {
                self.auth.invalidate();
            }

            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_default();

            return Err(ExplorerError::Warehouse {
                code: if detail.code == 0 { status.as_u16() } else { detail.code },
                message: detail.message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Polls `getQueryResults` until the job completes, then reads the
    /// remaining pages up to the row cap.
    fn collect_rows(&self, first: QueryResponse) -> ExplorerResult<DataFrame> {
        let mut response = first;

        let job = response.job_reference.clone().ok_or_else(|| ExplorerError::Warehouse {
            code: 0,
            message: "query response without job reference".to_string(),
        })?;

        let results_url = Self::url(&format!(
            "projects/{}/queries/{}",
            job.project_id, job.job_id
        ));

        let mut params: Vec<(&str, String)> =
            vec![("timeoutMs", self.options.timeout_ms.to_string())];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }

        while !response.job_complete {
            debug!("Job {} still running; polling", job.job_id);
            response = self.send(self.http.get(&results_url).query(&params))?;
        }

        let fields = response.schema.take().unwrap_or_default().fields;
        let mut rows = std::mem::take(&mut response.rows);
        let mut page_token = response.page_token.take();

        while let Some(token) = page_token {
            if rows.len() >= self.options.max_rows {
                warn!(
                    "Result truncated at {} rows (total {:?})",
                    self.options.max_rows, response.total_rows
                );
                break;
            }

            let mut page_params = params.clone();
            page_params.push(("pageToken", token));
            page_params.push(("maxResults", (self.options.max_rows - rows.len()).to_string()));

            let mut page: QueryResponse = self.send(self.http.get(&results_url).query(&page_params))?;
            rows.append(&mut page.rows);
            page_token = page.page_token;
        }

        rows.truncate(self.options.max_rows);
        Ok(rows_to_dataframe(&fields, &rows)?)
    }
}

impl Warehouse for BigQueryClient {
    fn project_id(&self) -> &str {
        &self.auth.key().project_id
    }

    fn list_datasets(&self, project: &str) -> ExplorerResult<Vec<String>> {
        let url = Self::url(&format!("projects/{project}/datasets"));
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).query(&[("all", "false")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: DatasetList = self.send(request)?;
            datasets.extend(page.datasets.into_iter().map(|d| d.dataset_reference.dataset_id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Project '{project}' lists {} datasets", datasets.len());
        Ok(datasets)
    }

    fn table_schema(&self, table_ref: &str) -> ExplorerResult<Vec<TableField>> {
        let (project, dataset, table) =
            split_table_ref(table_ref).ok_or_else(|| ExplorerError::InvalidArgument {
                arg_name: "table_ref".to_string(),
                reason: format!("expected 'project.dataset.table', found '{table_ref}'"),
            })?;

        let url = Self::url(&format!(
            "projects/{project}/datasets/{dataset}/tables/{table}"
        ));
        let resource: TableResource = self.send(self.http.get(&url))?;

        Ok(resource.schema.fields)
    }

    fn run_query(&self, query: &str) -> ExplorerResult<DataFrame> {
        let url = Self::url(&format!("projects/{}/queries", self.project_id()));
        let body = json!({
            "query": query,
            "useLegacySql": false,
            "maxResults": self.options.max_rows,
            "timeoutMs": self.options.timeout_ms,
        });

        debug!("Submitting query ({} chars)", query.len());
        let first: QueryResponse = self.send(self.http.post(&url).json(&body))?;

        self.collect_rows(first)
    }
}
