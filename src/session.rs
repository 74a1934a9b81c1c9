//! Session State Store.
//!
//! One [`Session`] holds everything a single user's exploration needs: the
//! active client, dataset and table selections, the current result, chart
//! selection and queued notices. It is an ordinary value owned by the app,
//! never a global, so two sessions never see each other's state.

use crate::{
    Action, ChartKind, ChartSpec, ClientHandle, CredentialManager, Event,
    ExplorerError, PUBLIC_PROJECT, QueryExecutor, QueryOptions, SchemaChangeDetector, TableField, ViewState,
    WarehouseConnector, build_chart, default_query, is_blank, next_state, quoted_table_ref,
    table_ref,
};

use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-session settings, usually filled from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Project whose datasets are browsed.
    pub public_project: String,
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            public_project: PUBLIC_PROJECT.to_string(),
            max_rows: 10_000,
            query_timeout_ms: 10_000,
        }
    }
}

impl SessionConfig {
    /// Row cap and poll wait handed to the BigQuery connector.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_rows: self.max_rows,
            timeout_ms: self.query_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user, shown on the next redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Axis and kind choices of the chart builder. Unset means "not chosen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSelection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub kind: Option<ChartKind>,
}

impl ChartSelection {
    pub fn clear(&mut self) {
        *self = ChartSelection::default();
    }
}

/// What the chart area should show.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    /// No plot was requested for the current result.
    NotRequested,
    Ready(ChartSpec),
    /// Plot requested but there is nothing to draw.
    NoData,
    /// Plot requested with axes that are not columns of the result.
    InvalidSelection,
}

pub struct Session {
    config: SessionConfig,
    credentials: CredentialManager,
    executor: QueryExecutor,
    detector: SchemaChangeDetector,

    state: ViewState,
    client: Option<ClientHandle>,
    /// Transient key input; cleared once a key is accepted.
    key_input: String,

    datasets: Vec<String>,
    selected_dataset: Option<String>,
    tables: Vec<String>,
    selected_table: Option<String>,
    table_schema: Vec<TableField>,

    query_text: String,
    result: Option<Arc<DataFrame>>,
    query_error: Option<String>,
    chart: ChartSelection,

    notices: Vec<Notice>,
}

impl Session {
    pub fn new(config: SessionConfig, connector: Arc<dyn WarehouseConnector>) -> Self {
        Session {
            config,
            credentials: CredentialManager::new(connector),
            executor: QueryExecutor::new(),
            detector: SchemaChangeDetector::new(),
            state: ViewState::NoClient,
            client: None,
            key_input: String::new(),
            datasets: Vec::new(),
            selected_dataset: None,
            tables: Vec::new(),
            selected_table: None,
            table_schema: Vec::new(),
            query_text: String::new(),
            result: None,
            query_error: None,
            chart: ChartSelection::default(),
            notices: Vec::new(),
        }
    }

    /// Performs `action`, advances the state machine and applies the cascading reset.
    ///
    /// ### Logic
    /// 1. Perform the action against the store; this yields an [`Event`].
    /// 2. `next_state(current, event)` picks the new [`ViewState`].
    /// 3. Everything that belongs to a later state than the new one is discarded.
    pub fn dispatch(&mut self, action: Action) -> ViewState {
        debug!("Dispatching {action:?} in state {:?}", self.state);

        let event = match action {
            Action::SaveKey(text) => self.save_key(&text),
            Action::SelectDataset(name) => self.select_dataset(name),
            Action::SelectTable(name) => self.select_table(name),
            Action::SubmitQuery(text) => self.submit_query(text),
            Action::SetChartX(name) => self.set_chart_column(name, true),
            Action::SetChartY(name) => self.set_chart_column(name, false),
            Action::SetChartKind(kind) => {
                self.chart.kind = Some(kind);
                Event::ChartSelectionEdited
            }
            Action::RequestPlot => self.request_plot(),
            Action::ResetSession => self.reset(),
        };

        let next = next_state(self.state, &event);
        if next != self.state {
            info!("View state {:?} -> {:?} ({event:?})", self.state, next);
        }

        self.state = next;
        self.discard_above(next);
        next
    }

    /// The single cascading-reset rule.
    fn discard_above(&mut self, state: ViewState) {
        if state < ViewState::ClientReady {
            self.datasets.clear();
            self.selected_dataset = None;
            self.tables.clear();
            self.selected_table = None;
            self.table_schema.clear();
            self.query_text.clear();
        }

        if state < ViewState::ResultReady {
            self.result = None;
            self.chart.clear();
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn notify_error(&mut self, err: &ExplorerError) {
        self.notify(NoticeLevel::Error, err.to_string());
    }

    fn save_key(&mut self, key_text: &str) -> Event {
        let client = match self.credentials.validate_and_build(key_text) {
            Ok(client) => client,
            Err(err) => {
                warn!("Key rejected: {err}");
                self.notify_error(&err);
                return Event::CredentialRejected;
            }
        };

        let replaced = self
            .client
            .as_ref()
            .is_none_or(|current| !Arc::ptr_eq(current, &client));

        if replaced {
            // Cached results belong to the previous client.
            self.executor.clear();
        }

        self.client = Some(client);
        self.key_input.clear();
        self.notify(NoticeLevel::Success, "Key saved successfully");

        self.selected_dataset = None;
        self.tables.clear();
        self.selected_table = None;
        self.table_schema.clear();
        self.query_text.clear();
        self.query_error = None;
        self.load_datasets();

        Event::ClientSaved
    }

    fn load_datasets(&mut self) {
        let project = self.config.public_project.clone();

        match self.executor.list_datasets(self.client.as_ref(), &project) {
            Ok(datasets) => {
                if datasets.is_empty() {
                    self.notify(NoticeLevel::Warning, "No datasets available.");
                }
                self.datasets = datasets;
            }
            Err(err) => {
                self.datasets.clear();
                self.notify_error(&err);
            }
        }
    }

    fn select_dataset(&mut self, name: String) -> Event {
        if self.client.is_none() {
            self.notify_error(&ExplorerError::NoClient);
            return Event::Ignored;
        }

        if self.selected_dataset.as_deref() == Some(name.as_str()) {
            return Event::DatasetChosen { changed: false };
        }

        let project = self.config.public_project.clone();
        let listing = self
            .executor
            .list_tables(self.client.as_ref(), &project, &name);

        self.selected_table = None;
        self.table_schema.clear();
        self.query_text.clear();
        self.query_error = None;

        match listing {
            Ok(tables) => {
                if tables.is_empty() {
                    self.notify(NoticeLevel::Info, "No tables found in this dataset.");
                }
                self.tables = tables;
            }
            Err(err) => {
                self.tables.clear();
                self.query_error = Some(err.to_string());
                self.notify_error(&err);
            }
        }

        self.selected_dataset = Some(name);
        Event::DatasetChosen { changed: true }
    }

    fn select_table(&mut self, name: String) -> Event {
        let Some(dataset) = self.selected_dataset.clone() else {
            self.notify(NoticeLevel::Warning, "No dataset selected.");
            return Event::Ignored;
        };

        let project = self.config.public_project.clone();
        let reference = table_ref(&project, &dataset, &name);

        match self.executor.table_schema(self.client.as_ref(), &reference) {
            Ok(fields) => self.table_schema = fields,
            Err(err) => {
                self.table_schema.clear();
                self.notify_error(&err);
            }
        }

        self.query_text = default_query(&project, &dataset, &name);
        self.selected_table = Some(name);
        Event::TableChosen
    }

    fn submit_query(&mut self, text: String) -> Event {
        self.query_text = text;

        if is_blank(&self.query_text) {
            let err = ExplorerError::EmptyInput;
            self.query_error = Some(err.to_string());
            self.notify(NoticeLevel::Warning, err.to_string());
            return Event::QueryBlank;
        }

        if self.client.is_none() {
            let err = ExplorerError::NoClient;
            self.query_error = Some(err.to_string());
            self.notify_error(&err);
            return Event::QueryFailed;
        }

        if self.selected_dataset.is_none() {
            self.notify(NoticeLevel::Warning, "No dataset selected.");
            return Event::Ignored;
        }

        match self.executor.execute(self.client.as_ref(), &self.query_text) {
            Ok(df) => {
                let schema_changed = self.detector.observe(Some(&df));
                if schema_changed {
                    debug!("Result columns changed; clearing chart selection");
                    self.chart.clear();
                }

                self.result = Some(df);
                self.query_error = None;
                Event::ResultLoaded { schema_changed }
            }
            Err(err) => {
                self.query_error = Some(err.to_string());
                self.notify_error(&err);
                Event::QueryFailed
            }
        }
    }

    fn set_chart_column(&mut self, name: String, is_x: bool) -> Event {
        let known = self
            .result
            .as_ref()
            .is_some_and(|df| df.column(&name).is_ok());

        if !known {
            self.notify(NoticeLevel::Warning, "Invalid column selection.");
            return Event::Ignored;
        }

        if is_x {
            self.chart.x = Some(name);
        } else {
            self.chart.y = Some(name);
        }
        Event::ChartSelectionEdited
    }

    /// Unset selectors default to the first column and the first chart kind.
    fn request_plot(&mut self) -> Event {
        let Some(df) = self.result.as_ref() else {
            self.notify(NoticeLevel::Info, "Run a SQL query to enable charting");
            return Event::Ignored;
        };

        let Some(first) = df.get_column_names().first().map(|name| name.to_string()) else {
            self.notify(NoticeLevel::Warning, "No data available to plot.");
            return Event::Ignored;
        };

        self.chart.x.get_or_insert_with(|| first.clone());
        self.chart.y.get_or_insert(first);
        self.chart.kind.get_or_insert(ChartKind::default());

        Event::PlotRequested
    }

    /// Fresh session start. The credential and query memo tables outlive it.
    fn reset(&mut self) -> Event {
        self.client = None;
        self.key_input.clear();
        self.query_error = None;
        self.detector.reset();
        self.notices.clear();
        Event::Reset
    }

    // --- Read access for the view ---

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> Option<&ClientHandle> {
        self.client.as_ref()
    }

    pub fn key_input_mut(&mut self) -> &mut String {
        &mut self.key_input
    }

    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn selected_dataset(&self) -> Option<&str> {
        self.selected_dataset.as_deref()
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn selected_table(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    /// Backticked id of the selected table, as offered by the copy button.
    pub fn selected_table_id(&self) -> Option<String> {
        let dataset = self.selected_dataset.as_deref()?;
        let table = self.selected_table.as_deref()?;
        Some(quoted_table_ref(&self.config.public_project, dataset, table))
    }

    pub fn table_schema(&self) -> &[TableField] {
        &self.table_schema
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn query_text_mut(&mut self) -> &mut String {
        &mut self.query_text
    }

    pub fn result(&self) -> Option<&Arc<DataFrame>> {
        self.result.as_ref()
    }

    pub fn query_error(&self) -> Option<&str> {
        self.query_error.as_deref()
    }

    pub fn chart_selection(&self) -> &ChartSelection {
        &self.chart
    }

    pub fn detector(&self) -> &SchemaChangeDetector {
        &self.detector
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Removes and returns the queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// The chart to render, if a plot was requested for the current result.
    pub fn plot(&self) -> PlotOutcome {
        if self.state != ViewState::ChartReady {
            return PlotOutcome::NotRequested;
        }

        let df = match self.result.as_deref() {
            Some(df) if df.height() > 0 && df.width() > 0 => df,
            _ => return PlotOutcome::NoData,
        };

        let (Some(x), Some(y)) = (self.chart.x.as_deref(), self.chart.y.as_deref()) else {
            return PlotOutcome::InvalidSelection;
        };

        match build_chart(Some(df), x, y, self.chart.kind.unwrap_or_default()) {
            Some(spec) => PlotOutcome::Ready(spec),
            None => PlotOutcome::InvalidSelection,
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// `cargo test -- --show-output tests_session`
#[cfg(test)]
mod tests_session {
    use super::*;
    use crate::tests_support::{FakeConnector, FakeWarehouse, service_account_json};
    use crate::{AxisKind, ExplorerResult, infer_axis_kind};
    use polars::prelude::*;

    const AB_QUERY: &str = "SELECT 1 AS a, 2 AS b";
    const CD_QUERY: &str = "SELECT 'x' AS c, 3 AS d";

    fn warehouse() -> ExplorerResult<FakeWarehouse> {
        Ok(FakeWarehouse::default()
            .with_datasets(&["samples", "austin_bikeshare"])
            .with_tables("samples", &["shakespeare"])
            .with_tables("austin_bikeshare", &["bikeshare_trips"])
            .with_schema(
                "bigquery-public-data.samples.shakespeare",
                vec![
                    TableField::new("word", "STRING", "REQUIRED"),
                    TableField::new("word_count", "INTEGER", "REQUIRED"),
                ],
            )
            .with_query(AB_QUERY, df!("a" => [1i64], "b" => [2i64])?)
            .with_query(CD_QUERY, df!("c" => ["x"], "d" => [3i64])?)
            .with_query("SELECT 3 AS a, 4 AS b", df!("a" => [3i64], "b" => [4i64])?))
    }

    fn session_with(warehouse: &FakeWarehouse) -> Session {
        let connector = Arc::new(FakeConnector::new(warehouse.clone()));
        Session::new(SessionConfig::default(), connector)
    }

    /// A session with a client and the `samples` dataset selected.
    fn ready_session(warehouse: &FakeWarehouse) -> Session {
        let mut session = session_with(warehouse);
        session.dispatch(Action::SaveKey(service_account_json("demo")));
        session.dispatch(Action::SelectDataset("samples".to_string()));
        session
    }

    fn has_notice(notices: &[Notice], level: NoticeLevel, text: &str) -> bool {
        notices
            .iter()
            .any(|n| n.level == level && n.message.contains(text))
    }

    #[test]
    fn malformed_key_leaves_client_unset() -> ExplorerResult<()> {
        let mut session = session_with(&warehouse()?);

        let state = session.dispatch(Action::SaveKey(r#"{"project_id":"demo"}"#.to_string()));

        assert_eq!(state, ViewState::NoClient);
        assert!(session.client().is_none());
        assert!(has_notice(&session.take_notices(), NoticeLevel::Error, "Invalid credentials"));
        Ok(())
    }

    #[test]
    fn rejected_key_keeps_previous_client() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        let before = session.client().cloned().expect("client saved");

        session.dispatch(Action::SaveKey("{broken".to_string()));

        let after = session.client().expect("client kept");
        assert!(Arc::ptr_eq(&before, after));
        assert_eq!(session.state(), ViewState::DatasetSelected);
        Ok(())
    }

    #[test]
    fn valid_key_loads_datasets_and_clears_input() -> ExplorerResult<()> {
        let mut session = session_with(&warehouse()?);
        let key = service_account_json("demo");
        session.key_input_mut().push_str(&key);

        let state = session.dispatch(Action::SaveKey(key));

        assert_eq!(state, ViewState::ClientReady);
        assert_eq!(session.datasets(), ["samples", "austin_bikeshare"]);
        assert!(session.key_input_mut().is_empty());
        assert_eq!(session.client().map(|c| c.project_id()), Some("demo"));
        assert!(has_notice(&session.take_notices(), NoticeLevel::Success, "Key saved"));
        Ok(())
    }

    #[test]
    fn selecting_dataset_lists_tables() -> ExplorerResult<()> {
        let session = ready_session(&warehouse()?);

        assert_eq!(session.state(), ViewState::DatasetSelected);
        assert_eq!(session.selected_dataset(), Some("samples"));
        assert_eq!(session.tables(), ["shakespeare"]);
        Ok(())
    }

    #[test]
    fn selecting_table_writes_default_query_and_schema() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);

        session.dispatch(Action::SelectTable("shakespeare".to_string()));

        assert_eq!(
            session.query_text(),
            "SELECT *\nFROM `bigquery-public-data.samples.shakespeare`\nLIMIT 10;"
        );
        assert_eq!(session.table_schema().len(), 2);
        assert_eq!(
            session.selected_table_id().as_deref(),
            Some("`bigquery-public-data.samples.shakespeare`")
        );
        assert_eq!(session.state(), ViewState::DatasetSelected);
        Ok(())
    }

    #[test]
    fn table_change_keeps_current_result() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));

        session.dispatch(Action::SelectTable("shakespeare".to_string()));

        assert!(session.result().is_some());
        assert_eq!(session.state(), ViewState::ResultReady);
        Ok(())
    }

    #[test]
    fn repeated_query_is_cached_and_keeps_chart() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = ready_session(&warehouse);

        assert_eq!(
            session.dispatch(Action::SubmitQuery(AB_QUERY.to_string())),
            ViewState::ResultReady
        );
        let first = session.result().cloned().expect("first result");

        session.dispatch(Action::SetChartX("a".to_string()));
        session.dispatch(Action::SetChartY("b".to_string()));
        session.dispatch(Action::RequestPlot);
        assert_eq!(session.state(), ViewState::ChartReady);

        // Same text: served from the cache, same signature, chart survives.
        let state = session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        let second = session.result().cloned().expect("second result");

        assert_eq!(state, ViewState::ChartReady);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(warehouse.queries_run(), 2, "tables listing + one query");
        assert_eq!(session.chart_selection().x.as_deref(), Some("a"));
        assert_eq!(
            session.detector().signature(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        Ok(())
    }

    #[test]
    fn same_columns_different_query_keeps_selection() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        session.dispatch(Action::SetChartX("b".to_string()));

        let state = session.dispatch(Action::SubmitQuery("SELECT 3 AS a, 4 AS b".to_string()));

        assert_eq!(state, ViewState::ResultReady);
        assert_eq!(session.chart_selection().x.as_deref(), Some("b"));
        Ok(())
    }

    #[test]
    fn schema_change_resets_chart_selection() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        session.dispatch(Action::RequestPlot);
        assert_eq!(session.state(), ViewState::ChartReady);

        let state = session.dispatch(Action::SubmitQuery(CD_QUERY.to_string()));

        assert_eq!(state, ViewState::ResultReady);
        assert_eq!(session.chart_selection(), &ChartSelection::default());
        assert_eq!(session.plot(), PlotOutcome::NotRequested);
        Ok(())
    }

    #[test]
    fn dataset_switch_discards_result_and_chart() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        session.dispatch(Action::SetChartKind(ChartKind::Line));
        session.dispatch(Action::RequestPlot);
        assert_eq!(session.state(), ViewState::ChartReady);

        let state = session.dispatch(Action::SelectDataset("austin_bikeshare".to_string()));

        assert_eq!(state, ViewState::DatasetSelected);
        assert_eq!(session.chart_selection(), &ChartSelection::default());
        assert!(session.result().is_none());
        assert_eq!(session.tables(), ["bikeshare_trips"]);
        assert_eq!(session.selected_table(), None);
        Ok(())
    }

    #[test]
    fn reselecting_same_dataset_is_a_no_op() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = ready_session(&warehouse);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));

        let state = session.dispatch(Action::SelectDataset("samples".to_string()));

        assert_eq!(state, ViewState::ResultReady);
        assert!(session.result().is_some());
        Ok(())
    }

    #[test]
    fn blank_query_never_reaches_warehouse() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = ready_session(&warehouse);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        let before = warehouse.queries_run();

        let state = session.dispatch(Action::SubmitQuery("  \n ".to_string()));

        assert_eq!(state, ViewState::DatasetSelected);
        assert_eq!(warehouse.queries_run(), before);
        assert!(session.result().is_none());
        assert_eq!(session.query_error(), Some("Please enter a SQL query."));
        Ok(())
    }

    #[test]
    fn failed_query_is_redacted_and_clears_result() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        session.take_notices();

        let state = session.dispatch(Action::SubmitQuery("SELEC nonsense".to_string()));

        assert_eq!(state, ViewState::DatasetSelected);
        assert!(session.result().is_none());

        let notices = session.take_notices();
        assert!(has_notice(&notices, NoticeLevel::Error, "Context: Running SQL query"));
        assert!(!notices.iter().any(|n| n.message.contains("Syntax error")));
        Ok(())
    }

    #[test]
    fn query_without_client_is_refused() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = session_with(&warehouse);

        let state = session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));

        assert_eq!(state, ViewState::NoClient);
        assert_eq!(warehouse.queries_run(), 0);
        assert!(session.query_error().is_some_and(|e| e.contains("No BigQuery client")));
        Ok(())
    }

    #[test]
    fn query_without_dataset_is_refused() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = session_with(&warehouse);
        session.dispatch(Action::SaveKey(service_account_json("demo")));

        let state = session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        assert_eq!(state, ViewState::ClientReady);
        assert!(session.result().is_none());
        assert_eq!(warehouse.queries_run(), 0);
        assert!(has_notice(&session.take_notices(), NoticeLevel::Warning, "No dataset selected"));

        let state = session.dispatch(Action::RequestPlot);
        assert_eq!(state, ViewState::ClientReady);
        assert_eq!(session.selected_dataset(), None);
        Ok(())
    }

    #[test]
    fn resaving_memoized_key_relists_datasets() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = ready_session(&warehouse);
        let key = service_account_json("demo");

        session.dispatch(Action::SaveKey(key));

        assert_eq!(session.state(), ViewState::ClientReady);
        assert_eq!(session.credentials().cached_keys(), 1);
        assert_eq!(warehouse.datasets_listed(), 2, "listed again on re-save");
        assert_eq!(session.datasets(), ["samples", "austin_bikeshare"]);
        Ok(())
    }

    #[test]
    fn plot_defaults_to_first_column_and_scatter() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(CD_QUERY.to_string()));

        session.dispatch(Action::RequestPlot);

        let selection = session.chart_selection();
        assert_eq!(selection.x.as_deref(), Some("c"));
        assert_eq!(selection.y.as_deref(), Some("c"));
        assert_eq!(selection.kind, Some(ChartKind::Scatter));

        match session.plot() {
            PlotOutcome::Ready(spec) => assert_eq!(spec.title, "Scatter Chart"),
            other => panic!("expected a chart, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn plot_without_result_is_ignored() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);

        let state = session.dispatch(Action::RequestPlot);

        assert_eq!(state, ViewState::DatasetSelected);
        assert_eq!(session.plot(), PlotOutcome::NotRequested);
        Ok(())
    }

    #[test]
    fn unknown_chart_column_is_rejected() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));

        session.dispatch(Action::SetChartX("zzz".to_string()));

        assert_eq!(session.chart_selection().x, None);
        assert!(has_notice(&session.take_notices(), NoticeLevel::Warning, "Invalid column"));
        Ok(())
    }

    #[test]
    fn new_client_clears_query_cache() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let mut session = ready_session(&warehouse);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));
        assert!(session.executor().cached_queries() > 0);

        session.dispatch(Action::SaveKey(service_account_json("other")));

        assert_eq!(session.state(), ViewState::ClientReady);
        assert_eq!(session.executor().cached_queries(), 0);
        assert!(session.result().is_none());
        assert_eq!(session.credentials().cached_keys(), 2);
        Ok(())
    }

    #[test]
    fn reset_reinitializes_store() -> ExplorerResult<()> {
        let mut session = ready_session(&warehouse()?);
        session.dispatch(Action::SubmitQuery(AB_QUERY.to_string()));

        let state = session.dispatch(Action::ResetSession);

        assert_eq!(state, ViewState::NoClient);
        assert!(session.client().is_none());
        assert!(session.datasets().is_empty());
        assert!(session.result().is_none());
        assert_eq!(session.detector().signature(), None);
        Ok(())
    }

    #[test]
    fn sessions_are_isolated() -> ExplorerResult<()> {
        let warehouse = warehouse()?;
        let first = ready_session(&warehouse);
        let second = session_with(&warehouse);

        assert_eq!(first.state(), ViewState::DatasetSelected);
        assert_eq!(second.state(), ViewState::NoClient);
        assert!(second.datasets().is_empty());
        Ok(())
    }

    #[test]
    fn score_column_with_text_is_categorical() -> ExplorerResult<()> {
        let query = "SELECT score FROM grades";
        let warehouse = warehouse()?.with_query(query, df!("score" => ["1", "2", "bad"])?);
        let mut session = ready_session(&warehouse);

        session.dispatch(Action::SubmitQuery(query.to_string()));
        let df = session.result().cloned().expect("result loaded");

        assert_eq!(infer_axis_kind(df.column("score")?), AxisKind::Categorical);
        Ok(())
    }
}
