//! View Orchestrator: the session's state machine.
//!
//! Every user interaction becomes an [`Action`]. The session performs it and
//! reports what happened as an [`Event`]; [`next_state`] then decides the new
//! [`ViewState`] without touching any data. Discarding the data that no longer
//! fits the new state is the session's single cascading-reset step.

use crate::ChartKind;

use std::fmt;

/// Readiness of one session, from nothing to a rendered chart.
///
/// The order matters: a later state implies every earlier prerequisite.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewState {
    #[default]
    NoClient,
    ClientReady,
    DatasetSelected,
    ResultReady,
    ChartReady,
}

impl ViewState {
    /// Short status text for the footer.
    pub fn describe(self) -> &'static str {
        match self {
            ViewState::NoClient => "Waiting for a BigQuery key",
            ViewState::ClientReady => "Connected; pick a dataset",
            ViewState::DatasetSelected => "Dataset selected",
            ViewState::ResultReady => "Query result ready",
            ViewState::ChartReady => "Chart ready",
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// User interactions the session reacts to.
#[derive(Clone, PartialEq)]
pub enum Action {
    /// Raw key text from the key box or a key file.
    SaveKey(String),
    SelectDataset(String),
    SelectTable(String),
    /// Query text as currently in the editor.
    SubmitQuery(String),
    SetChartX(String),
    SetChartY(String),
    SetChartKind(ChartKind),
    RequestPlot,
    ResetSession,
}

impl Action {
    /// `true` when performing the action may block on the warehouse.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Action::SaveKey(_)
                | Action::SelectDataset(_)
                | Action::SelectTable(_)
                | Action::SubmitQuery(_)
        )
    }

    /// Spinner text while a remote action runs.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Action::SaveKey(_) => "Connecting to BigQuery...",
            Action::SelectDataset(_) => "Loading tables...",
            Action::SelectTable(_) => "Loading table schema...",
            Action::SubmitQuery(_) => "Running query...",
            _ => "Working...",
        }
    }
}

// Key material must never reach a log line.
impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SaveKey(text) => write!(f, "SaveKey(<{} bytes redacted>)", text.len()),
            Action::SelectDataset(name) => f.debug_tuple("SelectDataset").field(name).finish(),
            Action::SelectTable(name) => f.debug_tuple("SelectTable").field(name).finish(),
            Action::SubmitQuery(text) => f.debug_tuple("SubmitQuery").field(text).finish(),
            Action::SetChartX(name) => f.debug_tuple("SetChartX").field(name).finish(),
            Action::SetChartY(name) => f.debug_tuple("SetChartY").field(name).finish(),
            Action::SetChartKind(kind) => f.debug_tuple("SetChartKind").field(kind).finish(),
            Action::RequestPlot => f.write_str("RequestPlot"),
            Action::ResetSession => f.write_str("ResetSession"),
        }
    }
}

/// Outcome of performing an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A valid key produced the active client (new or memoized).
    ClientSaved,
    /// The key was rejected; the previous client, if any, stays active.
    CredentialRejected,
    /// A dataset was picked. `changed` is false when it was already selected.
    DatasetChosen { changed: bool },
    TableChosen,
    ResultLoaded { schema_changed: bool },
    QueryFailed,
    /// Blank editor; nothing was sent.
    QueryBlank,
    ChartSelectionEdited,
    PlotRequested,
    /// Nothing could be done (missing prerequisite); a notice explains why.
    Ignored,
    Reset,
}

/// Pure transition function of the view state machine.
///
/// ### Rules
/// * A saved key always lands in `ClientReady`; a rejected one changes nothing.
/// * Switching datasets lands in `DatasetSelected`, dropping any result or chart.
/// * A loaded result lands in `ResultReady` once a dataset is selected, except
///   that a chart already on screen survives a result whose column signature
///   did not change.
/// * A blank or failed query falls back to (at most) `DatasetSelected`.
/// * A plot request needs a result.
/// * A reset returns to `NoClient`.
pub fn next_state(state: ViewState, event: &Event) -> ViewState {
    use ViewState::*;

    match *event {
        Event::ClientSaved => ClientReady,
        Event::DatasetChosen { changed: true } if state >= ClientReady => DatasetSelected,
        Event::ResultLoaded {
            schema_changed: false,
        } if state == ChartReady => ChartReady,
        Event::ResultLoaded { .. } if state >= DatasetSelected => ResultReady,
        Event::QueryFailed | Event::QueryBlank => state.min(DatasetSelected),
        Event::PlotRequested if state >= ResultReady => ChartReady,
        Event::Reset => NoClient,
        Event::CredentialRejected
        | Event::DatasetChosen { .. }
        | Event::TableChosen
        | Event::ResultLoaded { .. }
        | Event::ChartSelectionEdited
        | Event::PlotRequested
        | Event::Ignored => state,
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
