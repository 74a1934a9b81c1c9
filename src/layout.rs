use crate::{
    Action, Arguments, BigQueryConnector, ChartKind, Error, ExplorerError, ExplorerResult, MyStyle, Notice,
    NoticeLevel, Notification, PlotOutcome, ResultFormat, Session, SessionConfig, WarehouseConnector,
    open_key_file, read_key_file, render_chart, render_result_summary, render_result_table,
    render_table_preview, save_chart_spec,
};

use egui::{
    CentralPanel, Color32, ComboBox, Context, Direction, FontId, Frame, Grid, Hyperlink, Layout,
    RichText, ScrollArea, SidePanel, Stroke, TextEdit, TopBottomPanel, Ui, ViewportCommand, menu,
    style::Visuals, warn_if_debug_build, widgets,
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::oneshot::{self, Receiver, error::TryRecvError};
use tracing::{error, info, warn};

/// The main application struct for BigQuery Explorer.
pub struct ExplorerApp {
    /// The user's session. `None` while a worker thread owns it.
    session: Option<Session>,
    /// Settings for every session of this app.
    config: SessionConfig,
    /// Builds clients for new keys; shared by every session of this app.
    connector: Arc<dyn WarehouseConnector>,
    /// Result table presentation.
    format: ResultFormat,
    /// Optional Notification window for displaying errors.
    notification: Option<Box<dyn Notification>>,
    /// Latest non-error notice, shown in the footer.
    footer: Option<Notice>,

    /// Tokio runtime for the native file dialogs.
    runtime: tokio::runtime::Runtime,
    /// Returns the session from the worker thread running a remote action.
    pipe: Option<Receiver<Session>>,
    /// Spinner text of the remote action in flight.
    pending_label: &'static str,
    /// Outcome of a chart export.
    export_pipe: Option<Receiver<ExplorerResult<PathBuf>>>,
}

impl ExplorerApp {
    /// Creates the app; with `--key-file` the key is saved right away.
    pub fn new(cc: &eframe::CreationContext<'_>, args: &Arguments) -> ExplorerResult<Self> {
        cc.egui_ctx.set_style_init(Visuals::dark());

        let config = args.session_config();
        let connector: Arc<dyn WarehouseConnector> =
            Arc::new(BigQueryConnector::new(config.query_options()));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let mut app = ExplorerApp {
            session: Some(Session::new(config.clone(), connector.clone())),
            config,
            connector,
            format: ResultFormat::default(),
            notification: None,
            footer: None,
            runtime,
            pipe: None,
            pending_label: "",
            export_pipe: None,
        };

        if let Some(path) = &args.key_file {
            match read_key_file(path) {
                Ok(text) => app.dispatch(Action::SaveKey(text), &cc.egui_ctx),
                Err(err) => app.show_error(format!("Could not read key file {path:?}: {err}")),
            }
        }

        Ok(app)
    }

    fn show_error(&mut self, message: String) {
        self.notification = Some(Box::new(Error { message }));
    }

    /// Checks if a Notification is active and displays it.
    fn check_notification(&mut self, ctx: &Context) {
        if let Some(notification) = &mut self.notification {
            if !notification.show(ctx) {
                self.notification = None;
            }
        }
    }

    /// Performs `action` on the session.
    ///
    /// Local actions run inline. Remote ones move the session to a worker
    /// thread, which hands it back through `pipe` when done. The blocking HTTP
    /// client must not run on the UI thread nor inside the tokio runtime.
    fn dispatch(&mut self, action: Action, ctx: &Context) {
        let Some(mut session) = self.session.take() else {
            warn!("Session busy; dropping {action:?}");
            return;
        };

        if !action.is_remote() {
            session.dispatch(action);
            self.session = Some(session);
            self.collect_notices();
            return;
        }

        let (tx, rx) = oneshot::channel::<Session>();
        self.pipe = Some(rx);
        self.pending_label = action.progress_label();

        let ctx_clone = ctx.clone();
        std::thread::spawn(move || {
            session.dispatch(action);

            if tx.send(session).is_err() {
                error!("Receiver dropped before the session could be returned.");
            }

            ctx_clone.request_repaint();
        });
    }

    /// Returns `true` while a remote action is in flight.
    fn check_session_pending(&mut self) -> bool {
        let Some(mut output) = self.pipe.take() else {
            return false;
        };

        match output.try_recv() {
            Ok(session) => {
                self.session = Some(session);
                self.collect_notices();
                false
            }
            Err(TryRecvError::Empty) => {
                self.pipe = Some(output);
                true
            }
            Err(TryRecvError::Closed) => {
                let err = ExplorerError::ChannelReceive(
                    "the request terminated without response; a new session was started".to_string(),
                );
                error!("{err}");
                self.show_error(err.to_string());
                self.session = Some(Session::new(self.config.clone(), self.connector.clone()));
                false
            }
        }
    }

    /// Routes the session's notices: errors open the Error window unless the
    /// query panel already shows them, the rest go to the footer.
    fn collect_notices(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let inline_error = session.query_error().map(str::to_string);

        for notice in session.take_notices() {
            match notice.level {
                NoticeLevel::Error if inline_error.as_deref() == Some(notice.message.as_str()) => {}
                NoticeLevel::Error => {
                    self.notification = Some(Box::new(Error {
                        message: notice.message,
                    }));
                }
                _ => self.footer = Some(notice),
            }
        }
    }

    fn check_export_pending(&mut self) {
        let Some(mut output) = self.export_pipe.take() else {
            return;
        };

        match output.try_recv() {
            Ok(Ok(path)) => {
                self.footer = Some(Notice {
                    level: NoticeLevel::Success,
                    message: format!("Chart specification saved to {path:?}"),
                });
            }
            Ok(Err(err)) => {
                error!("Chart export failed: {err}");
                self.show_error(format!("Chart export failed: {err}"));
            }
            Err(TryRecvError::Empty) => self.export_pipe = Some(output),
            Err(TryRecvError::Closed) => {
                let err = ExplorerError::ChannelReceive("chart export terminated without response".to_string());
                error!("{err}");
                self.show_error(err.to_string());
            }
        }
    }

    fn load_key_from_file(&mut self, ctx: &Context) {
        match self.runtime.block_on(open_key_file()) {
            Ok(Some(text)) => self.dispatch(Action::SaveKey(text), ctx),
            Ok(None) => {}
            Err(err) => self.show_error(format!("Could not read key file: {err}")),
        }
    }

    fn export_chart(&mut self, ctx: &Context) {
        let Some(session) = &self.session else {
            return;
        };
        let (PlotOutcome::Ready(spec), Some(df)) = (session.plot(), session.result()) else {
            return;
        };

        let future = save_chart_spec(spec, df.clone(), ctx.clone());
        self.export_pipe = self.runtime.block_on(future);
    }

    fn render_menu(&mut self, ui: &mut Ui, ctx: &Context) {
        let has_chart = self
            .session
            .as_ref()
            .is_some_and(|s| matches!(s.plot(), PlotOutcome::Ready(_)));

        menu::bar(ui, |ui| {
            ui.horizontal(|ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Load key…").clicked() {
                        self.load_key_from_file(ctx);
                        ui.close_menu();
                    }

                    if ui
                        .add_enabled(has_chart, egui::Button::new("Export chart spec…"))
                        .clicked()
                    {
                        self.export_chart(ctx);
                        ui.close_menu();
                    }

                    if ui.button("New session").clicked() {
                        self.dispatch(Action::ResetSession, ctx);
                        self.footer = None;
                        ui.close_menu();
                    }

                    ui.menu_button("About", render_about);

                    if ui.button("Quit").clicked() {
                        ui.ctx().send_viewport_cmd(ViewportCommand::Close);
                    }
                });

                let delta = ui.available_width() - 15.0;
                if delta > 0.0 {
                    ui.add_space(delta);
                    widgets::global_theme_preference_switch(ui);
                }
            });
        });
    }
}

/// The "About" submenu.
fn render_about(ui: &mut Ui) {
    Frame::default()
        .stroke(Stroke::new(1.0, Color32::GRAY))
        .outer_margin(2.0)
        .inner_margin(10.0)
        .show(ui, |ui| {
            let version = env!("CARGO_PKG_VERSION");
            let authors = env!("CARGO_PKG_AUTHORS");
            let description = env!("CARGO_PKG_DESCRIPTION");

            Grid::new("about_grid")
                .num_columns(1)
                .spacing([10.0, 4.0])
                .show(ui, |ui| {
                    ui.with_layout(Layout::centered_and_justified(Direction::LeftToRight), |ui| {
                        ui.label(RichText::new("BigQuery Explorer").font(FontId::proportional(30.0)));
                    });
                    ui.end_row();

                    ui.with_layout(Layout::centered_and_justified(Direction::LeftToRight), |ui| {
                        ui.label(format!("Version: {version}"));
                    });
                    ui.end_row();
                    ui.end_row();

                    ui.with_layout(Layout::centered_and_justified(Direction::LeftToRight), |ui| {
                        ui.label(RichText::new(description).font(FontId::proportional(20.0)));
                    });
                    ui.end_row();
                    ui.end_row();

                    for (label, name, url) in [
                        ("Queries ", "BigQuery", "https://cloud.google.com/bigquery"),
                        ("Powered by ", "Polars", "https://github.com/pola-rs/polars"),
                        ("Built with ", "egui", "https://github.com/emilk/egui"),
                    ] {
                        ui.horizontal(|ui| {
                            ui.label(label);
                            ui.add(Hyperlink::from_label_and_url(name, url))
                                .on_hover_text(url);
                        });
                        ui.end_row();
                    }
                    ui.end_row();

                    ui.label(format!("Author: {authors}"));
                    ui.end_row();
                });
        });
}

/// Side panel: key entry, result format and the chart builder.
fn render_side_panel(ui: &mut Ui, session: &mut Session, format: &mut ResultFormat, actions: &mut Vec<Action>) {
    ui.collapsing("BigQuery Key", |ui| {
        ui.label("Paste the service-account key (JSON):");
        ui.add(
            TextEdit::multiline(session.key_input_mut())
                .password(true)
                .desired_rows(3)
                .hint_text("{ \"type\": \"service_account\", ... }"),
        );
        if ui.button("Save Key").clicked() {
            actions.push(Action::SaveKey(session.key_input_mut().clone()));
        }
        if session.client().is_some() {
            ui.label(RichText::new("✔ Connected").color(Color32::from_rgb(0, 160, 0)));
        }
    });

    ui.separator();
    ui.heading("Chart Builder");

    let Some(df) = session.result().cloned() else {
        ui.label(RichText::new("Run a SQL query to enable charting").weak());
        return;
    };

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let selection = session.chart_selection().clone();

    for (label, current, is_x) in [("X axis", &selection.x, true), ("Y axis", &selection.y, false)] {
        let mut chosen = current.clone().unwrap_or_default();
        ComboBox::from_label(label)
            .selected_text(chosen.as_str())
            .show_ui(ui, |ui| {
                for name in &columns {
                    ui.selectable_value(&mut chosen, name.clone(), name.as_str());
                }
            });

        if !chosen.is_empty() && current.as_deref() != Some(chosen.as_str()) {
            actions.push(if is_x {
                Action::SetChartX(chosen)
            } else {
                Action::SetChartY(chosen)
            });
        }
    }

    let mut kind = selection.kind.unwrap_or_default();
    let mut kind_changed = false;
    ui.horizontal(|ui| {
        for option in ChartKind::ALL {
            kind_changed |= ui.radio_value(&mut kind, option, option.label()).changed();
        }
    });
    if kind_changed {
        actions.push(Action::SetChartKind(kind));
    }

    if ui.button("Plot").clicked() {
        actions.push(Action::RequestPlot);
    }

    ui.separator();
    ui.collapsing("Format", |ui| {
        format.render_format(ui);
    });
}

/// Central panel: dataset and table pickers, schema preview, SQL editor,
/// result table and chart.
fn render_central_panel(ui: &mut Ui, session: &mut Session, format: &ResultFormat, actions: &mut Vec<Action>) {
    ui.heading("BigQuery Explorer");
    ui.label(RichText::new(session.state().describe()).weak());
    ui.add_space(8.0);

    if session.client().is_none() {
        ui.label("Paste your BigQuery key in the sidebar to begin.");
        return;
    }

    let mut dataset = session.selected_dataset().unwrap_or_default().to_string();
    ComboBox::from_label("Dataset")
        .selected_text(dataset.as_str())
        .width(320.0)
        .show_ui(ui, |ui| {
            for name in session.datasets() {
                ui.selectable_value(&mut dataset, name.clone(), name.as_str());
            }
        });
    if !dataset.is_empty() && session.selected_dataset() != Some(dataset.as_str()) {
        actions.push(Action::SelectDataset(dataset));
    }

    if session.selected_dataset().is_some() {
        let mut table = session.selected_table().unwrap_or_default().to_string();
        ComboBox::from_label("Table")
            .selected_text(table.as_str())
            .width(320.0)
            .show_ui(ui, |ui| {
                for name in session.tables() {
                    ui.selectable_value(&mut table, name.clone(), name.as_str());
                }
            });
        if !table.is_empty() && session.selected_table() != Some(table.as_str()) {
            actions.push(Action::SelectTable(table));
        }
    }

    if let Some(table_id) = session.selected_table_id() {
        ui.horizontal(|ui| {
            ui.monospace(&table_id);
            if ui.button("📋 Copy").on_hover_text("Copy the table id").clicked() {
                ui.ctx().copy_text(table_id.clone());
            }
        });

        ui.collapsing("Table Preview", |ui| {
            render_table_preview(ui, &table_id, session.table_schema());
        });
    }

    ui.separator();
    if session.selected_dataset().is_none() {
        ui.label("Select a dataset to write a query.");
        return;
    }

    ui.label("SQL query:");
    ui.add(
        TextEdit::multiline(session.query_text_mut())
            .code_editor()
            .desired_rows(6)
            .desired_width(f32::INFINITY)
            .hint_text("SELECT ..."),
    );

    if ui.button("Submit Query").clicked() {
        actions.push(Action::SubmitQuery(session.query_text().to_string()));
    }

    if let Some(message) = session.query_error() {
        Frame::default()
            .stroke(Stroke::new(1.0, Color32::DARK_RED))
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.colored_label(Color32::from_rgb(220, 60, 60), message);
            });
    }

    let Some(df) = session.result() else {
        return;
    };

    ui.separator();
    ui.collapsing("Result", |ui| {
        render_result_summary(ui, df);
    });

    ScrollArea::horizontal()
        .id_salt("result_scroll")
        .auto_shrink([false, true])
        .show(ui, |ui| {
            render_result_table(ui, df, format);
        });

    ui.separator();
    match session.plot() {
        PlotOutcome::Ready(spec) => render_chart(ui, &spec, df),
        PlotOutcome::NoData => {
            ui.colored_label(Color32::from_rgb(200, 150, 0), "No data available to plot.");
        }
        PlotOutcome::InvalidSelection => {
            ui.colored_label(Color32::from_rgb(200, 150, 0), "Invalid column selection.");
        }
        PlotOutcome::NotRequested => {}
    }
}

fn notice_color(level: NoticeLevel) -> Color32 {
    match level {
        NoticeLevel::Info => Color32::LIGHT_BLUE,
        NoticeLevel::Success => Color32::from_rgb(0, 160, 0),
        NoticeLevel::Warning => Color32::from_rgb(200, 150, 0),
        NoticeLevel::Error => Color32::from_rgb(220, 60, 60),
    }
}

// See
// https://github.com/emilk/egui/blob/master/examples/custom_window_frame/src/main.rs

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.check_notification(ctx);
        self.check_export_pending();
        let pending = self.check_session_pending();

        //  | menu_bar             widgets |
        //  --------------------------------
        //  |  Key    |  pickers, editor,  |
        //  |  Chart  |  result, chart     |
        //  --------------------------------
        //  | state / notice footer        |

        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            if pending {
                ui.disable();
            }
            self.render_menu(ui, ctx);
        });

        let mut actions = Vec::new();

        TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if pending {
                    ui.spinner();
                    ui.label(self.pending_label);
                } else if let Some(session) = &self.session {
                    ui.label(session.state().describe());
                }

                if let Some(notice) = &self.footer {
                    ui.separator();
                    ui.colored_label(notice_color(notice.level), &notice.message);
                }
            });
        });

        SidePanel::left("side_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                if pending {
                    ui.disable();
                }
                ScrollArea::vertical().show(ui, |ui| {
                    if let Some(session) = self.session.as_mut() {
                        render_side_panel(ui, session, &mut self.format, &mut actions);
                    }
                });
            });

        // CentralPanel must be added after all other panels.
        CentralPanel::default().show(ctx, |ui| {
            warn_if_debug_build(ui);

            let Some(session) = self.session.as_mut() else {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
                return;
            };

            ScrollArea::vertical()
                .id_salt("central_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    render_central_panel(ui, session, &self.format, &mut actions);
                });
        });

        // At most one remote action can take the session per frame.
        for action in actions {
            if self.session.is_none() {
                info!("Session busy; skipping {action:?}");
                break;
            }
            self.dispatch(action, ctx);
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
