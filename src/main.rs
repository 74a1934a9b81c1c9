#![warn(clippy::all)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use bq_explorer::{Arguments, ExplorerApp};
use tracing::error;

/*
cargo fmt
cargo test -- --nocapture
cargo test -- --show-output tests_session
cargo run -- --help
cargo run -- -k service-account.json
cargo doc --open
cargo b -r && cargo install --path=.
*/

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    // Initialize the tracing subscriber for logging.
    // Use RUST_LOG environment variable to set logging level.  eg `export RUST_LOG=info`
    tracing_subscriber::fmt::init();

    // Parse command-line arguments.
    let args = Arguments::build();

    // RUST_LOG=debug cargo run -- -p bigquery-public-data
    tracing::debug!("main()\nArguments: {args:#?}");

    let native_options = eframe::NativeOptions {
        centered: true,
        persist_window: true,
        vsync: true,
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "BigQuery Explorer",
        native_options,
        Box::new(move |creation_context| create_app(creation_context, &args)),
    )
}

/// Builds the app, logging why it could not start.
fn create_app(
    creation_context: &eframe::CreationContext<'_>,
    args: &Arguments,
) -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
    match ExplorerApp::new(creation_context, args) {
        Ok(app) => Ok(Box::new(app)),
        Err(err) => {
            error!("Failed to initialize ExplorerApp: {err}");
            Err(Box::new(err))
        }
    }
}
