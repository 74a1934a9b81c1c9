use crate::{ChartSpec, ExplorerError, ExplorerResult, PathExtension, read_key_file};

use egui::Context;
use polars::prelude::DataFrame;
use rfd::AsyncFileDialog;
use std::{fs::File, io::BufWriter, path::{Path, PathBuf}, sync::Arc};
use tokio::sync::oneshot;
use tracing::{error, info};

/// Opens a native dialog to choose a service-account key and reads it.
///
/// ### Returns
/// - `Ok(Some(text))`: the key document's text.
/// - `Ok(None)`: the user cancelled the dialog.
pub async fn open_key_file() -> ExplorerResult<Option<String>> {
    let opt_file = AsyncFileDialog::new()
        .add_filter("Service account key", &["json"])
        .add_filter("All files", &["*"])
        .pick_file()
        .await;

    opt_file
        .map(|file| read_key_file(file.path()))
        .transpose()
}

/// Writes the Vega-Lite document of `spec` over `df` as pretty JSON.
///
/// The target must carry a `.json` extension.
pub fn write_chart_spec(path: &Path, spec: &ChartSpec, df: &DataFrame) -> ExplorerResult<()> {
    if !path.is_json() {
        return Err(ExplorerError::Other(format!(
            "{path:?}: chart specifications are saved as .json files"
        )));
    }

    let document = spec.to_vega_lite(df)?;

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &document)?;

    info!("Chart specification written to {path:?}");
    Ok(())
}

/// Asks for a target file and exports the chart specification there.
///
/// The write runs on a blocking task; its outcome arrives on the returned
/// receiver, followed by a repaint request.
///
/// ### Returns
/// `None` if the user cancelled the dialog.
pub async fn save_chart_spec(
    spec: ChartSpec,
    df: Arc<DataFrame>,
    ctx: Context,
) -> Option<oneshot::Receiver<ExplorerResult<PathBuf>>> {
    let default_file_name = format!("{}.json", spec.kind.label().to_lowercase());

    let file = AsyncFileDialog::new()
        .add_filter("Vega-Lite (JSON)", &["json"])
        .set_file_name(default_file_name)
        .save_file()
        .await?;

    let path = file.path().to_path_buf();
    let (tx, rx) = oneshot::channel::<ExplorerResult<PathBuf>>();

    tokio::task::spawn_blocking(move || {
        let result = write_chart_spec(&path, &spec, &df).map(|()| path);

        if tx.send(result).is_err() {
            error!("The receiver has been dropped.");
        }

        ctx.request_repaint();
    });

    Some(rx)
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
