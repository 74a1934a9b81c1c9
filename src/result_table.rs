use crate::{ResultFormat, format_cell_value};

use egui::{Color32, Frame, Grid, Label, RichText, Sense, Stroke, TextStyle, Ui};
use egui_extras::{Column, TableBuilder, TableRow};
use polars::prelude::DataFrame;

/// Renders row and column counts of a query result.
pub fn render_result_summary(ui: &mut Ui, df: &DataFrame) {
    Frame::default()
        .stroke(Stroke::new(1.0, Color32::GRAY))
        .outer_margin(2.0)
        .inner_margin(10.0)
        .show(ui, |ui| {
            Grid::new("result_summary_grid")
                .num_columns(2)
                .spacing([10.0, 20.0])
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Columns:");
                    ui.label(df.width().to_string());
                    ui.end_row();

                    ui.label("Rows:");
                    ui.label(df.height().to_string());
                    ui.end_row();
                });
        });
}

/// Renders the query result as an `egui` table.
///
/// Column headers are the result's column names; right-click copies one.
/// Cell text, decimals and alignment come from `format`.
pub fn render_result_table(ui: &mut Ui, df: &DataFrame, format: &ResultFormat) {
    if df.width() == 0 {
        ui.label("The query returned no columns.");
        return;
    }

    let analyze_header = |mut table_row: TableRow<'_, '_>| {
        for column_name in df.get_column_names() {
            table_row.col(|ui| {
                let label = Label::new(RichText::new(column_name.as_str()).strong())
                    .sense(Sense::click());
                let response = ui.add(label);
                if response.clicked_by(egui::PointerButton::Secondary) {
                    ui.ctx().copy_text(column_name.to_string());
                }
            });
        }
    };

    let analyze_rows = |mut table_row: TableRow<'_, '_>| {
        let row_index = table_row.index();

        for column in df.columns() {
            let (decimals, layout) = format.get_decimal_and_layout(column);
            let value = format_cell_value(column, row_index, decimals);

            table_row.col(|ui| {
                ui.with_layout(layout.with_main_wrap(false), |ui| {
                    ui.label(value);
                });
            });
        }
    };

    let style = ui.style();
    let text_height = TextStyle::Body.resolve(style).size;
    let col_number = df.width().max(1) as f32;
    let available_space = ui.available_width()
        - col_number * style.spacing.item_spacing.x
        - style.spacing.scroll.bar_width;

    let initial_col_width = available_space / col_number;
    let header_height = style.spacing.interact_size.y + 2.0 * style.spacing.item_spacing.y;
    let min_col_width = style.spacing.interact_size.x.max(initial_col_width / 4.0);

    let column = if format.auto_col_width {
        Column::auto().at_least(min_col_width).resizable(true).clip(true)
    } else {
        Column::initial(initial_col_width)
            .at_least(min_col_width)
            .resizable(true)
            .clip(true)
    };

    // A new id salt discards cached widths when the sizing mode changes.
    let id_salt = ("result_table", format.auto_col_width, df.width());

    TableBuilder::new(ui)
        .id_salt(id_salt)
        .striped(true)
        .columns(column, df.width())
        .column(Column::remainder())
        .auto_shrink([false, false])
        .max_scroll_height(480.0)
        .header(header_height, analyze_header)
        .body(|body| {
            body.rows(text_height, df.height(), analyze_rows);
        });
}
