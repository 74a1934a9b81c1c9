use crate::TableField;

use egui::{Color32, Frame, Grid, Label, RichText, Sense, Stroke, Ui};

/// Renders the field list of the selected table: name, type and mode.
///
/// Right-clicking a field name copies it to the clipboard.
pub fn render_table_preview(ui: &mut Ui, table_id: &str, fields: &[TableField]) {
    ui.label(RichText::new(format!("Schema of {table_id}")).strong());

    if fields.is_empty() {
        ui.label(RichText::new("No schema information available.").weak());
        return;
    }

    ui.label("Tip: Right-click a field name to copy it to the clipboard.");

    Frame::default()
        .stroke(Stroke::new(1.0, Color32::GRAY))
        .outer_margin(2.0)
        .inner_margin(10.0)
        .show(ui, |ui| {
            Grid::new("table_preview_grid")
                .num_columns(3)
                .spacing([10.0, 8.0])
                .striped(true)
                .show(ui, |ui| {
                    ui.strong("Field");
                    ui.strong("Type");
                    ui.strong("Mode");
                    ui.end_row();

                    for field in fields {
                        let response =
                            ui.add(Label::new(field.name.as_str()).sense(Sense::click()));
                        if response.clicked_by(egui::PointerButton::Secondary) {
                            ui.ctx().copy_text(field.name.clone());
                        }
                        ui.label(&field.field_type);
                        ui.label(&field.mode);
                        ui.end_row();
                    }
                });
        });
}
