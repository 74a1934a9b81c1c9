use egui::{Align, Direction, DragValue, Grid, Layout, Ui};
use polars::prelude::*;

use std::{collections::HashMap, fmt::Debug, sync::LazyLock};

// --- Constants ---

/// Default text alignment per `DataType` in the result table.
///
/// Numbers right, integers, dates and booleans centered, text left.
/// User choices in `ResultFormat.alignments` take precedence.
pub static DEFAULT_ALIGNMENTS: LazyLock<HashMap<DataType, Align>> = LazyLock::new(|| {
    HashMap::from([
        (DataType::Float32, Align::RIGHT),
        (DataType::Float64, Align::RIGHT),
        (DataType::Int32, Align::Center),
        (DataType::Int64, Align::Center),
        (DataType::UInt32, Align::Center),
        (DataType::UInt64, Align::Center),
        (DataType::Date, Align::Center),
        (DataType::Boolean, Align::Center),
        (DataType::String, Align::LEFT),
    ])
});

/// Data types offered in the alignment panel; the ones a query result can carry.
const ALIGNABLE_TYPES: [DataType; 4] = [
    DataType::Float64,
    DataType::Int64,
    DataType::Boolean,
    DataType::String,
];

// --- Data Structures ---

/// Presentation settings for the result table.
///
/// Held by `ExplorerApp` (`layout.rs`) and edited in the side panel's
/// "Format" section. The result itself is never modified, only its rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFormat {
    /// Alignment per `DataType`, overriding `DEFAULT_ALIGNMENTS`.
    pub alignments: HashMap<DataType, Align>,

    /// `true`: `Column::auto()` widths. `false`: uniform initial widths.
    pub auto_col_width: bool,

    /// Decimal places for floats.
    pub decimal: usize,
}

impl Default for ResultFormat {
    fn default() -> Self {
        ResultFormat {
            alignments: DEFAULT_ALIGNMENTS.clone(),
            auto_col_width: false,
            decimal: 2,
        }
    }
}

impl ResultFormat {
    /// Renders the format controls.
    ///
    /// Widgets bind to `&mut self`; a clone taken before rendering tells
    /// whether anything changed this frame.
    ///
    /// ### Returns
    /// `true` if a setting was changed.
    pub fn render_format(&mut self, ui: &mut Ui) -> bool {
        let format_former = self.clone();

        Grid::new("result_format_grid")
            .num_columns(2)
            .spacing([10.0, 20.0])
            .striped(true)
            .show(ui, |ui| {
                self.render_alignment_panel(ui);
                self.render_decimal_input(ui);
                self.render_auto_col(ui);
            });

        let changed = *self != format_former;
        if changed {
            tracing::debug!("Result format changed: {self:#?}");
        }
        changed
    }

    fn render_alignment_panel(&mut self, ui: &mut Ui) {
        ui.label("Alignment:");

        ui.collapsing("Data Types", |ui| {
            Grid::new("align_grid")
                .num_columns(4)
                .spacing([10.0, 10.0])
                .striped(true)
                .show(ui, |ui| {
                    for data_type in &ALIGNABLE_TYPES {
                        self.show_alignment_row(ui, data_type);
                    }
                });
        });
        ui.end_row();
    }

    fn show_alignment_row(&mut self, ui: &mut Ui, data_type: &DataType) {
        let current_align: &mut Align = self
            .alignments
            .entry(data_type.clone())
            .or_insert(Align::LEFT);

        ui.label(format!("{data_type:?}"));

        ui.radio_value(current_align, Align::LEFT, "Left");
        ui.radio_value(current_align, Align::Center, "Center");
        ui.radio_value(current_align, Align::RIGHT, "Right");

        ui.end_row();
    }

    fn render_decimal_input(&mut self, ui: &mut Ui) {
        let decimal_max = 10;
        ui.label("Decimals:");
        ui.add(
            DragValue::new(&mut self.decimal)
                .speed(1)
                .range(0..=decimal_max),
        )
        .on_hover_text(format!(
            "Number of decimal places for floating-point numbers.\n\
            Maximum decimal places: {decimal_max}"
        ));
        ui.end_row();
    }

    fn render_auto_col(&mut self, ui: &mut Ui) {
        ui.label("Auto Col Width:");
        ui.checkbox(&mut self.auto_col_width, "").on_hover_text(
            "Enable: Size columns based on content (slower).\n\
            Disable: Use uniform initial widths (faster), allows manual resize.",
        );
        ui.end_row();
    }

    /// Decimal places (floats only) and cell layout for `column`.
    pub fn get_decimal_and_layout(&self, column: &Column) -> (Option<usize>, Layout) {
        let dtype = column.dtype();

        let align = self.alignments.get(dtype).unwrap_or(&Align::LEFT);

        let layout = match *align {
            Align::LEFT => Layout::left_to_right(Align::Center),
            Align::Center => Layout::centered_and_justified(Direction::LeftToRight),
            Align::RIGHT => Layout::right_to_left(Align::Center),
        };

        if dtype.is_float() {
            (Some(self.decimal), layout)
        } else {
            (None, layout)
        }
    }
}

/// Cell text for row `row_index` of `column`. Nulls render as an empty string.
pub fn format_cell_value(column: &Column, row_index: usize, decimals: Option<usize>) -> String {
    match (column.get(row_index), decimals) {
        (Ok(AnyValue::Null), _) => String::new(),
        (Ok(AnyValue::Float32(f)), Some(decimals)) => format!("{f:.decimals$}"),
        (Ok(AnyValue::Float64(f)), Some(decimals)) => format!("{f:.decimals$}"),
        (Ok(AnyValue::String(s)), _) => s.to_string(),
        (Ok(AnyValue::StringOwned(s)), _) => s.to_string(),
        (Ok(any_value), _) => any_value.to_string(),
        (Err(_), _) => "Error: Value not found".to_string(),
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
