//! Renders a [`ChartSpec`] with `egui_plot`.

use crate::{ChartData, ChartKind, ChartSpec, ordinal_label};

use egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, Points};
use polars::prelude::DataFrame;
use std::ops::RangeInclusive;

/// Steel blue, the single-series color.
const SINGLE_SERIES: Color32 = Color32::from_rgb(70, 130, 180);

/// Color for the `index`-th legend group.
pub fn categorical_color(index: usize) -> Color32 {
    const PALETTE: &[Color32] = &[
        Color32::from_rgb(100, 150, 250), // Blue
        Color32::from_rgb(250, 150, 100), // Orange
        Color32::from_rgb(150, 250, 100), // Green
        Color32::from_rgb(250, 100, 150), // Pink
        Color32::from_rgb(150, 100, 250), // Purple
        Color32::from_rgb(250, 250, 100), // Yellow
        Color32::from_rgb(100, 250, 250), // Cyan
        Color32::from_rgb(250, 100, 100), // Red
    ];
    PALETTE[index % PALETTE.len()]
}

/// Category names as tick labels; positions between categories stay blank.
fn category_ticks(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        ordinal_label(&labels, mark.value)
            .map(str::to_string)
            .unwrap_or_default()
    }
}

/// Draws the chart, or a short explanation when its data cannot be read.
pub fn render_chart(ui: &mut Ui, spec: &ChartSpec, df: &DataFrame) {
    let data = match ChartData::prepare(spec, df) {
        Ok(data) => data,
        Err(err) => {
            tracing::error!("Preparing chart data failed: {err}");
            ui.label(RichText::new("Chart data could not be prepared.").weak());
            return;
        }
    };

    ui.heading(&spec.title);

    if data.point_count() == 0 {
        ui.label(RichText::new("No plottable rows (every row has a missing value).").weak());
        return;
    }

    let single_series = spec.color.is_none();

    let mut plot = Plot::new(("chart_plot", spec.title.as_str(), spec.x.field.as_str()))
        .height(crate::CHART_HEIGHT as f32)
        .x_axis_label(spec.x.field.clone())
        .y_axis_label(spec.y.field.clone())
        .allow_zoom(true)
        .allow_drag(true);

    if spec.x.kind.is_categorical() {
        plot = plot.x_axis_formatter(category_ticks(data.x_labels.clone()));
    }
    if spec.y.kind.is_categorical() {
        plot = plot.y_axis_formatter(category_ticks(data.y_labels.clone()));
    }

    if !single_series {
        plot = plot.legend(Legend::default());
    }

    plot.show(ui, |plot_ui| {
        for (index, series) in data.series.iter().enumerate() {
            let color = if single_series {
                SINGLE_SERIES
            } else {
                categorical_color(index)
            };

            match spec.kind {
                ChartKind::Scatter => {
                    plot_ui.points(
                        Points::new(series.name.clone(), series.points.clone())
                            .color(color)
                            .radius(4.0)
                            .filled(true),
                    );
                }
                ChartKind::Line => {
                    let mut points = series.points.clone();
                    points.sort_by(|a, b| a[0].total_cmp(&b[0]));

                    plot_ui.line(Line::new(series.name.clone(), points.clone()).color(color));
                    plot_ui.points(
                        Points::new(series.name.clone(), points)
                            .color(color)
                            .radius(3.0),
                    );
                }
                ChartKind::Bar => {
                    let bars: Vec<Bar> = series
                        .points
                        .iter()
                        .map(|[x, y]| Bar::new(*x, *y).width(0.7).fill(color))
                        .collect();
                    plot_ui.bar_chart(BarChart::new(series.name.clone(), bars).color(color));
                }
            }
        }
    });
}
