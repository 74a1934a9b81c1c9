//! Chart Builder: axis-kind inference and declarative chart specifications.
//!
//! A [`ChartSpec`] names fields, marks and encoding types only. It can be
//! exported as a Vega-Lite document ([`ChartSpec::to_vega_lite`]) or turned into
//! plot coordinates ([`ChartData::prepare`]) for the in-app renderer.

use polars::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};
use std::{collections::HashMap, fmt};
use tracing::{debug, warn};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
pub const CHART_HEIGHT: u32 = 600;
pub const POINT_SIZE: u32 = 80;
pub const SINGLE_SERIES_COLOR: &str = "steelblue";

/// Semantic type of a chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AxisKind {
    #[serde(rename = "quantitative")]
    Quantitative,
    #[serde(rename = "nominal")]
    Categorical,
}

impl AxisKind {
    pub fn is_categorical(self) -> bool {
        self == AxisKind::Categorical
    }
}

/// The three supported chart kinds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartKind {
    #[default]
    Scatter,
    Line,
    Bar,
}

impl ChartKind {
    /// Selector order; the first entry is the default choice.
    pub const ALL: [ChartKind; 3] = [ChartKind::Scatter, ChartKind::Line, ChartKind::Bar];

    /// Parses a user-facing label. Anything unrecognized falls back to `Bar`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Scatter" => ChartKind::Scatter,
            "Line" => ChartKind::Line,
            _ => ChartKind::Bar,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Scatter => "Scatter",
            ChartKind::Line => "Line",
            ChartKind::Bar => "Bar",
        }
    }

    /// Vega-Lite mark type.
    pub fn mark(self) -> &'static str {
        match self {
            ChartKind::Scatter => "point",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One positional channel: which column, read as which kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Encoding {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: AxisKind,
}

/// Declarative chart description, independent of any rendering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub mark: &'static str,
    pub x: Encoding,
    pub y: Encoding,
    /// Legend field; `None` renders a single series.
    pub color: Option<String>,
    pub tooltip: Vec<String>,
}

/// Classifies a column as quantitative or categorical.
///
/// ### Logic
/// 1. Numeric storage types are quantitative.
/// 2. Text columns are quantitative only if every non-null value, trimmed,
///    parses as a number. A single failure demotes the whole column.
/// 3. Anything else (booleans, dates, timestamps, ...) is categorical.
pub fn infer_axis_kind(column: &Column) -> AxisKind {
    match numeric_values(column) {
        Some(_) => AxisKind::Quantitative,
        None => AxisKind::Categorical,
    }
}

/// `x` if it is categorical, else `y` if it is categorical, else no legend.
pub fn choose_legend_field(x: &str, y: &str, categorical: &[&str]) -> Option<String> {
    [x, y]
        .into_iter()
        .find(|name| categorical.contains(name))
        .map(str::to_string)
}

/// Builds the chart for columns `x` and `y` of `table`.
///
/// Returns `None` when the table is absent or empty, or when either axis is
/// not one of its columns. The caller shows a warning in that case.
pub fn build_chart(table: Option<&DataFrame>, x: &str, y: &str, kind: ChartKind) -> Option<ChartSpec> {
    let df = table.filter(|df| df.height() > 0 && df.width() > 0)?;

    let (Ok(x_column), Ok(y_column)) = (df.column(x), df.column(y)) else {
        warn!("Chart axes ({x:?}, {y:?}) are not columns of the current result");
        return None;
    };

    let x_kind = infer_axis_kind(x_column);
    let y_kind = infer_axis_kind(y_column);

    let categorical: Vec<&str> = [(x, x_kind), (y, y_kind)]
        .into_iter()
        .filter(|(_, kind)| kind.is_categorical())
        .map(|(name, _)| name)
        .collect();

    let spec = ChartSpec {
        title: format!("{kind} Chart"),
        kind,
        mark: kind.mark(),
        x: Encoding {
            field: x.to_string(),
            kind: x_kind,
        },
        y: Encoding {
            field: y.to_string(),
            kind: y_kind,
        },
        color: choose_legend_field(x, y, &categorical),
        tooltip: vec![x.to_string(), y.to_string()],
    };

    debug!("Built chart spec: {spec:?}");
    Some(spec)
}

impl ChartSpec {
    fn encoding_json(encoding: &Encoding) -> Value {
        json!({
            "field": encoding.field,
            "type": encoding.kind,
            "title": encoding.field,
        })
    }

    /// Renders the spec as a Vega-Lite v5 document with the rows of `df` inlined.
    ///
    /// Quantitative columns are emitted as numbers (after the same coercion the
    /// inference used), categorical ones as strings.
    pub fn to_vega_lite(&self, df: &DataFrame) -> PolarsResult<Value> {
        let x_values = json_values(df.column(&self.x.field)?, self.x.kind);
        let y_values = json_values(df.column(&self.y.field)?, self.y.kind);

        let values: Vec<Value> = x_values
            .into_iter()
            .zip(y_values)
            .map(|(x, y)| {
                let mut row = serde_json::Map::new();
                row.insert(self.x.field.clone(), x);
                row.insert(self.y.field.clone(), y);
                Value::Object(row)
            })
            .collect();

        let mark = match self.kind {
            ChartKind::Scatter => json!({"type": "point", "size": POINT_SIZE, "filled": true}),
            ChartKind::Line => json!({"type": "line", "point": true}),
            ChartKind::Bar => json!({"type": "bar"}),
        };

        let color = match &self.color {
            Some(field) => json!({"field": field, "type": "nominal"}),
            None => json!({"value": SINGLE_SERIES_COLOR}),
        };

        let tooltip: Vec<Value> = self
            .tooltip
            .iter()
            .map(|field| {
                let kind = if *field == self.x.field { self.x.kind } else { self.y.kind };
                json!({"field": field, "type": kind})
            })
            .collect();

        Ok(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "title": self.title,
            "width": "container",
            "height": CHART_HEIGHT,
            "data": {"values": values},
            "mark": mark,
            "encoding": {
                "x": Self::encoding_json(&self.x),
                "y": Self::encoding_json(&self.y),
                "color": color,
                "tooltip": tooltip,
            },
        }))
    }
}

/// Plot-ready coordinates of one legend group.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub name: String,
    pub points: Vec<[f64; 2]>,
}

/// Numeric coordinates for a [`ChartSpec`], grouped by legend value.
///
/// Categorical axes are mapped to ordinal positions `0, 1, 2, ...` in order of
/// first appearance; the matching labels are kept for tick formatting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartData {
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub series: Vec<SeriesData>,
}

struct AxisData {
    positions: Vec<Option<f64>>,
    labels: Vec<String>,
    text: Vec<Option<String>>,
}

impl AxisData {
    fn read(column: &Column, kind: AxisKind) -> Self {
        let text = text_values(column);

        match (kind, numeric_values(column)) {
            (AxisKind::Quantitative, Some(positions)) => AxisData {
                positions,
                labels: Vec::new(),
                text,
            },
            _ => {
                let mut labels: Vec<String> = Vec::new();
                let mut index: HashMap<String, usize> = HashMap::new();
                let positions = text
                    .iter()
                    .map(|value| {
                        let label = value.clone()?;
                        let next = index.len();
                        let position = *index.entry(label.clone()).or_insert_with(|| {
                            labels.push(label);
                            next
                        });
                        Some(position as f64)
                    })
                    .collect();

                AxisData {
                    positions,
                    labels,
                    text,
                }
            }
        }
    }
}

impl ChartData {
    /// Reads the axis columns of `df` per `spec`.
    ///
    /// Rows with a missing coordinate are skipped.
    pub fn prepare(spec: &ChartSpec, df: &DataFrame) -> PolarsResult<Self> {
        let x = AxisData::read(df.column(&spec.x.field)?, spec.x.kind);
        let y = AxisData::read(df.column(&spec.y.field)?, spec.y.kind);

        let legend = spec.color.as_ref().map(|field| {
            if *field == spec.x.field { &x.text } else { &y.text }
        });

        let mut series: Vec<SeriesData> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for (row, (px, py)) in x.positions.iter().zip(&y.positions).enumerate() {
            let (Some(px), Some(py)) = (px, py) else {
                continue;
            };

            let name = match legend {
                Some(values) => values[row].clone().unwrap_or_else(|| "null".to_string()),
                None => spec.y.field.clone(),
            };

            let slot = *group_index.entry(name.clone()).or_insert_with(|| {
                series.push(SeriesData {
                    name,
                    points: Vec::new(),
                });
                series.len() - 1
            });

            series[slot].points.push([*px, *py]);
        }

        Ok(ChartData {
            x_labels: x.labels,
            y_labels: y.labels,
            series,
        })
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Label for an ordinal position on a categorical axis, if there is one.
pub fn ordinal_label(labels: &[String], position: f64) -> Option<&str> {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return None;
    }
    labels.get(rounded as usize).map(String::as_str)
}

/// The column as numbers, or `None` when it cannot be read as numeric throughout.
fn numeric_values(column: &Column) -> Option<Vec<Option<f64>>> {
    let dtype = column.dtype();

    if dtype.is_float() || dtype.is_integer() {
        let cast = column.cast(&DataType::Float64).ok()?;
        return Some(cast.as_materialized_series().f64().ok()?.into_iter().collect());
    }

    if dtype != &DataType::String {
        return None;
    }

    let mut values = Vec::with_capacity(column.len());
    for value in column.as_materialized_series().str().ok()? {
        match value.map(|text| text.trim().parse::<f64>()) {
            None => values.push(None),
            Some(Ok(number)) => values.push(Some(number)),
            Some(Err(_)) => {
                debug!(
                    "Column '{}' has non-numeric value {value:?}; treating it as categorical",
                    column.name()
                );
                return None;
            }
        }
    }
    Some(values)
}

fn text_values(column: &Column) -> Vec<Option<String>> {
    (0..column.len())
        .map(|row| match column.get(row) {
            Ok(AnyValue::Null) | Err(_) => None,
            Ok(AnyValue::String(s)) => Some(s.to_string()),
            Ok(AnyValue::StringOwned(s)) => Some(s.to_string()),
            Ok(value) => Some(value.to_string()),
        })
        .collect()
}

fn json_values(column: &Column, kind: AxisKind) -> Vec<Value> {
    match (kind, numeric_values(column)) {
        (AxisKind::Quantitative, Some(numbers)) => numbers
            .into_iter()
            .map(|n| n.map_or(Value::Null, Value::from))
            .collect(),
        _ => text_values(column)
            .into_iter()
            .map(|s| s.map_or(Value::Null, Value::String))
            .collect(),
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// `cargo test -- --show-output tests_chart`
#[cfg(test)]
mod tests_chart {
    use super::*;

    fn sample() -> PolarsResult<DataFrame> {
        df!(
            "city" => ["Austin", "Boston", "Austin"],
            "trips" => [10i64, 20, 30],
            "fare" => ["1.5", " 2.0 ", "3"],
            "score" => ["1", "2", "bad"],
        )
    }

    #[test]
    fn one_bad_value_poisons_the_column() -> PolarsResult<()> {
        let df = sample()?;
        assert_eq!(infer_axis_kind(df.column("score")?), AxisKind::Categorical);
        Ok(())
    }

    #[test]
    fn numeric_text_and_numeric_storage_are_quantitative() -> PolarsResult<()> {
        let df = sample()?;
        assert_eq!(infer_axis_kind(df.column("trips")?), AxisKind::Quantitative);
        assert_eq!(infer_axis_kind(df.column("fare")?), AxisKind::Quantitative);
        assert_eq!(infer_axis_kind(df.column("city")?), AxisKind::Categorical);
        Ok(())
    }

    #[test]
    fn nulls_do_not_demote() -> PolarsResult<()> {
        let df = df!("v" => [Some("1"), None, Some("2.5")])?;
        assert_eq!(infer_axis_kind(df.column("v")?), AxisKind::Quantitative);
        Ok(())
    }

    #[test]
    fn booleans_are_categorical() -> PolarsResult<()> {
        let df = df!("flag" => [true, false])?;
        assert_eq!(infer_axis_kind(df.column("flag")?), AxisKind::Categorical);
        Ok(())
    }

    #[test]
    fn legend_field_choice() {
        assert_eq!(choose_legend_field("a", "b", &["a"]), Some("a".to_string()));
        assert_eq!(choose_legend_field("a", "b", &["b"]), Some("b".to_string()));
        assert_eq!(choose_legend_field("a", "b", &["a", "b"]), Some("a".to_string()));
        assert_eq!(choose_legend_field("a", "b", &[]), None);
    }

    #[test]
    fn unknown_kind_falls_back_to_bar() {
        assert_eq!(ChartKind::from_label("Scatter"), ChartKind::Scatter);
        assert_eq!(ChartKind::from_label("Line"), ChartKind::Line);
        assert_eq!(ChartKind::from_label("Pie"), ChartKind::Bar);
        assert_eq!(ChartKind::from_label(""), ChartKind::Bar);
    }

    #[test]
    fn build_chart_requires_known_columns() -> PolarsResult<()> {
        let df = sample()?;
        assert!(build_chart(Some(&df), "missing", "trips", ChartKind::Line).is_none());
        assert!(build_chart(Some(&df), "city", "missing", ChartKind::Line).is_none());
        assert!(build_chart(None, "city", "trips", ChartKind::Line).is_none());
        Ok(())
    }

    #[test]
    fn build_chart_rejects_empty_table() -> PolarsResult<()> {
        let df = sample()?.head(Some(0));
        assert!(build_chart(Some(&df), "city", "trips", ChartKind::Bar).is_none());
        Ok(())
    }

    #[test]
    fn categorical_axis_drives_legend() -> PolarsResult<()> {
        let df = sample()?;

        let spec = build_chart(Some(&df), "city", "trips", ChartKind::Bar).expect("valid axes");
        assert_eq!(spec.title, "Bar Chart");
        assert_eq!(spec.mark, "bar");
        assert_eq!(spec.x.kind, AxisKind::Categorical);
        assert_eq!(spec.y.kind, AxisKind::Quantitative);
        assert_eq!(spec.color.as_deref(), Some("city"));
        assert_eq!(spec.tooltip, vec!["city", "trips"]);

        let spec = build_chart(Some(&df), "trips", "fare", ChartKind::Scatter).expect("valid axes");
        assert_eq!(spec.color, None, "both quantitative: single series");
        Ok(())
    }

    #[test]
    fn vega_lite_document() -> PolarsResult<()> {
        let df = sample()?;
        let spec = build_chart(Some(&df), "trips", "fare", ChartKind::Line).expect("valid axes");

        let doc = spec.to_vega_lite(&df)?;

        assert_eq!(doc["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(doc["title"], "Line Chart");
        assert_eq!(doc["mark"]["type"], "line");
        assert_eq!(doc["mark"]["point"], true);
        assert_eq!(doc["encoding"]["x"]["type"], "quantitative");
        assert_eq!(doc["encoding"]["color"]["value"], SINGLE_SERIES_COLOR);
        assert_eq!(doc["data"]["values"][1]["fare"], 2.0, "numeric text coerced");
        assert_eq!(doc["encoding"]["tooltip"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[test]
    fn vega_lite_nominal_legend() -> PolarsResult<()> {
        let df = sample()?;
        let spec = build_chart(Some(&df), "trips", "score", ChartKind::Scatter).expect("valid axes");

        let doc = spec.to_vega_lite(&df)?;

        assert_eq!(doc["mark"]["size"], POINT_SIZE);
        assert_eq!(doc["encoding"]["y"]["type"], "nominal");
        assert_eq!(doc["encoding"]["color"]["field"], "score");
        assert_eq!(doc["data"]["values"][2]["score"], "bad");
        Ok(())
    }

    #[test]
    fn chart_data_groups_by_legend() -> PolarsResult<()> {
        let df = sample()?;
        let spec = build_chart(Some(&df), "city", "trips", ChartKind::Bar).expect("valid axes");

        let data = ChartData::prepare(&spec, &df)?;

        assert_eq!(data.x_labels, vec!["Austin", "Boston"]);
        assert!(data.y_labels.is_empty());
        assert_eq!(data.series.len(), 2);
        assert_eq!(data.series[0].name, "Austin");
        assert_eq!(data.series[0].points, vec![[0.0, 10.0], [0.0, 30.0]]);
        assert_eq!(data.series[1].points, vec![[1.0, 20.0]]);
        assert_eq!(ordinal_label(&data.x_labels, 1.0), Some("Boston"));
        assert_eq!(ordinal_label(&data.x_labels, 0.5), None);
        Ok(())
    }

    #[test]
    fn chart_data_skips_missing_coordinates() -> PolarsResult<()> {
        let df = df!("x" => [Some(1.0), None, Some(3.0)], "y" => [1.0, 2.0, 3.0])?;
        let spec = build_chart(Some(&df), "x", "y", ChartKind::Scatter).expect("valid axes");

        let data = ChartData::prepare(&spec, &df)?;

        assert_eq!(data.series.len(), 1);
        assert_eq!(data.series[0].name, "y");
        assert_eq!(data.point_count(), 2);
        Ok(())
    }
}
