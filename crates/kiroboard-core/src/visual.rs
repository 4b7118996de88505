//! Declarative QuickSight visual definitions
//!
//! Builders return serde documents in the shape the `Definition.Sheets[].Visuals`
//! member expects. Column names are not checked against the dataset.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aggregations accepted by a numerical measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericAggregation {
    Sum,
    Average,
    Min,
    Max,
    Count,
    Median,
}

/// How a measure column is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Numeric(NumericAggregation),
    DistinctCount,
}

impl Aggregation {
    pub const SUM: Aggregation = Aggregation::Numeric(NumericAggregation::Sum);
    pub const AVERAGE: Aggregation = Aggregation::Numeric(NumericAggregation::Average);
    pub const MAX: Aggregation = Aggregation::Numeric(NumericAggregation::Max);
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported aggregation: {0}. Supported: SUM, AVERAGE, MIN, MAX, COUNT, MEDIAN, DISTINCT_COUNT")]
pub struct ParseAggregationError(String);

impl FromStr for Aggregation {
    type Err = ParseAggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let aggregation = match s.trim().to_uppercase().as_str() {
            "DISTINCT_COUNT" => Aggregation::DistinctCount,
            "SUM" => Aggregation::Numeric(NumericAggregation::Sum),
            "AVERAGE" => Aggregation::Numeric(NumericAggregation::Average),
            "MIN" => Aggregation::Numeric(NumericAggregation::Min),
            "MAX" => Aggregation::Numeric(NumericAggregation::Max),
            "COUNT" => Aggregation::Numeric(NumericAggregation::Count),
            "MEDIAN" => Aggregation::Numeric(NumericAggregation::Median),
            _ => return Err(ParseAggregationError(s.to_string())),
        };
        Ok(aggregation)
    }
}

impl fmt::Display for NumericAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericAggregation::Sum => "SUM",
            NumericAggregation::Average => "AVERAGE",
            NumericAggregation::Min => "MIN",
            NumericAggregation::Max => "MAX",
            NumericAggregation::Count => "COUNT",
            NumericAggregation::Median => "MEDIAN",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Numeric(numeric) => write!(f, "{}", numeric),
            Aggregation::DistinctCount => f.write_str("DISTINCT_COUNT"),
        }
    }
}

/// A measure column paired with its aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub field_id: String,
    pub column: String,
    pub aggregation: Aggregation,
}

impl Measure {
    pub fn new(field_id: impl Into<String>, column: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            field_id: field_id.into(),
            column: column.into(),
            aggregation,
        }
    }

    fn field(&self, dataset: &str) -> MeasureField {
        measure_field(&self.field_id, dataset, &self.column, self.aggregation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnIdentifier {
    pub data_set_identifier: String,
    pub column_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MeasureField {
    #[serde(rename = "NumericalMeasureField")]
    Numerical(NumericalMeasureField),
    #[serde(rename = "CategoricalMeasureField")]
    Categorical(CategoricalMeasureField),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NumericalMeasureField {
    pub field_id: String,
    pub column: ColumnIdentifier,
    pub aggregation_function: NumericalAggregationFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NumericalAggregationFunction {
    pub simple_numerical_aggregation: NumericAggregation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoricalMeasureField {
    pub field_id: String,
    pub column: ColumnIdentifier,
    pub aggregation_function: CategoricalAggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoricalAggregation {
    DistinctCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DimensionField {
    #[serde(rename = "CategoricalDimensionField")]
    Categorical(CategoricalDimensionField),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoricalDimensionField {
    pub field_id: String,
    pub column: ColumnIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VisualTitle {
    pub visibility: Visibility,
    pub format_text: FormatText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormatText {
    pub plain_text: String,
}

/// One visual of a sheet, tagged the way QuickSight expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Visual {
    #[serde(rename = "KPIVisual")]
    Kpi(KpiVisual),
    #[serde(rename = "LineChartVisual")]
    Line(LineChartVisual),
    #[serde(rename = "BarChartVisual")]
    Bar(BarChartVisual),
    #[serde(rename = "TableVisual")]
    Table(TableVisual),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KpiVisual {
    pub visual_id: String,
    pub title: VisualTitle,
    pub chart_configuration: KpiChartConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KpiChartConfiguration {
    pub field_wells: KpiFieldWells,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KpiFieldWells {
    pub values: Vec<MeasureField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineChartVisual {
    pub visual_id: String,
    pub title: VisualTitle,
    pub chart_configuration: LineChartConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineChartConfiguration {
    pub field_wells: LineChartFieldWells,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineChartFieldWells {
    pub line_chart_aggregated_field_wells: AggregatedFieldWells,
}

/// Category plus values, shared by line and bar charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregatedFieldWells {
    pub category: Vec<DimensionField>,
    pub values: Vec<MeasureField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarChartVisual {
    pub visual_id: String,
    pub title: VisualTitle,
    pub chart_configuration: BarChartConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarChartConfiguration {
    pub field_wells: BarChartFieldWells,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_configuration: Option<BarChartSortConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarChartFieldWells {
    pub bar_chart_aggregated_field_wells: AggregatedFieldWells,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarChartSortConfiguration {
    pub category_items_limit: ItemsLimitConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsLimitConfiguration {
    pub items_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableVisual {
    pub visual_id: String,
    pub title: VisualTitle,
    pub chart_configuration: TableConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableConfiguration {
    pub field_wells: TableFieldWells,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableFieldWells {
    pub table_aggregated_field_wells: TableAggregatedFieldWells,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableAggregatedFieldWells {
    pub group_by: Vec<DimensionField>,
    pub values: Vec<MeasureField>,
}

impl MeasureField {
    pub fn field_id(&self) -> &str {
        match self {
            MeasureField::Numerical(field) => &field.field_id,
            MeasureField::Categorical(field) => &field.field_id,
        }
    }

    pub fn column(&self) -> &ColumnIdentifier {
        match self {
            MeasureField::Numerical(field) => &field.column,
            MeasureField::Categorical(field) => &field.column,
        }
    }
}

impl DimensionField {
    pub fn field_id(&self) -> &str {
        match self {
            DimensionField::Categorical(field) => &field.field_id,
        }
    }

    pub fn column(&self) -> &ColumnIdentifier {
        match self {
            DimensionField::Categorical(field) => &field.column,
        }
    }
}

impl Visual {
    pub fn visual_id(&self) -> &str {
        match self {
            Visual::Kpi(v) => &v.visual_id,
            Visual::Line(v) => &v.visual_id,
            Visual::Bar(v) => &v.visual_id,
            Visual::Table(v) => &v.visual_id,
        }
    }

    fn wells(&self) -> (&[DimensionField], &[MeasureField]) {
        match self {
            Visual::Kpi(v) => (&[], &v.chart_configuration.field_wells.values),
            Visual::Line(v) => {
                let wells = &v.chart_configuration.field_wells.line_chart_aggregated_field_wells;
                (&wells.category, &wells.values)
            }
            Visual::Bar(v) => {
                let wells = &v.chart_configuration.field_wells.bar_chart_aggregated_field_wells;
                (&wells.category, &wells.values)
            }
            Visual::Table(v) => {
                let wells = &v.chart_configuration.field_wells.table_aggregated_field_wells;
                (&wells.group_by, &wells.values)
            }
        }
    }

    /// Field ids in well order: dimensions first, then measures
    pub fn field_ids(&self) -> Vec<&str> {
        let (dimensions, measures) = self.wells();
        dimensions
            .iter()
            .map(DimensionField::field_id)
            .chain(measures.iter().map(MeasureField::field_id))
            .collect()
    }

    /// Every column referenced by the visual
    pub fn columns(&self) -> Vec<&ColumnIdentifier> {
        let (dimensions, measures) = self.wells();
        dimensions
            .iter()
            .map(DimensionField::column)
            .chain(measures.iter().map(MeasureField::column))
            .collect()
    }
}

fn column(dataset: &str, column: &str) -> ColumnIdentifier {
    ColumnIdentifier {
        data_set_identifier: dataset.to_string(),
        column_name: column.to_string(),
    }
}

fn title(text: &str) -> VisualTitle {
    VisualTitle {
        visibility: Visibility::Visible,
        format_text: FormatText {
            plain_text: text.to_string(),
        },
    }
}

fn dimension(field_id: &str, dataset: &str, column_name: &str) -> DimensionField {
    DimensionField::Categorical(CategoricalDimensionField {
        field_id: field_id.to_string(),
        column: column(dataset, column_name),
    })
}

/// `DistinctCount` needs the categorical measure shape; everything else is numerical
fn measure_field(field_id: &str, dataset: &str, column_name: &str, aggregation: Aggregation) -> MeasureField {
    match aggregation {
        Aggregation::DistinctCount => MeasureField::Categorical(CategoricalMeasureField {
            field_id: field_id.to_string(),
            column: column(dataset, column_name),
            aggregation_function: CategoricalAggregation::DistinctCount,
        }),
        Aggregation::Numeric(numeric) => MeasureField::Numerical(NumericalMeasureField {
            field_id: field_id.to_string(),
            column: column(dataset, column_name),
            aggregation_function: NumericalAggregationFunction {
                simple_numerical_aggregation: numeric,
            },
        }),
    }
}

/// Single-value KPI; the measure's field id is the visual id
pub fn kpi(id: &str, title_text: &str, dataset: &str, column_name: &str, aggregation: Aggregation) -> Visual {
    Visual::Kpi(KpiVisual {
        visual_id: id.to_string(),
        title: title(title_text),
        chart_configuration: KpiChartConfiguration {
            field_wells: KpiFieldWells {
                values: vec![measure_field(id, dataset, column_name, aggregation)],
            },
        },
    })
}

/// Line chart over a date dimension, one line per measure
pub fn line(id: &str, title_text: &str, dataset: &str, date_column: &str, values: &[Measure]) -> Visual {
    Visual::Line(LineChartVisual {
        visual_id: id.to_string(),
        title: title(title_text),
        chart_configuration: LineChartConfiguration {
            field_wells: LineChartFieldWells {
                line_chart_aggregated_field_wells: AggregatedFieldWells {
                    category: vec![dimension(date_column, dataset, date_column)],
                    values: values.iter().map(|m| m.field(dataset)).collect(),
                },
            },
        },
    })
}

/// Bar chart keyed by one category; `limit` keeps only the top N categories
///
/// `Some(0)` means no limit, same as `None`.
pub fn bar(
    id: &str,
    title_text: &str,
    dataset: &str,
    category_column: &str,
    values: &[Measure],
    limit: Option<u32>,
) -> Visual {
    Visual::Bar(BarChartVisual {
        visual_id: id.to_string(),
        title: title(title_text),
        chart_configuration: BarChartConfiguration {
            field_wells: BarChartFieldWells {
                bar_chart_aggregated_field_wells: AggregatedFieldWells {
                    category: vec![dimension(category_column, dataset, category_column)],
                    values: values.iter().map(|m| m.field(dataset)).collect(),
                },
            },
            sort_configuration: limit.filter(|n| *n > 0).map(|items_limit| {
                BarChartSortConfiguration {
                    category_items_limit: ItemsLimitConfiguration { items_limit },
                }
            }),
        },
    })
}

pub fn table(
    id: &str,
    title_text: &str,
    dataset: &str,
    group_columns: &[&str],
    values: &[Measure],
) -> Visual {
    Visual::Table(TableVisual {
        visual_id: id.to_string(),
        title: title(title_text),
        chart_configuration: TableConfiguration {
            field_wells: TableFieldWells {
                table_aggregated_field_wells: TableAggregatedFieldWells {
                    group_by: group_columns
                        .iter()
                        .map(|col| dimension(col, dataset, col))
                        .collect(),
                    values: values.iter().map(|m| m.field(dataset)).collect(),
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const NUMERIC: [NumericAggregation; 6] = [
        NumericAggregation::Sum,
        NumericAggregation::Average,
        NumericAggregation::Min,
        NumericAggregation::Max,
        NumericAggregation::Count,
        NumericAggregation::Median,
    ];

    fn to_json(visual: &Visual) -> Value {
        serde_json::to_value(visual).unwrap()
    }

    #[test]
    fn test_kpi_distinct_count_is_categorical() {
        let visual = kpi("kpi-users", "Active users", "dataset1", "userid", Aggregation::DistinctCount);
        assert_eq!(
            to_json(&visual),
            json!({
                "KPIVisual": {
                    "VisualId": "kpi-users",
                    "Title": {"Visibility": "VISIBLE", "FormatText": {"PlainText": "Active users"}},
                    "ChartConfiguration": {"FieldWells": {"Values": [{
                        "CategoricalMeasureField": {
                            "FieldId": "kpi-users",
                            "Column": {"DataSetIdentifier": "dataset1", "ColumnName": "userid"},
                            "AggregationFunction": "DISTINCT_COUNT"
                        }
                    }]}}
                }
            })
        );
    }

    #[test]
    fn test_numeric_aggregations_in_every_builder() {
        for numeric in NUMERIC {
            let agg = Aggregation::Numeric(numeric);
            let measures = [Measure::new("m", "credits_used", agg)];
            let visuals = [
                kpi("k", "t", "ds", "credits_used", agg),
                line("l", "t", "ds", "date", &measures),
                bar("b", "t", "ds", "username", &measures, None),
                table("t", "t", "ds", &["username"], &measures),
            ];
            for visual in &visuals {
                let text = serde_json::to_string(visual).unwrap();
                assert!(text.contains("NumericalMeasureField"), "{}", text);
                assert!(!text.contains("CategoricalMeasureField"), "{}", text);
                assert!(
                    text.contains(&format!(r#""SimpleNumericalAggregation":"{}""#, numeric)),
                    "{}",
                    text
                );
            }
        }
    }

    #[test]
    fn test_distinct_count_in_every_builder() {
        let measures = [Measure::new("users", "userid", Aggregation::DistinctCount)];
        let visuals = [
            line("l", "t", "ds", "date", &measures),
            bar("b", "t", "ds", "subscription_tier", &measures, None),
            table("t", "t", "ds", &["client_type"], &measures),
        ];
        for visual in &visuals {
            let text = serde_json::to_string(visual).unwrap();
            assert!(text.contains(r#""CategoricalMeasureField""#), "{}", text);
            assert!(!text.contains("SimpleNumericalAggregation"), "{}", text);
        }
    }

    #[test]
    fn test_bar_limit() {
        let measures = [Measure::new("credits", "credits_used", Aggregation::SUM)];

        let top = to_json(&bar("bar-top", "Top 10", "ds", "username", &measures, Some(10)));
        assert_eq!(
            top["BarChartVisual"]["ChartConfiguration"]["SortConfiguration"],
            json!({"CategoryItemsLimit": {"ItemsLimit": 10}})
        );

        let all = to_json(&bar("bar-all", "All", "ds", "username", &measures, None));
        assert!(all["BarChartVisual"]["ChartConfiguration"]
            .get("SortConfiguration")
            .is_none());

        let zero = to_json(&bar("bar-zero", "All", "ds", "username", &measures, Some(0)));
        assert!(zero["BarChartVisual"]["ChartConfiguration"]
            .get("SortConfiguration")
            .is_none());
    }

    #[test]
    fn test_line_and_table_wells() {
        let visual = line(
            "line-credits",
            "Daily credits",
            "credits",
            "date",
            &[
                Measure::new("cr_used", "credits_used", Aggregation::SUM),
                Measure::new("cr_over", "overage_credits_used", Aggregation::SUM),
            ],
        );
        assert_eq!(visual.field_ids(), vec!["date", "cr_used", "cr_over"]);
        let value = to_json(&visual);
        let wells = &value["LineChartVisual"]["ChartConfiguration"]["FieldWells"]
            ["LineChartAggregatedFieldWells"];
        assert_eq!(wells["Category"][0]["CategoricalDimensionField"]["FieldId"], "date");
        assert_eq!(wells["Values"].as_array().unwrap().len(), 2);

        let visual = table(
            "table-cost",
            "Detail",
            "ds",
            &["username", "subscription_tier"],
            &[Measure::new("cap", "overage_cap", Aggregation::MAX)],
        );
        assert_eq!(visual.field_ids(), vec!["username", "subscription_tier", "cap"]);
        assert_eq!(visual.columns().len(), 3);
    }

    #[test]
    fn test_parse_aggregation() {
        assert_eq!("DISTINCT_COUNT".parse::<Aggregation>(), Ok(Aggregation::DistinctCount));
        assert_eq!("sum".parse::<Aggregation>(), Ok(Aggregation::SUM));
        assert_eq!(
            "MEDIAN".parse::<Aggregation>(),
            Ok(Aggregation::Numeric(NumericAggregation::Median))
        );
        assert!("P90".parse::<Aggregation>().is_err());
        assert_eq!(Aggregation::DistinctCount.to_string(), "DISTINCT_COUNT");
    }
}
