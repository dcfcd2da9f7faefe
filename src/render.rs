use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::FormatOptions;
use arrow::util::pretty::pretty_format_batches_with_options;
use serde::Serialize;

use crate::data::model::Count;
use crate::query::{Metric, QueryOutput};

/// Text shown instead of an empty table.
pub const NO_DATA: &str = "No data";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

// ---------------------------------------------------------------------------
// QueryOutput → Arrow
// ---------------------------------------------------------------------------

/// Columnar form of a query result, using the source column names.
///
/// `Count` columns are Int64 when every value is integral, Float64
/// otherwise. Metric columns are Float64 with inf/NaN kept and
/// `NotApplicable` as null.
pub fn to_record_batch(output: &QueryOutput) -> Result<RecordBatch> {
    let columns: Vec<(&str, ArrayRef)> = match output {
        QueryOutput::Raw(rows) => vec![
            ("Residents", string_array(rows.iter().map(|r| r.residents.as_deref()))),
            ("Year", int_array(rows.iter().map(|r| r.year))),
            ("Count", count_array(rows.iter().map(|r| r.count))),
            ("Year_Group", int_array(rows.iter().map(|r| r.year_group))),
            ("Category", string_array(rows.iter().map(|r| r.category.as_deref()))),
        ],
        QueryOutput::Totals(rows) => vec![
            ("Year", int_array(rows.iter().map(|r| r.year))),
            ("Count", count_array(rows.iter().map(|r| r.count))),
        ],
        QueryOutput::Ratio(rows) => vec![
            ("Category", string_array(rows.iter().map(|r| Some(r.category.as_str())))),
            ("Year_Group", int_array(rows.iter().map(|r| r.year_group))),
            ("Male", count_array(rows.iter().map(|r| r.male))),
            ("Female", count_array(rows.iter().map(|r| r.female))),
            (
                "Female_to_Male_Ratio",
                metric_array(rows.iter().map(|r| r.female_to_male)),
            ),
        ],
        QueryOutput::Growth(table) => vec![
            ("Year", int_array(table.rows.iter().map(|r| r.year))),
            ("Count", count_array(table.rows.iter().map(|r| r.count))),
            (
                "Population_Growth_%",
                metric_array(table.rows.iter().map(|r| r.growth)),
            ),
        ],
    };

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(schema, arrays).context("building result batch")
}

fn string_array<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

fn int_array(values: impl Iterator<Item = i64>) -> ArrayRef {
    Arc::new(Int64Array::from(values.collect::<Vec<i64>>()))
}

fn count_array(values: impl Iterator<Item = Count>) -> ArrayRef {
    let counts: Vec<Count> = values.collect();
    if counts.iter().all(Count::is_integer) {
        let ints: Vec<i64> = counts
            .iter()
            .map(|c| match c {
                Count::Integer(i) => *i,
                Count::Float(v) => *v as i64,
            })
            .collect();
        Arc::new(Int64Array::from(ints))
    } else {
        let floats: Vec<f64> = counts.iter().map(Count::as_f64).collect();
        Arc::new(Float64Array::from(floats))
    }
}

fn metric_array(values: impl Iterator<Item = Metric>) -> ArrayRef {
    Arc::new(Float64Array::from(values.map(|m| m.as_f64()).collect::<Vec<Option<f64>>>()))
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

pub fn render(output: &QueryOutput, format: OutputFormat) -> Result<String> {
    if output.is_empty() {
        return Ok(NO_DATA.to_string());
    }
    match format {
        OutputFormat::Table => render_table(output),
        OutputFormat::Csv => render_csv(output),
        OutputFormat::Json => render_json(output),
    }
}

fn render_table(output: &QueryOutput) -> Result<String> {
    let batch = to_record_batch(output)?;
    let options = FormatOptions::default().with_null("N/A");
    let table = pretty_format_batches_with_options(&[batch], &options)
        .context("formatting result table")?;
    Ok(table.to_string())
}

fn render_csv(output: &QueryOutput) -> Result<String> {
    fn write_rows<T: Serialize>(rows: &[T]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).context("writing CSV row")?;
        }
        let bytes = writer.into_inner().context("flushing CSV output")?;
        String::from_utf8(bytes).context("CSV output is not UTF-8")
    }

    match output {
        QueryOutput::Raw(rows) => write_rows(rows),
        QueryOutput::Totals(rows) => write_rows(rows),
        QueryOutput::Ratio(rows) => write_rows(rows),
        QueryOutput::Growth(table) => write_rows(&table.rows),
    }
}

fn render_json(output: &QueryOutput) -> Result<String> {
    let json = match output {
        QueryOutput::Raw(rows) => serde_json::to_string_pretty(rows),
        QueryOutput::Totals(rows) => serde_json::to_string_pretty(rows),
        QueryOutput::Ratio(rows) => serde_json::to_string_pretty(rows),
        QueryOutput::Growth(table) => serde_json::to_string_pretty(&table.rows),
    };
    json.context("serializing result to JSON")
}
