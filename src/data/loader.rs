use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Count, PopulationDataset, Record};
use crate::error::{DataError, Result};

pub const RESIDENTS_COLUMN: &str = "Residents";
pub const YEAR_COLUMN: &str = "Year";
pub const COUNT_COLUMN: &str = "Count";

/// Options for delimited text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { delimiter: b',' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a population dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` / `.txt` – delimited text with a header row
/// * `.parquet` / `.pq`       – Parquet with `Residents`, `Year`, `Count`
/// * `.json`                  – `[{ "Residents": ..., "Year": ..., "Count": ... }, ...]`
///
/// Extra columns are ignored. A missing required column or an unparsable
/// `Year`/`Count` value fails the whole load.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<PopulationDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" | "tsv" | "txt" => read_csv(std::fs::File::open(path)?, options)?,
        "parquet" | "pq" => read_parquet(std::fs::File::open(path)?)?,
        "json" => read_json(std::fs::File::open(path)?)?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };

    log::info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(PopulationDataset::from_records(records))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse delimited text with a header row naming at least `Residents`,
/// `Year` and `Count`.
pub fn read_csv<R: Read>(input: R, options: &LoadOptions) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(DataError::MissingColumn(name))
    };
    let residents_idx = column(RESIDENTS_COLUMN)?;
    let year_idx = column(YEAR_COLUMN)?;
    let count_idx = column(COUNT_COLUMN)?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;

        let residents = match record.get(residents_idx).unwrap_or("") {
            "" => None,
            label => Some(label.to_string()),
        };
        let year = parse_year(record.get(year_idx).unwrap_or(""), row_no)?;
        let count = parse_count(record.get(count_idx).unwrap_or(""), row_no)?;

        records.push(Record {
            residents,
            year,
            count,
        });
    }
    Ok(records)
}

fn parse_year(s: &str, row: usize) -> Result<i64> {
    let s = s.trim();
    let year = match s.parse::<i64>() {
        Ok(year) => Some(year),
        Err(_) => s.parse::<f64>().ok().and_then(integral_year),
    };
    year.and_then(bucketable_year).ok_or_else(|| invalid(row, YEAR_COLUMN, s))
}

/// An integral float that fits in `i64`; `v as i64` would saturate.
fn integral_year(v: f64) -> Option<i64> {
    ((i64::MIN as f64)..(i64::MAX as f64))
        .contains(&v)
        .then_some(v)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

/// A year whose 3-year group start is representable.
fn bucketable_year(year: i64) -> Option<i64> {
    year.div_euclid(3).checked_mul(3).map(|_| year)
}

fn parse_count(s: &str, row: usize) -> Result<Count> {
    let s = s.trim();
    let count = if let Ok(i) = s.parse::<i64>() {
        Count::Integer(i)
    } else if let Ok(v) = s.parse::<f64>() {
        Count::Float(v)
    } else {
        return Err(invalid(row, COUNT_COLUMN, s));
    };
    validate_count(count, row)
}

fn validate_count(count: Count, row: usize) -> Result<Count> {
    let v = count.as_f64();
    if v.is_finite() && v >= 0.0 {
        Ok(count)
    } else {
        Err(invalid(row, COUNT_COLUMN, &count.to_string()))
    }
}

fn invalid(row: usize, column: &'static str, value: &str) -> DataError {
    DataError::InvalidValue {
        row,
        column,
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
pub fn read_json<R: Read>(input: R) -> Result<Vec<Record>> {
    let records: Vec<Record> = serde_json::from_reader(input)?;
    for (row, record) in records.iter().enumerate() {
        bucketable_year(record.year)
            .ok_or_else(|| invalid(row, YEAR_COLUMN, &record.year.to_string()))?;
        validate_count(record.count, row)?;
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load `Residents` (Utf8/LargeUtf8), `Year` (any integer type, or an
/// integral float) and `Count` (integer or float) from a Parquet file.
pub fn read_parquet(file: std::fs::File) -> Result<Vec<Record>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // Files with no row groups yield no batches, so check the schema up front.
    for name in [RESIDENTS_COLUMN, YEAR_COLUMN, COUNT_COLUMN] {
        builder
            .schema()
            .index_of(name)
            .map_err(|_| DataError::MissingColumn(name))?;
    }
    let reader = builder.build()?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let column = |name: &'static str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i).clone())
                .map_err(|_| DataError::MissingColumn(name))
        };
        let residents = residents_column(&column(RESIDENTS_COLUMN)?)?;
        let base = records.len();
        let years = year_column(&column(YEAR_COLUMN)?, base)?;
        let counts = count_column(&column(COUNT_COLUMN)?)?;

        for row in 0..batch.num_rows() {
            let year = years[row].ok_or_else(|| invalid(base + row, YEAR_COLUMN, "null"))?;
            let count = counts[row].ok_or_else(|| invalid(base + row, COUNT_COLUMN, "null"))?;
            records.push(Record {
                residents: residents[row].clone(),
                year,
                count: validate_count(count, base + row)?,
            });
        }
    }

    Ok(records)
}

// -- Arrow column helpers --

fn residents_column(col: &ArrayRef) -> Result<Vec<Option<String>>> {
    let values = match col.data_type() {
        DataType::Utf8 => col
            .as_string::<i32>()
            .iter()
            .map(|v| v.filter(|s| !s.is_empty()).map(str::to_string))
            .collect(),
        DataType::LargeUtf8 => col
            .as_string::<i64>()
            .iter()
            .map(|v| v.filter(|s| !s.is_empty()).map(str::to_string))
            .collect(),
        other => return Err(invalid(0, RESIDENTS_COLUMN, &format!("{other:?}"))),
    };
    Ok(values)
}

/// `base` is the file row of the batch's first row, for error messages.
fn year_column(col: &ArrayRef, base: usize) -> Result<Vec<Option<i64>>> {
    let dt = col.data_type();
    let check = |row: usize, year: Option<i64>, raw: &dyn std::fmt::Display| {
        year.and_then(bucketable_year)
            .map(Some)
            .ok_or_else(|| invalid(base + row, YEAR_COLUMN, &raw.to_string()))
    };
    if dt.is_integer() {
        let ints = cast(col, &DataType::Int64)?;
        return ints
            .as_primitive::<Int64Type>()
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v) => check(row, Some(v), &v),
                None => Ok(None),
            })
            .collect();
    }
    if dt.is_floating() {
        let floats = cast(col, &DataType::Float64)?;
        return floats
            .as_primitive::<Float64Type>()
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v) => check(row, integral_year(v), &v),
                None => Ok(None),
            })
            .collect();
    }
    Err(invalid(base, YEAR_COLUMN, &format!("{dt:?}")))
}

fn count_column(col: &ArrayRef) -> Result<Vec<Option<Count>>> {
    let dt = col.data_type();
    if dt.is_integer() {
        let ints = cast(col, &DataType::Int64)?;
        return Ok(ints
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(Count::Integer))
            .collect());
    }
    if dt.is_floating() {
        let floats = cast(col, &DataType::Float64)?;
        return Ok(floats
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map(Count::Float))
            .collect());
    }
    Err(invalid(0, COUNT_COLUMN, &format!("{dt:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_csv_with_extra_columns_in_any_order() {
        let text = "Count,Notes,Year,Residents\n100,x,2020,Total Residents\n55.5,,2021.0,Singaporean Male\n7,,2021,\n";
        let records = read_csv(text.as_bytes(), &LoadOptions::default()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::new("Total Residents", 2020, 100));
        assert_eq!(records[1].count, Count::Float(55.5));
        assert_eq!(records[1].year, 2021);
        assert_eq!(records[2].residents, None);
    }

    #[test]
    fn honours_delimiter() {
        let text = "Residents;Year;Count\nTotal Residents;2020;10\n";
        let options = LoadOptions { delimiter: b';' };
        let records = read_csv(text.as_bytes(), &options).unwrap();
        assert_eq!(records, vec![Record::new("Total Residents", 2020, 10)]);
    }

    #[test]
    fn missing_column_is_fatal() {
        let text = "Residents,Year\nTotal Residents,2020\n";
        let err = read_csv(text.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn("Count")));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for text in [
            "Residents,Year,Count\nA,20x0,1\n",
            "Residents,Year,Count\nA,2020.5,1\n",
            "Residents,Year,Count\nA,2020,-4\n",
            "Residents,Year,Count\nA,2020,\n",
            "Residents,Year,Count\nA,1e30,1\n",
            "Residents,Year,Count\nA,-1e30,1\n",
            "Residents,Year,Count\nA,-9223372036854775808,1\n",
        ] {
            let err = read_csv(text.as_bytes(), &LoadOptions::default()).unwrap_err();
            assert!(
                matches!(err, DataError::InvalidValue { row: 0, .. }),
                "{text:?} gave {err}"
            );
        }
    }

    #[test]
    fn reads_json_records() {
        let text = r#"[
            {"Residents": "Total Residents", "Year": 2020, "Count": 150},
            {"Residents": null, "Year": 2021, "Count": 2.5}
        ]"#;
        let records = read_json(text.as_bytes()).unwrap();
        assert_eq!(records[0], Record::new("Total Residents", 2020, 150));
        assert_eq!(records[1].residents, None);
        assert_eq!(records[1].count, Count::Float(2.5));
    }

    #[test]
    fn json_rejects_negative_counts() {
        let text = r#"[{"Residents": "A", "Year": 2020, "Count": -1}]"#;
        assert!(matches!(
            read_json(text.as_bytes()),
            Err(DataError::InvalidValue { column: "Count", .. })
        ));
    }

    #[test]
    fn json_rejects_years_without_a_group() {
        let text = r#"[{"Residents": "A", "Year": -9223372036854775808, "Count": 1}]"#;
        assert!(matches!(
            read_json(text.as_bytes()),
            Err(DataError::InvalidValue { column: "Year", .. })
        ));
    }

    #[test]
    fn year_errors_report_the_file_row() {
        let col: ArrayRef = std::sync::Arc::new(arrow::array::Float64Array::from(vec![
            2020.0, 2021.0, 2021.5,
        ]));
        let err = year_column(&col, 1024).unwrap_err();
        assert!(
            matches!(err, DataError::InvalidValue { row: 1026, column: "Year", .. }),
            "{err}"
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = load_file(Path::new("population.xlsx"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(ext) if ext == "xlsx"));
    }
}
