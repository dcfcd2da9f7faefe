use std::io::Write;
use std::sync::Arc;

use arrow::array::{Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::{Builder, NamedTempFile};

use rusty_census::data::derive::{category, year_group};
use rusty_census::query::{GrowthTable, YearTotal};
use rusty_census::render::{render, OutputFormat, NO_DATA};
use rusty_census::{
    apply_filters, load_file, CategoryFilter, Count, DataError, LoadOptions, Metric,
    QueryOutput, Selection, Session, Task,
};

const RESIDENTS_CSV: &str = "\
Year,Residents,Count
2018,Total Residents,100
2019,Total Residents,110
2020,Total Residents,99
2018,Singaporean Male,40
2018,Singaporean Female,42
2019,Singaporean Male,41
2019,Singaporean Female,44
2020,Singaporean Male,39
2020,Singaporean Female,40
2019,Non-Resident Male,10
";

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn session() -> (NamedTempFile, Session) {
    let file = csv_file(RESIDENTS_CSV);
    let dataset = load_file(file.path(), &LoadOptions::default()).unwrap();
    (file, Session::new(dataset))
}

#[test]
fn derived_columns_hold_for_every_row() {
    let (_file, session) = session();
    for row in session.dataset().derived().iter() {
        assert_eq!(row.year_group, row.year.div_euclid(3) * 3);
        let expected = row.residents.as_deref().map(category);
        assert_eq!(row.category, expected);
        if let Some(cat) = &row.category {
            assert_eq!(&category(cat), cat);
        }
    }
}

#[test]
fn all_category_matches_year_group_only_filter() {
    let (_file, session) = session();
    let table = session.dataset().derived();
    let groups = [2016, 2019];

    let view = apply_filters(table, &Selection::new(CategoryFilter::All, groups));
    let expected: Vec<_> = table
        .iter()
        .filter(|r| groups.contains(&r.year_group))
        .collect();
    assert_eq!(view.rows(), expected.as_slice());
}

#[test]
fn empty_year_groups_give_no_data_for_every_task() {
    let (_file, mut session) = session();
    session.select_no_year_groups();
    for task in Task::ALL {
        session.set_task(task);
        let output = session.run();
        assert!(output.is_empty(), "{task} returned rows");
        assert_eq!(render(&output, OutputFormat::Table).unwrap(), NO_DATA);
    }
}

#[test]
fn totals_per_year() {
    let (_file, mut session) = session();
    session.set_task(Task::TotalPopulation);
    let QueryOutput::Totals(rows) = session.run() else {
        panic!("expected totals");
    };
    assert_eq!(
        rows,
        vec![
            YearTotal {
                year: 2018,
                count: Count::Integer(100),
            },
            YearTotal {
                year: 2019,
                count: Count::Integer(110),
            },
            YearTotal {
                year: 2020,
                count: Count::Integer(99),
            },
        ]
    );
}

#[test]
fn ratio_joins_on_category_and_year_group() {
    let (_file, mut session) = session();
    session.set_task(Task::GenderRatio);
    let QueryOutput::Ratio(rows) = session.run() else {
        panic!("expected ratio");
    };

    // 2018 is in group 2016; 2019 and 2020 are in group 2019.
    // Non-Resident has no female rows and drops out of the join.
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.category == "Singaporean "));
    assert_eq!(rows[0].year_group, year_group(2018));
    assert_eq!(rows[0].female_to_male, Metric::Value(1.05));
    assert_eq!(rows[1].year_group, 2019);
    assert_eq!(rows[1].male, Count::Integer(80));
    assert_eq!(rows[1].female, Count::Integer(84));
    assert_eq!(rows[1].female_to_male, Metric::Value(1.05));
}

#[test]
fn growth_follows_year_order() {
    let file = csv_file(
        "Residents,Year,Count\n\
         Total Residents,2020,99\n\
         Total Residents,2018,100\n\
         Total Residents,2019,110\n",
    );
    let mut session = Session::new(load_file(file.path(), &LoadOptions::default()).unwrap());
    session.set_task(Task::PopulationGrowth);

    let QueryOutput::Growth(table) = session.run() else {
        panic!("expected growth");
    };
    let GrowthTable { rows } = &table;
    assert_eq!(rows.len(), 3);

    let (years, growth) = table.series();
    assert_eq!(years, vec![2018, 2019, 2020]);
    assert_eq!(
        growth,
        vec![Metric::NotApplicable, Metric::Value(10.0), Metric::Value(-10.0)]
    );
}

#[test]
fn category_filter_narrows_growth_to_nothing() {
    let (_file, mut session) = session();
    session.set_task(Task::PopulationGrowth);
    session.set_category(CategoryFilter::Only("Singaporean ".into()));
    assert!(session.run().is_empty());
}

#[test]
fn missing_column_fails_before_any_query() {
    let file = csv_file("Residents,Year\nTotal Residents,2020\n");
    let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, DataError::MissingColumn("Count")));
}

#[test]
fn empty_parquet_without_required_columns_fails() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "Residents",
        DataType::Utf8,
        true,
    )]));
    let file = Builder::new().suffix(".parquet").tempfile().unwrap();
    let out = std::fs::File::create(file.path()).unwrap();
    ArrowWriter::try_new(out, schema, None)
        .unwrap()
        .close()
        .unwrap();

    let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, DataError::MissingColumn("Year")), "{err}");
}

#[test]
fn out_of_range_float_years_fail_the_load() {
    for year in ["1e30", "-1e30"] {
        let file = csv_file(&format!("Residents,Year,Count\nTotal Residents,{year},1\n"));
        let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(
            matches!(err, DataError::InvalidValue { row: 0, column: "Year", .. }),
            "{year}: {err}"
        );
    }
}

#[test]
fn parquet_year_errors_point_at_the_bad_row() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Residents", DataType::Utf8, true),
        Field::new("Year", DataType::Float64, false),
        Field::new("Count", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["Total Residents"; 3])),
            Arc::new(Float64Array::from(vec![2019.0, 2020.0, 2020.5])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
        ],
    )
    .unwrap();

    let file = Builder::new().suffix(".parquet").tempfile().unwrap();
    let out = std::fs::File::create(file.path()).unwrap();
    let mut writer = ArrowWriter::try_new(out, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
    assert!(
        matches!(err, DataError::InvalidValue { row: 2, column: "Year", .. }),
        "{err}"
    );
}

#[test]
fn loads_parquet_with_narrow_integer_years() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Residents", DataType::Utf8, true),
        Field::new("Year", DataType::Int32, false),
        Field::new("Count", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![
                Some("Total Residents"),
                Some("Singaporean Male"),
                None,
            ])),
            Arc::new(Int32Array::from(vec![2020, 2020, 2021])),
            Arc::new(Float64Array::from(vec![10.5, 4.0, 1.0])),
        ],
    )
    .unwrap();

    let file = Builder::new().suffix(".parquet").tempfile().unwrap();
    let out = std::fs::File::create(file.path()).unwrap();
    let mut writer = ArrowWriter::try_new(out, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let dataset = load_file(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.records()[0].count, Count::Float(10.5));
    assert_eq!(dataset.records()[2].residents, None);
    assert_eq!(dataset.derived().rows[2].category, None);
    assert_eq!(
        dataset.year_groups.iter().copied().collect::<Vec<_>>(),
        vec![2019]
    );
}

#[test]
fn csv_output_of_ratio_query() {
    let (_file, mut session) = session();
    session.set_task(Task::GenderRatio);
    session.selection.year_groups = [2019].into_iter().collect();

    let text = render(&session.run(), OutputFormat::Csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Category,Year_Group,Male,Female,Female_to_Male_Ratio");
    assert!(lines[1].ends_with(",2019,80,84,1.05"));
}
