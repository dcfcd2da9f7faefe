use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rusty_census::data::derive::year_group;
use rusty_census::render::{render, OutputFormat};
use rusty_census::{load_file, CategoryFilter, LoadOptions, Session, Task};

#[derive(Parser, Debug)]
#[command(name = "rusty-census")]
#[command(version)]
#[command(about = "Population statistics from a residents-by-year table")]
#[command(long_about = "Population statistics from a residents-by-year table

TASKS:
  raw      View Raw Data
  totals   Total Population Every Year
  ratio    Male–Female Ratio (Every 3 Years)
  growth   Population Growth Percentage

EXAMPLES:
  rusty-census --task totals
  rusty-census --task ratio --category 'Singaporean ' -y 2016 -y 2019
  rusty-census --data residents.parquet --task growth --format json
  rusty-census --list-filters")]
struct Args {
    /// Population dataset (.csv, .tsv, .parquet or .json)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "RUSTY_CENSUS_DATA",
        default_value = "data/Singapore_Residents_edit.csv"
    )]
    data: PathBuf,

    /// Field delimiter for delimited text input
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Query to run (raw, totals, ratio, growth)
    #[arg(short, long, default_value = "raw")]
    task: Task,

    /// Category to keep, or "all"
    #[arg(short, long, default_value = "all")]
    category: CategoryFilter,

    /// Year group to keep; repeat for several. Defaults to every group
    #[arg(short = 'y', long = "year-group", value_name = "YEAR_GROUP")]
    year_groups: Vec<i64>,

    /// Deselect every year group
    #[arg(long, conflicts_with = "year_groups")]
    no_year_groups: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Print the available categories and year groups, then exit
    #[arg(long)]
    list_filters: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let options = LoadOptions {
        delimiter: u8::try_from(args.delimiter)
            .context("delimiter must be a single-byte character")?,
    };
    let dataset = load_file(&args.data, &options)
        .with_context(|| format!("loading {}", args.data.display()))?;

    if args.list_filters {
        println!("Categories:");
        for category in &dataset.categories {
            println!("  {category:?}");
        }
        println!("Year groups:");
        for group in &dataset.year_groups {
            println!("  {group}");
        }
        return Ok(());
    }

    let mut session = Session::new(dataset);
    session.set_task(args.task);
    session.set_category(args.category);

    if args.no_year_groups {
        session.select_no_year_groups();
    } else if !args.year_groups.is_empty() {
        for &group in &args.year_groups {
            if year_group(group) != group || !session.dataset().year_groups.contains(&group) {
                log::warn!("{group} is not a year group of this dataset");
            }
        }
        session.selection.year_groups = args.year_groups.into_iter().collect();
    }

    let output = session.run();
    let text = render(&output, args.format)?;

    if args.format == OutputFormat::Table {
        println!("{}\n", session.task.label());
    }
    println!("{text}");

    Ok(())
}
