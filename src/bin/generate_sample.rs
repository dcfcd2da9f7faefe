use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use rusty_census::Record;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[-1, 1)`.
    fn jitter(&mut self) -> f64 {
        ((self.next_u64() >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

#[derive(Parser)]
#[command(about = "Write a synthetic residents-by-year dataset (.csv or .parquet)")]
struct Args {
    #[arg(default_value = "data/Singapore_Residents_edit.csv")]
    output: PathBuf,
    #[arg(long, default_value_t = 2000)]
    first_year: i64,
    #[arg(long, default_value_t = 2020)]
    last_year: i64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// (group, starting population per gender, yearly growth, female share)
const GROUPS: [(&str, f64, f64, f64); 2] = [
    ("Singaporean", 1_600_000.0, 0.008, 0.51),
    ("Permanent Residents", 280_000.0, 0.025, 0.53),
];

fn generate(args: &Args) -> Vec<Record> {
    let mut rng = SimpleRng::new(args.seed);
    let mut records = Vec::new();

    for year in args.first_year..=args.last_year {
        let t = (year - args.first_year) as i32;
        let mut total = 0i64;
        let mut rows = Vec::new();

        for &(group, base, growth, female_share) in &GROUPS {
            let size = 2.0 * base * (1.0 + growth).powi(t) * (1.0 + 0.004 * rng.jitter());
            let female = (size * female_share).round() as i64;
            let male = (size * (1.0 - female_share)).round() as i64;
            total += male + female;
            rows.push(Record::new(format!("{group} Male"), year, male));
            rows.push(Record::new(format!("{group} Female"), year, female));
        }

        records.push(Record::new("Total Residents", year, total));
        records.extend(rows);
    }
    records
}

fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, records: &[Record]) -> Result<()> {
    let residents = StringArray::from(
        records
            .iter()
            .map(|r| r.residents.as_deref())
            .collect::<Vec<_>>(),
    );
    let years = Int64Array::from(records.iter().map(|r| r.year).collect::<Vec<_>>());
    let counts = Int64Array::from(
        records
            .iter()
            .map(|r| r.count.as_f64() as i64)
            .collect::<Vec<_>>(),
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new("Residents", DataType::Utf8, true),
        Field::new("Year", DataType::Int64, false),
        Field::new("Count", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(residents), Arc::new(years), Arc::new(counts)],
    )?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.last_year < args.first_year {
        bail!("last year {} precedes first year {}", args.last_year, args.first_year);
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let records = generate(&args);
    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &records)?,
        "parquet" | "pq" => write_parquet(&args.output, &records)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    log::info!("Wrote {} rows to {}", records.len(), args.output.display());
    println!(
        "Wrote {} rows ({}..={}) to {}",
        records.len(),
        args.first_year,
        args.last_year,
        args.output.display()
    );
    Ok(())
}
