/// Query stage: four independent, read-only aggregations over a
/// [`FilteredView`].
///
/// ```text
///   FilteredView ──► raw     → Vec<DerivedRecord>
///                ├─► totals  → Vec<YearTotal>
///                ├─► ratio   → Vec<GenderRatio>
///                └─► growth  → GrowthTable
/// ```
pub mod growth;
pub mod ratio;
pub mod raw;
pub mod totals;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::data::filter::FilteredView;
use crate::data::model::DerivedRecord;

pub use growth::{population_growth, GrowthRow, GrowthTable};
pub use ratio::{gender_ratio, GenderRatio};
pub use raw::raw_view;
pub use totals::{total_population, YearTotal};

// ---------------------------------------------------------------------------
// Task – the four query modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Task {
    #[default]
    RawData,
    TotalPopulation,
    GenderRatio,
    PopulationGrowth,
}

impl Task {
    pub const ALL: [Task; 4] = [
        Task::RawData,
        Task::TotalPopulation,
        Task::GenderRatio,
        Task::PopulationGrowth,
    ];

    /// Heading shown above the result.
    pub fn label(&self) -> &'static str {
        match self {
            Task::RawData => "View Raw Data",
            Task::TotalPopulation => "Total Population Every Year",
            Task::GenderRatio => "Male–Female Ratio (Every 3 Years)",
            Task::PopulationGrowth => "Population Growth Percentage",
        }
    }

    /// Short command-line name.
    pub fn name(&self) -> &'static str {
        match self {
            Task::RawData => "raw",
            Task::TotalPopulation => "totals",
            Task::GenderRatio => "ratio",
            Task::PopulationGrowth => "growth",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the short name or the full label.
impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| s.eq_ignore_ascii_case(t.name()) || s == t.label())
            .ok_or_else(|| {
                let names: Vec<&str> = Task::ALL.iter().map(Task::name).collect();
                format!("unknown task '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// Metric – a derived figure that may be undefined
// ---------------------------------------------------------------------------

/// A computed ratio or percentage. Division by zero and a missing growth
/// baseline are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Infinity,
    NegInfinity,
    /// 0 / 0.
    Undefined,
    /// No prior value to compare against.
    NotApplicable,
}

impl Metric {
    /// Classify a raw float, rounding finite values to 2 decimals.
    pub fn from_f64(v: f64) -> Metric {
        if v.is_nan() {
            Metric::Undefined
        } else if v == f64::INFINITY {
            Metric::Infinity
        } else if v == f64::NEG_INFINITY {
            Metric::NegInfinity
        } else {
            Metric::Value(round2(v))
        }
    }

    pub fn ratio(numerator: f64, denominator: f64) -> Metric {
        Metric::from_f64(numerator / denominator)
    }

    /// Float form for numeric consumers; `None` only for `NotApplicable`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Infinity => Some(f64::INFINITY),
            Metric::NegInfinity => Some(f64::NEG_INFINITY),
            Metric::Undefined => Some(f64::NAN),
            Metric::NotApplicable => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.2}"),
            Metric::Infinity => f.write_str("inf"),
            Metric::NegInfinity => f.write_str("-inf"),
            Metric::Undefined => f.write_str("NaN"),
            Metric::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Finite values serialize as numbers, markers as their display text.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            other => serializer.collect_str(other),
        }
    }
}

/// Round half to even at 2 decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Result of one query. Owns its rows; nothing borrows from the view.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Raw(Vec<DerivedRecord>),
    Totals(Vec<YearTotal>),
    Ratio(Vec<GenderRatio>),
    Growth(GrowthTable),
}

impl QueryOutput {
    pub fn task(&self) -> Task {
        match self {
            QueryOutput::Raw(_) => Task::RawData,
            QueryOutput::Totals(_) => Task::TotalPopulation,
            QueryOutput::Ratio(_) => Task::GenderRatio,
            QueryOutput::Growth(_) => Task::PopulationGrowth,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Raw(rows) => rows.len(),
            QueryOutput::Totals(rows) => rows.len(),
            QueryOutput::Ratio(rows) => rows.len(),
            QueryOutput::Growth(table) => table.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn run_query(task: Task, view: &FilteredView<'_>) -> QueryOutput {
    let output = match task {
        Task::RawData => QueryOutput::Raw(raw_view(view)),
        Task::TotalPopulation => QueryOutput::Totals(total_population(view)),
        Task::GenderRatio => QueryOutput::Ratio(gender_ratio(view)),
        Task::PopulationGrowth => QueryOutput::Growth(population_growth(view)),
    };
    log::debug!("{}: {} input rows -> {} output rows", task.name(), view.len(), output.len());
    output
}
