use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::derive::derive_table;

/// Label of the canonical whole-population row for a year.
pub const TOTAL_RESIDENTS: &str = "Total Residents";

// ---------------------------------------------------------------------------
// Count – a population figure
// ---------------------------------------------------------------------------

/// A population count as read from the source, keeping track of whether it
/// was integral so that sums of integer columns stay integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Integer(i64),
    Float(f64),
}

impl Count {
    pub fn as_f64(&self) -> f64 {
        match self {
            Count::Integer(i) => *i as f64,
            Count::Float(v) => *v,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Count::Integer(_))
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::Integer(0)
    }
}

impl Add for Count {
    type Output = Count;

    fn add(self, rhs: Count) -> Count {
        match (self, rhs) {
            (Count::Integer(a), Count::Integer(b)) => match a.checked_add(b) {
                Some(sum) => Count::Integer(sum),
                None => Count::Float(a as f64 + b as f64),
            },
            (a, b) => Count::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl Sum for Count {
    fn sum<I: Iterator<Item = Count>>(iter: I) -> Count {
        iter.fold(Count::default(), Add::add)
    }
}

impl<'a> Sum<&'a Count> for Count {
    fn sum<I: Iterator<Item = &'a Count>>(iter: I) -> Count {
        iter.copied().sum()
    }
}

impl From<i64> for Count {
    fn from(v: i64) -> Self {
        Count::Integer(v)
    }
}

impl From<f64> for Count {
    fn from(v: f64) -> Self {
        Count::Float(v)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Integer(i) => write!(f, "{i}"),
            Count::Float(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// One row of the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Residents")]
    pub residents: Option<String>,
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Count")]
    pub count: Count,
}

impl Record {
    pub fn new(residents: impl Into<String>, year: i64, count: impl Into<Count>) -> Self {
        Record {
            residents: Some(residents.into()),
            year,
            count: count.into(),
        }
    }

    pub fn is_total(&self) -> bool {
        self.residents.as_deref() == Some(TOTAL_RESIDENTS)
    }
}

// ---------------------------------------------------------------------------
// DerivedRecord / DerivedTable – source rows plus derived columns
// ---------------------------------------------------------------------------

/// A source row extended with its `Year_Group` and `Category`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    #[serde(rename = "Residents")]
    pub residents: Option<String>,
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Count")]
    pub count: Count,
    #[serde(rename = "Year_Group")]
    pub year_group: i64,
    #[serde(rename = "Category")]
    pub category: Option<String>,
}

impl DerivedRecord {
    pub fn is_total(&self) -> bool {
        self.residents.as_deref() == Some(TOTAL_RESIDENTS)
    }
}

impl From<&DerivedRecord> for Record {
    fn from(row: &DerivedRecord) -> Self {
        Record {
            residents: row.residents.clone(),
            year: row.year,
            count: row.count,
        }
    }
}

/// The derived table, row-aligned with the source records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTable {
    pub rows: Vec<DerivedRecord>,
}

impl DerivedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DerivedRecord> {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// PopulationDataset – the loaded, immutable dataset
// ---------------------------------------------------------------------------

/// The loaded dataset: immutable base records, the derived table computed
/// once from them, and the distinct filter values.
///
/// Cloning is cheap and shares the underlying tables, so independent
/// sessions can read the same dataset without locking.
#[derive(Debug, Clone)]
pub struct PopulationDataset {
    records: Arc<[Record]>,
    derived: Arc<DerivedTable>,
    /// Sorted distinct `Category` values (null categories excluded).
    pub categories: BTreeSet<String>,
    /// Sorted distinct `Year_Group` values.
    pub year_groups: BTreeSet<i64>,
}

impl PopulationDataset {
    /// Build the dataset and run the derivation stage once.
    pub fn from_records(records: Vec<Record>) -> Self {
        let records: Arc<[Record]> = records.into();
        let derived = derive_table(&records);

        let mut categories = BTreeSet::new();
        let mut year_groups = BTreeSet::new();
        for row in derived.iter() {
            if let Some(cat) = &row.category {
                categories.insert(cat.clone());
            }
            year_groups.insert(row.year_group);
        }

        PopulationDataset {
            records,
            derived: Arc::new(derived),
            categories,
            year_groups,
        }
    }

    /// The source records, in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The derived table shared by every query on this dataset.
    pub fn derived(&self) -> &DerivedTable {
        &self.derived
    }

    /// Whether two handles refer to the same loaded base table.
    pub fn same_base(&self, other: &PopulationDataset) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
