use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use super::model::{DerivedRecord, DerivedTable, PopulationDataset};

// ---------------------------------------------------------------------------
// Selection: which rows the caller wants to see
// ---------------------------------------------------------------------------

/// Category predicate. `All` bypasses the predicate entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, row: &DerivedRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => row.category.as_deref() == Some(wanted.as_str()),
        }
    }
}

/// `"all"` in any case is the sentinel; anything else is an exact category.
impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "All"),
            CategoryFilter::Only(cat) => write!(f, "{cat:?}"),
        }
    }
}

/// Both filter predicates, passed explicitly to [`apply_filters`].
///
/// An empty `year_groups` set selects nothing; it is not "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub category: CategoryFilter,
    pub year_groups: BTreeSet<i64>,
}

impl Selection {
    pub fn new(category: CategoryFilter, year_groups: impl IntoIterator<Item = i64>) -> Self {
        Selection {
            category,
            year_groups: year_groups.into_iter().collect(),
        }
    }

    pub fn matches(&self, row: &DerivedRecord) -> bool {
        self.year_groups.contains(&row.year_group) && self.category.matches(row)
    }
}

/// A [`Selection`] that lets every row of `dataset` through.
pub fn init_selection(dataset: &PopulationDataset) -> Selection {
    Selection {
        category: CategoryFilter::All,
        year_groups: dataset.year_groups.clone(),
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// Rows of a derived table that passed a [`Selection`], in table order.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    rows: Vec<&'a DerivedRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn from_rows(rows: Vec<&'a DerivedRecord>) -> Self {
        FilteredView { rows }
    }

    pub fn rows(&self) -> &[&'a DerivedRecord] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a DerivedRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep the rows satisfying both the category and the year-group predicate.
pub fn apply_filters<'a>(table: &'a DerivedTable, selection: &Selection) -> FilteredView<'a> {
    let rows: Vec<&DerivedRecord> = table.iter().filter(|row| selection.matches(row)).collect();
    log::debug!(
        "filter category={} year_groups={:?}: {} of {} rows",
        selection.category,
        selection.year_groups,
        rows.len(),
        table.len()
    );
    FilteredView::from_rows(rows)
}
