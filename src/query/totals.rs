use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::Count;

/// Summed `Total Residents` count for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearTotal {
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Count")]
    pub count: Count,
}

/// Sum `Total Residents` counts per year, ascending by year.
pub fn total_population(view: &FilteredView<'_>) -> Vec<YearTotal> {
    let mut by_year: BTreeMap<i64, Count> = BTreeMap::new();
    for row in view.iter().filter(|r| r.is_total()) {
        let sum = by_year.entry(row.year).or_default();
        *sum = *sum + row.count;
    }
    by_year
        .into_iter()
        .map(|(year, count)| YearTotal { year, count })
        .collect()
}
