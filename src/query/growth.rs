use serde::Serialize;

use super::Metric;
use crate::data::filter::FilteredView;
use crate::data::model::Count;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthRow {
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Count")]
    pub count: Count,
    #[serde(rename = "Population_Growth_%")]
    pub growth: Metric,
}

/// Year-over-year growth of the `Total Residents` rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrowthTable {
    pub rows: Vec<GrowthRow>,
}

impl GrowthTable {
    /// Equal-length `(years, growth)` sequences for charting.
    pub fn series(&self) -> (Vec<i64>, Vec<Metric>) {
        self.rows.iter().map(|r| (r.year, r.growth)).unzip()
    }
}

/// Percentage change between consecutive `Total Residents` rows.
///
/// Rows are sorted by year first (stable, so equal years keep input order).
/// The earliest row has no baseline and carries [`Metric::NotApplicable`].
pub fn population_growth(view: &FilteredView<'_>) -> GrowthTable {
    let mut totals: Vec<(i64, Count)> = view
        .iter()
        .filter(|r| r.is_total())
        .map(|r| (r.year, r.count))
        .collect();
    totals.sort_by_key(|&(year, _)| year);

    let rows = totals
        .iter()
        .enumerate()
        .map(|(i, &(year, count))| {
            let growth = match i.checked_sub(1).map(|p| totals[p].1) {
                None => Metric::NotApplicable,
                Some(prev) => {
                    let prev = prev.as_f64();
                    Metric::from_f64((count.as_f64() - prev) / prev * 100.0)
                }
            };
            GrowthRow {
                year,
                count,
                growth,
            }
        })
        .collect();

    GrowthTable { rows }
}
