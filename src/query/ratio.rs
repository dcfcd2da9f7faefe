use std::collections::BTreeMap;

use serde::Serialize;

use super::Metric;
use crate::data::derive::{contains_token, strip_token, FEMALE_TOKEN, MALE_TOKEN};
use crate::data::filter::FilteredView;
use crate::data::model::Count;

/// Male and female totals for one `(Category, Year_Group)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderRatio {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Year_Group")]
    pub year_group: i64,
    #[serde(rename = "Male")]
    pub male: Count,
    #[serde(rename = "Female")]
    pub female: Count,
    #[serde(rename = "Female_to_Male_Ratio")]
    pub female_to_male: Metric,
}

type GroupKey = (String, i64);

/// Female-to-male ratio per category and 3-year group.
///
/// Each side selects rows whose label contains its token (case-insensitive)
/// and keys them by the label with that token removed. Every "Female" label
/// also contains "male", so on the male side it keys as e.g. "Singaporean Fe"
/// and falls out of the inner join instead of inflating the male total.
/// Keys present on only one side produce no row.
pub fn gender_ratio(view: &FilteredView<'_>) -> Vec<GenderRatio> {
    let male = sum_by_group(view, MALE_TOKEN);
    let female = sum_by_group(view, FEMALE_TOKEN);

    let rows: Vec<GenderRatio> = male
        .into_iter()
        .filter_map(|(key, male)| {
            let female = *female.get(&key)?;
            let (category, year_group) = key;
            Some(GenderRatio {
                female_to_male: Metric::ratio(female.as_f64(), male.as_f64()),
                category,
                year_group,
                male,
                female,
            })
        })
        .collect();

    for row in rows.iter().filter(|r| !r.female_to_male.is_finite()) {
        log::warn!(
            "ratio for {:?} / {} is {} (male count {})",
            row.category,
            row.year_group,
            row.female_to_male,
            row.male
        );
    }
    rows
}

fn sum_by_group(view: &FilteredView<'_>, token: &str) -> BTreeMap<GroupKey, Count> {
    let mut groups: BTreeMap<GroupKey, Count> = BTreeMap::new();
    for row in view.iter() {
        let Some(label) = row.residents.as_deref() else {
            continue;
        };
        if !contains_token(label, token) {
            continue;
        }
        let sum = groups
            .entry((strip_token(label, token), row.year_group))
            .or_default();
        *sum = *sum + row.count;
    }
    groups
}
