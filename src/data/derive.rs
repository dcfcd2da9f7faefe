use super::model::{DerivedRecord, DerivedTable, Record};

pub const MALE_TOKEN: &str = "Male";
pub const FEMALE_TOKEN: &str = "Female";

// ---------------------------------------------------------------------------
// Derived columns
// ---------------------------------------------------------------------------

/// 3-year bucket anchored at multiples of 3: `floor(year / 3) * 3`.
///
/// Saturates below `i64::MIN + 2`; the loader rejects such years.
pub fn year_group(year: i64) -> i64 {
    year.div_euclid(3).saturating_mul(3)
}

/// Case-insensitive substring test.
pub fn contains_token(text: &str, token: &str) -> bool {
    find_token(text, token, 0).is_some()
}

/// Remove every non-overlapping, case-insensitive occurrence of `token`,
/// scanning left to right.
pub fn strip_token(text: &str, token: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(start) = find_token(text, token, pos) {
        out.push_str(&text[pos..start]);
        pos = start + token.len();
    }
    out.push_str(&text[pos..]);
    out
}

/// `residents` with the gender tokens removed.
///
/// "Female" goes first, otherwise stripping "Male" would leave "Fe" behind.
/// Removal repeats until nothing changes, so the result never contains
/// either token and `category(category(x)) == category(x)`.
pub fn category(residents: &str) -> String {
    let mut current = residents.to_string();
    loop {
        let next = strip_token(&strip_token(&current, FEMALE_TOKEN), MALE_TOKEN);
        if next == current {
            return current;
        }
        current = next;
    }
}

// Tokens are ASCII, so a byte-level match always starts and ends on a char
// boundary.
fn find_token(text: &str, token: &str, from: usize) -> Option<usize> {
    let haystack = text.as_bytes();
    let needle = token.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

// ---------------------------------------------------------------------------
// Derivation stage
// ---------------------------------------------------------------------------

pub fn derive_record(record: &Record) -> DerivedRecord {
    DerivedRecord {
        residents: record.residents.clone(),
        year: record.year,
        count: record.count,
        year_group: year_group(record.year),
        category: record.residents.as_deref().map(category),
    }
}

/// Extend every record with `Year_Group` and `Category`, preserving order.
pub fn derive_table(records: &[Record]) -> DerivedTable {
    let rows: Vec<DerivedRecord> = records.iter().map(derive_record).collect();
    log::debug!("derived {} rows", rows.len());
    DerivedTable { rows }
}
