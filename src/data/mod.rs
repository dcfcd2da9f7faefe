/// Data layer: core types, loading, derivation and filtering.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<Record>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  Year_Group, Category (once per load)
///   └──────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ PopulationDataset │  base records, derived table, filter values
///   └───────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  category + year-group predicates → FilteredView
///   └──────────┘
/// ```

pub mod derive;
pub mod filter;
pub mod loader;
pub mod model;
