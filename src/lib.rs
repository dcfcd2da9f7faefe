//! Population statistics over a residents-by-year table.
//!
//! The pipeline is `loader → derive → filter → query`, with `render` as a
//! text/Arrow presenter for the results and `state::Session` holding one
//! user's selections.

pub mod data;
pub mod error;
pub mod query;
pub mod render;
pub mod state;

pub use data::filter::{apply_filters, CategoryFilter, FilteredView, Selection};
pub use data::loader::{load_file, LoadOptions};
pub use data::model::{Count, PopulationDataset, Record};
pub use error::DataError;
pub use query::{run_query, Metric, QueryOutput, Task};
pub use state::Session;
