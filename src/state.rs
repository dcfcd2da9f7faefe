use crate::data::filter::{apply_filters, init_selection, CategoryFilter, FilteredView, Selection};
use crate::data::model::PopulationDataset;
use crate::query::{run_query, QueryOutput, Task};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One user's choices over a shared, immutable dataset.
///
/// Sessions never mutate the dataset; several sessions may hold clones of
/// the same [`PopulationDataset`] and filter it independently.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: PopulationDataset,
    /// Which query to run.
    pub task: Task,
    /// Category and year-group filters.
    pub selection: Selection,
}

impl Session {
    /// Start with the raw view and every row selected.
    pub fn new(dataset: PopulationDataset) -> Self {
        Session {
            selection: init_selection(&dataset),
            task: Task::default(),
            dataset,
        }
    }

    pub fn dataset(&self) -> &PopulationDataset {
        &self.dataset
    }

    /// Swap in a newly loaded dataset. Filters reset unless it is the same
    /// base table.
    pub fn set_dataset(&mut self, dataset: PopulationDataset) {
        if !self.dataset.same_base(&dataset) {
            self.selection = init_selection(&dataset);
        }
        self.dataset = dataset;
    }

    pub fn set_task(&mut self, task: Task) {
        self.task = task;
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        if let CategoryFilter::Only(cat) = &category {
            if !self.dataset.categories.contains(cat) {
                log::warn!("category {cat:?} does not occur in the dataset");
            }
        }
        self.selection.category = category;
    }

    /// Toggle a single year group in the filter.
    pub fn toggle_year_group(&mut self, year_group: i64) {
        if !self.selection.year_groups.remove(&year_group) {
            self.selection.year_groups.insert(year_group);
        }
    }

    /// Select every year group present in the dataset.
    pub fn select_all_year_groups(&mut self) {
        self.selection.year_groups = self.dataset.year_groups.clone();
    }

    /// Deselect all year groups; every query then sees an empty view.
    pub fn select_no_year_groups(&mut self) {
        self.selection.year_groups.clear();
    }

    /// Rows passing the current filters.
    pub fn view(&self) -> FilteredView<'_> {
        apply_filters(self.dataset.derived(), &self.selection)
    }

    /// Run the selected task against the current filters.
    pub fn run(&self) -> QueryOutput {
        run_query(self.task, &self.view())
    }
}
