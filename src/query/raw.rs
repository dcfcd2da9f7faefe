use crate::data::filter::FilteredView;
use crate::data::model::DerivedRecord;

/// The filtered rows themselves, copied out of the view.
pub fn raw_view(view: &FilteredView<'_>) -> Vec<DerivedRecord> {
    view.iter().cloned().collect()
}
