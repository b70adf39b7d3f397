use std::ops::Range;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::domain::TableError;
use crate::store::DataStore;

/// Which rows are visible and in which order.
///
/// Positions handed out to the rest of the crate are 1-based because row 0 of
/// the rendered grid is the header. `original_index` is the only place that
/// translates a position back to a row of the [`DataStore`].
#[derive(Debug, Default, Clone)]
pub struct RowProjection {
    rows: Vec<usize>,
    filter: String,
    needle: String,
    sorted_by: Option<usize>,
    // rows hold exactly the filter result, in creation order, for the current data
    exact: bool,
}

impl RowProjection {
    pub fn identity(nrows: usize) -> Self {
        Self {
            rows: (0..nrows).collect(),
            ..Self::default()
        }
    }

    /// Drops filter and sort and shows every row in creation order.
    pub fn reset(&mut self, nrows: usize) {
        *self = Self::identity(nrows);
    }

    /// Recomputes the visible rows in ascending original order. An empty text
    /// shows every row. Any previous sort is discarded.
    pub fn apply_filter(&mut self, store: &DataStore, text: &str) {
        let start_time = Instant::now();
        let needle = text.to_lowercase();

        // A longer needle can only narrow the match set, so an unsorted
        // projection only needs its current rows re-tested.
        let narrowing =
            self.exact && !self.needle.is_empty() && needle.starts_with(&self.needle);

        self.rows = if needle.is_empty() {
            (0..store.row_count()).collect()
        } else if narrowing {
            self.rows
                .par_iter()
                .copied()
                .filter(|&r| store.row_contains(r, &needle))
                .collect()
        } else {
            (0..store.row_count())
                .into_par_iter()
                .filter(|&r| store.row_contains(r, &needle))
                .collect()
        };

        self.filter = text.to_string();
        self.needle = needle;
        self.sorted_by = None;
        self.exact = true;
        debug!(
            "Filter {:?} kept {}/{} rows in {}us (narrowing: {})",
            self.filter,
            self.rows.len(),
            store.row_count(),
            start_time.elapsed().as_micros(),
            narrowing
        );
    }

    /// Stable ascending sort of the visible rows by the cell at `column`
    /// (an original column index).
    pub fn sort_by(&mut self, store: &DataStore, column: usize) {
        self.rows
            .sort_by(|&a, &b| store.cell(a, column).cmp(store.cell(b, column)));
        self.sorted_by = Some(column);
        self.exact = false;
        trace!("Sorted {} rows by column {}", self.rows.len(), column);
    }

    /// Appends rows created in the store as visible, in identity order.
    pub fn extend(&mut self, created: Range<usize>) {
        if !created.is_empty() {
            trace!("Projection extended by rows {:?}", created);
            self.rows.extend(created);
            self.exact = false;
        }
    }

    /// Marks the rows as possibly stale after cells changed underneath.
    pub fn invalidate(&mut self) {
        self.exact = false;
    }

    /// Original row index shown at the 1-based `position`.
    pub fn original_index(&self, position: usize) -> Result<usize, TableError> {
        if self.rows.is_empty() {
            return Err(TableError::EmptyProjection);
        }
        position
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx).copied())
            .ok_or_else(|| TableError::row(position, self.rows.len()))
    }

    /// 1-based position at which the original row `row` is shown.
    pub fn position_of(&self, row: usize) -> Option<usize> {
        self.rows.iter().position(|&r| r == row).map(|idx| idx + 1)
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn sorted_by(&self) -> Option<usize> {
        self.sorted_by
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> DataStore {
        let mut store = DataStore::new();
        store.set_columns(vec!["Name".into(), "Age".into()]);
        store.set_rows(vec![
            vec!["Alice".into(), "30".into()],
            vec!["Bob".into(), "25".into()],
            vec!["Carol".into(), "25".into()],
        ]);
        store
    }

    #[test]
    fn filter_keeps_matching_rows_in_order() {
        let store = people();
        let mut proj = RowProjection::identity(store.row_count());
        proj.apply_filter(&store, "25");
        assert_eq!(proj.rows(), &[1, 2]);
        proj.apply_filter(&store, "A");
        assert_eq!(proj.rows(), &[0, 2]);
    }

    #[test]
    fn empty_filter_restores_identity() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        for text in ["bo", "zzz", "L", "30"] {
            proj.apply_filter(&store, text);
            proj.apply_filter(&store, "");
            assert_eq!(proj.rows(), &[0, 1, 2]);
        }
    }

    #[test]
    fn narrowing_matches_full_recompute() {
        let store = people();
        let mut live = RowProjection::identity(3);
        let mut fresh = RowProjection::identity(3);
        for text in ["a", "ar", "aro", "arol"] {
            live.apply_filter(&store, text);
            fresh.reset(3);
            fresh.apply_filter(&store, text);
            assert_eq!(live.rows(), fresh.rows(), "text {text:?}");
        }
        assert_eq!(live.rows(), &[2]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        proj.apply_filter(&store, "25");
        proj.sort_by(&store, 1);
        assert_eq!(proj.rows(), &[1, 2]);

        proj.apply_filter(&store, "");
        proj.sort_by(&store, 1);
        assert_eq!(proj.rows(), &[1, 2, 0]);
    }

    #[test]
    fn sort_produces_non_decreasing_keys() {
        let mut store = DataStore::new();
        store.set_columns(vec!["k".into()]);
        let keys = ["m", "b", "z", "b", "a", "m"];
        store.set_rows(keys.iter().map(|k| vec![k.to_string()]).collect());
        let mut proj = RowProjection::identity(keys.len());
        proj.sort_by(&store, 0);
        let sorted: Vec<&str> = proj.rows().iter().map(|&r| store.cell(r, 0)).collect();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(proj.rows(), &[4, 1, 3, 0, 5, 2]);
    }

    #[test]
    fn filter_discards_sort() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        proj.sort_by(&store, 1);
        assert_eq!(proj.sorted_by(), Some(1));
        proj.apply_filter(&store, "");
        assert_eq!(proj.sorted_by(), None);
        assert_eq!(proj.rows(), &[0, 1, 2]);
    }

    #[test]
    fn narrowing_after_sort_goes_back_to_creation_order() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        proj.apply_filter(&store, "o");
        proj.sort_by(&store, 1);
        assert_eq!(proj.rows(), &[1, 2]);
        proj.apply_filter(&store, "ol");
        assert_eq!(proj.rows(), &[2]);
    }

    #[test]
    fn stale_rows_are_fully_recomputed() {
        let mut store = people();
        let mut proj = RowProjection::identity(3);
        proj.apply_filter(&store, "b");
        assert_eq!(proj.rows(), &[1]);
        store.set_cell(0, 0, "Albert").unwrap();
        proj.invalidate();
        proj.apply_filter(&store, "be");
        assert_eq!(proj.rows(), &[0]);
    }

    #[test]
    fn position_translation() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        proj.apply_filter(&store, "25");
        assert_eq!(proj.original_index(1).unwrap(), 1);
        assert_eq!(proj.original_index(2).unwrap(), 2);
        assert!(matches!(
            proj.original_index(0),
            Err(TableError::OutOfRange { .. })
        ));
        assert!(matches!(
            proj.original_index(3),
            Err(TableError::OutOfRange { .. })
        ));
        assert_eq!(proj.position_of(2), Some(2));
        assert_eq!(proj.position_of(0), None);
    }

    #[test]
    fn empty_projection_is_reported() {
        let store = people();
        let mut proj = RowProjection::identity(3);
        proj.apply_filter(&store, "nobody");
        assert!(proj.is_empty());
        assert!(matches!(
            proj.original_index(1),
            Err(TableError::EmptyProjection)
        ));
    }

    #[test]
    fn extend_appends_identity_rows() {
        let mut proj = RowProjection::identity(2);
        proj.extend(2..5);
        proj.extend(5..5);
        assert_eq!(proj.rows(), &[0, 1, 2, 3, 4]);
    }
}
