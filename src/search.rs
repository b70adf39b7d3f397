use tracing::trace;

use crate::domain::TableError;
use crate::projection::RowProjection;
use crate::store::DataStore;

/// Wrap-around text search over the visible rows.
///
/// Indices here are 0-based offsets into the projection, the caller adds
/// the header offset when it turns a hit into a selection.
#[derive(Debug, Default, Clone)]
pub struct SearchCursor {
    last: String,
    anchor: usize,
    failed: bool,
}

impl SearchCursor {
    /// Scans the visible rows starting at `start` (inclusive, taken modulo
    /// the row count) and wrapping around once. Returns the index of the
    /// first row with a cell containing `text`, ignoring case.
    pub fn find(
        store: &DataStore,
        projection: &RowProjection,
        start: usize,
        text: &str,
    ) -> Result<Option<usize>, TableError> {
        let rows = projection.rows();
        if rows.is_empty() {
            return Err(TableError::EmptyProjection);
        }
        let needle = text.to_lowercase();
        let hit = (0..rows.len())
            .map(|i| (start + i) % rows.len())
            .find(|&idx| store.row_contains(rows[idx], &needle));
        trace!("Search {:?} from {} -> {:?}", text, start, hit);
        Ok(hit)
    }

    /// Remembers where an interactive search started; every edit of the
    /// prompt searches again from here.
    pub fn begin(&mut self, anchor: usize) {
        self.anchor = anchor;
        self.failed = false;
    }

    /// Searches from the anchor set by [`SearchCursor::begin`].
    pub fn live(
        &mut self,
        store: &DataStore,
        projection: &RowProjection,
        text: &str,
    ) -> Option<usize> {
        let hit = Self::find(store, projection, self.anchor, text).ok().flatten();
        self.failed = hit.is_none();
        hit
    }

    /// Searches for the committed text, starting at `start`.
    pub fn next(
        &mut self,
        store: &DataStore,
        projection: &RowProjection,
        start: usize,
    ) -> Option<usize> {
        let hit = Self::find(store, projection, start, &self.last).ok().flatten();
        self.failed = hit.is_none();
        hit
    }

    pub fn commit(&mut self, text: &str) {
        self.last = text.to_string();
    }

    pub fn last(&self) -> &str {
        &self.last
    }

    /// True if the latest search found nothing.
    pub fn failed(&self) -> bool {
        self.failed
    }
}
