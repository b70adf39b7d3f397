use std::ops::Range;

use tracing::{debug, trace};

use crate::domain::{Alignment, TableError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub expansion: u16,
    pub alignment: Alignment,
}

impl Column {
    fn named(name: String) -> Self {
        Column {
            name,
            expansion: 0,
            alignment: Alignment::Left,
        }
    }
}

/// Authoritative cell storage. Rows keep their creation order forever,
/// cells are stored in original column order.
#[derive(Debug, Default)]
pub struct DataStore {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the column set. Columns that survive by index keep their
    /// expansion and alignment. Returns true if the column count changed.
    pub fn set_columns(&mut self, names: Vec<String>) -> bool {
        let previous = self.columns.len();
        let mut kept = std::mem::take(&mut self.columns).into_iter();
        self.columns = names
            .into_iter()
            .map(|name| match kept.next() {
                Some(column) => Column { name, ..column },
                None => Column::named(name),
            })
            .collect();
        debug!("Columns set: {} -> {}", previous, self.columns.len());
        previous != self.columns.len()
    }

    /// Replaces all rows. Returns true if the row count changed.
    pub fn set_rows(&mut self, rows: Vec<Vec<String>>) -> bool {
        let previous = self.rows.len();
        self.rows = rows;
        previous != self.rows.len()
    }

    /// Writes one cell, growing the row storage if needed.
    /// Returns the range of rows created by this write.
    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        content: impl Into<String>,
    ) -> Result<Range<usize>, TableError> {
        let ncols = self.columns.len();
        if column >= ncols {
            return Err(TableError::column(column, ncols));
        }

        let before = self.rows.len();
        if row >= before {
            self.rows.resize_with(row + 1, || vec![String::new(); ncols]);
            trace!("Grew rows {} -> {}", before, self.rows.len());
        }

        let cells = &mut self.rows[row];
        if column >= cells.len() {
            cells.resize(column + 1, String::new());
        }
        cells[column] = content.into();

        Ok(before..self.rows.len().max(before))
    }

    pub fn set_expansion(&mut self, column: usize, weight: u16) -> Result<(), TableError> {
        let ncols = self.columns.len();
        let col = self
            .columns
            .get_mut(column)
            .ok_or_else(|| TableError::column(column, ncols))?;
        col.expansion = weight;
        Ok(())
    }

    pub fn set_alignment(&mut self, column: usize, align: Alignment) -> Result<(), TableError> {
        let ncols = self.columns.len();
        let col = self
            .columns
            .get_mut(column)
            .ok_or_else(|| TableError::column(column, ncols))?;
        col.alignment = align;
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, column: usize) -> Option<&Column> {
        self.columns.get(column)
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Content of a cell. Cells never written (short rows) read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True if any cell of the row contains `needle`, ignoring case.
    /// `needle` must already be lowercase.
    pub(crate) fn row_contains(&self, row: usize, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.rows.get(row).is_some_and(|cells| {
            cells
                .iter()
                .take(self.columns.len())
                .any(|c| c.to_lowercase().contains(needle))
        })
    }
}
