use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
};
use tracing::trace;

use crate::domain::{Alignment, ViewConfig};

pub const LEGEND_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;

/// One cell pushed to the renderer. Row 0 of the grid is the header.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub content: String,
    pub expansion: u16,
    pub alignment: Alignment,
}

/// The line under the legend.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum StatusLine {
    #[default]
    Empty,
    Text(String),
    Prompt {
        label: &'static str,
        text: String,
        cursor: usize,
        failed: bool,
    },
}

/// What the view needs from a terminal toolkit.
pub trait Renderer {
    fn set_cell(&mut self, row: usize, column: usize, cell: GridCell);
    /// Drops every cell at or beyond `rows` / `columns`.
    fn truncate(&mut self, rows: usize, columns: usize);
    fn select(&mut self, row: usize, column: usize);
    /// (row, column) of the first data row and column shown.
    fn offset(&self) -> (usize, usize);
    fn set_offset(&mut self, row: usize, column: usize);
    /// (width, height) available for data rows, header excluded.
    fn viewport(&self) -> (usize, usize);
    /// How many columns fitted from the column offset on at the last draw,
    /// 0 before the first one.
    fn columns_in_view(&self) -> usize;
    /// Column mode highlights the selected column instead of the row.
    fn set_column_mode(&mut self, on: bool);
    fn set_legend(&mut self, legend: &str);
    fn set_status(&mut self, status: StatusLine);
    fn request_redraw(&mut self);
}

/// [`Renderer`] backed by a ratatui [`Table`].
#[derive(Debug)]
pub struct GridRenderer {
    cells: Vec<Vec<GridCell>>,
    selected: (usize, usize),
    row_offset: usize,
    column_offset: usize,
    viewport: (usize, usize),
    columns_in_view: usize,
    column_mode: bool,
    legend: String,
    status: StatusLine,
    dirty: bool,
    max_column_width: usize,
    column_spacing: u16,
}

impl GridRenderer {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            cells: Vec::new(),
            selected: (1, 0),
            row_offset: 0,
            column_offset: 0,
            viewport: (0, 0),
            columns_in_view: 0,
            column_mode: false,
            legend: String::new(),
            status: StatusLine::Empty,
            dirty: true,
            max_column_width: config.max_column_width,
            column_spacing: config.column_spacing,
        }
    }

    /// Pretends a terminal of the given size, for use before the first draw.
    pub fn with_viewport(mut self, width: usize, height: usize) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn cell_text(&self, row: usize, column: usize) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .map(|c| c.content.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn selected(&self) -> (usize, usize) {
        self.selected
    }

    pub fn legend(&self) -> &str {
        &self.legend
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn ncols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    // Keeps the selected data row inside the viewport.
    fn follow_selection(&mut self) {
        let height = self.viewport.1.max(1);
        let sel = self.selected.0.saturating_sub(1);
        if sel < self.row_offset {
            self.row_offset = sel;
        } else if sel >= self.row_offset + height {
            self.row_offset = sel + 1 - height;
        }
        let max_offset = self.cells.len().saturating_sub(1).saturating_sub(height);
        self.row_offset = self.row_offset.min(max_offset);
    }

    fn column_width(&self, column: usize) -> Constraint {
        let expansion = self.cells[0][column].expansion;
        if expansion > 0 {
            return Constraint::Fill(expansion);
        }
        let widest = self
            .cells
            .iter()
            .filter_map(|r| r.get(column))
            .map(|c| c.content.chars().count())
            .max()
            .unwrap_or(0);
        Constraint::Length(u16::try_from(widest.min(self.max_column_width)).unwrap_or(u16::MAX))
    }

    // Counts columns left to right until the width runs out. Fill columns
    // need at least one cell. Always at least one.
    fn columns_that_fit(&self, widths: &[Constraint], width: u16) -> usize {
        let mut used: u16 = 0;
        let mut fit = 0;
        for constraint in widths {
            let need = match *constraint {
                Constraint::Length(n) => n,
                _ => 1,
            };
            let need = if fit == 0 {
                need
            } else {
                need.saturating_add(self.column_spacing)
            };
            if used.saturating_add(need) > width {
                break;
            }
            used += need;
            fit += 1;
        }
        fit.max(1)
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(TABLE_HEADER_HEIGHT) as usize;
        self.viewport = (area.width as usize, height);
        self.follow_selection();

        let ncols = self.ncols();
        let first_col = self.column_offset.min(ncols.saturating_sub(1));
        let columns = first_col..ncols;

        let widths: Vec<Constraint> = columns.clone().map(|c| self.column_width(c)).collect();
        self.columns_in_view = self.columns_that_fit(&widths, area.width);

        let header = match self.cells.first() {
            Some(names) => Row::new(
                names[columns.clone()]
                    .iter()
                    .map(|c| Cell::from(c.content.clone()).yellow()),
            )
            .style(Style::default().bg(Color::Blue)),
            None => Row::default(),
        };

        let end = (self.row_offset + 1 + height).min(self.cells.len());
        let begin = (self.row_offset + 1).min(end);
        let rows = self.cells[begin..end].iter().map(|r| {
            Row::new(columns.clone().map(|c| match r.get(c) {
                Some(cell) => Cell::from(
                    Line::from(cell.content.as_str()).alignment(cell.alignment.into()),
                ),
                None => Cell::default(),
            }))
        });


        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(self.column_spacing);
        let highlight = Style::default().add_modifier(Modifier::REVERSED);
        let (table, mut state) = if self.column_mode {
            let state = TableState::default()
                .with_selected_column(self.selected.1.checked_sub(first_col));
            (table.column_highlight_style(highlight), state)
        } else {
            let local = self
                .selected
                .0
                .checked_sub(1 + self.row_offset)
                .filter(|_| begin < end);
            (
                table.row_highlight_style(highlight),
                TableState::default().with_selected(local),
            )
        };
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.status {
            StatusLine::Empty => Line::default(),
            StatusLine::Text(text) => Line::from(text.as_str()),
            StatusLine::Prompt {
                label,
                text,
                failed,
                ..
            } => {
                let fg = if *failed { Color::Red } else { Color::White };
                Line::from(vec![
                    Span::raw(*label),
                    Span::styled(text.as_str(), Style::default().fg(fg).bg(Color::Black)),
                ])
            }
        };
        frame.render_widget(Paragraph::new(line), area);
        if let StatusLine::Prompt { label, cursor, .. } = &self.status {
            let x = area.x + (label.chars().count() + cursor) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        }
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let [table_area, legend_area, status_area] = Layout::vertical([
            Constraint::Min(TABLE_HEADER_HEIGHT),
            Constraint::Length(LEGEND_HEIGHT),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        self.render_table(frame, table_area);
        frame.render_widget(
            Paragraph::new(self.legend.as_str()).yellow().on_blue(),
            legend_area,
        );
        self.render_status(frame, status_area);
        self.dirty = false;
    }
}

impl Renderer for GridRenderer {
    fn set_cell(&mut self, row: usize, column: usize, cell: GridCell) {
        if row >= self.cells.len() {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if column >= cells.len() {
            cells.resize_with(column + 1, GridCell::default);
        }
        cells[column] = cell;
    }

    fn truncate(&mut self, rows: usize, columns: usize) {
        self.cells.truncate(rows);
        for row in self.cells.iter_mut() {
            row.truncate(columns);
        }
    }

    fn select(&mut self, row: usize, column: usize) {
        self.selected = (row, column);
        self.follow_selection();
    }

    fn offset(&self) -> (usize, usize) {
        (self.row_offset, self.column_offset)
    }

    fn set_offset(&mut self, row: usize, column: usize) {
        self.row_offset = row;
        self.column_offset = column;
    }

    fn viewport(&self) -> (usize, usize) {
        self.viewport
    }

    fn columns_in_view(&self) -> usize {
        self.columns_in_view
    }

    fn set_column_mode(&mut self, on: bool) {
        self.column_mode = on;
    }

    fn set_legend(&mut self, legend: &str) {
        if self.legend != legend {
            self.legend = legend.to_string();
        }
    }

    fn set_status(&mut self, status: StatusLine) {
        self.status = status;
    }

    fn request_redraw(&mut self) {
        trace!("Redraw requested ({} grid rows)", self.cells.len());
        self.dirty = true;
    }
}
