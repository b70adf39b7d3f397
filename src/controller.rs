use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, trace};

use crate::columns::ColumnOrder;
use crate::commands::{CommandHandle, CommandRegistry, RowAction};
use crate::domain::{Alignment, COLUMN_LEGEND, Message, TableError, ViewId};
use crate::inputter::Inputter;
use crate::projection::RowProjection;
use crate::renderer::{GridCell, Renderer, StatusLine};
use crate::search::SearchCursor;
use crate::store::DataStore;

/// Called on every key in normal mode, before anything else.
/// Returning false swallows the key.
pub type KeyInterceptor = Box<dyn FnMut(KeyCode, Option<char>, Option<usize>) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ColumnMode,
    EditingFilter,
    EditingSearch,
    Stopped,
}

/// Cursor inside the projection. `row` is 1-based (row 0 is the header) and
/// is 0 only while no row is visible. `column` is a display position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub row: usize,
    pub column: usize,
}

/// What the host has to do after a key was handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub stop: bool,
    /// The terminal was handed out and must be repainted from scratch.
    pub repaint: bool,
    pub switch_to: Option<ViewId>,
}

/// Access given to command and selection callbacks while they run.
pub struct ActionContext<'a> {
    store: &'a mut DataStore,
    projection: &'a mut RowProjection,
    repaint: bool,
    switch_to: Option<ViewId>,
    status: Option<String>,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(store: &'a mut DataStore, projection: &'a mut RowProjection) -> Self {
        Self {
            store,
            projection,
            repaint: false,
            switch_to: None,
            status: None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.store.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.store.column_count()
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.store.row(row)
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.store.cell(row, column)
    }

    /// Same rules as [`ViewController::set_cell`].
    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        content: impl Into<String>,
    ) -> Result<(), TableError> {
        write_cell(self.store, self.projection, row, column, content)
    }

    /// Hands the terminal back to line mode while `f` runs.
    pub fn suspend<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, TableError> {
        self.repaint = true;
        crate::host::suspend(f)
    }

    /// Asks the host to activate another view once the callback returns.
    pub fn switch_to(&mut self, view: ViewId) {
        self.switch_to = Some(view);
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(text.into());
    }
}

fn write_cell(
    store: &mut DataStore,
    projection: &mut RowProjection,
    row: usize,
    column: usize,
    content: impl Into<String>,
) -> Result<(), TableError> {
    let created = store.set_cell(row, column, content)?;
    projection.extend(created);
    projection.invalidate();
    Ok(())
}

/// One interactive table: data, projection, commands and the key state machine.
pub struct ViewController {
    store: DataStore,
    columns: ColumnOrder,
    projection: RowProjection,
    search: SearchCursor,
    commands: CommandRegistry,
    input: Inputter,
    mode: Mode,
    selection: Selection,
    column_offset: usize,
    page_height: usize,
    columns_in_view: usize,
    status: StatusLine,
    debug_pending: bool,
    grid_dirty: bool,
    reset_offset: bool,
    on_select: Option<RowAction>,
    interceptor: Option<KeyInterceptor>,
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewController {
    pub fn new() -> Self {
        Self {
            store: DataStore::new(),
            columns: ColumnOrder::default(),
            projection: RowProjection::default(),
            search: SearchCursor::default(),
            commands: CommandRegistry::default(),
            input: Inputter::default(),
            mode: Mode::Normal,
            selection: Selection::default(),
            column_offset: 0,
            page_height: 1,
            columns_in_view: 0,
            status: StatusLine::Empty,
            debug_pending: false,
            grid_dirty: true,
            reset_offset: true,
            on_select: None,
            interceptor: None,
        }
    }

    // -------------------- Programmatic surface ---------------------- //

    /// Replaces columns and rows. A new column count resets the column
    /// order, a new row count drops the filter. Otherwise the current filter
    /// is applied to the new data.
    pub fn set_columns_and_rows(&mut self, columns: Vec<String>, rows: Vec<Vec<String>>) {
        if self.store.set_columns(columns) {
            self.columns.reset(self.store.column_count());
        }
        let filter = if self.store.set_rows(rows) {
            String::new()
        } else {
            self.projection.filter().to_string()
        };
        self.projection.reset(self.store.row_count());
        self.projection.apply_filter(&self.store, &filter);

        self.selection = Selection { row: 1, column: 0 };
        self.column_offset = 0;
        self.reset_offset = true;
        self.clamp_selection();
        self.grid_dirty = true;
        debug!(
            "Table set: {} columns, {} rows, {} visible",
            self.store.column_count(),
            self.store.row_count(),
            self.projection.len()
        );
    }

    /// Replaces only the column names, keeping the rows. A new column count
    /// changes which cells a filter looks at, so the filter is applied again.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        if self.store.set_columns(columns) {
            self.columns.reset(self.store.column_count());
            let filter = self.projection.filter().to_string();
            self.projection.invalidate();
            self.projection.apply_filter(&self.store, &filter);
            self.column_offset = 0;
            self.clamp_selection();
        }
        self.grid_dirty = true;
    }

    /// Writes a cell. Rows created by the write become visible.
    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        content: impl Into<String>,
    ) -> Result<(), TableError> {
        write_cell(&mut self.store, &mut self.projection, row, column, content)?;
        self.clamp_selection();
        self.grid_dirty = true;
        Ok(())
    }

    pub fn set_column_expansion(&mut self, column: usize, weight: u16) -> Result<(), TableError> {
        self.store.set_expansion(column, weight)?;
        self.grid_dirty = true;
        Ok(())
    }

    pub fn set_column_alignment(
        &mut self,
        column: usize,
        align: Alignment,
    ) -> Result<(), TableError> {
        self.store.set_alignment(column, align)?;
        self.grid_dirty = true;
        Ok(())
    }

    /// Binds `action` to `key`. The action receives the original index of
    /// the selected row.
    pub fn register_command<F>(
        &mut self,
        key: char,
        label: impl Into<String>,
        action: F,
    ) -> Result<CommandHandle, TableError>
    where
        F: FnMut(usize, &mut ActionContext<'_>) + 'static,
    {
        self.commands.register(key, label, action)
    }

    /// Runs `action` with the selected row when Enter is pressed.
    pub fn set_selection_callback<F>(&mut self, action: F)
    where
        F: FnMut(usize, &mut ActionContext<'_>) + 'static,
    {
        self.on_select = Some(Box::new(action));
    }

    pub fn set_key_interceptor<F>(&mut self, interceptor: F)
    where
        F: FnMut(KeyCode, Option<char>, Option<usize>) -> bool + 'static,
    {
        self.interceptor = Some(Box::new(interceptor));
    }

    /// Row grouping is reserved and always fails.
    pub fn join_rows(&mut self, _start: usize, _end: usize) -> Result<(), TableError> {
        Err(TableError::NotImplemented("row grouping"))
    }

    /// Shows only rows containing `text`, in creation order.
    pub fn apply_filter(&mut self, text: &str) {
        self.projection.apply_filter(&self.store, text);
        self.clamp_selection();
        self.grid_dirty = true;
    }

    /// Sorts the visible rows by the column shown at display `position`.
    pub fn sort_by_position(&mut self, position: usize) -> Result<(), TableError> {
        let column = self
            .columns
            .original(position)
            .ok_or_else(|| TableError::column(position, self.columns.len()))?;
        self.projection.sort_by(&self.store, column);
        self.grid_dirty = true;
        Ok(())
    }

    /// Searches from the 0-based visible index `start` and selects the hit.
    pub fn search(&mut self, start: usize, text: &str) -> Result<Option<usize>, TableError> {
        let hit = SearchCursor::find(&self.store, &self.projection, start, text)?;
        if let Some(idx) = hit {
            self.selection.row = idx + 1;
        }
        Ok(hit)
    }

    // -------------------- Read access ---------------------- //

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn projection(&self) -> &RowProjection {
        &self.projection
    }

    pub fn column_order(&self) -> &ColumnOrder {
        &self.columns
    }

    pub fn visible_rows(&self) -> &[usize] {
        self.projection.rows()
    }

    pub fn visible_columns(&self) -> &[usize] {
        self.columns.as_slice()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn column_offset(&self) -> usize {
        self.column_offset
    }

    pub fn last_search(&self) -> &str {
        self.search.last()
    }

    /// Original index of the selected row.
    pub fn current_row(&self) -> Result<usize, TableError> {
        self.projection.original_index(self.selection.row)
    }

    pub fn legend(&self) -> String {
        match self.mode {
            Mode::ColumnMode => COLUMN_LEGEND.to_string(),
            _ => self.commands.legend(),
        }
    }

    pub fn status_line(&self) -> StatusLine {
        match self.mode {
            Mode::EditingFilter => StatusLine::Prompt {
                label: "Filter: ",
                text: self.input.text().to_string(),
                cursor: self.input.cursor_pos(),
                failed: false,
            },
            Mode::EditingSearch => StatusLine::Prompt {
                label: "Search: ",
                text: self.input.text().to_string(),
                cursor: self.input.cursor_pos(),
                failed: self.search.failed(),
            },
            _ => self.status.clone(),
        }
    }

    // -------------------- Key handling ---------------------- //

    pub fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        if self.mode == Mode::Normal {
            let row = self.current_row().ok();
            if let Some(intercept) = self.interceptor.as_mut()
                && !intercept(key.code, key.code.as_char(), row)
            {
                trace!("Interceptor swallowed {key:?}");
                return Outcome::default();
            }
        }

        match self.map_key(key) {
            Some(message) => {
                trace!("Mapped: {key:?} => {message:?} in {:?}", self.mode);
                self.update(message)
            }
            None => Outcome::default(),
        }
    }

    fn map_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match self.mode {
            Mode::Normal => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Message::Quit,
                KeyCode::Char('c') => Message::EnterColumnMode,
                KeyCode::Char('/') => Message::StartSearch,
                KeyCode::Char('f') => Message::StartFilter,
                KeyCode::Char('n') => Message::SearchNext,
                KeyCode::Char('<') | KeyCode::Left => Message::ScrollLeft,
                KeyCode::Char('>') | KeyCode::Right => Message::ScrollRight,
                KeyCode::Char('=') => Message::Debug,
                KeyCode::Enter => Message::Select,
                KeyCode::Char(ch) => Message::Command(ch),
                code => Self::map_movement(code)?,
            },
            Mode::ColumnMode => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Message::Quit,
                KeyCode::Char('c') => Message::LeaveColumnMode,
                KeyCode::Char('<') => Message::SwapLeft,
                KeyCode::Char('>') => Message::SwapRight,
                KeyCode::Char('s') => Message::SortColumn,
                KeyCode::Left => Message::MoveLeft,
                KeyCode::Right => Message::MoveRight,
                code => Self::map_movement(code)?,
            },
            Mode::EditingFilter | Mode::EditingSearch => Message::RawKey(key),
            Mode::Stopped => return None,
        };
        Some(message)
    }

    fn map_movement(code: KeyCode) -> Option<Message> {
        match code {
            KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Down => Some(Message::MoveDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::End => Some(Message::MoveEnd),
            _ => None,
        }
    }

    pub fn update(&mut self, message: Message) -> Outcome {
        match message {
            Message::Quit => {
                self.mode = Mode::Stopped;
                return Outcome {
                    stop: true,
                    ..Outcome::default()
                };
            }
            Message::EnterColumnMode => {
                self.mode = Mode::ColumnMode;
                // start on a column that is on screen
                self.select_column(self.selection.column.max(self.column_offset));
            }
            Message::LeaveColumnMode => self.mode = Mode::Normal,
            Message::StartSearch => self.start_search(),
            Message::StartFilter => self.start_filter(),
            Message::SearchNext => self.search_next(),
            Message::ScrollLeft => self.column_offset = self.column_offset.saturating_sub(1),
            Message::ScrollRight => {
                if self.column_offset + 1 < self.columns.len() {
                    self.column_offset += 1;
                }
            }
            Message::SwapLeft => {
                let pos = self.selection.column;
                if self.columns.swap_adjacent(pos) {
                    self.select_column(pos - 1);
                    self.grid_dirty = true;
                }
            }
            Message::SwapRight => {
                let pos = self.selection.column;
                if self.columns.swap_adjacent(pos + 1) {
                    self.select_column(pos + 1);
                    self.grid_dirty = true;
                }
            }
            Message::SortColumn => {
                if let Err(e) = self.sort_by_position(self.selection.column) {
                    debug!("Sort ignored: {e}");
                }
            }
            Message::Debug => self.debug_pending = true,
            Message::MoveUp => self.move_selection_up(1),
            Message::MoveDown => self.move_selection_down(1),
            Message::MovePageUp => self.move_selection_up(self.page_height),
            Message::MovePageDown => self.move_selection_down(self.page_height),
            Message::MoveBeginning => self.move_selection_up(usize::MAX),
            Message::MoveEnd => self.move_selection_down(usize::MAX),
            Message::MoveLeft => self.select_column(self.selection.column.saturating_sub(1)),
            Message::MoveRight => self.select_column(self.selection.column + 1),
            Message::Select => return self.run_selection_callback(),
            Message::Command(ch) => return self.run_command(ch),
            Message::RawKey(key) => self.raw_input(key),
        }
        Outcome::default()
    }

    // -------------------- Control handling functions ---------------------- //

    fn start_search(&mut self) {
        self.search.begin(self.selection.row.saturating_sub(1));
        self.input.clear();
        self.mode = Mode::EditingSearch;
    }

    fn start_filter(&mut self) {
        self.input.clear();
        self.apply_filter("");
        self.mode = Mode::EditingFilter;
    }

    fn search_next(&mut self) {
        // the selection is 1-based, so as a 0-based index it is the next row
        let start = self.selection.row;
        if let Some(idx) = self.search.next(&self.store, &self.projection, start) {
            self.selection.row = idx + 1;
        }
    }

    fn raw_input(&mut self, key: KeyEvent) {
        let res = self.input.read(key);
        match self.mode {
            Mode::EditingFilter => {
                if res.changed {
                    self.apply_filter(&res.input);
                }
                if res.finished {
                    self.mode = Mode::Normal;
                    self.status = self.filter_summary();
                }
            }
            Mode::EditingSearch => {
                if res.changed
                    && let Some(idx) = self.search.live(&self.store, &self.projection, &res.input)
                {
                    self.selection.row = idx + 1;
                }
                if res.finished {
                    self.search.commit(&res.input);
                    self.mode = Mode::Normal;
                    self.status = self.filter_summary();
                }
            }
            _ => {}
        }
    }

    fn filter_summary(&self) -> StatusLine {
        let filter = self.projection.filter();
        if filter.is_empty() {
            StatusLine::Empty
        } else {
            StatusLine::Text(format!(
                "Filter: {:?} ({}/{} lines)",
                filter,
                self.projection.len(),
                self.store.row_count()
            ))
        }
    }

    fn run_command(&mut self, trigger: char) -> Outcome {
        if !self.commands.handles(trigger) {
            return Outcome::default();
        }
        let row = match self.current_row() {
            Ok(row) => row,
            Err(e) => {
                debug!("Command {trigger:?} ignored: {e}");
                return Outcome::default();
            }
        };
        let mut ctx = ActionContext::new(&mut self.store, &mut self.projection);
        self.commands.dispatch(trigger, row, &mut ctx);
        let ActionContext {
            repaint,
            switch_to,
            status,
            ..
        } = ctx;
        self.after_action(repaint, switch_to, status)
    }

    fn run_selection_callback(&mut self) -> Outcome {
        let row = match self.current_row() {
            Ok(row) => row,
            Err(e) => {
                debug!("Selection ignored: {e}");
                return Outcome::default();
            }
        };
        let Some(action) = self.on_select.as_mut() else {
            return Outcome::default();
        };
        let mut ctx = ActionContext::new(&mut self.store, &mut self.projection);
        action(row, &mut ctx);
        let ActionContext {
            repaint,
            switch_to,
            status,
            ..
        } = ctx;
        self.after_action(repaint, switch_to, status)
    }

    // The action may have changed cells or added rows.
    fn after_action(
        &mut self,
        repaint: bool,
        switch_to: Option<ViewId>,
        status: Option<String>,
    ) -> Outcome {
        if let Some(text) = status {
            self.status = StatusLine::Text(text);
        }
        self.clamp_selection();
        self.grid_dirty = true;
        Outcome {
            stop: false,
            repaint,
            switch_to,
        }
    }

    fn select_column(&mut self, position: usize) {
        let ncols = self.columns.len();
        if ncols == 0 {
            return;
        }
        self.selection.column = position.min(ncols - 1);
        if self.selection.column < self.column_offset {
            self.column_offset = self.selection.column;
        }
    }

    // Scrolls right until the selected column fits. Nothing is known about
    // the width before the first draw.
    fn follow_selected_column(&mut self) {
        let fit = self.columns_in_view;
        if fit > 0 && self.selection.column >= self.column_offset + fit {
            self.column_offset = self.selection.column + 1 - fit;
        }
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.selection.row > 1 {
            self.selection.row = self.selection.row.saturating_sub(size).max(1);
        }
    }

    fn move_selection_down(&mut self, size: usize) {
        let len = self.projection.len();
        if self.selection.row < len {
            self.selection.row = self.selection.row.saturating_add(size).min(len);
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.projection.len();
        self.selection.row = if len == 0 {
            0
        } else {
            self.selection.row.clamp(1, len)
        };
        let ncols = self.columns.len();
        self.selection.column = self.selection.column.min(ncols.saturating_sub(1));
        self.column_offset = self.column_offset.min(ncols.saturating_sub(1));
    }

    // -------------------- Rendering ---------------------- //

    /// Pushes the current projection and cursor to `renderer`.
    pub fn present<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        let (width, height) = renderer.viewport();
        self.page_height = height.max(1);
        self.columns_in_view = renderer.columns_in_view();
        if self.mode == Mode::ColumnMode {
            self.follow_selected_column();
        }

        if self.grid_dirty {
            self.fill_grid(renderer);
            self.grid_dirty = false;
        }

        let row_offset = if self.reset_offset {
            self.reset_offset = false;
            0
        } else {
            renderer.offset().0
        };
        renderer.set_offset(row_offset, self.column_offset);
        renderer.select(self.selection.row, self.selection.column);
        renderer.set_column_mode(self.mode == Mode::ColumnMode);
        renderer.set_legend(&self.legend());

        if self.debug_pending {
            self.debug_pending = false;
            self.status = StatusLine::Text(format!(
                "size={} wid={} hei={} sel={} off={}",
                self.projection.len(),
                width,
                height,
                self.selection.row,
                renderer.offset().0
            ));
        }
        renderer.set_status(self.status_line());
        renderer.request_redraw();
    }

    fn fill_grid<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        let columns = self.store.columns();
        for (pos, &col) in self.columns.as_slice().iter().enumerate() {
            let Some(column) = columns.get(col) else {
                continue;
            };
            renderer.set_cell(
                0,
                pos,
                GridCell {
                    content: column.name.clone(),
                    expansion: column.expansion,
                    alignment: column.alignment,
                },
            );
            for (j, &row) in self.projection.rows().iter().enumerate() {
                renderer.set_cell(
                    j + 1,
                    pos,
                    GridCell {
                        content: self.store.cell(row, col).to_string(),
                        expansion: column.expansion,
                        alignment: column.alignment,
                    },
                );
            }
        }
        renderer.truncate(self.projection.len() + 1, self.columns.len());
        trace!(
            "Grid filled: {} rows x {} columns",
            self.projection.len(),
            self.columns.len()
        );
    }
}
