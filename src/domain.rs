use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const NORMAL_LEGEND: &str = " q:quit   /:search   n:next   f:filter   c:columns";
pub const COLUMN_LEGEND: &str = " q:quit   c:back   <:left   >:right   s:sort";

/// Keys handled by the view in normal mode. Commands registered on one of
/// these never fire. `s` only sorts in column mode, so it stays free.
pub const BUILTIN_KEYS: [char; 8] = ['q', '/', 'n', 'f', 'c', '<', '>', '='];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("no visible rows")]
    EmptyProjection,
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("a command is already bound to {0:?}")]
    DuplicateTrigger(char),
    #[error("unknown view {0}")]
    UnknownView(usize),
    #[error("terminal failure: {0}")]
    ToolkitFatal(#[from] Error),
}

impl TableError {
    pub(crate) fn row(index: usize, len: usize) -> Self {
        TableError::OutOfRange {
            what: "row",
            index,
            len,
        }
    }

    pub(crate) fn column(index: usize, len: usize) -> Self {
        TableError::OutOfRange {
            what: "column",
            index,
            len,
        }
    }
}

/// Index of a view inside a [`crate::host::MultiViewHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub usize);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl From<Alignment> for ratatui::layout::Alignment {
    fn from(align: Alignment) -> Self {
        match align {
            Alignment::Left => ratatui::layout::Alignment::Left,
            Alignment::Center => ratatui::layout::Alignment::Center,
            Alignment::Right => ratatui::layout::Alignment::Right,
        }
    }
}

#[derive(Debug, Clone, Setters)]
pub struct ViewConfig {
    /// Milliseconds the host waits for a terminal event before redrawing.
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub column_spacing: u16,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
            column_spacing: 1,
        }
    }
}

/// What a key press means in the current mode of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    EnterColumnMode,
    LeaveColumnMode,
    StartSearch,
    StartFilter,
    SearchNext,
    ScrollLeft,
    ScrollRight,
    SwapLeft,
    SwapRight,
    SortColumn,
    Debug,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveLeft,
    MoveRight,
    Select,
    Command(char),
    RawKey(KeyEvent),
}
