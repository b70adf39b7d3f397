//! Interactive terminal table with live filtering, sorting, wrap-around
//! search, column reordering and per-row key commands.
//!
//! A [`ViewController`] owns the data and the key state machine. It pushes
//! what is visible to a [`Renderer`]; [`GridRenderer`] draws that with
//! ratatui. [`MultiViewHost`] owns one or more views and runs the terminal.

pub mod columns;
pub mod commands;
pub mod controller;
pub mod domain;
pub mod host;
pub mod inputter;
pub mod logging;
pub mod projection;
pub mod renderer;
pub mod search;
pub mod store;

pub use commands::{CommandHandle, RowAction};
pub use controller::{ActionContext, KeyInterceptor, Mode, Outcome, Selection, ViewController};
pub use domain::{Alignment, TableError, ViewConfig, ViewId};
pub use host::{MultiViewHost, run};
pub use renderer::{GridCell, GridRenderer, Renderer, StatusLine};
pub use store::DataStore;
