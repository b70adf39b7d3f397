use std::io::{self, stdout};
use std::time::Duration;

use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use tracing::{debug, error, info, trace, warn};

use crate::controller::{Outcome, ViewController};
use crate::domain::{TableError, ViewConfig, ViewId};
use crate::renderer::GridRenderer;

struct Page {
    view: ViewController,
    grid: GridRenderer,
}

/// Owns several views and shows one of them at a time.
pub struct MultiViewHost {
    pages: Vec<Page>,
    active: usize,
    config: ViewConfig,
}

impl MultiViewHost {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            pages: Vec::new(),
            active: 0,
            config,
        }
    }

    /// Adds a fresh, empty view and makes it the active one.
    pub fn create_view(&mut self) -> ViewId {
        self.add_view(ViewController::new())
    }

    /// Adds `view` and makes it the active one.
    pub fn add_view(&mut self, view: ViewController) -> ViewId {
        self.pages.push(Page {
            view,
            grid: GridRenderer::new(&self.config),
        });
        self.active = self.pages.len() - 1;
        debug!("View {} added", self.active);
        ViewId(self.active)
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewController> {
        self.pages.get(id.0).map(|p| &p.view)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut ViewController> {
        self.pages.get_mut(id.0).map(|p| &mut p.view)
    }

    pub fn active(&self) -> ViewId {
        ViewId(self.active)
    }

    pub fn set_active(&mut self, id: ViewId) -> Result<(), TableError> {
        if id.0 >= self.pages.len() {
            return Err(TableError::UnknownView(id.0));
        }
        trace!("Active view {} -> {}", self.active, id.0);
        self.active = id.0;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_views(self) -> Vec<ViewController> {
        self.pages.into_iter().map(|p| p.view).collect()
    }

    /// Routes a key to the active view and follows a requested view switch.
    pub fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        let Some(page) = self.pages.get_mut(self.active) else {
            return Outcome {
                stop: true,
                ..Outcome::default()
            };
        };
        let outcome = page.view.handle_key(key);
        if let Some(target) = outcome.switch_to
            && let Err(e) = self.set_active(target)
        {
            warn!("View switch ignored: {e}");
        }
        outcome
    }

    /// Takes over the terminal until the active view stops.
    pub fn run(&mut self) -> Result<(), TableError> {
        if self.pages.is_empty() {
            return Err(TableError::UnknownView(0));
        }
        let mut terminal = ratatui::try_init()?;
        info!("Host started with {} views", self.pages.len());
        let result = self.event_loop(&mut terminal);
        ratatui::restore();
        if let Err(e) = &result {
            error!("Host stopped: {e}");
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<(), TableError> {
        let poll_time = Duration::from_millis(self.config.event_poll_time);
        loop {
            let page = &mut self.pages[self.active];
            page.view.present(&mut page.grid);
            let grid = &mut page.grid;
            terminal.draw(|f| grid.draw(f))?;

            if !event::poll(poll_time)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let outcome = self.handle_key(key);
                    if outcome.stop {
                        return Ok(());
                    }
                    if outcome.repaint {
                        terminal.clear()?;
                    }
                }
                Event::Resize(width, height) => trace!("Resize to {width}x{height}"),
                _ => {}
            }
        }
    }
}

/// Runs a single view until it stops and hands it back.
pub fn run(view: ViewController, config: ViewConfig) -> Result<ViewController, TableError> {
    let mut host = MultiViewHost::new(config);
    host.add_view(view);
    host.run()?;
    host.into_views()
        .pop()
        .ok_or_else(|| TableError::UnknownView(0))
}

/// Leaves raw mode and the alternate screen while `f` runs. The terminal is
/// taken back when `f` returns or unwinds.
pub(crate) fn suspend<R>(f: impl FnOnce() -> R) -> Result<R, TableError> {
    ratatui::try_restore()?;
    debug!("Terminal suspended");
    let _guard = ResumeGuard;
    Ok(f())
}

struct ResumeGuard;

impl Drop for ResumeGuard {
    fn drop(&mut self) {
        match resume() {
            Ok(()) => debug!("Terminal resumed"),
            Err(e) => error!("Could not resume terminal: {e}"),
        }
    }
}

fn resume() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)
}

#[cfg(test)]
mod tests {
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    use super::*;

    fn chr(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn one_row_view(name: &str) -> ViewController {
        let mut view = ViewController::new();
        view.set_columns_and_rows(vec!["Name".into()], vec![vec![name.into()]]);
        view
    }

    #[test]
    fn newest_view_is_active() {
        let mut host = MultiViewHost::new(ViewConfig::default());
        let first = host.add_view(one_row_view("a"));
        let second = host.create_view();
        assert_eq!(host.active(), second);
        assert_eq!(host.len(), 2);
        host.set_active(first).unwrap();
        assert_eq!(host.active(), first);
    }

    #[test]
    fn unknown_view_is_rejected() {
        let mut host = MultiViewHost::new(ViewConfig::default());
        host.create_view();
        assert!(matches!(
            host.set_active(ViewId(4)),
            Err(TableError::UnknownView(4))
        ));
        assert_eq!(host.active(), ViewId(0));
    }

    #[test]
    fn commands_switch_views() {
        let mut host = MultiViewHost::new(ViewConfig::default());
        let files = host.add_view(one_row_view("a"));
        let other = host.add_view(one_row_view("b"));
        host.view_mut(files)
            .unwrap()
            .register_command('v', "other", move |_, ctx| ctx.switch_to(other))
            .unwrap();
        host.view_mut(other)
            .unwrap()
            .register_command('v', "back", move |_, ctx| ctx.switch_to(files))
            .unwrap();
        host.view_mut(other)
            .unwrap()
            .register_command('x', "", |_, ctx| ctx.switch_to(ViewId(9)))
            .unwrap();

        host.set_active(files).unwrap();
        host.handle_key(chr('v'));
        assert_eq!(host.active(), other);
        host.handle_key(chr('x'));
        assert_eq!(host.active(), other);
        host.handle_key(chr('v'));
        assert_eq!(host.active(), files);
    }

    #[test]
    fn keys_reach_only_the_active_view() {
        let mut host = MultiViewHost::new(ViewConfig::default());
        let first = host.add_view(one_row_view("a"));
        let second = host.add_view(one_row_view("b"));
        host.handle_key(chr('c'));
        assert_eq!(
            host.view(second).unwrap().mode(),
            crate::controller::Mode::ColumnMode
        );
        assert_eq!(
            host.view(first).unwrap().mode(),
            crate::controller::Mode::Normal
        );
        assert!(host.handle_key(chr('q')).stop);
    }

    #[test]
    fn run_without_views_fails_before_touching_the_terminal() {
        let mut host = MultiViewHost::new(ViewConfig::default());
        assert!(matches!(host.run(), Err(TableError::UnknownView(0))));
    }
}
