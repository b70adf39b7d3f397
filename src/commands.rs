use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::controller::ActionContext;
use crate::domain::{BUILTIN_KEYS, NORMAL_LEGEND, TableError};

/// Callback bound to a row. Receives the original index of the selected row.
pub type RowAction = Box<dyn FnMut(usize, &mut ActionContext<'_>)>;

struct Command {
    trigger: char,
    label: String,
    enabled: Rc<Cell<bool>>,
    action: RowAction,
}

/// Handle returned by [`CommandRegistry::register`]. Toggling it takes effect
/// on the next key press and the next legend render.
#[derive(Clone)]
pub struct CommandHandle {
    trigger: char,
    enabled: Rc<Cell<bool>>,
}

impl CommandHandle {
    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("trigger", &self.trigger)
            .field("enabled", &self.enabled.get())
            .finish()
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn register<F>(
        &mut self,
        trigger: char,
        label: impl Into<String>,
        action: F,
    ) -> Result<CommandHandle, TableError>
    where
        F: FnMut(usize, &mut ActionContext<'_>) + 'static,
    {
        if self.commands.iter().any(|c| c.trigger == trigger) {
            warn!("Rejected second command on {trigger:?}");
            return Err(TableError::DuplicateTrigger(trigger));
        }
        if BUILTIN_KEYS.contains(&trigger) {
            warn!("Command on {trigger:?} is shadowed by a built-in key");
        }

        let enabled = Rc::new(Cell::new(true));
        self.commands.push(Command {
            trigger,
            label: label.into(),
            enabled: Rc::clone(&enabled),
            action: Box::new(action),
        });
        trace!("Registered command {trigger:?}");
        Ok(CommandHandle { trigger, enabled })
    }

    /// True if an enabled command listens on `trigger`.
    pub fn handles(&self, trigger: char) -> bool {
        self.commands
            .iter()
            .any(|c| c.trigger == trigger && c.enabled.get())
    }

    /// Runs the first enabled command bound to `trigger`.
    /// Returns false if there was none.
    pub fn dispatch(&mut self, trigger: char, row: usize, ctx: &mut ActionContext<'_>) -> bool {
        match self
            .commands
            .iter_mut()
            .find(|c| c.trigger == trigger && c.enabled.get())
        {
            Some(command) => {
                trace!("Dispatch {:?} ({}) on row {}", trigger, command.label, row);
                (command.action)(row, ctx);
                true
            }
            None => false,
        }
    }

    /// Built-in hints followed by every enabled, labelled command.
    pub fn legend(&self) -> String {
        self.commands
            .iter()
            .filter(|c| c.enabled.get() && !c.label.is_empty())
            .fold(NORMAL_LEGEND.to_string(), |mut legend, c| {
                legend.push_str(&format!("   {}:{}", c.trigger, c.label));
                legend
            })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
