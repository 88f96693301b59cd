//! A named group of actions treated as a single undo-redo unit.

use crate::{Action, ActionHandle, Result};
use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// An ordered group of actions sharing one identifier.
///
/// A command executes its actions in insertion order when moving forward
/// through the history and in reverse order when moving backward. Both
/// directions keep the target consistent on partial failure: the actions that
/// did run are restored before the error is returned.
///
/// Commands are normally created through
/// [`History::begin_command`](crate::History::begin_command) and finalized by
/// `end_command` or `cancel_command`. Once added to a history a command is
/// only modified by merging another command with an equal identifier onto it.
pub struct Command {
    id: Option<String>,
    actions: Vec<ActionHandle>,
}

impl Command {
    /// Returns a new, empty command.
    pub fn new(id: Option<String>) -> Command {
        Command {
            id,
            actions: Vec::new(),
        }
    }

    /// Returns the identifier of the command.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the number of actions in the command.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if the command contains no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Appends an already applied action to the command.
    pub fn add_action(&mut self, action: impl Action + 'static) {
        self.actions.push(Rc::new(RefCell::new(action)));
    }

    /// Returns the most recently added action.
    pub fn last_action(&self) -> Option<ActionHandle> {
        self.actions.last().cloned()
    }

    /// Appends the actions of `other` to this command.
    pub fn merge(&mut self, mut other: Command) {
        self.actions.append(&mut other.actions);
    }

    /// Applies every action in insertion order.
    ///
    /// # Errors
    /// If an action fails, the actions applied before it are reverted and the
    /// original error is returned.
    pub fn execute(&self) -> Result {
        apply_all(&self.actions)
    }

    /// Reverts every action in reverse insertion order.
    ///
    /// # Errors
    /// If an action fails, the actions reverted before it are re-applied and
    /// the original error is returned.
    pub fn rollback(&self) -> Result {
        revert_all(&self.actions)
    }

    pub(crate) fn push(&mut self, action: ActionHandle) {
        self.actions.push(action);
    }

    pub(crate) fn handles(&self) -> Vec<ActionHandle> {
        self.actions.clone()
    }

    pub(crate) fn id_cloned(&self) -> Option<String> {
        self.id.clone()
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("actions", &self.actions.len())
            .finish()
    }
}

pub(crate) fn apply_all(actions: &[ActionHandle]) -> Result {
    for (i, action) in actions.iter().enumerate() {
        if let Err(err) = action.borrow_mut().apply() {
            // Restore the prefix that did run, most recent first.
            for done in actions[..i].iter().rev() {
                let _ = done.borrow_mut().revert();
            }
            return Err(err);
        }
    }
    Ok(())
}

pub(crate) fn revert_all(actions: &[ActionHandle]) -> Result {
    for (i, action) in actions.iter().enumerate().rev() {
        if let Err(err) = action.borrow_mut().revert() {
            for done in &actions[i + 1..] {
                let _ = done.borrow_mut().apply();
            }
            return Err(err);
        }
    }
    Ok(())
}
