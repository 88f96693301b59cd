//! The thread-local binding to the currently mutating history.

use crate::{Action, ActionHandle, History, Result};
use std::cell::RefCell;

thread_local! {
    static CURRENT: RefCell<Option<History>> = const { RefCell::new(None) };
}

/// Binds `history` to the current thread. Returns `false` if another binding
/// is already in place.
pub(crate) fn install(history: &History) -> bool {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            false
        } else {
            *slot = Some(history.clone());
            true
        }
    })
}

pub(crate) fn uninstall() {
    CURRENT.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn is_occupied() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

fn current() -> Option<History> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Submits `action` to the command in progress on the current thread's
/// bound history.
///
/// The action is recorded first and then applied, so a command holds every
/// action that has touched the target. When no history is bound to the
/// thread, the bound history has no command in progress, or the command is
/// suspended, the action is applied once without being recorded and will not
/// be reversed by a later undo.
///
/// # Errors
/// Returns the error of the action's `apply`.
pub fn add_action(action: impl Action + 'static) -> Result {
    match current() {
        Some(history) => history.record(action),
        None => {
            let mut action = action;
            action.apply()
        }
    }
}

/// Returns the most recently recorded action of the command in progress on
/// the current thread's bound history.
///
/// Returns `None` when no history is bound, no command is in progress, or
/// the command is suspended.
pub fn last_action() -> Option<ActionHandle> {
    current().and_then(|history| history.last_recorded())
}
