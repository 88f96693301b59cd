//! A scalar value whose writes are captured on the bound history.

use crate::{ambient, Action, Error, ObserverError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// The notification sent when the value of a [`Cell`] has changed.
#[derive(Clone, Copy, Debug)]
pub struct ValueChange<'a, T> {
    /// The value before the change.
    pub old: &'a T,
    /// The value after the change.
    pub new: &'a T,
}

/// The observer callback of a [`Cell`].
///
/// The callback runs synchronously after the value has been written. When it
/// returns an error, the write is undone before the error reaches the caller
/// as [`Error::Observer`].
pub type CellSlot<T> = Box<dyn FnMut(ValueChange<T>) -> core::result::Result<(), ObserverError>>;

/// Configuration flags of a [`Cell`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CellFlags {
    /// Serialize the initial value instead of the live value.
    ///
    /// Use this for state that should not survive persistence, such as a
    /// transient selection.
    pub persist_initial: bool,
}

struct CellInner<T> {
    value: T,
    initial: T,
    flags: CellFlags,
    slot: Option<CellSlot<T>>,
}

/// A scalar slot of type `T` participating in undo-redo.
///
/// Writing through [`set`](Cell::set) records a reversible edit on the
/// command in progress of the thread's bound history. Repeated writes within
/// one command coalesce into a single edit whose restore point is the value
/// the cell had when the command started. Without a bound history the write
/// is applied directly.
///
/// A `Cell` is a cheap, cloneable handle; clones share the same value.
///
/// # Examples
/// ```
/// use rewind::{Cell, History};
///
/// # fn main() -> rewind::Result {
/// let history = History::new();
/// let cell = Cell::new(0);
///
/// history.begin_command("type")?;
/// cell.set(1)?;
/// cell.set(2)?;
/// cell.set(3)?;
/// history.end_command(false)?;
///
/// // The writes coalesced into a single reversible edit.
/// assert_eq!(history.len(), 1);
/// history.undo()?;
/// assert_eq!(cell.get(), 0);
/// history.redo()?;
/// assert_eq!(cell.get(), 3);
/// # Ok(())
/// # }
/// ```
pub struct Cell<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Returns a new cell holding `initial`.
    pub fn new(initial: T) -> Cell<T> {
        Cell::with_flags(initial, CellFlags::default())
    }

    /// Returns a new cell holding `initial` with the provided flags.
    pub fn with_flags(initial: T, flags: CellFlags) -> Cell<T> {
        Cell {
            inner: Rc::new(RefCell::new(CellInner {
                value: initial.clone(),
                initial,
                flags,
                slot: None,
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Accesses the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Returns the value the cell was constructed with.
    pub fn initial(&self) -> T {
        self.inner.borrow().initial.clone()
    }

    /// Returns the flags of the cell.
    pub fn flags(&self) -> CellFlags {
        self.inner.borrow().flags
    }

    /// Returns the value to use when persisting the cell: the initial value
    /// when [`CellFlags::persist_initial`] is set, the live value otherwise.
    pub fn persistent_value(&self) -> T {
        let inner = self.inner.borrow();
        if inner.flags.persist_initial {
            inner.initial.clone()
        } else {
            inner.value.clone()
        }
    }

    /// Writes `value`, recording a reversible edit on the command in
    /// progress of the thread's bound history.
    ///
    /// When the most recent action of that command is this cell's own write,
    /// the write is coalesced into it instead of growing the command.
    ///
    /// # Errors
    /// Returns [`Error::Observer`] when the connected observer fails; the
    /// previous value is restored first.
    pub fn set(&self, value: T) -> Result {
        if let Some(handle) = ambient::last_action() {
            let mut action = handle.borrow_mut();
            if let Some(write) = action
                .as_any_mut()
                .and_then(|any| any.downcast_mut::<Write<T>>())
            {
                if Rc::ptr_eq(&write.cell, &self.inner) {
                    let live = self.inner.borrow().value.clone();
                    if live != write.new {
                        // An unrecorded write owns the live value; undo must
                        // restore to it, not to the stale capture.
                        write.old = live;
                    }
                    write.new = value;
                    return write.apply();
                }
            }
        }
        let old = self.inner.borrow().value.clone();
        ambient::add_action(Write {
            cell: Rc::clone(&self.inner),
            old,
            new: value,
        })
    }

    /// Sets how value changes should be handled.
    ///
    /// The previous slot is returned if it exists. The callback may read the
    /// cell and the history, but must not mutate the cell it observes.
    pub fn connect(
        &self,
        slot: impl FnMut(ValueChange<T>) -> core::result::Result<(), ObserverError> + 'static,
    ) -> Option<CellSlot<T>> {
        self.inner.borrow_mut().slot.replace(Box::new(slot))
    }

    /// Removes and returns the slot if it exists.
    pub fn disconnect(&self) -> Option<CellSlot<T>> {
        self.inner.borrow_mut().slot.take()
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Cell<T> {
        Cell {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Cell<T> {
    fn default() -> Cell<T> {
        Cell::new(T::default())
    }
}

impl<T: Debug> Debug for Cell<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Cell")
            .field("value", &inner.value)
            .field("flags", &inner.flags)
            .finish()
    }
}

#[cfg(feature = "serde")]
impl<T: Serialize + Clone + PartialEq + 'static> Serialize for Cell<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.persistent_value().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Deserialize<'de> + Clone + PartialEq + 'static> Deserialize<'de> for Cell<T> {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Cell<T>, D::Error> {
        T::deserialize(deserializer).map(Cell::new)
    }
}

/// The reversible edit behind [`Cell::set`].
struct Write<T> {
    cell: Rc<RefCell<CellInner<T>>>,
    old: T,
    new: T,
}

impl<T: Clone + PartialEq + 'static> Action for Write<T> {
    fn apply(&mut self) -> Result {
        self.cell.borrow_mut().value = self.new.clone();
        if let Err(err) = notify(&self.cell, &self.old, &self.new) {
            self.cell.borrow_mut().value = self.old.clone();
            return Err(err);
        }
        Ok(())
    }

    fn revert(&mut self) -> Result {
        self.cell.borrow_mut().value = self.old.clone();
        if let Err(err) = notify(&self.cell, &self.new, &self.old) {
            self.cell.borrow_mut().value = self.new.clone();
            return Err(err);
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

/// Runs the slot with the cell borrow released, so the observer may read the
/// cell and reach the history.
fn notify<T>(inner: &Rc<RefCell<CellInner<T>>>, old: &T, new: &T) -> Result {
    let slot = inner.borrow_mut().slot.take();
    let Some(mut slot) = slot else {
        return Ok(());
    };
    let result = slot(ValueChange { old, new });
    inner.borrow_mut().slot = Some(slot);
    result.map_err(Error::Observer)
}
