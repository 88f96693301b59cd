//! Provides undo-redo functionality with command grouping and transparent
//! change capture.
//!
//! All modifications are done by creating objects of actions that apply the
//! modifications. All actions know how to revert the changes they apply, and
//! by grouping them into commands on a [`History`] it is easy to apply, undo,
//! and redo changes made to a target.
//!
//! # Features
//!
//! * [`Action`] provides the base functionality for all reversible mutations.
//! * [`Command`] groups actions into a single undo-redo unit with an
//!   identifier, so gradual changes can be merged into larger operations.
//! * [`History`] provides linear undo-redo functionality with a movable
//!   position, a configurable size limit, and save-state tracking.
//! * While a command is in progress the history is bound to the current
//!   thread, so decoupled code can contribute actions through [`add_action`]
//!   without holding a reference to it.
//! * [`Cell`] and [`List`] wrap ordinary values and ordered collections so
//!   that mutating them is captured automatically on the bound history.
//!   Repeated writes to the same cell within one command coalesce into a
//!   single reversible edit.
//! * State changes are communicated through [`Event`]s and the adapters'
//!   change notifications, which observers receive synchronously.
//! * Serialization of cells is provided when the `serde` feature is enabled.
//!
//! # Examples
//!
//! Add this to `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rewind = "0.1"
//! ```
//!
//! And this to `main.rs`:
//!
//! ```
//! use rewind::{Cell, History};
//!
//! fn main() -> rewind::Result {
//!     let history = History::new();
//!     let counter = Cell::new(0);
//!
//!     history.begin_command("increment")?;
//!     counter.set(1)?;
//!     history.end_command(false)?;
//!     assert_eq!(counter.get(), 1);
//!
//!     history.undo()?;
//!     assert_eq!(counter.get(), 0);
//!     history.redo()?;
//!     assert_eq!(counter.get(), 1);
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! A history and its adapters are single-threaded: the handles are reference
//! counted and the current-history binding is thread local. Cross-thread
//! sharing requires external synchronization of the data itself.

#![deny(missing_docs)]

mod action;
mod ambient;
mod from_fn;

pub mod cell;
pub mod command;
pub mod history;
pub mod list;
pub mod socket;

use thiserror::Error;

pub use self::action::{Action, ActionHandle};
pub use self::ambient::{add_action, last_action};
pub use self::cell::{Cell, CellFlags, ValueChange};
pub use self::command::Command;
pub use self::from_fn::FromFn;
pub use self::history::History;
pub use self::list::{List, ListEvent};
pub use self::socket::{Event, Slot};

/// A specialized Result type for undo-redo operations.
pub type Result<T = ()> = core::result::Result<T, Error>;

/// The boxed error type returned by observer callbacks.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// The errors surfaced by the engine and its adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A command is already in progress on this thread.
    #[error("a command is already in progress")]
    Busy,
    /// No command is in progress.
    #[error("no command is in progress")]
    NoCommand,
    /// The position is already at the bottom of the history.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The position is already at the top of the history.
    #[error("nothing to redo")]
    NothingToRedo,
    /// A structural mutation was attempted on a read-only list.
    #[error("the list is read-only")]
    ReadOnly,
    /// An index argument was outside the valid range.
    #[error("index {index} is out of range for length {len}")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the collection.
        len: usize,
    },
    /// An observer callback failed.
    ///
    /// The state mutated by the notifying operation has been restored to its
    /// pre-mutation value before this error is returned.
    #[error("observer failed")]
    Observer(#[source] ObserverError),
}
