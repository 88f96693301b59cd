//! Module used to communicate changes in the history.

use std::sync::mpsc::{Sender, SyncSender};

/// The `Event` describes a step in the command lifecycle of a history.
///
/// Every event carries the identifier of the command it concerns. See
/// [`Slot`] for how to receive them.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Emitted when a command has been started.
    Started {
        /// The identifier of the command.
        id: Option<String>,
    },
    /// Emitted when a command is about to be finalized.
    ///
    /// The command is still current at this point, so observers may add more
    /// actions to it before it is committed to the history.
    Ended {
        /// The identifier of the command.
        id: Option<String>,
    },
    /// Emitted when a command has been cancelled and is about to be rolled
    /// back.
    Cancelled {
        /// The identifier of the command.
        id: Option<String>,
    },
    /// Emitted when a command has been executed, either by being committed
    /// or by being crossed while moving forward through the history.
    Executed {
        /// The identifier of the command.
        id: Option<String>,
    },
    /// Emitted when a command has been rolled back while moving backward
    /// through the history.
    RolledBack {
        /// The identifier of the command.
        id: Option<String>,
    },
    /// Emitted when the oldest command has been evicted to honor the size
    /// limit of the history.
    Discarded {
        /// The identifier of the command.
        id: Option<String>,
    },
}

/// Use this to handle events emitted by a history.
///
/// This allows you to trigger side effects on certain lifecycle changes.
///
/// # Examples
/// ```
/// use std::sync::mpsc;
/// use rewind::{Event, History};
///
/// # fn main() -> rewind::Result {
/// let (sender, receiver) = mpsc::channel();
/// let history = History::builder().connect(sender).build();
///
/// history.begin_command("edit")?;
/// history.cancel_command()?;
///
/// let mut iter = receiver.try_iter();
/// assert_eq!(iter.next(), Some(Event::Started { id: Some("edit".into()) }));
/// assert_eq!(iter.next(), Some(Event::Cancelled { id: Some("edit".into()) }));
/// assert_eq!(iter.next(), None);
/// # Ok(())
/// # }
/// ```
pub trait Slot {
    /// Receives an event that describes the lifecycle step taken by the
    /// history.
    fn on_emit(&mut self, event: Event);
}

impl Slot for () {
    fn on_emit(&mut self, _: Event) {}
}

impl<F: FnMut(Event)> Slot for F {
    fn on_emit(&mut self, event: Event) {
        self(event)
    }
}

impl Slot for Sender<Event> {
    fn on_emit(&mut self, event: Event) {
        self.send(event).ok();
    }
}

impl Slot for SyncSender<Event> {
    fn on_emit(&mut self, event: Event) {
        self.send(event).ok();
    }
}

/// Slot wrapper that adds connect and disconnect functionality.
#[derive(Default)]
pub(crate) struct Socket(Option<Box<dyn Slot>>);

impl Socket {
    pub fn new(slot: Option<Box<dyn Slot>>) -> Socket {
        Socket(slot)
    }

    pub fn connect(&mut self, slot: Option<Box<dyn Slot>>) -> Option<Box<dyn Slot>> {
        std::mem::replace(&mut self.0, slot)
    }

    pub fn disconnect(&mut self) -> Option<Box<dyn Slot>> {
        self.0.take()
    }
}
