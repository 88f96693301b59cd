//! A linear history of commands.

use crate::command::{apply_all, revert_all};
use crate::socket::{Event, Slot, Socket};
use crate::{ambient, Action, ActionHandle, Command, Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{debug, trace};

struct Inner {
    commands: VecDeque<Command>,
    /// Number of commands currently in their applied state.
    head: usize,
    /// Maximum number of commands kept, zero meaning unbounded.
    limit: usize,
    /// Position the target was last marked saved at, `None` once the saved
    /// command has been evicted.
    saved: Option<usize>,
    current: Option<Command>,
    suspend_depth: usize,
    undoing: bool,
    redoing: bool,
    socket: Socket,
}

/// A linear history of commands.
///
/// The history can roll the state of its targets backwards and forwards by
/// using the [`undo`] and [`redo`] methods. Mutations are grouped into
/// commands: [`begin_command`] opens one and binds the history to the current
/// thread, adapters such as [`Cell`](crate::Cell) and [`List`](crate::List)
/// record their changes into it through [`add_action`](crate::add_action),
/// and [`end_command`] commits it as a single undo-redo unit. The history can
/// notify the user about lifecycle changes through [`Event`]s.
///
/// A `History` is a cheap, cloneable handle; clones share the same state.
///
/// # Examples
/// ```
/// use rewind::{History, List};
///
/// # fn main() -> rewind::Result {
/// let history = History::new();
/// let items = List::new();
///
/// history.begin_command("add")?;
/// items.add(1)?;
/// items.add(2)?;
/// history.end_command(false)?;
/// assert_eq!(items.to_vec(), [1, 2]);
///
/// history.undo()?;
/// assert!(items.is_empty());
/// history.redo()?;
/// assert_eq!(items.to_vec(), [1, 2]);
/// # Ok(())
/// # }
/// ```
///
/// [`undo`]: History::undo
/// [`redo`]: History::redo
/// [`begin_command`]: History::begin_command
/// [`end_command`]: History::end_command
pub struct History {
    inner: Rc<RefCell<Inner>>,
}

impl History {
    /// Returns a new history.
    pub fn new() -> History {
        History::builder().build()
    }

    /// Returns a new history builder.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Returns the number of commands in the history.
    pub fn len(&self) -> usize {
        self.inner.borrow().commands.len()
    }

    /// Returns `true` if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().commands.is_empty()
    }

    /// Returns the position of the history, the number of commands currently
    /// in their applied state.
    pub fn position(&self) -> usize {
        self.inner.borrow().head
    }

    /// Returns the size limit of the history, zero meaning unbounded.
    pub fn limit(&self) -> usize {
        self.inner.borrow().limit
    }

    /// Sets the size limit of the history, zero meaning unbounded.
    ///
    /// When the history already holds more commands than the new limit, the
    /// oldest commands are dropped. The position is clamped to the new length
    /// and the save point shifts with the dropped commands, or poisons when
    /// the state it marked is no longer reachable.
    pub fn set_limit(&self, limit: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.limit = limit;
        if limit == 0 || inner.commands.len() <= limit {
            return;
        }
        let delta = inner.commands.len() - limit;
        inner.commands.drain(..delta);
        inner.head = inner.head.min(inner.commands.len());
        inner.saved = match inner.saved {
            Some(saved) if saved > delta => Some(saved - delta),
            _ => None,
        };
        debug!(dropped = delta, "history shrunk to limit");
    }

    /// Returns `true` if the history can undo.
    pub fn can_undo(&self) -> bool {
        self.position() > 0
    }

    /// Returns `true` if the history can redo.
    pub fn can_redo(&self) -> bool {
        let inner = self.inner.borrow();
        inner.head < inner.commands.len()
    }

    /// Returns `true` if the target is in the state it was in when
    /// [`set_saved`](History::set_saved) was last called.
    pub fn is_saved(&self) -> bool {
        let inner = self.inner.borrow();
        inner.saved == Some(inner.head)
    }

    /// Marks the current position as the saved state of the target.
    pub fn set_saved(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.saved = Some(inner.head);
    }

    /// Returns `true` if a command is in progress.
    pub fn is_command_started(&self) -> bool {
        self.inner.borrow().current.is_some()
    }

    /// Returns `true` if the command in progress is suspended.
    pub fn is_command_suspended(&self) -> bool {
        let inner = self.inner.borrow();
        inner.current.is_some() && inner.suspend_depth > 0
    }

    /// Returns `true` while an [`undo`](History::undo) call is running.
    pub fn is_undoing(&self) -> bool {
        self.inner.borrow().undoing
    }

    /// Returns `true` while a [`redo`](History::redo) call is running.
    pub fn is_redoing(&self) -> bool {
        self.inner.borrow().redoing
    }

    /// Returns the identifier of the command in progress.
    pub fn current_command_id(&self) -> Option<String> {
        self.inner
            .borrow()
            .current
            .as_ref()
            .and_then(|command| command.id_cloned())
    }

    /// Returns the identifiers of the commands in the history, oldest first.
    pub fn command_ids(&self) -> Vec<Option<String>> {
        self.inner
            .borrow()
            .commands
            .iter()
            .map(Command::id_cloned)
            .collect()
    }

    /// Returns the identifier of the command at `index`, oldest first.
    pub fn command_id_at(&self, index: usize) -> Option<String> {
        self.inner
            .borrow()
            .commands
            .get(index)
            .and_then(|command| command.id_cloned())
    }

    /// Sets how the events should be handled when the state changes.
    ///
    /// The previous slot is returned if it exists.
    pub fn connect(&self, slot: impl Slot + 'static) -> Option<Box<dyn Slot>> {
        self.inner.borrow_mut().socket.connect(Some(Box::new(slot)))
    }

    /// Removes and returns the slot if it exists.
    pub fn disconnect(&self) -> Option<Box<dyn Slot>> {
        self.inner.borrow_mut().socket.disconnect()
    }

    /// Starts a new command with the provided identifier and binds the
    /// history to the current thread.
    ///
    /// Until [`end_command`](History::end_command) or
    /// [`cancel_command`](History::cancel_command) is called, every action
    /// submitted through [`add_action`](crate::add_action) is recorded in
    /// this command. Emits [`Event::Started`].
    ///
    /// # Errors
    /// Returns [`Error::Busy`] when a command is already in progress on this
    /// thread.
    pub fn begin_command(&self, id: impl Into<String>) -> Result {
        if ambient::is_occupied() {
            return Err(Error::Busy);
        }
        let id = Some(id.into());
        {
            let mut inner = self.inner.try_borrow_mut().map_err(|_| Error::Busy)?;
            if inner.current.is_some() {
                return Err(Error::Busy);
            }
            inner.current = Some(Command::new(id.clone()));
        }
        ambient::install(self);
        debug!(id = id.as_deref(), "command started");
        self.emit(Event::Started { id });
        Ok(())
    }

    /// Finalizes the command in progress and unbinds the history from the
    /// current thread.
    ///
    /// Emits [`Event::Ended`] while the command is still current, so
    /// observers may add final actions to it. A command without actions is
    /// dropped. When `mergeable` is `true` and the command on top of the
    /// position has an equal identifier, the ending command is merged onto it
    /// and the position is unchanged; otherwise the commands above the
    /// position are discarded, the command is appended, and the oldest
    /// command is evicted when the size limit is exceeded (emitting
    /// [`Event::Discarded`]). Emits [`Event::Executed`] last.
    ///
    /// # Errors
    /// Returns [`Error::NoCommand`] when no command is in progress.
    ///
    /// # Examples
    /// ```
    /// use rewind::{Cell, History};
    ///
    /// # fn main() -> rewind::Result {
    /// let history = History::new();
    /// let cell = Cell::new(0);
    ///
    /// history.begin_command("edit")?;
    /// cell.set(1)?;
    /// history.end_command(true)?;
    /// history.begin_command("edit")?;
    /// cell.set(2)?;
    /// history.end_command(true)?;
    ///
    /// // Both edits merged into a single undo step.
    /// assert_eq!(history.len(), 1);
    /// history.undo()?;
    /// assert_eq!(cell.get(), 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn end_command(&self, mergeable: bool) -> Result {
        let id = {
            let inner = self.inner.try_borrow().map_err(|_| Error::Busy)?;
            match inner.current.as_ref() {
                Some(command) => command.id_cloned(),
                None => return Err(Error::NoCommand),
            }
        };
        self.emit(Event::Ended { id: id.clone() });

        let mut discarded = None;
        {
            let mut inner = self.inner.borrow_mut();
            inner.suspend_depth = 0;
            let command = inner.current.take();
            match command {
                None => {}
                Some(command) if command.is_empty() => {
                    debug!(id = id.as_deref(), "empty command dropped");
                }
                Some(command)
                    if mergeable
                        && inner.head > 0
                        && inner.commands[inner.head - 1].id() == command.id() =>
                {
                    let index = inner.head - 1;
                    inner.commands[index].merge(command);
                    debug!(id = id.as_deref(), "command merged");
                }
                Some(command) => {
                    let head = inner.head;
                    inner.commands.truncate(head);
                    inner.saved = inner.saved.filter(|&saved| saved <= head);
                    inner.commands.push_back(command);
                    inner.head += 1;
                    if inner.limit > 0 && inner.commands.len() > inner.limit {
                        if let Some(oldest) = inner.commands.pop_front() {
                            inner.head -= 1;
                            inner.saved = match inner.saved {
                                Some(saved) if saved > 1 => Some(saved - 1),
                                _ => None,
                            };
                            discarded = Some(oldest.id_cloned());
                        }
                    }
                    debug!(id = id.as_deref(), "command committed");
                }
            }
        }
        ambient::uninstall();
        if let Some(oldest) = discarded {
            debug!(id = oldest.as_deref(), "oldest command discarded");
            self.emit(Event::Discarded { id: oldest });
        }
        self.emit(Event::Executed { id });
        Ok(())
    }

    /// Cancels the command in progress, rolling back every action recorded
    /// since [`begin_command`](History::begin_command).
    ///
    /// Emits [`Event::Cancelled`]. The command is discarded and the history
    /// is left as it was before the command was started.
    ///
    /// # Errors
    /// Returns [`Error::NoCommand`] when no command is in progress, or the
    /// error of a failing rollback.
    pub fn cancel_command(&self) -> Result {
        let id = {
            let inner = self.inner.try_borrow().map_err(|_| Error::Busy)?;
            match inner.current.as_ref() {
                Some(command) => command.id_cloned(),
                None => return Err(Error::NoCommand),
            }
        };
        self.emit(Event::Cancelled { id: id.clone() });
        let command = {
            let mut inner = self.inner.borrow_mut();
            inner.suspend_depth = 0;
            inner.current.take()
        };
        let result = match command {
            Some(command) => {
                debug!(id = id.as_deref(), "command cancelled");
                command.rollback()
            }
            None => Ok(()),
        };
        ambient::uninstall();
        result
    }

    /// Suspends the command in progress.
    ///
    /// While suspended, actions submitted through
    /// [`add_action`](crate::add_action) are applied without being recorded,
    /// so they will not be reversed by a later undo. Calls nest; the command
    /// records again once [`resume_command`](History::resume_command) has
    /// been called as many times. Does nothing when no command is in
    /// progress.
    pub fn suspend_command(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.current.is_some() {
            inner.suspend_depth += 1;
        }
    }

    /// Resumes the command in progress, canceling one
    /// [`suspend_command`](History::suspend_command) call.
    pub fn resume_command(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.current.is_some() {
            inner.suspend_depth = inner.suspend_depth.saturating_sub(1);
        }
    }

    /// Rolls back the command below the position and moves the position one
    /// step down. Emits [`Event::RolledBack`].
    ///
    /// # Errors
    /// Returns [`Error::Busy`] when a command is in progress on this thread,
    /// [`Error::NothingToUndo`] at the bottom of the history, or the error of
    /// a failing rollback.
    pub fn undo(&self) -> Result {
        if self.is_command_started() {
            return Err(Error::Busy);
        }
        if !ambient::install(self) {
            return Err(Error::Busy);
        }
        let result = (|| {
            let head = self.inner.borrow().head;
            if head == 0 {
                return Err(Error::NothingToUndo);
            }
            self.inner.borrow_mut().undoing = true;
            let result = self.go_to(head - 1);
            self.inner.borrow_mut().undoing = false;
            result
        })();
        ambient::uninstall();
        result
    }

    /// Executes the command above the position and moves the position one
    /// step up. Emits [`Event::Executed`].
    ///
    /// # Errors
    /// Returns [`Error::Busy`] when a command is in progress on this thread,
    /// [`Error::NothingToRedo`] at the top of the history, or the error of a
    /// failing execution.
    pub fn redo(&self) -> Result {
        if self.is_command_started() {
            return Err(Error::Busy);
        }
        if !ambient::install(self) {
            return Err(Error::Busy);
        }
        let result = (|| {
            let (head, len) = {
                let inner = self.inner.borrow();
                (inner.head, inner.commands.len())
            };
            if head == len {
                return Err(Error::NothingToRedo);
            }
            self.inner.borrow_mut().redoing = true;
            let result = self.go_to(head + 1);
            self.inner.borrow_mut().redoing = false;
            result
        })();
        ambient::uninstall();
        result
    }

    /// Repeatedly executes or rolls back commands until the position reaches
    /// `to`, which is clamped to the length of the history.
    ///
    /// Emits [`Event::Executed`] or [`Event::RolledBack`] for every command
    /// crossed. On failure the traversal stops and the position reflects the
    /// last command that completed.
    ///
    /// # Errors
    /// Returns [`Error::Busy`] when a command is in progress on this thread,
    /// or the error of the failing step.
    pub fn set_position(&self, to: usize) -> Result {
        if self.is_command_started() {
            return Err(Error::Busy);
        }
        if !ambient::install(self) {
            return Err(Error::Busy);
        }
        let len = self.inner.borrow().commands.len();
        let result = self.go_to(to.min(len));
        ambient::uninstall();
        result
    }

    /// Removes all commands from the history without reverting them and
    /// resets the position and the save point.
    ///
    /// # Errors
    /// Returns [`Error::Busy`] when a command is in progress.
    pub fn clear(&self) -> Result {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| Error::Busy)?;
        if inner.current.is_some() {
            return Err(Error::Busy);
        }
        inner.commands.clear();
        inner.head = 0;
        inner.saved = Some(0);
        debug!("history cleared");
        Ok(())
    }

    fn go_to(&self, to: usize) -> Result {
        loop {
            let (head, forward) = {
                let inner = self.inner.borrow();
                if inner.head == to {
                    return Ok(());
                }
                (inner.head, inner.head < to)
            };
            let index = if forward { head } else { head - 1 };
            let (handles, id) = {
                let inner = self.inner.borrow();
                let command = &inner.commands[index];
                (command.handles(), command.id_cloned())
            };
            trace!(index, forward, "crossing command");
            if forward {
                apply_all(&handles)?;
                self.inner.borrow_mut().head += 1;
                self.emit(Event::Executed { id });
            } else {
                revert_all(&handles)?;
                self.inner.borrow_mut().head -= 1;
                self.emit(Event::RolledBack { id });
            }
        }
    }

    /// Runs the connected slot with the history borrow released, so the
    /// observer may query the history and add actions.
    fn emit(&self, event: Event) {
        let slot = self.inner.borrow_mut().socket.disconnect();
        if let Some(mut slot) = slot {
            slot.on_emit(event);
            self.inner.borrow_mut().socket.connect(Some(slot));
        }
    }

    pub(crate) fn record(&self, action: impl Action + 'static) -> Result {
        let handle: ActionHandle = Rc::new(RefCell::new(action));
        {
            let mut inner = self.inner.try_borrow_mut().map_err(|_| Error::Busy)?;
            if inner.suspend_depth == 0 {
                if let Some(command) = inner.current.as_mut() {
                    command.push(handle.clone());
                }
            }
        }
        let result = handle.borrow_mut().apply();
        result
    }

    pub(crate) fn last_recorded(&self) -> Option<ActionHandle> {
        let inner = self.inner.try_borrow().ok()?;
        if inner.suspend_depth > 0 {
            return None;
        }
        inner.current.as_ref().and_then(Command::last_action)
    }
}

impl Clone for History {
    fn clone(&self) -> History {
        History {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for History {
    fn default() -> History {
        History::new()
    }
}

impl Debug for History {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("History")
            .field("len", &inner.commands.len())
            .field("position", &inner.head)
            .field("limit", &inner.limit)
            .field("saved", &inner.saved)
            .field("command_started", &inner.current.is_some())
            .finish()
    }
}

/// Builder for a [`History`].
///
/// # Examples
/// ```
/// use rewind::{Event, History};
///
/// let history = History::builder()
///     .limit(100)
///     .saved(false)
///     .connect(|event: Event| println!("{event:?}"))
///     .build();
/// assert_eq!(history.limit(), 100);
/// assert!(!history.is_saved());
/// ```
pub struct Builder {
    limit: usize,
    saved: bool,
    slot: Option<Box<dyn Slot>>,
}

impl Builder {
    /// Returns a builder for a history.
    pub fn new() -> Builder {
        Builder {
            limit: 0,
            saved: true,
            slot: None,
        }
    }

    /// Sets the size limit of the history, zero meaning unbounded.
    pub fn limit(mut self, limit: usize) -> Builder {
        self.limit = limit;
        self
    }

    /// Sets if the target is initially in a saved state.
    /// By default the target is in a saved state.
    pub fn saved(mut self, saved: bool) -> Builder {
        self.saved = saved;
        self
    }

    /// Connects the slot.
    pub fn connect(mut self, slot: impl Slot + 'static) -> Builder {
        self.slot = Some(Box::new(slot));
        self
    }

    /// Builds the history.
    pub fn build(self) -> History {
        History {
            inner: Rc::new(RefCell::new(Inner {
                commands: VecDeque::new(),
                head: 0,
                limit: self.limit,
                saved: self.saved.then_some(0),
                current: None,
                suspend_depth: 0,
                undoing: false,
                redoing: false,
                socket: Socket::new(self.slot),
            })),
        }
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}
