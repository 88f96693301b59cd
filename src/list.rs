//! An ordered collection whose structural mutations are captured on the
//! bound history.

use crate::{ambient, Action, Error, ObserverError, Result};
use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::slice;

/// A structural change notification of a [`List`].
#[derive(Clone, Copy, Debug)]
pub enum ListEvent<'a, T> {
    /// Items were inserted at `index`.
    Added {
        /// The position of the first inserted item.
        index: usize,
        /// The inserted items.
        items: &'a [T],
    },
    /// Items were removed from `index`.
    Removed {
        /// The position the items were removed from.
        index: usize,
        /// The removed items.
        items: &'a [T],
    },
    /// Items starting at `index` were replaced.
    Replaced {
        /// The position of the first replaced item.
        index: usize,
        /// The items that were replaced.
        old: &'a [T],
        /// The items that took their place.
        new: &'a [T],
    },
    /// The list was emptied.
    Cleared {
        /// The items the list held before it was emptied.
        items: &'a [T],
    },
}

/// The observer callback of a [`List`].
///
/// The callback runs synchronously after the storage has been mutated. When
/// it returns an error, the mutation is undone before the error reaches the
/// caller as [`Error::Observer`].
pub type ListSlot<T> = Box<dyn FnMut(ListEvent<T>) -> core::result::Result<(), ObserverError>>;

struct ListInner<T> {
    items: Vec<T>,
    read_only: bool,
    slot: Option<ListSlot<T>>,
}

/// An ordered container of `T` participating in undo-redo.
///
/// Every structural mutation records a reversible range operation on the
/// command in progress of the thread's bound history; without a bound
/// history the mutation is applied directly. Reads never touch the history.
///
/// A `List` is a cheap, cloneable handle; clones share the same storage.
///
/// # Examples
/// ```
/// use rewind::{History, List};
///
/// # fn main() -> rewind::Result {
/// let history = History::new();
/// let items = List::from_vec(vec![1, 2, 3]);
///
/// history.begin_command("edit")?;
/// items.remove_at(0)?;
/// items.insert(1, 9)?;
/// history.end_command(false)?;
/// assert_eq!(items.to_vec(), [2, 9, 3]);
///
/// history.undo()?;
/// assert_eq!(items.to_vec(), [1, 2, 3]);
/// history.redo()?;
/// assert_eq!(items.to_vec(), [2, 9, 3]);
/// # Ok(())
/// # }
/// ```
pub struct List<T> {
    inner: Rc<RefCell<ListInner<T>>>,
}

impl<T: Clone + 'static> List<T> {
    /// Returns a new, empty list.
    pub fn new() -> List<T> {
        List::from_vec(Vec::new())
    }

    /// Returns a new list holding `items`.
    pub fn from_vec(items: Vec<T>) -> List<T> {
        List {
            inner: Rc::new(RefCell::new(ListInner {
                items,
                read_only: false,
                slot: None,
            })),
        }
    }

    /// Returns a new read-only list holding `items`.
    ///
    /// Every structural mutation on the list fails with
    /// [`Error::ReadOnly`].
    pub fn read_only(items: Vec<T>) -> List<T> {
        List {
            inner: Rc::new(RefCell::new(ListInner {
                items,
                read_only: true,
                slot: None,
            })),
        }
    }

    /// Returns the number of items in the list.
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Returns `true` if the list rejects structural mutations.
    pub fn is_read_only(&self) -> bool {
        self.inner.borrow().read_only
    }

    /// Returns a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Accesses the items by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Returns a clone of the items.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    /// Returns `true` if the list contains `item`.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.inner.borrow().items.contains(item)
    }

    /// Returns the position of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.inner.borrow().items.iter().position(|x| x == item)
    }

    /// Appends `item` to the list.
    pub fn add(&self, item: T) -> Result {
        self.writable()?;
        let index = self.len();
        self.submit(Op::Insert {
            index,
            items: vec![item],
        })
    }

    /// Appends every item of `items` to the list.
    pub fn add_range(&self, items: Vec<T>) -> Result {
        self.writable()?;
        if items.is_empty() {
            return Ok(());
        }
        let index = self.len();
        self.submit(Op::Insert { index, items })
    }

    /// Inserts `item` at `index`.
    pub fn insert(&self, index: usize, item: T) -> Result {
        self.insert_range(index, vec![item])
    }

    /// Inserts every item of `items` at `index`.
    pub fn insert_range(&self, index: usize, items: Vec<T>) -> Result {
        self.writable()?;
        let len = self.len();
        if index > len {
            return Err(Error::OutOfRange { index, len });
        }
        if items.is_empty() {
            return Ok(());
        }
        self.submit(Op::Insert { index, items })
    }

    /// Removes the item at `index` and returns it.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.writable()?;
        let item = self.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.len(),
        })?;
        self.submit(Op::Remove {
            index,
            items: vec![item.clone()],
        })?;
        Ok(item)
    }

    /// Removes `count` items starting at `index`.
    pub fn remove_range(&self, index: usize, count: usize) -> Result {
        self.writable()?;
        let len = self.len();
        let end = index
            .checked_add(count)
            .filter(|&end| end <= len)
            .ok_or(Error::OutOfRange { index, len })?;
        if count == 0 {
            return Ok(());
        }
        let items = self.inner.borrow().items[index..end].to_vec();
        self.submit(Op::Remove { index, items })
    }

    /// Removes the first item equal to `item`.
    ///
    /// Returns `Ok(false)` without recording anything when no such item
    /// exists.
    pub fn remove(&self, item: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        self.writable()?;
        let Some(index) = self.index_of(item) else {
            return Ok(false);
        };
        let removed = self.inner.borrow().items[index].clone();
        self.submit(Op::Remove {
            index,
            items: vec![removed],
        })?;
        Ok(true)
    }

    /// Replaces the item at `index` with `item`.
    pub fn set(&self, index: usize, item: T) -> Result {
        self.writable()?;
        let old = self.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.len(),
        })?;
        self.submit(Op::Replace {
            index,
            old,
            new: item,
        })
    }

    /// Replaces the whole contents of the list with `items`.
    ///
    /// A single [`ListEvent::Replaced`] carrying both the old and the new
    /// contents is emitted.
    pub fn replace_all(&self, items: Vec<T>) -> Result {
        self.writable()?;
        let old = self.to_vec();
        self.submit(Op::ReplaceAll { old, new: items })
    }

    /// Removes every item from the list.
    pub fn clear(&self) -> Result {
        self.writable()?;
        let old = self.to_vec();
        self.submit(Op::Clear { old })
    }

    /// Sets how structural changes should be handled.
    ///
    /// The previous slot is returned if it exists.
    pub fn connect(
        &self,
        slot: impl FnMut(ListEvent<T>) -> core::result::Result<(), ObserverError> + 'static,
    ) -> Option<ListSlot<T>> {
        self.inner.borrow_mut().slot.replace(Box::new(slot))
    }

    /// Removes and returns the slot if it exists.
    pub fn disconnect(&self) -> Option<ListSlot<T>> {
        self.inner.borrow_mut().slot.take()
    }

    fn writable(&self) -> Result {
        if self.inner.borrow().read_only {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn submit(&self, op: Op<T>) -> Result {
        ambient::add_action(Edit {
            list: Rc::clone(&self.inner),
            op,
        })
    }
}

impl<T: Clone + 'static> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> List<T> {
        List::from_vec(items)
    }
}

impl<T: Clone + 'static> Default for List<T> {
    fn default() -> List<T> {
        List::new()
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> List<T> {
        List {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for List<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("List")
            .field("items", &inner.items)
            .field("read_only", &inner.read_only)
            .finish()
    }
}

/// The closed set of reversible structural operations.
enum Op<T> {
    Insert { index: usize, items: Vec<T> },
    Remove { index: usize, items: Vec<T> },
    Replace { index: usize, old: T, new: T },
    ReplaceAll { old: Vec<T>, new: Vec<T> },
    Clear { old: Vec<T> },
}

/// The reversible edit behind every [`List`] mutator.
struct Edit<T> {
    list: Rc<RefCell<ListInner<T>>>,
    op: Op<T>,
}

impl<T: Clone + 'static> Action for Edit<T> {
    fn apply(&mut self) -> Result {
        match &self.op {
            Op::Insert { index, items } => insert(&self.list, *index, items),
            Op::Remove { index, items } => remove(&self.list, *index, items),
            Op::Replace { index, old, new } => replace(&self.list, *index, old, new),
            Op::ReplaceAll { old, new } => replace_all(&self.list, old, new),
            Op::Clear { old } => empty(&self.list, old),
        }
    }

    fn revert(&mut self) -> Result {
        match &self.op {
            Op::Insert { index, items } => remove(&self.list, *index, items),
            Op::Remove { index, items } => insert(&self.list, *index, items),
            Op::Replace { index, old, new } => replace(&self.list, *index, new, old),
            Op::ReplaceAll { old, new } => replace_all(&self.list, new, old),
            Op::Clear { old } => insert(&self.list, 0, old),
        }
    }
}

fn insert<T: Clone>(list: &Rc<RefCell<ListInner<T>>>, index: usize, items: &[T]) -> Result {
    list.borrow_mut()
        .items
        .splice(index..index, items.iter().cloned());
    if let Err(err) = notify(list, ListEvent::Added { index, items }) {
        list.borrow_mut().items.drain(index..index + items.len());
        return Err(err);
    }
    Ok(())
}

fn remove<T: Clone>(list: &Rc<RefCell<ListInner<T>>>, index: usize, items: &[T]) -> Result {
    list.borrow_mut().items.drain(index..index + items.len());
    if let Err(err) = notify(list, ListEvent::Removed { index, items }) {
        list.borrow_mut()
            .items
            .splice(index..index, items.iter().cloned());
        return Err(err);
    }
    Ok(())
}

fn replace<T: Clone>(list: &Rc<RefCell<ListInner<T>>>, index: usize, old: &T, new: &T) -> Result {
    list.borrow_mut().items[index] = new.clone();
    let event = ListEvent::Replaced {
        index,
        old: slice::from_ref(old),
        new: slice::from_ref(new),
    };
    if let Err(err) = notify(list, event) {
        list.borrow_mut().items[index] = old.clone();
        return Err(err);
    }
    Ok(())
}

fn replace_all<T: Clone>(list: &Rc<RefCell<ListInner<T>>>, old: &[T], new: &[T]) -> Result {
    list.borrow_mut().items = new.to_vec();
    if let Err(err) = notify(list, ListEvent::Replaced { index: 0, old, new }) {
        list.borrow_mut().items = old.to_vec();
        return Err(err);
    }
    Ok(())
}

fn empty<T: Clone>(list: &Rc<RefCell<ListInner<T>>>, old: &[T]) -> Result {
    list.borrow_mut().items.clear();
    if let Err(err) = notify(list, ListEvent::Cleared { items: old }) {
        list.borrow_mut().items = old.to_vec();
        return Err(err);
    }
    Ok(())
}

/// Runs the slot with the list borrow released, so the observer may read the
/// list and reach the history.
fn notify<T>(inner: &Rc<RefCell<ListInner<T>>>, event: ListEvent<T>) -> Result {
    let slot = inner.borrow_mut().slot.take();
    let Some(mut slot) = slot else {
        return Ok(());
    };
    let result = slot(event);
    inner.borrow_mut().slot = Some(slot);
    result.map_err(Error::Observer)
}
