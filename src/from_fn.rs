use crate::{Action, Result};

/// Action made from a pair of functions.
///
/// The first function performs the forward mutation, the second its inverse.
///
/// # Examples
/// ```
/// # use std::cell::Cell;
/// # use std::rc::Rc;
/// use rewind::{FromFn, History};
///
/// # fn main() -> rewind::Result {
/// let flag = Rc::new(Cell::new(false));
/// let history = History::new();
///
/// history.begin_command("toggle")?;
/// let (on, off) = (flag.clone(), flag.clone());
/// rewind::add_action(FromFn::new(
///     move || Ok(on.set(true)),
///     move || Ok(off.set(false)),
/// ))?;
/// history.end_command(false)?;
/// assert!(flag.get());
///
/// history.undo()?;
/// assert!(!flag.get());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FromFn<A, R> {
    apply: A,
    revert: R,
}

impl<A, R> FromFn<A, R> {
    /// Creates a new `FromFn` from the two functions.
    pub fn new(apply: A, revert: R) -> Self {
        FromFn { apply, revert }
    }
}

impl<A, R> Action for FromFn<A, R>
where
    A: FnMut() -> Result,
    R: FnMut() -> Result,
{
    fn apply(&mut self) -> Result {
        (self.apply)()
    }

    fn revert(&mut self) -> Result {
        (self.revert)()
    }
}
