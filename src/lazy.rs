use std::cell::UnsafeCell;
use std::fmt;
use std::mem;

use log::{debug, trace};

use crate::check::AccessError;

/// What `describe` and `Display` print before the value has been computed.
pub const NOT_INITIALIZED: &str = "Lazy value not initialized yet.";

/// An access check. Returning `Err` denies the access.
///
/// Checks are `Send` so that a cell can be moved to another thread when its
/// value and initializer allow it, which is what thread checks look for.
pub type Check<E> = Box<dyn Fn() -> Result<(), E> + Send>;

enum State<T, F, E> {
    Uninit {
        init: F,
        first_access_check: Option<Check<E>>,
    },
    // Taken out of `Uninit` while the checks and the initializer run. Only a
    // panicking `FnOnce` initializer leaves the cell in this state.
    Busy,
    Init(T),
}

/// A value computed on first access, with a check run before every access.
///
/// On the first access `first_access_check` runs if there is one, otherwise
/// `read_check`. Every later access runs `read_check`. A check that fails,
/// by returning `Err` or by panicking, leaves the cell untouched, so the
/// access can be retried once the condition the check looks at has changed.
///
/// The initializer is either an `FnOnce() -> T`, read through `get`, or an
/// `FnMut() -> Result<T, E>`, read through `try_get` and kept until it first
/// succeeds.
///
/// Without any check this behaves like an unsynchronized lazy value: the
/// cell is `!Sync`, and nothing stops it from being moved to another thread
/// if `T` and `F` are `Send`. Pass `access_on` as `read_check` to pin it to
/// one thread.
pub struct CheckedLazy<T, E = AccessError, F = fn() -> T> {
    state: UnsafeCell<State<T, F, E>>,
    read_check: Option<Check<E>>,
}

impl<T, F> CheckedLazy<T, AccessError, F>
where
    F: FnOnce() -> T,
{
    /// A cell without any check.
    pub fn new(init: F) -> Self {
        CheckedLazy::with_checks(init, None, None)
    }
}

impl<T, E, F> CheckedLazy<T, E, F>
where
    F: FnOnce() -> T,
{
    /// A cell that runs `read_check` on every access, the first included.
    pub fn checked<C>(read_check: C, init: F) -> Self
    where
        C: Fn() -> Result<(), E> + Send + 'static,
    {
        CheckedLazy::with_checks(init, Some(Box::new(read_check)), None)
    }

    /// Runs the access check, then returns the value, computing it first if
    /// this is the first access that got past its check.
    ///
    /// Errors from the checks are returned as is.
    ///
    /// # Panics
    ///
    /// If called again from inside this cell's own check or initializer, or
    /// after the initializer panicked. The initializer is consumed by the
    /// call, so a cell whose initializer panicked cannot be retried; use
    /// `try_new` for an initializer that may fail.
    pub fn get(&self) -> Result<&T, E> {
        if let Some(value) = self.peek() {
            self.run_read_check()?;
            return Ok(value);
        }

        let mut pending = Pending::take(self);
        pending.check()?;
        let init = match pending.init.take() {
            Some(init) => init,
            None => unreachable!("pending CheckedLazy without initializer"),
        };
        let value = init();
        Ok(pending.finish(value))
    }
}

impl<T, E, F> CheckedLazy<T, E, F>
where
    F: FnMut() -> Result<T, E>,
{
    /// A cell whose initializer may fail. Until it succeeds it stays in the
    /// cell and runs again on the next access.
    pub fn try_new(init: F) -> Self {
        CheckedLazy::with_checks(init, None, None)
    }

    pub fn try_checked<C>(read_check: C, init: F) -> Self
    where
        C: Fn() -> Result<(), E> + Send + 'static,
    {
        CheckedLazy::with_checks(init, Some(Box::new(read_check)), None)
    }

    /// Like `get`, with the initializer's error returned the same way a
    /// check's is. A failing or panicking initializer leaves the cell
    /// uninitialized.
    pub fn try_get(&self) -> Result<&T, E> {
        if let Some(value) = self.peek() {
            self.run_read_check()?;
            return Ok(value);
        }

        let mut pending = Pending::take(self);
        pending.check()?;
        let init = match pending.init.as_mut() {
            Some(init) => init,
            None => unreachable!("pending CheckedLazy without initializer"),
        };
        let value = init().map_err(|err| {
            debug!("checked lazy initializer failed");
            err
        })?;
        Ok(pending.finish(value))
    }
}

impl<T, E, F> CheckedLazy<T, E, F> {
    pub fn with_checks(
        init: F,
        read_check: Option<Check<E>>,
        first_access_check: Option<Check<E>>,
    ) -> Self {
        CheckedLazy {
            state: UnsafeCell::new(State::Uninit {
                init,
                first_access_check,
            }),
            read_check,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.peek().is_some()
    }

    /// Mutable access to the value if it was computed. No check runs: holding
    /// `&mut self` already rules out any other accessor.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self.state.get_mut() {
            State::Init(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.state.into_inner() {
            State::Init(value) => Some(value),
            _ => None,
        }
    }

    fn peek(&self) -> Option<&T> {
        // `Init` is never replaced through `&self`.
        match unsafe { &*self.state.get() } {
            State::Init(value) => Some(value),
            _ => None,
        }
    }

    fn run_read_check(&self) -> Result<(), E> {
        match &self.read_check {
            Some(check) => check().map_err(|err| {
                debug!("checked lazy access denied");
                err
            }),
            None => Ok(()),
        }
    }
}

/// The initializer and first-access check, moved out of the cell for the
/// duration of a first access. Dropping it while it still holds the
/// initializer puts both back, so an `Err` or a panic from a check or a
/// fallible initializer leaves the cell as it was.
struct Pending<'a, T, E, F> {
    lazy: &'a CheckedLazy<T, E, F>,
    init: Option<F>,
    first_access_check: Option<Check<E>>,
}

impl<'a, T, E, F> Pending<'a, T, E, F> {
    #[cold]
    fn take(lazy: &'a CheckedLazy<T, E, F>) -> Self {
        // Nothing borrows the state while it is not `Init`, and user code only
        // runs once it has been moved out, so a re-entrant `get` sees `Busy`.
        let state = unsafe { mem::replace(&mut *lazy.state.get(), State::Busy) };
        match state {
            State::Uninit {
                init,
                first_access_check,
            } => Pending {
                lazy,
                init: Some(init),
                first_access_check,
            },
            State::Busy => {
                panic!("CheckedLazy re-entered during initialization or poisoned by a panic")
            }
            State::Init(_) => unreachable!("first access on a computed CheckedLazy"),
        }
    }

    fn check(&self) -> Result<(), E> {
        match &self.first_access_check {
            Some(check) => check().map_err(|err| {
                debug!("checked lazy first access denied");
                err
            }),
            None => self.lazy.run_read_check(),
        }
    }

    fn finish(mut self, value: T) -> &'a T {
        let init = self.init.take();
        let first_access_check = self.first_access_check.take();
        unsafe {
            *self.lazy.state.get() = State::Init(value);
        }
        trace!("checked lazy value initialized");
        // Dropped only once the value is in place.
        drop((init, first_access_check));
        match self.lazy.peek() {
            Some(value) => value,
            None => unreachable!("CheckedLazy state was just set"),
        }
    }
}

impl<T, E, F> Drop for Pending<'_, T, E, F> {
    fn drop(&mut self) {
        if let Some(init) = self.init.take() {
            let first_access_check = self.first_access_check.take();
            unsafe {
                *self.lazy.state.get() = State::Uninit {
                    init,
                    first_access_check,
                };
            }
        }
    }
}

impl<T: fmt::Display, E, F> CheckedLazy<T, E, F> {
    /// The value's `Display` text, or `NOT_INITIALIZED`. Never runs a check
    /// and never computes the value.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl<T: fmt::Display, E, F> fmt::Display for CheckedLazy<T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match unsafe { &*self.state.get() } {
            State::Init(value) => fmt::Display::fmt(value, f),
            _ => f.write_str(NOT_INITIALIZED),
        }
    }
}

impl<T: fmt::Debug, E, F> fmt::Debug for CheckedLazy<T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_tuple("CheckedLazy");
        match unsafe { &*self.state.get() } {
            State::Init(value) => d.field(value),
            _ => d.field(&format_args!("<uninit>")),
        };
        d.finish()
    }
}
