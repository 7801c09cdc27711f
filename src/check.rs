//! Ready-made access checks.

use std::thread::{self, ThreadId};

use thiserror::Error;

use crate::lazy::CheckedLazy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("accessed from thread {actual:?}, but only {expected:?} is allowed")]
    WrongThread { expected: ThreadId, actual: ThreadId },
    #[error("access denied: {0}")]
    Denied(String),
}

/// Tells which thread the caller is running on.
pub trait ThreadIdentity {
    fn current_thread(&self) -> ThreadId;
}

/// The identity the standard library reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentThread;

impl ThreadIdentity for CurrentThread {
    fn current_thread(&self) -> ThreadId {
        thread::current().id()
    }
}

impl<F> ThreadIdentity for F
where
    F: Fn() -> ThreadId,
{
    fn current_thread(&self) -> ThreadId {
        self()
    }
}

/// Fails unless the access happens on `expected`.
pub fn access_on(expected: ThreadId) -> impl Fn() -> Result<(), AccessError> {
    access_on_with(expected, CurrentThread)
}

pub fn access_on_with<I>(expected: ThreadId, identity: I) -> impl Fn() -> Result<(), AccessError>
where
    I: ThreadIdentity,
{
    move || {
        let actual = identity.current_thread();
        if actual == expected {
            Ok(())
        } else {
            Err(AccessError::WrongThread { expected, actual })
        }
    }
}

/// `Ok` when `condition` holds, `AccessError::Denied(message)` otherwise.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), AccessError> {
    if condition {
        Ok(())
    } else {
        Err(AccessError::Denied(message.into()))
    }
}

/// A lazy value only accessible from the thread that created it.
pub fn thread_lazy<T, F>(init: F) -> CheckedLazy<T, AccessError, F>
where
    F: FnOnce() -> T,
{
    CheckedLazy::checked(access_on(thread::current().id()), init)
}

/// A lazy value running `read_check` on every access.
///
/// As safe as `read_check` is: a check that always passes gives an
/// unsynchronized lazy value.
pub fn checked_lazy<T, E, C, F>(read_check: C, init: F) -> CheckedLazy<T, E, F>
where
    C: Fn() -> Result<(), E> + Send + 'static,
    F: FnOnce() -> T,
{
    CheckedLazy::checked(read_check, init)
}
