/*!
Lazily evaluated values guarded by an access check.

A `CheckedLazy` holds an initializer and computes its value on first access,
like any lazy value. On top of that it runs a caller-supplied check before
every access, so that rules such as "only touch this from the thread that
owns it" are enforced each time the value is read.

# Semantic

`CheckedLazy::get` runs the check and returns the value, computing it first
if needed. The initializer runs at most once, or for a fallible one, until
it first succeeds.

- `read_check` runs on every access.
- `first_access_check`, if given, replaces `read_check` on the access that
  computes the value, and is dropped afterwards together with the
  initializer.
- A check that returns `Err` makes `get` return that same error. The cell
  stays as it was, so a later `get` may succeed once the check passes. The
  same holds for a check that panics.

`is_initialized`, `describe` and the `Display`/`Debug` impls never run a check
and never compute the value. Before initialization `describe` returns
`NOT_INITIALIZED`.

# Example

Counting how often the initializer runs:

```rust
extern crate checked_lazy;

use std::cell::Cell;
use std::rc::Rc;
use checked_lazy::CheckedLazy;

fn main() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let answer = CheckedLazy::new(move || {
        counter.set(counter.get() + 1);
        42
    });

    assert!(!answer.is_initialized());
    assert_eq!(answer.describe(), "Lazy value not initialized yet.");
    assert_eq!(*answer.get().unwrap(), 42);
    assert_eq!(*answer.get().unwrap(), 42);
    assert_eq!(runs.get(), 1);
    assert_eq!(answer.describe(), "42");
}
```

Pinned to the creating thread:

```rust
extern crate checked_lazy;

use checked_lazy::{thread_lazy, AccessError};

fn main() {
    let names = thread_lazy(|| vec!["foo", "bar", "baz"]);
    assert_eq!(names.get().unwrap().len(), 3);

    let expected = std::thread::current().id();
    let other = std::thread::spawn(|| std::thread::current().id()).join().unwrap();
    let check = checked_lazy::access_on_with(expected, move || other);
    assert!(matches!(check(), Err(AccessError::WrongThread { .. })));
}
```

# Implementation details

The state lives in an `UnsafeCell` holding either the initializer (with the
first-access check), the computed value, or a busy marker while user code
runs. That makes the cell `!Sync`: shared access from several threads does
not compile. Checks are required to be `Send`, so a cell whose value and
initializer are `Send` can still be moved to another thread, and that move
is what the thread checks catch.

Re-entering `get` from the cell's own check or initializer panics. A check
that panics leaves the cell as it was. An `FnOnce` initializer is consumed by
the access that runs it, so if it panics every later access panics too.

# Fallible initializers

`CheckedLazy::try_new` takes an `FnMut() -> Result<T, E>`. `try_get` returns
its error like a check's, leaves the cell uninitialized, and runs it again on
the next access. The initializer is dropped once it succeeds.

```rust
extern crate checked_lazy;

use checked_lazy::CheckedLazy;

fn main() {
    let mut attempts = 0;
    let port = CheckedLazy::try_new(move || {
        attempts += 1;
        if attempts < 2 { Err("busy") } else { Ok(8080) }
    });

    assert_eq!(port.try_get(), Err("busy"));
    assert!(!port.is_initialized());
    assert_eq!(port.try_get(), Ok(&8080));
}
```
*/

pub use self::check::{
    access_on, access_on_with, checked_lazy, ensure, thread_lazy, AccessError, CurrentThread,
    ThreadIdentity,
};
pub use self::lazy::{Check, CheckedLazy, NOT_INITIALIZED};

mod check;
mod lazy;
