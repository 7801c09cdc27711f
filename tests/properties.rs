extern crate checked_lazy;
extern crate proptest;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use checked_lazy::{ensure, AccessError, CheckedLazy, NOT_INITIALIZED};
use proptest::prelude::*;

proptest! {
    #[test]
    fn initializer_runs_once(value in any::<i64>(), reads in 1usize..64) {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = runs.clone();
        let lazy = CheckedLazy::new(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            value
        });

        for _ in 0..reads {
            prop_assert_eq!(lazy.get(), Ok(&value));
        }
        prop_assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn always_failing_check_never_initializes(attempts in 0usize..32) {
        let lazy = CheckedLazy::checked(|| ensure(false, "denied"), || 0u8);
        for _ in 0..attempts {
            prop_assert_eq!(lazy.get(), Err(AccessError::Denied("denied".into())));
        }
        prop_assert!(!lazy.is_initialized());
        prop_assert_eq!(lazy.describe(), NOT_INITIALIZED);
    }

    // Each step says whether the external condition allows the access.
    #[test]
    fn first_passing_check_initializes(steps in proptest::collection::vec(any::<bool>(), 1..32)) {
        let allowed = Arc::new(AtomicBool::new(false));
        let first_calls = Arc::new(AtomicUsize::new(0));
        let read_calls = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let lazy: CheckedLazy<String, AccessError, _> = {
            let allowed_first = allowed.clone();
            let allowed_read = allowed.clone();
            let first_calls = first_calls.clone();
            let read_calls = read_calls.clone();
            let runs = runs.clone();
            CheckedLazy::with_checks(
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    "ready".to_string()
                },
                Some(Box::new(move || {
                    read_calls.fetch_add(1, Ordering::SeqCst);
                    ensure(allowed_read.load(Ordering::SeqCst), "read")
                })),
                Some(Box::new(move || {
                    first_calls.fetch_add(1, Ordering::SeqCst);
                    ensure(allowed_first.load(Ordering::SeqCst), "first")
                })),
            )
        };

        let first_success = steps.iter().position(|ok| *ok);
        for (i, ok) in steps.iter().enumerate() {
            allowed.store(*ok, Ordering::SeqCst);
            let result = lazy.get().map(|s| s.clone());
            if *ok {
                prop_assert_eq!(result, Ok("ready".to_string()));
            } else if first_success.map_or(true, |f| i < f) {
                prop_assert_eq!(result, Err(AccessError::Denied("first".into())));
            } else {
                prop_assert_eq!(result, Err(AccessError::Denied("read".into())));
            }
        }

        match first_success {
            Some(f) => {
                prop_assert!(lazy.is_initialized());
                prop_assert_eq!(runs.load(Ordering::SeqCst), 1);
                prop_assert_eq!(first_calls.load(Ordering::SeqCst), f + 1);
                prop_assert_eq!(read_calls.load(Ordering::SeqCst), steps.len() - f - 1);
                prop_assert_eq!(lazy.describe(), "ready");
            }
            None => {
                prop_assert!(!lazy.is_initialized());
                prop_assert_eq!(runs.load(Ordering::SeqCst), 0);
                prop_assert_eq!(read_calls.load(Ordering::SeqCst), 0);
                prop_assert_eq!(lazy.describe(), NOT_INITIALIZED);
            }
        }
    }

    // Each step says whether the initializer succeeds when it runs.
    #[test]
    fn fallible_initializer_runs_until_success(steps in proptest::collection::vec(any::<bool>(), 1..32)) {
        let outcomes = steps.clone();
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = runs.clone();
        let lazy = CheckedLazy::try_new(move || {
            let n = runs.fetch_add(1, Ordering::SeqCst);
            if outcomes[n] { Ok(n) } else { Err(n) }
        });

        let first_success = steps.iter().position(|ok| *ok);
        for (i, ok) in steps.iter().enumerate() {
            let result = lazy.try_get().map(|v| *v);
            match first_success {
                Some(f) if i >= f => {
                    prop_assert_eq!(result, Ok(f));
                }
                _ => {
                    prop_assert!(!*ok);
                    prop_assert_eq!(result, Err(i));
                }
            }
        }

        let expected_runs = first_success.map_or(steps.len(), |f| f + 1);
        prop_assert_eq!(seen.load(Ordering::SeqCst), expected_runs);
        prop_assert_eq!(lazy.is_initialized(), first_success.is_some());
    }
}
