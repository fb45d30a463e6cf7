// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small helpers shared by the AWG and capture controllers.

use std::collections::HashSet;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::error::TimeoutError;

/// De-duplicate a variadic ID list while preserving first-seen order.
pub fn dedup_ordered<T: Eq + Hash + Copy>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(*item) {
            out.push(*item);
        }
    }
    out
}

/// Poll `predicate` every `interval` until it reports every id satisfied or
/// `timeout` elapses. `predicate` returns the subset of ids still not
/// satisfied (closing over whatever id list it's checking); an empty
/// subset means success.
pub fn poll_until_empty<T, E>(
    operation: &'static str,
    timeout: Duration,
    interval: Duration,
    mut predicate: impl FnMut() -> Result<Vec<T>, E>,
) -> Result<(), ErrOrTimeout<E>>
where
    T: Into<u32>,
{
    let start = Instant::now();
    loop {
        let pending = predicate().map_err(ErrOrTimeout::Other)?;
        if pending.is_empty() {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(ErrOrTimeout::Timeout(TimeoutError {
                operation,
                pending_ids: pending.into_iter().map(Into::into).collect(),
                waited: start.elapsed(),
            }));
        }
        std::thread::sleep(interval);
    }
}

/// Either a caller-supplied error or a [`TimeoutError`], used by
/// [`poll_until_empty`] so it can be generic over what `predicate` fails with.
#[derive(Debug)]
pub enum ErrOrTimeout<E> {
    Other(E),
    Timeout(TimeoutError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_seen_order() {
        assert_eq!(dedup_ordered(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn poll_until_empty_succeeds_once_predicate_is_empty() {
        let mut calls = 0;
        let result: Result<(), ErrOrTimeout<()>> = poll_until_empty(
            "test_op",
            Duration::from_millis(100),
            Duration::from_millis(1),
            || {
                calls += 1;
                Ok(if calls < 3 { vec![1u32] } else { vec![] })
            },
        );
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_until_empty_times_out() {
        let result: Result<(), ErrOrTimeout<()>> = poll_until_empty(
            "test_op",
            Duration::from_millis(20),
            Duration::from_millis(5),
            || Ok(vec![1u32]),
        );
        match result {
            Err(ErrOrTimeout::Timeout(e)) => assert_eq!(e.operation, "test_op"),
            _ => panic!("expected timeout"),
        }
    }
}
