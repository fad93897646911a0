use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{DomainError, Error, Future, Promise};

/// Resolves once every input future has resolved.
///
/// The result is a success when no input failed. Otherwise it is a single
/// [`Error::JoinFailed`] domain error that only counts the failures; the
/// individual causes are not kept. Cancelled inputs count as neither.
///
/// Futures of other value types can be joined with [`Future::discard`] or
/// the [`join!`](crate::join!) macro.
pub fn join<I>(futures: I) -> Future<()>
where
    I: IntoIterator<Item = Future<()>>,
{
    let futures: Vec<Future<()>> = futures.into_iter().collect();
    let total = futures.len();
    if total == 0 {
        return Future::success(());
    }

    let (promise, joined) = Promise::new();
    let promise = Arc::new(promise);
    let remaining = Arc::new(AtomicUsize::new(total));
    let failed = Arc::new(AtomicUsize::new(0));

    for future in futures {
        let (on_error, on_fault) = (failed.clone(), failed.clone());
        let (remaining, failed, promise) = (remaining.clone(), failed.clone(), promise.clone());
        future
            .error(move |_| {
                on_error.fetch_add(1, Ordering::SeqCst);
            })
            .fault(move |_| {
                on_fault.fetch_add(1, Ordering::SeqCst);
            })
            .finally(move || {
                // Only the thread taking the count from one to zero resolves.
                if remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
                    return;
                }
                let failed = failed.load(Ordering::SeqCst);
                log::trace!("join settled: {} of {} failed", failed, total);
                if failed == 0 {
                    promise.complete(());
                } else {
                    promise.complete_with_error(DomainError::new(Error::JoinFailed {
                        failed,
                        total,
                    }));
                }
            });
    }
    joined
}

/// Joins futures of any value types. See [`join`].
///
/// ```
/// use promise_kit::{join, Future};
/// let joined = join!(Future::success(1u8), Future::success("two"));
/// assert!(joined.peek().unwrap().is_success());
/// ```
#[macro_export]
macro_rules! join {
    ($($future:expr),* $(,)?) => {
        $crate::join(::std::vec![$($crate::Future::discard(&$future)),*])
    };
}
