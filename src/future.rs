use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::{DomainError, ExecutionContext, Fault, Outcome, PendingQueue, Promise};

/// A closure run once with the resolved outcome of a [`Future`].
pub(crate) type Reaction<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Runs one reaction. A panic is logged and contained so the reactions queued
/// behind it still run and the resolving caller is not unwound.
fn react<T>(reaction: Reaction<T>, outcome: Outcome<T>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || reaction(outcome))) {
        log::error!("reaction panicked: {}", Fault::from_panic(payload));
    }
}

/// Read-side handle to a value that resolves at most once.
///
/// Clones share the same state. Reactions registered with [`then`],
/// [`error`], [`fault`] and [`finally`] run exactly once: at resolution if
/// they were registered before it, immediately otherwise.
///
/// Reactions that run inline do so while the future's lock is held. Such a
/// reaction must not register on, or resolve, the future it belongs to.
///
/// # Examples
///
/// ```
/// use promise_kit::{Future, Promise};
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, future) = Promise::<u32>::new();
/// let doubled = future.then(|n| n * 2);
/// let task1 = thread::spawn(move || promise.complete(21));
/// assert_eq!(block_on(doubled.outcome()).into_value(), Some(42));
/// task1.join().expect("The task1 thread has panicked");
/// ```
///
/// [`then`]: Future::then
/// [`error`]: Future::error
/// [`fault`]: Future::fault
/// [`finally`]: Future::finally
pub struct Future<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

struct Inner<T> {
    outcome: Option<Outcome<T>>,
    pending: PendingQueue<Reaction<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Future {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Future<T> {
    pub(crate) fn pending() -> Future<T> {
        Future {
            inner: Arc::new(Mutex::new(Inner {
                outcome: None,
                pending: PendingQueue::new(),
            })),
        }
    }

    /// A reaction panicking under the lock must not wedge every other handle.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().outcome.is_some()
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}

impl<T> Future<T>
where
    T: Clone + Send + 'static,
{
    pub fn resolved(outcome: Outcome<T>) -> Future<T> {
        let future = Future::pending();
        future.resolve(outcome);
        future
    }

    pub fn success(value: T) -> Future<T> {
        Future::resolved(Outcome::Success(value))
    }

    pub fn failure<E>(err: E) -> Future<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Future::resolved(Outcome::DomainError(DomainError::new(err)))
    }

    pub fn faulted(fault: Fault) -> Future<T> {
        Future::resolved(Outcome::Fault(fault))
    }

    pub fn cancelled() -> Future<T> {
        Future::resolved(Outcome::Cancelled)
    }

    /// Returns a copy of the outcome, if the future has resolved.
    pub fn peek(&self) -> Option<Outcome<T>> {
        self.lock().outcome.clone()
    }

    /// Stores `outcome` and runs every queued reaction in registration order.
    ///
    /// Only the first call has any effect. Returns whether this call resolved
    /// the future.
    pub(crate) fn resolve(&self, outcome: Outcome<T>) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.outcome.is_some() {
            log::trace!("ignoring {:?} for an already resolved future", outcome.kind());
            return false;
        }
        log::trace!(
            "resolving future as {:?} with {} pending reactions",
            outcome.kind(),
            inner.pending.len()
        );
        let outcome = inner.outcome.insert(outcome);
        while let Some(reaction) = inner.pending.dequeue() {
            react(reaction, outcome.clone());
        }
        true
    }

    /// Runs `reaction` now if resolved, otherwise queues it for resolution.
    fn register(&self, reaction: Reaction<T>) {
        let mut inner = self.lock();
        if let Some(outcome) = inner.outcome.clone() {
            react(reaction, outcome);
            return;
        }
        inner.pending.enqueue(reaction);
    }

    /// [`then_on`](Future::then_on) with [`ExecutionContext::Current`].
    pub fn then<K, F>(&self, f: F) -> Future<K>
    where
        K: Clone + Send + 'static,
        F: FnOnce(T) -> K + Send + 'static,
    {
        self.then_on(ExecutionContext::Current, f)
    }

    /// Maps a success value through `f`, run on `context`.
    ///
    /// Failures and cancellation are forwarded to the returned future without
    /// calling `f`. A panic in `f` resolves the returned future with a fault.
    pub fn then_on<K, F>(&self, context: ExecutionContext, f: F) -> Future<K>
    where
        K: Clone + Send + 'static,
        F: FnOnce(T) -> K + Send + 'static,
    {
        let (promise, future) = Promise::new();
        self.register(context.adapt(move |outcome: Outcome<T>| {
            let mapped = match panic::catch_unwind(AssertUnwindSafe(move || outcome.map(f))) {
                Ok(mapped) => mapped,
                Err(payload) => Outcome::Fault(Fault::from_panic(payload)),
            };
            promise.complete_with(mapped);
        }));
        future
    }

    /// [`and_then_on`](Future::and_then_on) with [`ExecutionContext::Current`].
    pub fn and_then<K, F>(&self, f: F) -> Future<K>
    where
        K: Clone + Send + 'static,
        F: FnOnce(T) -> Future<K> + Send + 'static,
    {
        self.and_then_on(ExecutionContext::Current, f)
    }

    /// Chains a dependent computation: on success `f` runs on `context` and
    /// the returned future settles with whatever `f`'s future settles with.
    /// A panic in `f` resolves the returned future with a fault.
    pub fn and_then_on<K, F>(&self, context: ExecutionContext, f: F) -> Future<K>
    where
        K: Clone + Send + 'static,
        F: FnOnce(T) -> Future<K> + Send + 'static,
    {
        let (promise, future) = Promise::new();
        self.register(context.adapt(move |outcome: Outcome<T>| match outcome {
            Outcome::Success(value) => match panic::catch_unwind(AssertUnwindSafe(move || f(value))) {
                Ok(nested) => nested.register(Box::new(move |outcome| {
                    promise.complete_with(outcome);
                })),
                Err(payload) => {
                    promise.complete_with_fault(Fault::from_panic(payload));
                }
            },
            Outcome::DomainError(err) => {
                promise.complete_with_error(err);
            }
            Outcome::Fault(fault) => {
                promise.complete_with_fault(fault);
            }
            Outcome::Cancelled => {
                promise.cancel();
            }
        }));
        future
    }

    /// Runs `f` inline if this future resolves with a domain error.
    pub fn error<F>(&self, f: F) -> &Self
    where
        F: FnOnce(DomainError) + Send + 'static,
    {
        self.register(Box::new(move |outcome| {
            if let Outcome::DomainError(err) = outcome {
                f(err)
            }
        }));
        self
    }

    /// Runs `f` inline if this future resolves with a fault.
    pub fn fault<F>(&self, f: F) -> &Self
    where
        F: FnOnce(Fault) + Send + 'static,
    {
        self.register(Box::new(move |outcome| {
            if let Outcome::Fault(fault) = outcome {
                f(fault)
            }
        }));
        self
    }

    /// Runs `f` inline once this future resolves, whatever the outcome.
    pub fn finally<F>(&self, f: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.register(Box::new(move |_| f()));
        self
    }

    /// Drops the success value, keeping failures and cancellation.
    pub fn discard(&self) -> Future<()> {
        self.then(|_| ())
    }

    /// Returns a [`std::future::Future`] that completes with this future's
    /// outcome, for use with any async executor.
    pub fn outcome(&self) -> Waiter<T> {
        Waiter {
            future: self.clone(),
            waker: None,
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        let state = match &inner.outcome {
            Some(outcome) => match outcome {
                Outcome::Success(_) => "Success",
                Outcome::DomainError(_) => "DomainError",
                Outcome::Fault(_) => "Fault",
                Outcome::Cancelled => "Cancelled",
            },
            None => "Pending",
        };
        f.debug_struct("Future")
            .field("state", &state)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

/// [`std::future::Future`] returned by [`Future::outcome`].
pub struct Waiter<T> {
    future: Future<T>,
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}

impl<T> std::future::Future for Waiter<T>
where
    T: Clone + Send + 'static,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.future.peek() {
            return Poll::Ready(outcome);
        }
        match &this.waker {
            Some(slot) => {
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = Some(cx.waker().clone());
            }
            None => {
                // One reaction per waiter; later polls only refresh the stored waker.
                let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
                let wake = slot.clone();
                this.waker = Some(slot);
                this.future.register(Box::new(move |_| {
                    let waker = wake.lock().unwrap_or_else(PoisonError::into_inner).take();
                    if let Some(waker) = waker {
                        waker.wake()
                    }
                }));
            }
        }
        Poll::Pending
    }
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter").field("future", &self.future).finish()
    }
}
