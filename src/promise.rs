use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::{DomainError, ExecutionContext, Fault, Future, Outcome};

/// Write-side handle of a [`Future`]: the only way to resolve it.
///
/// Every `complete*` method and [`cancel`](Promise::cancel) returns whether
/// that call resolved the future. Once resolved, further calls are no-ops.
///
/// Dropping a promise that never resolved its future resolves it as
/// [`Outcome::Cancelled`].
///
/// # Examples
///
/// ```
/// use promise_kit::Promise;
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, future) = Promise::<String>::new();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received {:?}", future.outcome().await);
/// }));
/// promise.complete("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
pub struct Promise<T>
where
    T: Clone + Send + 'static,
{
    future: Future<T>,
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> (Promise<T>, Future<T>) {
        let future = Future::pending();
        (
            Promise {
                future: future.clone(),
            },
            future,
        )
    }

    /// Another read handle to the future this promise resolves.
    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }

    pub fn complete(&self, value: T) -> bool {
        self.future.resolve(Outcome::Success(value))
    }

    pub fn complete_with(&self, outcome: Outcome<T>) -> bool {
        self.future.resolve(outcome)
    }

    pub fn complete_with_error(&self, err: DomainError) -> bool {
        self.future.resolve(Outcome::DomainError(err))
    }

    pub fn complete_with_fault(&self, fault: Fault) -> bool {
        self.future.resolve(Outcome::Fault(fault))
    }

    /// Resolves the future as cancelled. Work already running on behalf of
    /// this promise is not interrupted.
    pub fn cancel(&self) -> bool {
        self.future.resolve(Outcome::Cancelled)
    }
}

impl<T> Drop for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if !self.future.is_resolved() && self.cancel() {
            log::debug!("promise dropped before completion, future cancelled");
        }
    }
}

impl<T> fmt::Debug for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("future", &self.future).finish()
    }
}

/// Runs `f` on the host runtime's default pool.
///
/// `Ok` resolves the returned future with success, `Err` with a domain
/// error, and a panic inside `f` with a fault.
pub fn run_async<T, E, F>(f: F) -> Future<T>
where
    T: Clone + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    run_on(ExecutionContext::Default, f)
}

/// [`run_async`] on an explicit context.
pub fn run_on<T, E, F>(context: ExecutionContext, f: F) -> Future<T>
where
    T: Clone + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    let (promise, future) = Promise::new();
    let job = context.adapt(move |()| {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => Outcome::from(result),
            Err(payload) => Outcome::Fault(Fault::from_panic(payload)),
        };
        promise.complete_with(outcome);
    });
    job(());
    future
}
