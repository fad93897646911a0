use std::fmt;
use std::sync::Arc;

use crate::runtime;

/// Where a reaction should run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ExecutionContext {
    /// Inline, on whichever thread resolves the future (or registers the
    /// reaction, if the future is already resolved).
    #[default]
    Current,
    /// The host runtime's primary context.
    Main,
    /// The host runtime's general worker pool.
    Default,
    /// A specific queue of the host runtime. The built-in
    /// [`ThreadPool`](crate::runtime::ThreadPool) runs each distinct name on
    /// its own thread, kept until the queue is retired.
    Named(Arc<str>),
}

impl ExecutionContext {
    pub fn named(queue: impl Into<Arc<str>>) -> ExecutionContext {
        ExecutionContext::Named(queue.into())
    }

    /// Turns `f` into a closure whose invocation runs `f` on this context.
    ///
    /// For [`Current`](ExecutionContext::Current) `f` is returned as is. For
    /// every other context the returned closure submits `f` to the host
    /// runtime and returns immediately.
    pub fn adapt<A, F>(&self, f: F) -> Box<dyn FnOnce(A) + Send + 'static>
    where
        A: Send + 'static,
        F: FnOnce(A) + Send + 'static,
    {
        let target = match self {
            ExecutionContext::Current => return Box::new(f),
            ExecutionContext::Main => Target::Main,
            ExecutionContext::Default => Target::Default,
            ExecutionContext::Named(queue) => Target::Named(queue.clone()),
        };
        Box::new(move |arg: A| {
            let job: runtime::Job = Box::new(move || f(arg));
            let dispatcher = runtime::dispatcher();
            log::trace!("dispatching reaction to {:?}", target);
            match &target {
                Target::Main => dispatcher.submit_main(job),
                Target::Default => dispatcher.submit_default(job),
                Target::Named(queue) => dispatcher.submit_named(queue, job),
            }
        })
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Current => f.write_str("current"),
            ExecutionContext::Main => f.write_str("main"),
            ExecutionContext::Default => f.write_str("default"),
            ExecutionContext::Named(queue) => write!(f, "queue '{}'", queue),
        }
    }
}

#[derive(Debug)]
enum Target {
    Main,
    Default,
    Named(Arc<str>),
}
