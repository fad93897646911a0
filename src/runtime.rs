//! The host runtime that actually runs dispatched reactions.
//!
//! Futures never run work themselves. Reactions registered with a context
//! other than [`ExecutionContext::Current`](crate::ExecutionContext) are
//! handed to a [`Dispatch`] implementation, which is either installed by the
//! application with [`install`] or, by default, the built-in [`ThreadPool`].

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{Error, Fault};

/// A unit of work submitted to the host runtime.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Work submission points a host runtime provides.
///
/// Every method is fire-and-forget: the caller never observes whether or
/// when the job ran.
pub trait Dispatch: Send + Sync {
    /// Runs `job` on the general-purpose worker pool.
    fn submit_default(&self, job: Job);
    /// Runs `job` on the primary (main) context.
    fn submit_main(&self, job: Job);
    /// Runs `job` on the queue identified by `queue`.
    fn submit_named(&self, queue: &str, job: Job);
}

/// Environment variable read by [`Config::from_env`].
pub const WORKER_THREADS_ENV: &str = "PROMISE_KIT_WORKER_THREADS";

/// Default prefix for the names of the built-in pool's threads.
pub const DEFAULT_THREAD_NAME: &str = "promise-kit";

/// Settings for the built-in [`ThreadPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub worker_threads: usize,
    pub thread_name: String,
}

impl Config {
    pub fn new() -> Config {
        Config {
            worker_threads: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Defaults, with the worker count taken from `PROMISE_KIT_WORKER_THREADS`
    /// when it holds a positive integer.
    pub fn from_env() -> Config {
        let mut config = Config::new();
        if let Ok(raw) = env::var(WORKER_THREADS_ENV) {
            match raw.trim().parse::<NonZeroUsize>() {
                Ok(n) => config.worker_threads = n.get(),
                Err(_) => log::warn!("ignoring invalid {}={:?}", WORKER_THREADS_ENV, raw),
            }
        }
        config
    }

    /// Number of threads serving [`Dispatch::submit_default`]. Zero is raised to one.
    pub fn worker_threads(mut self, n: usize) -> Config {
        self.worker_threads = n.max(1);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Config {
        self.thread_name = name.into();
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

/// A serial queue: one thread draining one channel in FIFO order.
struct Serial {
    sender: Sender<Job>,
    handle: JoinHandle<()>,
}

impl Serial {
    fn spawn(name: String) -> Result<Serial, Error> {
        let (sender, receiver) = unbounded();
        let handle = spawn_worker(name, receiver)?;
        Ok(Serial { sender, handle })
    }
}

/// The built-in host runtime.
///
/// It runs a fixed number of workers sharing one channel for the default
/// pool, a single thread standing in for the main context, and one lazily
/// started thread per named queue. Dropping the pool closes every channel
/// and joins every thread, after already submitted jobs have run.
///
/// A named queue keeps its thread until the pool is dropped or the queue is
/// released with [`retire_queue`](ThreadPool::retire_queue). Queue names are
/// meant to be a small fixed set; deriving one per request costs one thread
/// per name.
pub struct ThreadPool {
    config: Config,
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    main: Option<Serial>,
    queues: Mutex<HashMap<String, Serial>>,
}

impl ThreadPool {
    pub fn new(config: Config) -> Result<ThreadPool, Error> {
        let (sender, receiver) = unbounded();
        let workers = (0..config.worker_threads.max(1))
            .map(|i| spawn_worker(format!("{}-worker-{}", config.thread_name, i), receiver.clone()))
            .collect::<Result<Vec<_>, Error>>()?;
        let main = Serial::spawn(format!("{}-main", config.thread_name))?;
        log::debug!(
            "thread pool '{}' started with {} workers",
            config.thread_name,
            workers.len()
        );
        Ok(ThreadPool {
            config,
            sender: Some(sender),
            workers,
            main: Some(main),
            queues: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the named queue `queue`. Its thread exits once the jobs already
    /// submitted to it have run. A later submission under the same name starts
    /// a fresh queue. Returns whether such a queue existed.
    pub fn retire_queue(&self, queue: &str) -> bool {
        let serial = self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(queue);
        match serial {
            Some(serial) => {
                // Dropping the sender ends the worker loop; the handle is detached.
                drop(serial.sender);
                log::debug!("retired named queue '{}'", queue);
                true
            }
            None => false,
        }
    }

    /// Number of named queues currently holding a thread.
    pub fn named_queues(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Dispatch for ThreadPool {
    fn submit_default(&self, job: Job) {
        if let Some(sender) = &self.sender {
            send(sender, job, "default pool");
        }
    }

    fn submit_main(&self, job: Job) {
        if let Some(main) = &self.main {
            send(&main.sender, job, "main queue");
        }
    }

    fn submit_named(&self, queue: &str, job: Job) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if !queues.contains_key(queue) {
            match Serial::spawn(format!("{}-{}", self.config.thread_name, queue)) {
                Ok(serial) => {
                    log::debug!("started named queue '{}'", queue);
                    queues.insert(queue.to_owned(), serial);
                }
                Err(err) => {
                    log::warn!("dropping job for queue '{}': {}", queue, err);
                    return;
                }
            }
        }
        if let Some(serial) = queues.get(queue) {
            send(&serial.sender, job, queue);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Closing the channels lets every worker exit once it drains its backlog.
        drop(self.sender.take());
        let mut handles = std::mem::take(&mut self.workers);
        if let Some(main) = self.main.take() {
            drop(main.sender);
            handles.push(main.handle);
        }
        let queues = std::mem::take(
            self.queues
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (_, serial) in queues {
            drop(serial.sender);
            handles.push(serial.handle);
        }
        for handle in handles {
            if handle.join().is_err() {
                log::error!("thread pool worker exited by panic");
            }
        }
        log::debug!("thread pool '{}' stopped", self.config.thread_name);
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .finish()
    }
}

fn send(sender: &Sender<Job>, job: Job, target: &str) {
    if sender.send(job).is_err() {
        log::warn!("{} is closed, dropping job", target);
    }
}

fn spawn_worker(name: String, receiver: Receiver<Job>) -> Result<JoinHandle<()>, Error> {
    let handle = thread::Builder::new().name(name.clone()).spawn(move || {
        log::trace!("worker '{}' starting", name);
        for job in receiver {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                log::error!("job on '{}' panicked: {}", name, Fault::from_panic(payload));
            }
        }
        log::trace!("worker '{}' exiting", name);
    })?;
    Ok(handle)
}

static DISPATCHER: OnceLock<Arc<dyn Dispatch>> = OnceLock::new();

/// Installs `dispatcher` as the process-wide host runtime.
///
/// Fails with [`Error::AlreadyInstalled`] once any dispatcher, including the
/// lazily started built-in pool, is active.
pub fn install(dispatcher: Arc<dyn Dispatch>) -> Result<(), Error> {
    DISPATCHER
        .set(dispatcher)
        .map_err(|_| Error::AlreadyInstalled)
}

/// Returns the process-wide host runtime, starting the built-in
/// [`ThreadPool`] from [`Config::from_env`] if none was installed.
pub fn dispatcher() -> Arc<dyn Dispatch> {
    DISPATCHER
        .get_or_init(|| match ThreadPool::new(Config::from_env()) {
            Ok(pool) => Arc::new(pool),
            Err(err) => {
                log::error!("failed to start thread pool, running jobs inline: {}", err);
                Arc::new(Inline)
            }
        })
        .clone()
}

/// Fallback host that runs every job on the submitting thread.
struct Inline;

impl Dispatch for Inline {
    fn submit_default(&self, job: Job) {
        job()
    }

    fn submit_main(&self, job: Job) {
        job()
    }

    fn submit_named(&self, _queue: &str, job: Job) {
        job()
    }
}
