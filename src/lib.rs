//! Futures that resolve at most once with one of four outcomes (success,
//! domain error, fault or cancellation), the promises that resolve them,
//! and the execution contexts their reactions run on.
//!
//! ```
//! use promise_kit::{run_async, ExecutionContext};
//! use futures::executor::block_on;
//! use std::io;
//!
//! let parsed = run_async(|| "42".parse::<u32>().map_err(io::Error::other))
//!     .then_on(ExecutionContext::Default, |n| n + 1);
//! parsed
//!     .error(|err| eprintln!("parse failed: {}", err))
//!     .finally(|| println!("done"));
//! assert_eq!(block_on(parsed.outcome()).into_value(), Some(43));
//! ```

mod context;
mod error;
mod future;
mod join;
mod outcome;
mod promise;
pub mod queue;
pub mod runtime;

pub use context::ExecutionContext;
pub use error::Error;
pub use future::{Future, Waiter};
pub use join::join;
pub use outcome::{DomainError, Fault, Outcome, OutcomeKind};
pub use promise::{run_async, run_on, Promise};
pub use queue::PendingQueue;
