use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A recoverable error reported by a computation.
///
/// Wraps any error type behind a shared pointer so the same failure can be
/// handed to every reaction registered on a [`Future`](crate::Future).
#[derive(Clone)]
pub struct DomainError(Arc<dyn StdError + Send + Sync + 'static>);

impl DomainError {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DomainError(Arc::new(err))
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DomainError").field(&self.0).finish()
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.0)
    }
}

/// An unexpected failure, such as a panic caught while running a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    reason: Arc<str>,
}

impl Fault {
    pub fn new(reason: impl Into<String>) -> Self {
        Fault {
            reason: Arc::from(reason.into()),
        }
    }

    /// Builds a fault from the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        match payload.downcast::<&'static str>() {
            Ok(s) => Fault::new(*s),
            Err(payload) => match payload.downcast::<String>() {
                Ok(s) => Fault::new(*s),
                Err(_) => Fault::new("task panicked with a non-string payload"),
            },
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault: {}", self.reason)
    }
}

impl StdError for Fault {}

/// Tag of an [`Outcome`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    DomainError,
    Fault,
    Cancelled,
}

/// The resolved value of a [`Future`](crate::Future).
///
/// Exactly one of [`is_success`](Outcome::is_success),
/// [`is_failure`](Outcome::is_failure) and
/// [`is_cancelled`](Outcome::is_cancelled) holds for any outcome.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Success(T),
    DomainError(DomainError),
    Fault(Fault),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::DomainError(_) => OutcomeKind::DomainError,
            Outcome::Fault(_) => OutcomeKind::Fault,
            Outcome::Cancelled => OutcomeKind::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// True for both domain errors and faults.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::DomainError(_) | Outcome::Fault(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn domain_error(&self) -> Option<&DomainError> {
        match self {
            Outcome::DomainError(err) => Some(err),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Applies `f` to a success value. Every other variant is carried over
    /// unchanged and `f` is not called.
    pub fn map<K, F>(self, f: F) -> Outcome<K>
    where
        F: FnOnce(T) -> K,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::DomainError(err) => Outcome::DomainError(err),
            Outcome::Fault(fault) => Outcome::Fault(fault),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: StdError + Send + Sync + 'static,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::DomainError(DomainError::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_exactly_one_predicate_holds() {
        let outcomes: Vec<Outcome<u8>> = vec![
            Outcome::Success(1),
            Outcome::DomainError(DomainError::new(io::Error::other("boom"))),
            Outcome::Fault(Fault::new("bad state")),
            Outcome::Cancelled,
        ];
        for outcome in &outcomes {
            let held = [outcome.is_success(), outcome.is_failure(), outcome.is_cancelled()];
            assert_eq!(held.iter().filter(|h| **h).count(), 1, "{:?}", outcome);
        }
    }

    #[test]
    fn test_projections_yield_nothing_on_mismatch() {
        let fault: Outcome<u8> = Outcome::Fault(Fault::new("bad state"));
        assert!(fault.value().is_none());
        assert!(fault.domain_error().is_none());
        assert_eq!(fault.fault().map(Fault::reason), Some("bad state"));

        let success = Outcome::Success(7);
        assert_eq!(success.value(), Some(&7));
        assert!(success.fault().is_none());
        assert_eq!(success.into_value(), Some(7));
    }

    #[test]
    fn test_map_forwards_failures_untouched() {
        let err: Outcome<u8> = Outcome::DomainError(DomainError::new(io::Error::other("boom")));
        let mapped = err.map(|_| -> u8 { panic!("transform must not run") });
        assert_eq!(mapped.kind(), OutcomeKind::DomainError);
        assert_eq!(mapped.domain_error().map(ToString::to_string).as_deref(), Some("boom"));

        assert_eq!(Outcome::Success(5).map(|x| x * 2).into_value(), Some(10));
        assert!(Outcome::<u8>::Cancelled.map(|x| x).is_cancelled());
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<u8> = Ok::<_, io::Error>(3).into();
        assert_eq!(ok.into_value(), Some(3));

        let err: Outcome<u8> = Err(io::Error::new(io::ErrorKind::NotFound, "missing")).into();
        let domain = err.domain_error().expect("domain error");
        assert_eq!(
            domain.downcast_ref::<io::Error>().map(io::Error::kind),
            Some(io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_fault_from_panic_payload() {
        let payload = std::panic::catch_unwind(|| panic!("exploded {}", 42)).unwrap_err();
        assert_eq!(Fault::from_panic(payload).reason(), "exploded 42");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(17u32)).unwrap_err();
        assert_eq!(
            Fault::from_panic(payload).reason(),
            "task panicked with a non-string payload"
        );
    }
}
