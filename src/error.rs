use std::any::type_name;
use std::fmt::Debug;
use std::sync::Arc;

/// The payload a promise resolves with: a value, or the error that rejected it.
pub type Outcome<T> = Result<T, Error>;

/// Every way a promise can be rejected.
///
/// Errors raised by producers are carried opaquely in [`Error::Other`]; the
/// remaining variants are raised by the combinators themselves.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A chained closure returned the promise it was supposed to resolve.
    #[error("a promise chain closure returned the promise it resolves")]
    ReturnedSelf,
    /// A flat-map style closure produced nothing for its input.
    #[error("could not flat-map `{value}` into a `{expected}`")]
    FlatMap { value: String, expected: &'static str },
    #[error("bad input: {0}")]
    BadInput(&'static str),
    /// The failure represents an intentional cancellation rather than a fault.
    #[error("the operation was cancelled")]
    Cancelled,
    #[error("the resolver was dropped without sealing its promise")]
    ResolverDropped,
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl Error {
    /// Wraps a producer error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(Arc::new(error))
    }

    /// A producer error that is nothing more than a message.
    pub fn msg(text: impl Into<String>) -> Self {
        Error::other(Message(text.into()))
    }

    pub fn flat_map<V: Debug, U>(value: &V) -> Self {
        Error::FlatMap {
            value: format!("{value:?}"),
            expected: type_name::<U>(),
        }
    }

    /// Whether this failure is classified as a cancellation.
    ///
    /// Recovery combinators consult this to decide whether a handler runs
    /// under [`CatchPolicy::AllErrorsExceptCancellation`](crate::CatchPolicy).
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Other(inner) => inner
                .downcast_ref::<Error>()
                .map_or(false, Error::is_cancelled),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_cancelled_classification() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::other(Error::Cancelled).is_cancelled());
        assert!(!Error::msg("boom").is_cancelled());
        assert!(!Error::ReturnedSelf.is_cancelled());
    }

    #[test]
    fn test_flat_map_carries_input_and_type() {
        match Error::flat_map::<_, u32>(&"abc") {
            Error::FlatMap { value, expected } => {
                assert_eq!(value, "\"abc\"");
                assert_eq!(expected, "u32");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_message_display() {
        assert_eq!(Error::msg("💥").to_string(), "💥");
    }
}
