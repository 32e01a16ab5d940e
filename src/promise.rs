//! A `Promise` is a value that may fail.
//!
//! The producing side holds the [`Resolver`]; every clone of the [`Promise`]
//! observes the same outcome.
use crate::resolution::Resolution;
use crate::{Config, Error, ExecutionContext, Outcome};
use std::fmt;
use std::sync::Arc;

/// The eventual [`Outcome`] of some operation.
///
/// # Examples
///
/// ```
/// use promise_seal::{Promise, Thenable};
/// use std::thread;
///
/// let (promise, resolver) = Promise::<String>::pending();
/// let task = thread::spawn(move || resolver.fulfill("🍓".into()));
/// assert_eq!(promise.wait().unwrap(), "🍓");
/// task.join().expect("The task thread has panicked");
/// ```
pub struct Promise<T> {
    pub(crate) resolution: Arc<Resolution<Outcome<T>>>,
    pub(crate) config: Config,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            resolution: self.resolution.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// A pending promise and the resolver that seals it.
    pub fn pending() -> (Self, Resolver<T>) {
        Self::pending_with(Config::default())
    }

    pub fn pending_with(config: Config) -> (Self, Resolver<T>) {
        let promise = Self::unsealed(config);
        let resolver = Resolver {
            resolution: Some(promise.resolution.clone()),
        };
        (promise, resolver)
    }

    /// Hands a fresh resolver to `body` and returns its promise.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let (promise, resolver) = Self::pending();
        body(resolver);
        promise
    }

    pub fn fulfilled(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    pub fn rejected(error: Error) -> Self {
        Self::from_outcome(Err(error))
    }

    pub fn from_outcome(outcome: Outcome<T>) -> Self {
        Self {
            resolution: Arc::new(Resolution::resolved(outcome)),
            config: Config::default(),
        }
    }

    /// The same promise, with `config` inherited by everything chained from
    /// the returned handle.
    pub fn with_config(&self, config: Config) -> Self {
        Self {
            resolution: self.resolution.clone(),
            config,
        }
    }

    /// The same promise, chaining onto `context`.
    pub fn on<C: ExecutionContext + 'static>(&self, context: C) -> Self {
        self.with_config(self.config.clone().with_context(context))
    }

    /// A pending promise sealed directly by combinators.
    pub(crate) fn unsealed(config: Config) -> Self {
        Self {
            resolution: Arc::new(Resolution::pending()),
            config,
        }
    }

    pub(crate) fn seal(&self, outcome: Outcome<T>) -> bool {
        self.resolution.seal(outcome)
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("box", &Arc::as_ptr(&self.resolution))
            .finish_non_exhaustive()
    }
}

/// The single-use write side of a [`Promise`].
///
/// Dropping a resolver without sealing rejects its promise with
/// [`Error::ResolverDropped`], so observers are never left waiting on a
/// producer that has gone away.
pub struct Resolver<T: Clone + 'static> {
    resolution: Option<Arc<Resolution<Outcome<T>>>>,
}

impl<T: Clone + 'static> Resolver<T> {
    pub fn fulfill(self, value: T) {
        self.resolve(Ok(value))
    }

    pub fn reject(self, error: Error) {
        self.resolve(Err(error))
    }

    pub fn resolve(mut self, outcome: Outcome<T>) {
        if let Some(resolution) = self.resolution.take() {
            resolution.seal(outcome);
        }
    }
}

impl<T: Clone + 'static> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(resolution) = self.resolution.take() {
            if resolution.seal(Err(Error::ResolverDropped)) {
                log::warn!("a resolver was dropped before sealing its promise");
            }
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

/// Starts a chain with a closure that builds its first promise.
///
/// An `Err` from `body` becomes a rejected promise.
pub fn firstly<T, F>(body: F) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<Promise<T>, Error>,
{
    body().unwrap_or_else(Promise::rejected)
}
