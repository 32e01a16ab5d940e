//! A `Guarantee` is a promise that cannot fail.
//!
//! Its box holds the bare value rather than an [`Outcome`](crate::Outcome), so
//! the failure channel does not exist at the type level.
use crate::resolution::Resolution;
use crate::thenable::block_until;
use crate::{Config, ExecutionContext, Promise};
use std::fmt;
use std::sync::Arc;

pub struct Guarantee<T> {
    pub(crate) resolution: Arc<Resolution<T>>,
    pub(crate) config: Config,
}

impl<T> Clone for Guarantee<T> {
    fn clone(&self) -> Self {
        Self {
            resolution: self.resolution.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Guarantee<T> {
    pub fn pending() -> (Self, GuaranteeResolver<T>) {
        Self::pending_with(Config::default())
    }

    pub fn pending_with(config: Config) -> (Self, GuaranteeResolver<T>) {
        let guarantee = Self::unsealed(config);
        let resolver = GuaranteeResolver {
            resolution: Some(guarantee.resolution.clone()),
        };
        (guarantee, resolver)
    }

    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(GuaranteeResolver<T>),
    {
        let (guarantee, resolver) = Self::pending();
        body(resolver);
        guarantee
    }

    pub fn resolved(value: T) -> Self {
        Self {
            resolution: Arc::new(Resolution::resolved(value)),
            config: Config::default(),
        }
    }

    pub fn with_config(&self, config: Config) -> Self {
        Self {
            resolution: self.resolution.clone(),
            config,
        }
    }

    pub fn on<C: ExecutionContext + 'static>(&self, context: C) -> Self {
        self.with_config(self.config.clone().with_context(context))
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<T> {
        self.resolution.get()
    }

    /// Blocks the calling thread until the guarantee resolves.
    ///
    /// See [`Thenable::wait`](crate::Thenable::wait) for the deadlock hazard.
    pub fn wait(&self) -> T {
        match self.get() {
            Some(value) => value,
            None => block_until(|deliver| self.resolution.observe(deliver)),
        }
    }

    /// A fallible view of this guarantee, for chaining steps that may fail.
    pub fn as_promise(&self) -> Promise<T> {
        let promise = Promise::unsealed(self.config.clone());
        let downstream = promise.clone();
        self.resolution.observe(move |value| {
            downstream.seal(Ok(value));
        });
        promise
    }

    /// Transforms the value on the map context.
    pub fn map<U, F>(&self, body: F) -> Guarantee<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let guarantee = Guarantee::unsealed(self.config.clone());
        let downstream = guarantee.clone();
        let context = self.config.map_context().clone();
        self.resolution.observe(move |value| {
            context.schedule(Box::new(move || {
                downstream.seal(body(value));
            }))
        });
        guarantee
    }

    /// Chains a step that itself produces a guarantee.
    pub fn then<U, F>(&self, body: F) -> Guarantee<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Guarantee<U> + Send + 'static,
    {
        let guarantee = Guarantee::unsealed(self.config.clone());
        let downstream = guarantee.clone();
        let context = self.config.map_context().clone();
        self.resolution.observe(move |value| {
            context.schedule(Box::new(move || {
                let next = body(value);
                if Arc::ptr_eq(&next.resolution, &downstream.resolution) {
                    log::error!("a guarantee chain closure returned the guarantee it resolves; it will never resolve");
                    return;
                }
                next.resolution.observe(move |value| {
                    downstream.seal(value);
                });
            }))
        });
        guarantee
    }

    /// Runs a side effect on the finish context.
    pub fn done<F>(&self, body: F) -> Guarantee<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        let guarantee = Guarantee::unsealed(self.config.clone());
        let downstream = guarantee.clone();
        let context = self.config.finish_context().clone();
        self.resolution.observe(move |value| {
            context.schedule(Box::new(move || {
                body(value);
                downstream.seal(());
            }))
        });
        guarantee
    }

    pub(crate) fn unsealed(config: Config) -> Self {
        Self {
            resolution: Arc::new(Resolution::pending()),
            config,
        }
    }

    pub(crate) fn seal(&self, value: T) -> bool {
        self.resolution.seal(value)
    }
}

impl Guarantee<()> {
    /// An already resolved unit guarantee.
    pub fn ready() -> Self {
        Self::resolved(())
    }
}

impl<T> fmt::Debug for Guarantee<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarantee")
            .field("box", &Arc::as_ptr(&self.resolution))
            .finish_non_exhaustive()
    }
}

/// The single-use write side of a [`Guarantee`].
///
/// A guarantee cannot be rejected, so dropping its resolver unsealed only
/// logs a warning; the guarantee stays pending.
pub struct GuaranteeResolver<T: Clone + 'static> {
    resolution: Option<Arc<Resolution<T>>>,
}

impl<T: Clone + 'static> GuaranteeResolver<T> {
    pub fn resolve(mut self, value: T) {
        if let Some(resolution) = self.resolution.take() {
            resolution.seal(value);
        }
    }
}

impl<T: Clone + 'static> Drop for GuaranteeResolver<T> {
    fn drop(&mut self) {
        if let Some(resolution) = self.resolution.take() {
            if !resolution.is_resolved() {
                log::warn!("a guarantee resolver was dropped unsealed; its guarantee will never resolve");
            }
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for GuaranteeResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuaranteeResolver").finish_non_exhaustive()
    }
}
