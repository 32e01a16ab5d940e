//! The observation interface shared by [`Promise`] and [`Guarantee`], and the
//! chaining combinators written against it.
use crate::{context, Config, Error, ExecutionContext, Guarantee, Outcome, Promise};
use parking_lot::{Condvar, Mutex};
use std::fmt::Debug;
use std::sync::Arc;

/// Anything that eventually resolves to an [`Outcome`].
///
/// Implemented by exactly [`Promise`] and [`Guarantee`]. Every chaining
/// method returns a new [`Promise`] inheriting this handle's [`Config`];
/// transforms run on the config's map context, terminal steps on its finish
/// context, and failures skip both and propagate immediately.
pub trait Thenable: Clone + Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Calls `body` with the outcome once it is known.
    ///
    /// If the outcome is already known `body` runs synchronously, on the
    /// calling thread.
    fn pipe<F>(&self, body: F)
    where
        F: FnOnce(Outcome<Self::Value>) + Send + 'static;

    /// The outcome, if resolved.
    fn result(&self) -> Option<Outcome<Self::Value>>;

    fn config(&self) -> &Config;

    /// The address of the underlying box; equal for handles that share one.
    #[doc(hidden)]
    fn identity(&self) -> usize;

    /// Chains a step that produces another thenable, and resolves with that
    /// thenable's outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_seal::{Promise, Thenable};
    ///
    /// let fetched = Promise::fulfilled(2).then(|n| Ok(Promise::fulfilled(n * 21)));
    /// assert_eq!(fetched.wait().unwrap(), 42);
    /// ```
    fn then<U, F>(&self, body: F) -> Promise<U::Value>
    where
        U: Thenable,
        F: FnOnce(Self::Value) -> Result<U, Error> + Send + 'static,
    {
        let promise = Promise::unsealed(self.config().clone());
        let downstream = promise.clone();
        let context = self.config().map_context().clone();
        self.pipe(move |outcome| match outcome {
            Ok(value) => context.schedule(Box::new(move || match body(value) {
                Ok(next) if next.identity() == downstream.identity() => {
                    downstream.seal(Err(Error::ReturnedSelf));
                }
                Ok(next) => next.pipe(move |outcome| {
                    downstream.seal(outcome);
                }),
                Err(error) => {
                    downstream.seal(Err(error));
                }
            })),
            Err(error) => {
                downstream.seal(Err(error));
            }
        });
        promise
    }

    /// Transforms the value.
    fn map<U, F>(&self, body: F) -> Promise<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Self::Value) -> Result<U, Error> + Send + 'static,
    {
        let context = self.config().map_context().clone();
        chain(self, context, body)
    }

    /// Transforms the value, rejecting with [`Error::FlatMap`] when `body`
    /// produces nothing.
    fn flat_map<U, F>(&self, body: F) -> Promise<U>
    where
        Self::Value: Debug,
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Self::Value) -> Option<U> + Send + 'static,
    {
        self.map(move |value| {
            let input = value.clone();
            body(value).ok_or_else(|| Error::flat_map::<_, U>(&input))
        })
    }

    /// Consumes the value on the finish context.
    fn done<F>(&self, body: F) -> Promise<()>
    where
        F: FnOnce(Self::Value) -> Result<(), Error> + Send + 'static,
    {
        let context = self.config().finish_context().clone();
        chain(self, context, body)
    }

    /// Passes the value through once the thenable built by `body` succeeds,
    /// otherwise rejects with its error.
    fn validate<P, F>(&self, body: F) -> Promise<Self::Value>
    where
        P: Thenable<Value = ()>,
        F: FnOnce(&Self::Value) -> P + Send + 'static,
    {
        let promise = Promise::unsealed(self.config().clone());
        let downstream = promise.clone();
        let context = self.config().map_context().clone();
        self.pipe(move |outcome| match outcome {
            Ok(value) => context.schedule(Box::new(move || {
                body(&value).pipe(move |verdict| {
                    downstream.seal(verdict.map(|()| value));
                })
            })),
            Err(error) => {
                downstream.seal(Err(error));
            }
        });
        promise
    }

    /// Observes the outcome without affecting it, returning this same handle.
    fn tap<F>(&self, body: F) -> Self
    where
        F: FnOnce(Outcome<Self::Value>) + Send + 'static,
    {
        self.pipe(body);
        self.clone()
    }

    fn as_void(&self) -> Promise<()> {
        self.map(|_| Ok(()))
    }

    fn value(&self) -> Option<Self::Value> {
        self.result().and_then(Result::ok)
    }

    fn error(&self) -> Option<Error> {
        self.result().and_then(Result::err)
    }

    fn is_pending(&self) -> bool {
        self.result().is_none()
    }

    fn is_resolved(&self) -> bool {
        self.result().is_some()
    }

    fn is_fulfilled(&self) -> bool {
        matches!(self.result(), Some(Ok(_)))
    }

    fn is_rejected(&self) -> bool {
        matches!(self.result(), Some(Err(_)))
    }

    /// Blocks the calling thread until the outcome is known.
    ///
    /// Waiting from a thread that some step of the same chain has to run on
    /// deadlocks; a warning is logged when this is called from a
    /// [`SerialQueue`](crate::SerialQueue) worker.
    fn wait(&self) -> Outcome<Self::Value> {
        match self.result() {
            Some(outcome) => outcome,
            None => block_until(|deliver| self.pipe(deliver)),
        }
    }
}

fn warn_if_queue_worker() {
    if context::on_queue_worker() {
        log::warn!(
            "blocking wait on a serial queue worker; this deadlocks if the awaited chain runs on the same queue"
        );
    }
}

/// Registers a continuation through `register` and parks the calling thread
/// until it delivers.
pub(crate) fn block_until<R, F>(register: F) -> R
where
    R: Send + 'static,
    F: FnOnce(Box<dyn FnOnce(R) + Send>),
{
    warn_if_queue_worker();
    let signal = Arc::new((Mutex::new(None), Condvar::new()));
    let sink = signal.clone();
    register(Box::new(move |value| {
        *sink.0.lock() = Some(value);
        sink.1.notify_all();
    }));
    let (slot, ready) = &*signal;
    let mut slot = slot.lock();
    loop {
        if let Some(value) = slot.take() {
            return value;
        }
        ready.wait(&mut slot);
    }
}

/// Shared body of the non-flattening combinators: run `body` on `context`
/// with a successful value and seal the downstream promise with its result.
fn chain<T, U, F>(
    upstream: &T,
    context: Arc<dyn ExecutionContext>,
    body: F,
) -> Promise<U>
where
    T: Thenable,
    U: Clone + Send + Sync + 'static,
    F: FnOnce(T::Value) -> Result<U, Error> + Send + 'static,
{
    let promise = Promise::unsealed(upstream.config().clone());
    let downstream = promise.clone();
    upstream.pipe(move |outcome| match outcome {
        Ok(value) => context.schedule(Box::new(move || {
            downstream.seal(body(value));
        })),
        Err(error) => {
            downstream.seal(Err(error));
        }
    });
    promise
}

impl<T: Clone + Send + Sync + 'static> Thenable for Promise<T> {
    type Value = T;

    fn pipe<F>(&self, body: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.resolution.observe(body)
    }

    fn result(&self) -> Option<Outcome<T>> {
        self.resolution.get()
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.resolution) as *const () as usize
    }
}

impl<T: Clone + Send + Sync + 'static> Thenable for Guarantee<T> {
    type Value = T;

    fn pipe<F>(&self, body: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.resolution.observe(move |value| body(Ok(value)))
    }

    fn result(&self) -> Option<Outcome<T>> {
        self.resolution.get().map(Ok)
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.resolution) as *const () as usize
    }
}
