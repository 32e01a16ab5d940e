//! Error handling for promises: `catch`, `recover` and `ensure`.
//!
//! Cancelled failures (see [`Error::is_cancelled`]) are skipped by `catch` and
//! `recover` under the default [`CatchPolicy`]. Nothing here stops a
//! producer; cancellation is only a classification of its error.
use crate::{CatchPolicy, Error, ExecutionContext, Guarantee, Outcome, Promise, Thenable};
use std::sync::Arc;

/// Resolves once a `catch` has completely finished, handler included.
#[derive(Debug, Clone)]
pub struct Finalizer {
    guarantee: Guarantee<()>,
}

impl Finalizer {
    /// Runs `body` once the catch that produced this finalizer is done.
    pub fn finally<F>(&self, body: F) -> Guarantee<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.guarantee.done(move |()| body())
    }

    pub fn guarantee(&self) -> &Guarantee<()> {
        &self.guarantee
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Handles a failure at the end of a chain, using the chain's catch
    /// policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_seal::{Error, Promise, Thenable};
    /// use std::sync::mpsc;
    ///
    /// let (tx, rx) = mpsc::channel();
    /// Promise::<u8>::rejected(Error::msg("💥"))
    ///     .map(|n| Ok(n + 1))
    ///     .catch(move |error| tx.send(error.to_string()).unwrap())
    ///     .finally(|| println!("cleaned up"));
    /// assert_eq!(rx.recv().unwrap(), "💥");
    /// ```
    pub fn catch<F>(&self, body: F) -> Finalizer
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.catch_with(self.config.catch_policy(), body)
    }

    pub fn catch_with<F>(&self, policy: CatchPolicy, body: F) -> Finalizer
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let finished = Guarantee::unsealed(self.config.clone());
        let finalizer = Finalizer {
            guarantee: finished.clone(),
        };
        let context = self.config.finish_context().clone();
        self.pipe(move |outcome| match outcome {
            Ok(_) => {
                finished.seal(());
            }
            Err(error) if policy.skips(&error) => {
                log::debug!("not handing a cancelled error to catch: {error}");
                finished.seal(());
            }
            Err(error) => context.schedule(Box::new(move || {
                body(error);
                finished.seal(());
            })),
        });
        finalizer
    }

    /// Replaces a failure with the outcome of the thenable `body` returns.
    pub fn recover<U, F>(&self, body: F) -> Promise<T>
    where
        U: Thenable<Value = T>,
        F: FnOnce(Error) -> Result<U, Error> + Send + 'static,
    {
        self.recover_with(self.config.catch_policy(), body)
    }

    pub fn recover_with<U, F>(&self, policy: CatchPolicy, body: F) -> Promise<T>
    where
        U: Thenable<Value = T>,
        F: FnOnce(Error) -> Result<U, Error> + Send + 'static,
    {
        let promise = Promise::unsealed(self.config.clone());
        let downstream = promise.clone();
        let context = self.config.map_context().clone();
        self.pipe(move |outcome| match outcome {
            Err(error) if !policy.skips(&error) => {
                context.schedule(Box::new(move || match body(error) {
                    Ok(next) if next.identity() == downstream.identity() => {
                        downstream.seal(Err(Error::ReturnedSelf));
                    }
                    Ok(next) => next.pipe(move |outcome| {
                        downstream.seal(outcome);
                    }),
                    Err(error) => {
                        downstream.seal(Err(error));
                    }
                }))
            }
            outcome => {
                downstream.seal(outcome);
            }
        });
        promise
    }

    /// Replaces any failure, cancellations included, with the value of the
    /// guarantee `body` returns.
    pub fn recover_guarantee<F>(&self, body: F) -> Guarantee<T>
    where
        F: FnOnce(Error) -> Guarantee<T> + Send + 'static,
    {
        let guarantee = Guarantee::unsealed(self.config.clone());
        let downstream = guarantee.clone();
        let context = self.config.map_context().clone();
        self.pipe(move |outcome| match outcome {
            Ok(value) => {
                downstream.seal(value);
            }
            Err(error) => context.schedule(Box::new(move || {
                let next = body(error);
                if Arc::ptr_eq(&next.resolution, &downstream.resolution) {
                    log::error!("a recover closure returned the guarantee it resolves; it will never resolve");
                    return;
                }
                next.resolution.observe(move |value| {
                    downstream.seal(value);
                });
            })),
        });
        guarantee
    }

    /// Replaces any failure with a value computed from it.
    pub fn recover_value<F>(&self, body: F) -> Guarantee<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.recover_guarantee(move |error| Guarantee::resolved(body(error)))
    }

    /// Runs `body` once settled, whatever the outcome, then forwards the
    /// original outcome.
    pub fn ensure<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let promise = Promise::unsealed(self.config.clone());
        let downstream = promise.clone();
        let context = self.config.finish_context().clone();
        self.pipe(move |outcome| {
            context.schedule(Box::new(move || {
                body();
                downstream.seal(outcome);
            }))
        });
        promise
    }

    /// Like [`ensure`](Self::ensure), but waits for the cleanup guarantee
    /// `body` returns before forwarding the original outcome.
    pub fn ensure_then<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce() -> Guarantee<()> + Send + 'static,
    {
        let promise = Promise::unsealed(self.config.clone());
        let downstream = promise.clone();
        let context = self.config.finish_context().clone();
        self.pipe(move |outcome: Outcome<T>| {
            context.schedule(Box::new(move || {
                body().resolution.observe(move |()| {
                    downstream.seal(outcome);
                })
            }))
        });
        promise
    }

    /// Ends a chain whose failures nobody handles by logging them.
    pub fn cauterize(&self) {
        self.catch(|error| log::warn!("cauterized error: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use crate::{CatchPolicy, Error, Guarantee, Promise, SerialQueue, Thenable};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn test_catch_skips_cancelled_but_still_finalizes() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let (tx, rx) = mpsc::channel();
        Promise::<()>::rejected(Error::Cancelled)
            .catch(move |_| flag.store(true, Ordering::SeqCst))
            .finally(move || tx.send(()).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(()));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_catch_all_errors_sees_cancelled() {
        let (tx, rx) = mpsc::channel();
        Promise::<()>::rejected(Error::Cancelled)
            .catch_with(CatchPolicy::AllErrors, move |error| {
                tx.send(error.is_cancelled()).unwrap()
            });
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(true));
    }

    #[test]
    fn test_finally_runs_after_scheduled_handler() {
        let queue = SerialQueue::new("catch").unwrap();
        let (tx, rx) = mpsc::channel();
        let handled = tx.clone();
        Promise::<i32>::rejected(Error::msg("late"))
            .on(queue)
            .catch(move |_| handled.send("handler").unwrap())
            .finally(move || tx.send("finally").unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok("handler"));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok("finally"));
    }

    #[test]
    fn test_catch_on_success_skips_handler() {
        let finalizer = Promise::fulfilled(1).catch(|_| panic!("no failure to handle"));
        assert_eq!(finalizer.guarantee().get(), Some(()));
    }

    #[test]
    fn test_recover_replaces_failure() {
        let recovered = Promise::rejected(Error::msg("offline"))
            .recover(|_| Ok(Promise::fulfilled("cached")));
        assert_eq!(recovered.value(), Some("cached"));

        let passed = Promise::fulfilled("fresh").recover(|_| Ok(Promise::fulfilled("cached")));
        assert_eq!(passed.value(), Some("fresh"));

        let rethrown = Promise::<u8>::rejected(Error::msg("offline"))
            .recover(|error| Err::<Promise<u8>, _>(error));
        assert_eq!(rethrown.error().unwrap().to_string(), "offline");
    }

    #[test]
    fn test_recover_leaves_cancellation_alone_by_default() {
        let recovered = Promise::<u8>::rejected(Error::Cancelled)
            .recover(|_| Ok(Promise::fulfilled(1)));
        assert!(matches!(recovered.error(), Some(Error::Cancelled)));

        let forced = Promise::<u8>::rejected(Error::Cancelled)
            .recover_with(CatchPolicy::AllErrors, |_| Ok(Guarantee::resolved(1)));
        assert_eq!(forced.value(), Some(1));
    }

    #[test]
    fn test_recover_into_guarantee() {
        let guarantee: Guarantee<u8> =
            Promise::rejected(Error::Cancelled).recover_guarantee(|_| Guarantee::resolved(7));
        assert_eq!(guarantee.get(), Some(7));

        let value = Promise::rejected(Error::msg("x")).recover_value(|error| error.to_string());
        assert_eq!(value.get().as_deref(), Some("x"));
    }

    #[test]
    fn test_ensure_forwards_original_outcome() {
        let (tx, rx) = mpsc::channel();
        let ensured = Promise::<u8>::rejected(Error::msg("kept")).ensure(move || tx.send(()).unwrap());
        assert_eq!(rx.try_recv(), Ok(()));
        assert_eq!(ensured.error().unwrap().to_string(), "kept");

        let (cleanup, done) = Guarantee::<()>::pending();
        let ensured = Promise::fulfilled(3).ensure_then(move || cleanup);
        assert!(ensured.is_pending());
        done.resolve(());
        assert_eq!(ensured.value(), Some(3));
    }

    #[test]
    fn test_cauterize_handles_failure() {
        Promise::<()>::rejected(Error::msg("ignored")).cauterize();
    }
}
