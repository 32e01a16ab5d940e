//! Where continuations run.
//!
//! Combinators never run user closures directly from a seal; they hand them to
//! an [`ExecutionContext`]. A context must run every job it accepts, in
//! submission order.
use crate::{Error, Guarantee, Promise};
use std::cell::Cell;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    mpsc::{channel, Sender},
    Arc,
};
use std::thread;

/// A unit of work submitted to an [`ExecutionContext`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait ExecutionContext: Send + Sync {
    /// Runs `job` eventually. Jobs submitted to the same context run in
    /// submission order.
    fn schedule(&self, job: Job);

    /// Runs `body` on this context and returns a promise of its result.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_seal::{ExecutionContext, SerialQueue, Thenable};
    ///
    /// let queue = SerialQueue::new("work").unwrap();
    /// let promise = queue.promise(|| Ok(6 * 7));
    /// assert_eq!(promise.wait().unwrap(), 42);
    /// ```
    fn promise<T, F>(&self, body: F) -> Promise<T>
    where
        Self: Sized,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        let (promise, resolver) = Promise::pending();
        self.schedule(Box::new(move || resolver.resolve(body())));
        promise
    }

    /// Runs an infallible `body` on this context.
    fn guarantee<T, F>(&self, body: F) -> Guarantee<T>
    where
        Self: Sized,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (guarantee, resolver) = Guarantee::pending();
        self.schedule(Box::new(move || resolver.resolve(body())));
        guarantee
    }
}

impl<C: ExecutionContext + ?Sized> ExecutionContext for Arc<C> {
    fn schedule(&self, job: Job) {
        (**self).schedule(job)
    }
}

/// Runs every job immediately on the scheduling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl ExecutionContext for Inline {
    fn schedule(&self, job: Job) {
        job()
    }
}

thread_local! {
    static QUEUE_WORKER: Cell<bool> = Cell::new(false);
}

/// Whether the current thread is the worker of some [`SerialQueue`].
pub(crate) fn on_queue_worker() -> bool {
    QUEUE_WORKER.with(Cell::get)
}

/// A FIFO queue drained by one dedicated worker thread.
///
/// Clones share the queue; the worker exits once every clone is dropped and
/// the remaining jobs have run.
///
/// # Examples
///
/// ```
/// use promise_seal::{Config, Promise, SerialQueue, Thenable};
///
/// let queue = SerialQueue::new("transforms").unwrap();
/// let (promise, resolver) = Promise::pending_with(Config::default().with_context(queue));
/// let doubled = promise.map(|value: i32| Ok(value * 2));
/// resolver.fulfill(21);
/// assert_eq!(doubled.wait().unwrap(), 42);
/// ```
#[derive(Clone)]
pub struct SerialQueue {
    label: Arc<str>,
    sender: Sender<Job>,
}

impl SerialQueue {
    pub fn new(label: impl Into<String>) -> io::Result<Self> {
        let label: Arc<str> = Arc::from(label.into());
        let (sender, receiver) = channel::<Job>();
        let name = label.clone();
        thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                QUEUE_WORKER.with(|worker| worker.set(true));
                log::trace!("queue '{name}' starting");
                for job in receiver {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("a job on queue '{name}' panicked");
                    }
                }
                log::trace!("queue '{name}' exiting");
            })?;
        Ok(Self { label, sender })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ExecutionContext for SerialQueue {
    fn schedule(&self, job: Job) {
        if self.sender.send(job).is_err() {
            log::error!("queue '{}' has shut down; dropping a job", self.label);
        }
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{on_queue_worker, ExecutionContext, Inline, SerialQueue};
    use crate::Thenable;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_inline_runs_synchronously() {
        let (tx, rx) = mpsc::channel();
        Inline.schedule(Box::new(move || tx.send(thread::current().id()).unwrap()));
        assert_eq!(rx.try_recv(), Ok(thread::current().id()));
    }

    #[test]
    fn test_serial_queue_is_fifo() {
        let queue = SerialQueue::new("fifo").unwrap();
        let (tx, rx) = mpsc::channel();
        for index in 0..100 {
            let tx = tx.clone();
            queue.schedule(Box::new(move || tx.send(index).unwrap()));
        }
        let received: Vec<_> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_serial_queue_survives_panicking_job() {
        let queue = SerialQueue::new("panics").unwrap();
        let (tx, rx) = mpsc::channel();
        queue.schedule(Box::new(|| panic!("job failure")));
        queue.schedule(Box::new(move || tx.send(on_queue_worker()).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(true));
        assert!(!on_queue_worker());
    }

    #[test]
    fn test_context_promise_and_guarantee() {
        let queue = SerialQueue::new("producers").unwrap();
        let promise = queue.promise(|| Err::<i32, _>(crate::Error::msg("nope")));
        let guarantee = queue.guarantee(|| "🍓".to_string());
        assert_eq!(promise.wait().unwrap_err().to_string(), "nope");
        assert_eq!(guarantee.wait(), "🍓");
    }
}
