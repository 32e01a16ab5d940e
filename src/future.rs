//! `.await` support.
//!
//! A [`Promise`] awaits to its [`Outcome`], a [`Guarantee`] to its value. The
//! first poll registers one continuation on the box; later polls only swap the
//! waker it will wake.
use crate::resolution::Resolution;
use crate::{Guarantee, Outcome, Promise};
use parking_lot::Mutex;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// The future returned by awaiting a [`Promise`] or a [`Guarantee`].
///
/// # Examples
///
/// ```
/// use promise_seal::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let (promise, resolver) = Promise::<String>::pending();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received {:?}", promise.await);
/// }));
/// resolver.fulfill("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
pub struct Settled<R> {
    resolution: Arc<Resolution<R>>,
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}

impl<R> Settled<R> {
    fn new(resolution: Arc<Resolution<R>>) -> Self {
        Self {
            resolution,
            waker: None,
        }
    }
}

impl<R: Clone + Send + Sync + 'static> Future for Settled<R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(value) = this.resolution.get() {
            return Poll::Ready(value);
        }
        if let Some(slot) = &this.waker {
            *slot.lock() = Some(cx.waker().clone());
            // the seal may have taken the previous waker before the swap
            return match this.resolution.get() {
                Some(value) => Poll::Ready(value),
                None => Poll::Pending,
            };
        }
        let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
        let wake = slot.clone();
        this.waker = Some(slot);
        this.resolution.observe(move |_| {
            if let Some(waker) = wake.lock().take() {
                waker.wake()
            }
        });
        Poll::Pending
    }
}

impl<R> fmt::Debug for Settled<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settled")
            .field("registered", &self.waker.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Promise<T> {
    type Output = Outcome<T>;
    type IntoFuture = Settled<Outcome<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Settled::new(self.resolution)
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Guarantee<T> {
    type Output = T;
    type IntoFuture = Settled<T>;

    fn into_future(self) -> Self::IntoFuture {
        Settled::new(self.resolution)
    }
}
