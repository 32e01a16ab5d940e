//! The write-once cell every promise and guarantee is built on.
//!
//! A `Resolution` is either pending, holding the continuations registered so
//! far, or resolved, holding the value every continuation receives. It moves
//! from pending to resolved at most once. Continuations always run after the
//! lock is released, so they are free to observe or seal other resolutions.
//!
//! A seal made from inside a running continuation does not call its own
//! continuations recursively. It queues them on the thread that is already
//! running continuations, and that thread runs them before its outermost seal
//! returns. Stack depth stays constant however long a chain is.
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::mem;

/// A registered continuation.
type Handler<R> = Box<dyn FnOnce(R) + Send>;

/// A continuation bound to its value, waiting for its turn on this thread.
type Deferred = Box<dyn FnOnce()>;

thread_local! {
    static DEFERRED: RefCell<VecDeque<Deferred>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = Cell::new(false);
}

/// Clears the draining flag when the outermost seal finishes, panic or not.
struct Draining;

impl Drop for Draining {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
    }
}

/// Queues `calls` and, unless this thread is already draining, runs them and
/// everything they queue in turn.
fn dispatch<I>(calls: I)
where
    I: IntoIterator<Item = Deferred>,
{
    DEFERRED.with(|queue| queue.borrow_mut().extend(calls));
    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }
    let _draining = Draining;
    while let Some(call) = DEFERRED.with(|queue| queue.borrow_mut().pop_front()) {
        call();
    }
}

enum State<R> {
    Pending(Vec<Handler<R>>),
    Resolved(R),
}

pub(crate) struct Resolution<R> {
    state: Mutex<State<R>>,
}

impl<R: Clone + 'static> Resolution<R> {
    pub(crate) fn pending() -> Self {
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
        }
    }

    pub(crate) fn resolved(value: R) -> Self {
        Self {
            state: Mutex::new(State::Resolved(value)),
        }
    }

    pub(crate) fn get(&self) -> Option<R> {
        match &*self.state.lock() {
            State::Pending(_) => None,
            State::Resolved(value) => Some(value.clone()),
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), State::Resolved(_))
    }

    /// Runs `body` with the resolved value, now if there is one, otherwise
    /// once the resolution is sealed.
    ///
    /// When already resolved `body` runs synchronously on the calling thread.
    pub(crate) fn observe<F>(&self, body: F)
    where
        F: FnOnce(R) + Send + 'static,
    {
        let value = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(handlers) => {
                    handlers.push(Box::new(body));
                    return;
                }
                State::Resolved(value) => value.clone(),
            }
        };
        body(value)
    }

    /// Transitions to resolved and runs every registered continuation in
    /// attachment order.
    ///
    /// Returns `false` and leaves the first value in place if the resolution
    /// was already sealed.
    pub(crate) fn seal(&self, value: R) -> bool {
        let mut state = self.state.lock();
        let handlers = match &mut *state {
            State::Resolved(_) => {
                log::debug!("ignoring seal of an already resolved promise");
                return false;
            }
            State::Pending(handlers) => mem::take(handlers),
        };
        *state = State::Resolved(value.clone());
        drop(state);

        dispatch(handlers.into_iter().map(|body| {
            let value = value.clone();
            Box::new(move || body(value)) as Deferred
        }));
        true
    }
}
