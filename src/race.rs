//! First-to-settle fan-in.
use crate::{Error, Guarantee, Promise, Thenable};

/// Resolves with the outcome of whichever input settles first, success or
/// failure. Later settlements are ignored.
///
/// Racing nothing can never produce a value, so an empty input rejects with
/// [`Error::BadInput`].
///
/// # Examples
///
/// ```
/// use promise_seal::{race, Promise, Thenable};
///
/// let (never, _resolver) = Promise::<u8>::pending();
/// let winner = race(vec![never, Promise::fulfilled(1)]);
/// assert_eq!(winner.value(), Some(1));
/// ```
pub fn race<I, U>(thenables: I) -> Promise<U::Value>
where
    I: IntoIterator<Item = U>,
    U: Thenable,
{
    let thenables: Vec<U> = thenables.into_iter().collect();
    let Some(first) = thenables.first() else {
        return Promise::rejected(Error::BadInput("cannot race an empty set of promises"));
    };
    let promise = Promise::unsealed(first.config().clone());
    for thenable in &thenables {
        let winner = promise.clone();
        thenable.pipe(move |outcome| {
            winner.seal(outcome);
        });
    }
    promise
}

/// Races guarantees. The result cannot fail, and the mandatory `first`
/// input rules out an empty race.
pub fn race_guaranteed<I, T>(first: Guarantee<T>, rest: I) -> Guarantee<T>
where
    I: IntoIterator<Item = Guarantee<T>>,
    T: Clone + Send + Sync + 'static,
{
    let guarantee = Guarantee::unsealed(first.config.clone());
    for input in std::iter::once(first).chain(rest) {
        let winner = guarantee.clone();
        input.resolution.observe(move |value| {
            winner.seal(value);
        });
    }
    guarantee
}
