//! Fan-in: wait on many thenables and combine their results.
//!
//! Each aggregation owns a slot array and a remaining-count behind its own
//! lock, separate from the lock of any input, so inputs settling concurrently
//! on different threads cannot corrupt it. Results are always reported in
//! input order, never completion order.
use crate::{Config, Error, Guarantee, Outcome, Promise, Thenable};
use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;

struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    fn new(count: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Slots {
            values: (0..count).map(|_| None).collect(),
            remaining: count,
        }))
    }

    /// Fills `index`; returns every value, in order, once the last slot fills.
    fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        self.values[index] = Some(value);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(mem::take(&mut self.values).into_iter().flatten().collect())
    }
}

fn config_of<U: Thenable>(thenables: &[U]) -> Config {
    thenables
        .first()
        .map_or_else(Config::default, |first| first.config().clone())
}

/// Resolves with every value once all inputs succeed, or with the first
/// failure as soon as any input fails.
///
/// An empty input resolves at once with an empty vec. Inputs still running
/// when the result is rejected are not stopped; their results are discarded.
///
/// # Examples
///
/// ```
/// use promise_seal::{when_fulfilled, Promise, Thenable};
///
/// let (slow, resolver) = Promise::<i32>::pending();
/// let all = when_fulfilled(vec![slow, Promise::fulfilled(2)]);
/// assert!(all.is_pending());
/// resolver.fulfill(1);
/// assert_eq!(all.wait().unwrap(), vec![1, 2]);
/// ```
pub fn when_fulfilled<I, U>(thenables: I) -> Promise<Vec<U::Value>>
where
    I: IntoIterator<Item = U>,
    U: Thenable,
{
    let thenables: Vec<U> = thenables.into_iter().collect();
    if thenables.is_empty() {
        return Promise::fulfilled(Vec::new());
    }
    let promise = Promise::unsealed(config_of(&thenables));
    let slots = Slots::new(thenables.len());
    for (index, thenable) in thenables.iter().enumerate() {
        let aggregate = promise.clone();
        let slots = slots.clone();
        thenable.pipe(move |outcome| match outcome {
            Err(error) => {
                aggregate.seal(Err(error));
            }
            Ok(_) if aggregate.resolution.is_resolved() => {}
            Ok(value) => {
                let finished = slots.lock().fill(index, value);
                if let Some(values) = finished {
                    aggregate.seal(Ok(values));
                }
            }
        });
    }
    promise
}

/// Resolves once every input has settled, with each input's outcome in
/// input order. Never fails.
pub fn when_resolved<I, U>(thenables: I) -> Guarantee<Vec<Outcome<U::Value>>>
where
    I: IntoIterator<Item = U>,
    U: Thenable,
{
    let thenables: Vec<U> = thenables.into_iter().collect();
    if thenables.is_empty() {
        return Guarantee::resolved(Vec::new());
    }
    let guarantee = Guarantee::unsealed(config_of(&thenables));
    let slots = Slots::new(thenables.len());
    for (index, thenable) in thenables.iter().enumerate() {
        let aggregate = guarantee.clone();
        let slots = slots.clone();
        thenable.pipe(move |outcome| {
            let finished = slots.lock().fill(index, outcome);
            if let Some(outcomes) = finished {
                aggregate.seal(outcomes);
            }
        });
    }
    guarantee
}

/// Resolves with every value once all input guarantees resolve.
pub fn when_guaranteed<I, T>(guarantees: I) -> Guarantee<Vec<T>>
where
    I: IntoIterator<Item = Guarantee<T>>,
    T: Clone + Send + Sync + 'static,
{
    let guarantees: Vec<Guarantee<T>> = guarantees.into_iter().collect();
    if guarantees.is_empty() {
        return Guarantee::resolved(Vec::new());
    }
    let guarantee = Guarantee::unsealed(config_of(&guarantees));
    let slots = Slots::new(guarantees.len());
    for (index, input) in guarantees.iter().enumerate() {
        let aggregate = guarantee.clone();
        let slots = slots.clone();
        input.resolution.observe(move |value| {
            let finished = slots.lock().fill(index, value);
            if let Some(values) = finished {
                aggregate.seal(values);
            }
        });
    }
    guarantee
}

fn fulfilled_value<U: Thenable>(thenable: &U) -> Outcome<U::Value> {
    thenable
        .result()
        .unwrap_or(Err(Error::BadInput("aggregate resolved before its inputs")))
}

/// [`when_fulfilled`] over two thenables of different types.
pub fn when_fulfilled2<A, B>(a: A, b: B) -> Promise<(A::Value, B::Value)>
where
    A: Thenable,
    B: Thenable,
{
    when_fulfilled([a.as_void(), b.as_void()])
        .map(move |_| Ok((fulfilled_value(&a)?, fulfilled_value(&b)?)))
}

/// [`when_fulfilled`] over three thenables of different types.
pub fn when_fulfilled3<A, B, C>(a: A, b: B, c: C) -> Promise<(A::Value, B::Value, C::Value)>
where
    A: Thenable,
    B: Thenable,
    C: Thenable,
{
    when_fulfilled([a.as_void(), b.as_void(), c.as_void()])
        .map(move |_| {
            Ok((
                fulfilled_value(&a)?,
                fulfilled_value(&b)?,
                fulfilled_value(&c)?,
            ))
        })
}

/// [`when_fulfilled`] over four thenables of different types.
pub fn when_fulfilled4<A, B, C, D>(
    a: A,
    b: B,
    c: C,
    d: D,
) -> Promise<(A::Value, B::Value, C::Value, D::Value)>
where
    A: Thenable,
    B: Thenable,
    C: Thenable,
    D: Thenable,
{
    when_fulfilled([a.as_void(), b.as_void(), c.as_void(), d.as_void()])
        .map(move |_| {
            Ok((
                fulfilled_value(&a)?,
                fulfilled_value(&b)?,
                fulfilled_value(&c)?,
                fulfilled_value(&d)?,
            ))
        })
}

/// [`when_fulfilled`] over five thenables of different types.
pub fn when_fulfilled5<A, B, C, D, E>(
    a: A,
    b: B,
    c: C,
    d: D,
    e: E,
) -> Promise<(A::Value, B::Value, C::Value, D::Value, E::Value)>
where
    A: Thenable,
    B: Thenable,
    C: Thenable,
    D: Thenable,
    E: Thenable,
{
    when_fulfilled([a.as_void(), b.as_void(), c.as_void(), d.as_void(), e.as_void()])
        .map(move |_| {
            Ok((
                fulfilled_value(&a)?,
                fulfilled_value(&b)?,
                fulfilled_value(&c)?,
                fulfilled_value(&d)?,
                fulfilled_value(&e)?,
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::{
        when_fulfilled, when_fulfilled2, when_fulfilled3, when_fulfilled4, when_fulfilled5,
        when_guaranteed, when_resolved,
    };
    use crate::{Error, Guarantee, Promise, Thenable};
    use std::sync::{mpsc, Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_input_fulfills_immediately() {
        let all = when_fulfilled(Vec::<Promise<u8>>::new());
        assert_eq!(all.value(), Some(vec![]));
        let settled = when_resolved(Vec::<Promise<u8>>::new());
        assert_eq!(settled.get().map(|outcomes| outcomes.len()), Some(0));
    }

    #[test]
    fn test_values_keep_input_order() {
        let (first, first_resolver) = Promise::<&str>::pending();
        let (second, second_resolver) = Promise::<&str>::pending();
        let all = when_fulfilled(vec![first, second]);
        second_resolver.fulfill("b");
        assert!(all.is_pending());
        first_resolver.fulfill("a");
        assert_eq!(all.value(), Some(vec!["a", "b"]));
    }

    #[test]
    fn test_first_failure_wins() {
        let (a, a_resolver) = Promise::<u8>::pending();
        let (b, b_resolver) = Promise::<u8>::pending();
        let (c, c_resolver) = Promise::<u8>::pending();
        let all = when_fulfilled(vec![a, b, c]);
        b_resolver.reject(Error::msg("B failed"));
        a_resolver.fulfill(1);
        c_resolver.fulfill(3);
        assert_eq!(all.error().unwrap().to_string(), "B failed");
    }

    #[test]
    fn test_when_resolved_reports_every_outcome() {
        let (a, a_resolver) = Promise::<u8>::pending();
        let (b, b_resolver) = Promise::<u8>::pending();
        let (c, c_resolver) = Promise::<u8>::pending();
        let settled = when_resolved(vec![a, b, c]);
        c_resolver.fulfill(3);
        b_resolver.reject(Error::msg("B failed"));
        assert!(settled.get().is_none());
        a_resolver.fulfill(1);

        let outcomes = settled.get().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().ok(), Some(&1));
        assert_eq!(outcomes[1].as_ref().unwrap_err().to_string(), "B failed");
        assert_eq!(outcomes[2].as_ref().ok(), Some(&3));
    }

    #[test]
    fn test_concurrent_settlement_fills_every_slot() {
        let count = 16;
        let barrier = Arc::new(Barrier::new(count));
        let (promises, resolvers): (Vec<_>, Vec<_>) =
            (0..count).map(|_| Promise::<usize>::pending()).unzip();
        let all = when_fulfilled(promises);
        let producers: Vec<_> = resolvers
            .into_iter()
            .enumerate()
            .map(|(index, resolver)| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    resolver.fulfill(index);
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("The producer thread has panicked");
        }
        assert_eq!(all.wait().unwrap(), (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn test_when_guaranteed_and_tuples() {
        let (late, resolver) = Guarantee::<i32>::pending();
        let all = when_guaranteed(vec![Guarantee::resolved(1), late]);
        let (tx, rx) = mpsc::channel();
        all.done(move |values| tx.send(values).unwrap());
        resolver.resolve(2);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(vec![1, 2]));

        let pair = when_fulfilled2(Promise::fulfilled(1), Guarantee::resolved("two"));
        assert_eq!(pair.value(), Some((1, "two")));

        let triple = when_fulfilled3(
            Promise::fulfilled(1),
            Promise::<char>::rejected(Error::msg("no char")),
            Guarantee::resolved(3.0),
        );
        assert_eq!(triple.error().unwrap().to_string(), "no char");
    }

    #[test]
    fn test_wide_tuples() {
        let (late, resolver) = Promise::<u16>::pending();
        let quad = when_fulfilled4(
            Promise::fulfilled(1u8),
            Guarantee::resolved('b'),
            late,
            Promise::fulfilled("d"),
        );
        assert!(quad.is_pending());
        resolver.fulfill(3);
        assert_eq!(quad.value(), Some((1, 'b', 3, "d")));

        let five = when_fulfilled5(
            Promise::fulfilled(1),
            Promise::fulfilled(2),
            Promise::fulfilled(3),
            Promise::fulfilled(4),
            Promise::fulfilled(5),
        );
        assert_eq!(five.value(), Some((1, 2, 3, 4, 5)));

        let failed = when_fulfilled5(
            Promise::fulfilled(1),
            Promise::fulfilled(2),
            Promise::fulfilled(3),
            Promise::fulfilled(4),
            Promise::<u8>::rejected(Error::msg("fifth")),
        );
        assert_eq!(failed.error().unwrap().to_string(), "fifth");
    }
}
