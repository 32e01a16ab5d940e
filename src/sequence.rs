//! Helpers for thenables that resolve to a `Vec`.
use crate::{when_fulfilled, Error, Promise, Thenable};
use std::fmt::Debug;

/// Element-wise combinators for any [`Thenable`] whose value is a `Vec<E>`.
pub trait SequenceThenable<E>: Thenable<Value = Vec<E>>
where
    E: Clone + Send + Sync + 'static,
{
    /// Transforms every element.
    fn map_each<U, F>(&self, transform: F) -> Promise<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(E) -> Result<U, Error> + Send + 'static,
    {
        self.map(move |values| values.into_iter().map(transform).collect())
    }

    /// Starts a thenable for every element and waits for all of them.
    fn then_each<U, F>(&self, transform: F) -> Promise<Vec<U::Value>>
    where
        U: Thenable,
        F: FnMut(E) -> Result<U, Error> + Send + 'static,
    {
        self.then(move |values| {
            let started = values.into_iter().map(transform).collect::<Result<Vec<U>, Error>>()?;
            Ok(when_fulfilled(started))
        })
    }

    /// Transforms every element, rejecting with [`Error::FlatMap`] on the
    /// first element `transform` produces nothing for.
    fn flat_map_each<U, F>(&self, mut transform: F) -> Promise<Vec<U>>
    where
        E: Debug,
        U: Clone + Send + Sync + 'static,
        F: FnMut(E) -> Option<U> + Send + 'static,
    {
        self.map(move |values| {
            values
                .into_iter()
                .map(|value| {
                    let input = value.clone();
                    transform(value).ok_or_else(|| Error::flat_map::<_, U>(&input))
                })
                .collect()
        })
    }

    fn filter_each<F>(&self, mut test: F) -> Promise<Vec<E>>
    where
        F: FnMut(&E) -> bool + Send + 'static,
    {
        self.map(move |values| Ok(values.into_iter().filter(|value| test(value)).collect()))
    }

    /// The first element; an empty vec rejects with [`Error::FlatMap`].
    fn first(&self) -> Promise<E>
    where
        E: Debug,
    {
        self.flat_map(|values| values.into_iter().next())
    }

    /// The last element; an empty vec rejects with [`Error::FlatMap`].
    fn last(&self) -> Promise<E>
    where
        E: Debug,
    {
        self.flat_map(|values| values.into_iter().last())
    }

    fn sorted(&self) -> Promise<Vec<E>>
    where
        E: Ord,
    {
        self.map(|mut values| {
            values.sort();
            Ok(values)
        })
    }
}

impl<E, T> SequenceThenable<E> for T
where
    E: Clone + Send + Sync + 'static,
    T: Thenable<Value = Vec<E>>,
{
}

#[cfg(test)]
mod tests {
    use super::SequenceThenable;
    use crate::{Error, Promise, Thenable};

    #[test]
    fn test_element_wise_helpers() {
        let numbers = Promise::fulfilled(vec![3, 1, 2]);
        assert_eq!(numbers.map_each(|n| Ok(n * 2)).value(), Some(vec![6, 2, 4]));
        assert_eq!(numbers.filter_each(|n| *n > 1).value(), Some(vec![3, 2]));
        assert_eq!(numbers.sorted().value(), Some(vec![1, 2, 3]));
        assert_eq!(numbers.first().value(), Some(3));
        assert_eq!(numbers.last().value(), Some(2));
    }

    #[test]
    fn test_then_each_fans_out() {
        let names = Promise::fulfilled(vec!["a", "b"]);
        let loaded = names.then_each(|name| Ok(Promise::fulfilled(name.to_uppercase())));
        assert_eq!(loaded.value(), Some(vec!["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_empty_and_unmappable_inputs_reject() {
        let empty = Promise::fulfilled(Vec::<u8>::new());
        assert!(matches!(empty.first().error(), Some(Error::FlatMap { .. })));
        assert!(matches!(empty.last().error(), Some(Error::FlatMap { .. })));

        let words = Promise::fulfilled(vec!["1", "two"]);
        match words.flat_map_each(|word| word.parse::<i32>().ok()).error() {
            Some(Error::FlatMap { value, .. }) => assert_eq!(value, "\"two\""),
            other => panic!("unexpected {other:?}"),
        }
    }
}
