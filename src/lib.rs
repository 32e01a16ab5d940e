//! Promises and guarantees: write-once values that run registered
//! continuations when they resolve, whether those continuations were attached
//! before or after resolution.
//!
//! A [`Promise`] resolves with an [`Outcome`], a value or an [`Error`]. A
//! [`Guarantee`] resolves with a bare value and can never fail. Both are cheap
//! handles onto one shared box; the producer keeps the single-use
//! [`Resolver`] that seals it.
//!
//! Chains are built with the [`Thenable`] combinators (`then`, `map`,
//! `flat_map`, `done`, `validate`, `tap`), failures are handled with
//! [`Promise::catch`], [`Promise::recover`] and [`Promise::ensure`], and
//! groups are combined with [`when_fulfilled`], [`when_resolved`] and
//! [`race`]. Where each step runs is decided by the [`Config`] a chain
//! carries.
//!
//! # Examples
//!
//! ```
//! use promise_seal::{Config, Promise, SerialQueue, Thenable};
//! use std::thread;
//!
//! let queue = SerialQueue::new("chain").unwrap();
//! let (promise, resolver) = Promise::<u32>::pending_with(Config::default().with_context(queue));
//!
//! let label = promise
//!     .map(|n| Ok(n + 1))
//!     .then(|n| Ok(Promise::fulfilled(format!("#{n}"))))
//!     .recover(|_| Ok(Promise::fulfilled("unknown".to_string())));
//!
//! let producer = thread::spawn(move || resolver.fulfill(41));
//! assert_eq!(label.wait().unwrap(), "#42");
//! producer.join().expect("The producer thread has panicked");
//! ```
mod catchable;
mod config;
mod context;
mod error;
mod future;
mod guarantee;
mod promise;
mod race;
mod resolution;
mod sequence;
mod thenable;
mod when;

pub use catchable::Finalizer;
pub use config::{CatchPolicy, Config};
pub use context::{ExecutionContext, Inline, Job, SerialQueue};
pub use error::{Error, Outcome};
pub use future::Settled;
pub use guarantee::{Guarantee, GuaranteeResolver};
pub use promise::{firstly, Promise, Resolver};
pub use race::{race, race_guaranteed};
pub use sequence::SequenceThenable;
pub use thenable::Thenable;
pub use when::{
    when_fulfilled, when_fulfilled2, when_fulfilled3, when_fulfilled4, when_fulfilled5,
    when_guaranteed, when_resolved,
};
