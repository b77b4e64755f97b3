//! Concat operator implementation
//!
//! Subscribes to its sources one after another. The next source is only
//! subscribed once the previous one completed.

use super::OperatorSubscriber;
use crate::{
  observable::{IntoObservable, Observable},
  subscriber::Subscriber,
};
use std::{cell::Cell, rc::Rc};

struct ConcatRun<Item, Err> {
  destination: Subscriber<Item, Err>,
  sources: Rc<[Observable<Item, Err>]>,
  index: Cell<usize>,
  draining: Cell<bool>,
  again: Cell<bool>,
}

/// Subscribe the next source, or complete when there is none left.
///
/// A source completing synchronously while it is being subscribed does not
/// recurse: the outer call picks up the following source instead.
fn subscribe_next<Item: 'static, Err: 'static>(run: &Rc<ConcatRun<Item, Err>>) {
  if run.draining.replace(true) {
    run.again.set(true);
    return;
  }
  loop {
    run.again.set(false);
    if run.destination.is_stopped() {
      break;
    }
    let index = run.index.get();
    let Some(source) = run.sources.get(index) else {
      run.destination.complete();
      break;
    };
    run.index.set(index + 1);
    let next = run.clone();
    OperatorSubscriber::forward(&run.destination)
      .on_complete(move |_| subscribe_next(&next))
      .subscribe_to(source);
    if !run.again.get() {
      break;
    }
  }
  run.draining.set(false);
}

/// Concatenate `sources`: emit all values of the first, then all values of
/// the second, and so on. An error from any source ends the whole sequence.
pub fn concat<Item, Err, I>(sources: I) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  I: IntoIterator,
  I::Item: IntoObservable<Item, Err>,
{
  let sources: Rc<[Observable<Item, Err>]> = sources
    .into_iter()
    .map(IntoObservable::into_observable)
    .collect();
  Observable::new(move |d: Subscriber<Item, Err>| {
    let run = Rc::new(ConcatRun {
      destination: d,
      sources: sources.clone(),
      index: Cell::new(0),
      draining: Cell::new(false),
      again: Cell::new(false),
    });
    subscribe_next(&run);
  })
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emit every value of this observable, then every value of `other`.
  pub fn concat_with<O>(self, other: O) -> Observable<Item, Err>
  where
    O: IntoObservable<Item, Err>,
  {
    concat([self, other.into_observable()])
  }
}
