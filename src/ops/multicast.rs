//! Multicast operators
//!
//! Each of these wraps the source in a [`ConnectableObservable`] over a
//! subject built by a factory. They differ only in the kind of subject.

use crate::{
  observable::{ConnectableObservable, Observable},
  subject::{BehaviorSubject, ReplaySubject, Subject, SubjectLike},
};

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  /// Share this observable through the subjects built by `factory`. A new
  /// subject is built for every connection.
  pub fn multicast<S, F>(self, factory: F) -> ConnectableObservable<Item, Err>
  where
    S: SubjectLike<Item, Err> + 'static,
    F: Fn() -> S + 'static,
  {
    ConnectableObservable::new(self, factory)
  }

  /// Share through a plain [`Subject`].
  pub fn publish(self) -> ConnectableObservable<Item, Err> { self.multicast(Subject::new) }

  /// Share through a [`BehaviorSubject`] seeded with `initial`, so
  /// subscribers receive the latest value as soon as they attach.
  pub fn publish_behavior(self, initial: Item) -> ConnectableObservable<Item, Err> {
    self.multicast(move || BehaviorSubject::new(initial.clone()))
  }

  /// Share through a [`ReplaySubject`] keeping the last `buffer_size`
  /// values.
  pub fn publish_replay(self, buffer_size: usize) -> ConnectableObservable<Item, Err> {
    self.multicast(move || ReplaySubject::new(buffer_size))
  }

  /// Share one subscription of the source among every subscriber, for as
  /// long as at least one is attached.
  pub fn share(self) -> Observable<Item, Err> { self.publish().ref_count() }
}
