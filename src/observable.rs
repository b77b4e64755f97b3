//! Cold, lazily executed event producers.
//!
//! An [`Observable`] is a shareable description of a producer. Nothing runs
//! until something subscribes, and every subscription runs the producer
//! again with its own [`Subscriber`].

use crate::{
  observer::{FnObserver, NoHandler, Observer},
  subscriber::Subscriber,
  subscription::{Subscription, Teardown},
};
use std::{convert::Infallible, fmt::Debug, rc::Rc};

mod connectable;
mod create;
mod defer;
mod of;
mod timer;

pub use connectable::ConnectableObservable;
pub use create::{create, try_create};
pub use defer::defer;
pub use of::{empty, from_iter, never, of, throw_err};
pub use timer::{interval, timer};

pub use crate::ops::{concat::concat, race::race};

type Producer<Item, Err> = dyn Fn(Subscriber<Item, Err>) -> Teardown;

pub struct Observable<Item, Err = Infallible> {
  producer: Rc<Producer<Item, Err>>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Observable { producer: self.producer.clone() } }
}

impl<Item, Err> Debug for Observable<Item, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("Observable")
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Wrap a producer. It runs once per subscription and returns the teardown
  /// for what it started.
  pub fn new<F, T>(producer: F) -> Self
  where
    F: Fn(Subscriber<Item, Err>) -> T + 'static,
    T: Into<Teardown>,
  {
    Observable { producer: Rc::new(move |s: Subscriber<Item, Err>| producer(s).into()) }
  }

  /// Run the producer for an existing subscriber and return its subscription.
  ///
  /// A subscriber that is already stopped never reaches the producer.
  pub fn subscribe_with(&self, subscriber: Subscriber<Item, Err>) -> Subscription {
    if !subscriber.is_stopped() {
      let teardown = (self.producer)(subscriber.clone());
      subscriber.add(teardown);
    }
    subscriber.subscription().clone()
  }

  pub fn actual_subscribe(&self, observer: impl Observer<Item, Err> + 'static) -> Subscription {
    self.subscribe_with(Subscriber::new(observer))
  }

  /// Subscribe with a `next` handler only. An error notification panics.
  pub fn subscribe(&self, next: impl FnMut(Item) + 'static) -> Subscription {
    self.actual_subscribe(FnObserver::next_only(next))
  }

  pub fn subscribe_err(
    &self, next: impl FnMut(Item) + 'static, error: impl FnMut(Err) + 'static,
  ) -> Subscription {
    self.actual_subscribe(FnObserver::new(next, error, NoHandler))
  }

  /// Subscribe with `next` and `complete` handlers. An error notification
  /// panics.
  pub fn subscribe_complete(
    &self, next: impl FnMut(Item) + 'static, complete: impl FnMut() + 'static,
  ) -> Subscription {
    self.actual_subscribe(FnObserver::new(next, NoHandler, complete))
  }

  pub fn subscribe_all(
    &self, next: impl FnMut(Item) + 'static, error: impl FnMut(Err) + 'static,
    complete: impl FnMut() + 'static,
  ) -> Subscription {
    self.actual_subscribe(FnObserver::new(next, error, complete))
  }
}

/// Conversion into an [`Observable`], implemented by every source kind so
/// combinators accept subjects and test observables directly.
pub trait IntoObservable<Item, Err> {
  fn into_observable(self) -> Observable<Item, Err>;
}

impl<Item, Err> IntoObservable<Item, Err> for Observable<Item, Err> {
  #[inline]
  fn into_observable(self) -> Observable<Item, Err> { self }
}

impl<Item, Err> IntoObservable<Item, Err> for &Observable<Item, Err> {
  #[inline]
  fn into_observable(self) -> Observable<Item, Err> { self.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::SubscriptionLike;
  use std::cell::{Cell, RefCell};

  #[test]
  fn cold_runs_per_subscription() {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    let source = Observable::<i32>::new(move |s| {
      r.set(r.get() + 1);
      s.next(1);
      s.complete();
    });
    assert_eq!(runs.get(), 0);

    let values = Rc::new(RefCell::new(vec![]));
    let v1 = values.clone();
    source.subscribe(move |v| v1.borrow_mut().push(v));
    let v2 = values.clone();
    source.subscribe(move |v| v2.borrow_mut().push(v));
    assert_eq!(runs.get(), 2);
    assert_eq!(*values.borrow(), vec![1, 1]);
  }

  #[test]
  fn producer_teardown_runs_on_unsubscribe() {
    let torn_down = Rc::new(Cell::new(false));
    let t = torn_down.clone();
    let source = Observable::<i32>::new(move |_| {
      let t = t.clone();
      Teardown::from_fn(move || t.set(true))
    });
    let subscription = source.subscribe(|_| {});
    assert!(!torn_down.get());
    subscription.unsubscribe();
    assert!(torn_down.get());
  }

  #[test]
  fn teardown_of_a_completed_producer_runs_at_once() {
    let torn_down = Rc::new(Cell::new(false));
    let t = torn_down.clone();
    let source = Observable::<i32>::new(move |s| {
      s.complete();
      let t = t.clone();
      Teardown::from_fn(move || t.set(true))
    });
    let subscription = source.subscribe(|_| {});
    assert!(subscription.is_closed());
    assert!(torn_down.get());
  }

  #[test]
  fn stopped_subscriber_skips_producer() {
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let source = Observable::<i32>::new(move |_| r.set(true));
    let subscriber = Subscriber::new(FnObserver::next_only(|_: i32| {}));
    subscriber.unsubscribe();
    source.subscribe_with(subscriber);
    assert!(!ran.get());
  }

  #[test]
  fn shared_plain_observer_keeps_independent_lifecycles() {
    #[derive(Default)]
    struct Collect {
      values: Vec<i32>,
      completions: usize,
    }
    impl Observer<i32, Infallible> for Collect {
      fn next(&mut self, value: i32) { self.values.push(value) }

      fn error(&mut self, _: Infallible) {}

      fn complete(&mut self) { self.completions += 1 }
    }

    let shared = Rc::new(RefCell::new(Collect::default()));
    let finite = Observable::<i32>::new(|s| {
      s.next(1);
      s.complete();
    });
    let open = Observable::<i32>::new(|s| s.next(2));

    let first = finite.actual_subscribe(shared.clone());
    let second = open.actual_subscribe(shared.clone());

    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(shared.borrow().values, vec![1, 2]);
    assert_eq!(shared.borrow().completions, 1);
  }
}
