//! RefCount operator implementation
//!
//! Connects a [`ConnectableObservable`] when its first subscriber arrives
//! and disconnects it when the last one leaves.

use super::OperatorSubscriber;
use crate::{
  observable::{ConnectableObservable, Observable},
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};
use std::{cell::RefCell, rc::Rc};

impl<Item: 'static, Err: 'static> ConnectableObservable<Item, Err> {
  /// An observable that keeps this connectable connected while at least one
  /// subscriber is attached.
  ///
  /// The connection is made on the 0 to 1 transition and torn down on the
  /// 1 to 0 transition. A later subscriber starts a new connection cycle
  /// with a fresh subject; nothing from the previous cycle is reused.
  pub fn ref_count(&self) -> Observable<Item, Err> {
    let connectable = self.clone();
    Observable::new(move |d: Subscriber<Item, Err>| {
      let counter = connectable.ref_count_cell();
      counter.set(counter.get() + 1);

      let connection: Rc<RefCell<Option<Subscription>>> = Rc::default();
      let (shared, local) = (connectable.clone(), connection.clone());
      let upstream = OperatorSubscriber::forward(&d)
        .on_finalize(move || {
          let local = local.borrow_mut().take();
          let counter = shared.ref_count_cell();
          if counter.get() == 0 {
            return;
          }
          counter.set(counter.get() - 1);
          if counter.get() > 0 {
            return;
          }
          if let Some(current) = shared.current_connection() {
            if local.as_ref().map_or(true, |local| local.ptr_eq(&current)) {
              current.unsubscribe();
            }
          }
        })
        .into_subscriber();

      connectable.observable().subscribe_with(upstream.clone());
      if !upstream.is_closed() {
        *connection.borrow_mut() = Some(connectable.connect());
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{
    cell::{Cell, RefCell},
    rc::Rc,
  };

  fn counted_source(
    subscriptions: &Rc<Cell<usize>>, unsubscriptions: &Rc<Cell<usize>>,
  ) -> Observable<i32, ()> {
    let (subs, unsubs) = (subscriptions.clone(), unsubscriptions.clone());
    observable::create(move |_: Subscriber<i32, ()>| {
      subs.set(subs.get() + 1);
      let unsubs = unsubs.clone();
      Teardown::from_fn(move || unsubs.set(unsubs.get() + 1))
    })
  }

  #[test]
  fn connects_once_per_cycle() {
    let (subs, unsubs) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
    let shared = counted_source(&subs, &unsubs).publish().ref_count();

    let a = shared.subscribe(|_| {});
    let b = shared.subscribe(|_| {});
    assert_eq!((subs.get(), unsubs.get()), (1, 0));

    a.unsubscribe();
    assert_eq!((subs.get(), unsubs.get()), (1, 0));
    b.unsubscribe();
    assert_eq!((subs.get(), unsubs.get()), (1, 1));

    let c = shared.subscribe(|_| {});
    assert_eq!((subs.get(), unsubs.get()), (2, 1));
    c.unsubscribe();
    c.unsubscribe();
    assert_eq!((subs.get(), unsubs.get()), (2, 2));
  }

  #[test]
  fn publish_behavior_cycles_restart_from_the_seed() {
    let source = Subject::<i32, ()>::new();
    let shared = source.observable().publish_behavior(0).ref_count();

    let first = Rc::new(RefCell::new(vec![]));
    let f = first.clone();
    let subscription = shared.subscribe(move |v| f.borrow_mut().push(v));
    source.try_next(1).unwrap();
    subscription.unsubscribe();
    assert_eq!(source.subscribed_size(), 0);

    let second = Rc::new(RefCell::new(vec![]));
    let s = second.clone();
    shared.subscribe(move |v| s.borrow_mut().push(v));
    source.try_next(2).unwrap();

    assert_eq!(*first.borrow(), vec![0, 1]);
    assert_eq!(*second.borrow(), vec![0, 2]);
  }

  #[test]
  fn source_completion_resets_the_count() {
    let source = Subject::<i32, ()>::new();
    let shared = source.observable().publish().ref_count();
    let completed = Rc::new(Cell::new(0));
    let (c1, c2) = (completed.clone(), completed.clone());
    shared.subscribe_complete(|_| {}, move || c1.set(c1.get() + 1));
    shared.subscribe_complete(|_| {}, move || c2.set(c2.get() + 1));
    source.try_complete().unwrap();
    assert_eq!(completed.get(), 2);
    assert_eq!(source.subscribed_size(), 0);

    let c3 = completed.clone();
    shared.subscribe_complete(|_| {}, move || c3.set(c3.get() + 1));
    assert_eq!(completed.get(), 3);
  }
}
