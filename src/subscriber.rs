use crate::{
  notification::Notification,
  observer::Observer,
  subscription::{Subscription, SubscriptionLike, Teardown},
};
use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  fmt::{Debug, Formatter},
  rc::{Rc, Weak},
};

/// Implements the Observer trait and Subscription trait. While the Observer is
/// the public API for consuming the values of an Observable, all Observers get
/// converted to a Subscriber, in order to provide Subscription capabilities.
///
/// Cloning a `Subscriber` shares it. Once stopped or closed, `next` is
/// ignored and only the first terminal notification is delivered.
///
/// A notification that arrives while the same subscriber is still
/// delivering a previous one is queued and delivered right after it, so the
/// observer never sees interleaved calls.
pub struct Subscriber<Item, Err>(Rc<Inner<Item, Err>>);

struct Inner<Item, Err> {
  subscription: Subscription,
  stopped: Cell<bool>,
  destination: RefCell<Option<Box<dyn Observer<Item, Err>>>>,
  pending: RefCell<VecDeque<Notification<Item, Err>>>,
}

impl<Item: 'static, Err: 'static> Subscriber<Item, Err> {
  pub fn new(observer: impl Observer<Item, Err> + 'static) -> Self {
    let inner = Rc::new(Inner {
      subscription: Subscription::new(),
      stopped: Cell::new(false),
      destination: RefCell::new(Some(Box::new(observer))),
      pending: RefCell::new(VecDeque::new()),
    });
    let weak = Rc::downgrade(&inner);
    inner
      .subscription
      .add(Teardown::from_fn(move || release(&weak)));
    Subscriber(inner)
  }

  pub fn next(&self, value: Item) {
    if !self.is_stopped() {
      self.dispatch(Notification::Next(value));
    }
  }

  pub fn error(&self, err: Err) {
    if !self.is_stopped() {
      self.0.stopped.set(true);
      self.dispatch(Notification::Error(err));
      self.close();
    }
  }

  pub fn complete(&self) {
    if !self.is_stopped() {
      self.0.stopped.set(true);
      self.dispatch(Notification::Complete);
      self.close();
    }
  }

  /// Deliver `notification` unless it is being delivered re-entrantly, in
  /// which case the outer call drains it afterwards.
  fn dispatch(&self, notification: Notification<Item, Err>) {
    let Ok(mut destination) = self.0.destination.try_borrow_mut() else {
      self.0.pending.borrow_mut().push_back(notification);
      return;
    };

    let mut current = Some(notification);
    while let Some(notification) = current {
      let deliver = notification.is_terminal() || self.0.stopped.get() || !self.is_closed();
      if let (true, Some(observer)) = (deliver, destination.as_mut()) {
        notification.accept(observer.as_mut());
      }
      current = self.0.pending.borrow_mut().pop_front();
    }

    if self.is_closed() {
      let observer = destination.take();
      drop(destination);
      drop(observer);
    }
  }

  fn close(&self) {
    if let Err(err) = self.0.subscription.try_unsubscribe() {
      crate::error::raise_unsubscription_error(err);
    }
  }

  /// Register a teardown that runs when this subscriber closes.
  #[inline]
  pub fn add(&self, teardown: impl Into<Teardown>) { self.0.subscription.add(teardown) }

  #[inline]
  pub fn subscription(&self) -> &Subscription { &self.0.subscription }

  /// `true` after a terminal notification or once the subscription closed.
  #[inline]
  pub fn is_stopped(&self) -> bool { self.0.stopped.get() || self.is_closed() }
}

impl<Item, Err> Subscriber<Item, Err> {
  /// `true` once the subscription closed.
  #[inline]
  pub fn is_closed(&self) -> bool { self.0.subscription.is_closed() }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

/// Drop the observer of a closed subscriber to break reference cycles
/// through captured state. A subscriber still in the middle of a delivery
/// releases it when that delivery returns.
fn release<Item, Err>(weak: &Weak<Inner<Item, Err>>) {
  if let Some(inner) = weak.upgrade() {
    if !inner.stopped.get() {
      inner.pending.borrow_mut().clear();
    }
    let observer = match inner.destination.try_borrow_mut() {
      Ok(mut destination) => destination.take(),
      Err(_) => None,
    };
    drop(observer);
  }
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Subscriber(self.0.clone()) }
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for Subscriber<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { Subscriber::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { Subscriber::error(self, err) }

  #[inline]
  fn complete(&mut self) { Subscriber::complete(self) }

  #[inline]
  fn is_closed(&self) -> bool { Subscriber::is_stopped(self) }
}

impl<Item, Err> SubscriptionLike for Subscriber<Item, Err> {
  /// Cancel without notifying the observer.
  fn unsubscribe(&self) {
    self.0.pending.borrow_mut().clear();
    self.0.subscription.unsubscribe()
  }

  #[inline]
  fn is_closed(&self) -> bool { Subscriber::is_closed(self) }

  #[inline]
  fn as_subscription(&self) -> Option<&Subscription> { Some(&self.0.subscription) }
}

impl<Item, Err> Debug for Subscriber<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscriber")
      .field("stopped", &self.0.stopped.get())
      .field("subscription", &self.0.subscription)
      .finish()
  }
}
