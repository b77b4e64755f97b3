use super::{protocol_violation, Subject, SubjectLike};
use crate::{
  error::{ObjectUnsubscribedError, ValueError},
  observable::{IntoObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};
use std::{cell::RefCell, convert::Infallible, rc::Rc};

/// A subject holding a current value. Every new subscriber receives the
/// current value first, then the live notifications.
pub struct BehaviorSubject<Item, Err = Infallible> {
  subject: Subject<Item, Err>,
  value: Rc<RefCell<Item>>,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self {
    BehaviorSubject { subject: self.subject.clone(), value: self.value.clone() }
  }
}

impl<Item, Err> BehaviorSubject<Item, Err> {
  pub fn new(value: Item) -> Self {
    BehaviorSubject { subject: Subject::new(), value: Rc::new(RefCell::new(value)) }
  }

  #[inline]
  pub fn subscribed_size(&self) -> usize { self.subject.subscribed_size() }

  #[inline]
  pub fn is_stopped(&self) -> bool { self.subject.is_stopped() }
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  /// The current value.
  ///
  /// Fails with the stored error once the subject errored, and with
  /// [`ObjectUnsubscribedError`] once it was disposed.
  pub fn value(&self) -> Result<Item, ValueError<Err>> {
    if let Some(err) = self.subject.thrown_error() {
      return Err(ValueError::Errored(err));
    }
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError.into());
    }
    Ok(self.value.borrow().clone())
  }

  pub fn try_next(&self, value: Item) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    *self.value.borrow_mut() = value.clone();
    self.subject.try_next(value)
  }

  #[inline]
  pub fn try_error(&self, err: Err) -> Result<(), ObjectUnsubscribedError> {
    self.subject.try_error(err)
  }

  #[inline]
  pub fn try_complete(&self) -> Result<(), ObjectUnsubscribedError> { self.subject.try_complete() }

  pub fn try_subscribe_with(
    &self, subscriber: Subscriber<Item, Err>,
  ) -> Result<Subscription, ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    let teardown = self.subject.inner_subscribe(&subscriber);
    if !self.subject.is_stopped() && !subscriber.is_stopped() {
      let current = self.value.borrow().clone();
      subscriber.next(current);
    }
    self.subject.check_finalized_statuses(&subscriber);
    subscriber.add(teardown);
    Ok(subscriber.subscription().clone())
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    let this = self.clone();
    Observable::new(move |s: Subscriber<Item, Err>| {
      if let Err(err) = this.try_subscribe_with(s) {
        protocol_violation(err);
      }
    })
  }
}

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn next(&mut self, value: Item) {
    if let Err(err) = self.try_next(value) {
      protocol_violation(err);
    }
  }

  fn error(&mut self, err: Err) {
    if let Err(err) = self.try_error(err) {
      protocol_violation(err);
    }
  }

  fn complete(&mut self) {
    if let Err(err) = self.try_complete() {
      protocol_violation(err);
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.is_stopped() }
}

impl<Item, Err> SubscriptionLike for BehaviorSubject<Item, Err> {
  #[inline]
  fn unsubscribe(&self) { self.subject.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.subject.is_disposed() }
}

impl<Item, Err> SubjectLike<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn as_observer(&self) -> Box<dyn Observer<Item, Err>> { Box::new(self.clone()) }

  fn observable(&self) -> Observable<Item, Err> { BehaviorSubject::observable(self) }

  fn is_stopped(&self) -> bool { BehaviorSubject::is_stopped(self) }
}

impl<Item, Err> IntoObservable<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}
