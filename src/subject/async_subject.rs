use super::{protocol_violation, Subject, SubjectLike};
use crate::{
  error::ObjectUnsubscribedError,
  observable::{IntoObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};
use std::{cell::RefCell, convert::Infallible, rc::Rc};

/// A subject that only emits the last value it received, and only once it
/// completes. An error discards the value.
pub struct AsyncSubject<Item, Err = Infallible> {
  subject: Subject<Item, Err>,
  last: Rc<RefCell<Option<Item>>>,
}

impl<Item, Err> Clone for AsyncSubject<Item, Err> {
  fn clone(&self) -> Self { AsyncSubject { subject: self.subject.clone(), last: self.last.clone() } }
}

impl<Item, Err> Default for AsyncSubject<Item, Err> {
  fn default() -> Self { AsyncSubject { subject: Subject::new(), last: Rc::default() } }
}

impl<Item, Err> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn is_stopped(&self) -> bool { self.subject.is_stopped() }
}

impl<Item, Err> AsyncSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub fn try_next(&self, value: Item) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    if !self.subject.is_terminated() {
      *self.last.borrow_mut() = Some(value);
    }
    Ok(())
  }

  #[inline]
  pub fn try_error(&self, err: Err) -> Result<(), ObjectUnsubscribedError> {
    self.subject.try_error(err)
  }

  pub fn try_complete(&self) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    if !self.subject.is_terminated() {
      let last = self.last.borrow().clone();
      if let Some(value) = last {
        self.subject.try_next(value)?;
      }
      self.subject.try_complete()?;
    }
    Ok(())
  }

  pub fn try_subscribe_with(
    &self, subscriber: Subscriber<Item, Err>,
  ) -> Result<Subscription, ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    let teardown = self.subject.inner_subscribe(&subscriber);
    if self.subject.is_terminated() && self.subject.thrown_error().is_none() {
      let last = self.last.borrow().clone();
      if let Some(value) = last {
        subscriber.next(value);
      }
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

impl<Item, Err> Observer<Item, Err> for AsyncSubject<Item, Err>
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

impl<Item, Err> SubscriptionLike for AsyncSubject<Item, Err> {
  #[inline]
  fn unsubscribe(&self) { self.subject.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.subject.is_disposed() }
}

impl<Item, Err> SubjectLike<Item, Err> for AsyncSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn as_observer(&self) -> Box<dyn Observer<Item, Err>> { Box::new(self.clone()) }

  fn observable(&self) -> Observable<Item, Err> { AsyncSubject::observable(self) }

  fn is_stopped(&self) -> bool { AsyncSubject::is_stopped(self) }
}

impl<Item, Err> IntoObservable<Item, Err> for AsyncSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect(subject: &AsyncSubject<i32, &'static str>) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject.observable().subscribe_all(
      move |v| l1.borrow_mut().push(v.to_string()),
      move |e| l2.borrow_mut().push(format!("error {e}")),
      move || l3.borrow_mut().push("complete".to_string()),
    );
    log
  }

  #[test]
  fn emits_last_value_on_complete() {
    let subject = AsyncSubject::new();
    let early = collect(&subject);
    subject.try_next(1).unwrap();
    subject.try_next(2).unwrap();
    assert!(early.borrow().is_empty());

    subject.try_complete().unwrap();
    assert_eq!(*early.borrow(), vec!["2", "complete"]);

    let late = collect(&subject);
    assert_eq!(*late.borrow(), vec!["2", "complete"]);
  }

  #[test]
  fn error_discards_value() {
    let subject = AsyncSubject::new();
    subject.try_next(1).unwrap();
    subject.try_error("bad").unwrap();
    let late = collect(&subject);
    assert_eq!(*late.borrow(), vec!["error bad"]);
  }

  #[test]
  fn empty_completion() {
    let subject = AsyncSubject::new();
    subject.try_complete().unwrap();
    assert_eq!(*collect(&subject).borrow(), vec!["complete"]);
  }
}
