use super::{protocol_violation, Subject, SubjectLike};
use crate::{
  error::ObjectUnsubscribedError,
  observable::{IntoObservable, Observable},
  observer::Observer,
  scheduler::{Duration, Scheduler},
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};
use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc};

/// A subject that records what passes through it and replays the recorded
/// values to every new subscriber before the live notifications.
///
/// The record is bounded by a count and, optionally, by age. Age is measured
/// on the scheduler handed to [`ReplaySubject::with_window`].
pub struct ReplaySubject<Item, Err = Infallible> {
  subject: Subject<Item, Err>,
  buffer: Rc<RefCell<ReplayBuffer<Item>>>,
}

struct ReplayBuffer<Item> {
  values: VecDeque<(Item, Duration)>,
  buffer_size: usize,
  window: Option<(Duration, Rc<dyn Scheduler>)>,
}

impl<Item> ReplayBuffer<Item> {
  fn now(&self) -> Duration { self.window.as_ref().map_or(Duration::ZERO, |(_, s)| s.now()) }

  fn trim(&mut self) {
    let excess = self.values.len().saturating_sub(self.buffer_size);
    self.values.drain(..excess);
    if let Some((window, scheduler)) = &self.window {
      let now = scheduler.now();
      while self
        .values
        .front()
        .is_some_and(|(_, stamp)| *stamp + *window <= now)
      {
        self.values.pop_front();
      }
    }
  }
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self {
    ReplaySubject { subject: self.subject.clone(), buffer: self.buffer.clone() }
  }
}

impl<Item, Err> ReplaySubject<Item, Err> {
  /// Keep the last `buffer_size` values.
  pub fn new(buffer_size: usize) -> Self { Self::build(buffer_size, None) }

  /// Keep every value.
  pub fn unbounded() -> Self { Self::build(usize::MAX, None) }

  /// Keep at most `buffer_size` values, none older than `window` as measured
  /// by `scheduler`.
  pub fn with_window(
    buffer_size: usize, window: Duration, scheduler: impl Scheduler + 'static,
  ) -> Self {
    let scheduler: Rc<dyn Scheduler> = Rc::new(scheduler);
    Self::build(buffer_size, Some((window, scheduler)))
  }

  fn build(buffer_size: usize, window: Option<(Duration, Rc<dyn Scheduler>)>) -> Self {
    ReplaySubject {
      subject: Subject::new(),
      buffer: Rc::new(RefCell::new(ReplayBuffer {
        values: VecDeque::new(),
        buffer_size,
        window,
      })),
    }
  }

  #[inline]
  pub fn subscribed_size(&self) -> usize { self.subject.subscribed_size() }

  #[inline]
  pub fn is_stopped(&self) -> bool { self.subject.is_stopped() }
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub fn try_next(&self, value: Item) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    if !self.subject.is_terminated() {
      let mut buffer = self.buffer.borrow_mut();
      let now = buffer.now();
      buffer.values.push_back((value.clone(), now));
      buffer.trim();
    }
    self.subject.try_next(value)
  }

  #[inline]
  pub fn try_error(&self, err: Err) -> Result<(), ObjectUnsubscribedError> {
    self.subject.try_error(err)
  }

  #[inline]
  pub fn try_complete(&self) -> Result<(), ObjectUnsubscribedError> { self.subject.try_complete() }

  /// Values a subscriber arriving now would receive.
  pub fn buffered(&self) -> Vec<Item> {
    let mut buffer = self.buffer.borrow_mut();
    buffer.trim();
    buffer.values.iter().map(|(v, _)| v.clone()).collect()
  }

  pub fn try_subscribe_with(
    &self, subscriber: Subscriber<Item, Err>,
  ) -> Result<Subscription, ObjectUnsubscribedError> {
    if self.subject.is_disposed() {
      return Err(ObjectUnsubscribedError);
    }
    let replay = self.buffered();
    let teardown = self.subject.inner_subscribe(&subscriber);
    for value in replay {
      if subscriber.is_stopped() {
        break;
      }
      subscriber.next(value);
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

impl<Item, Err> Observer<Item, Err> for ReplaySubject<Item, Err>
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

impl<Item, Err> SubscriptionLike for ReplaySubject<Item, Err> {
  #[inline]
  fn unsubscribe(&self) { self.subject.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.subject.is_disposed() }
}

impl<Item, Err> SubjectLike<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn as_observer(&self) -> Box<dyn Observer<Item, Err>> { Box::new(self.clone()) }

  fn observable(&self) -> Observable<Item, Err> { ReplaySubject::observable(self) }

  fn is_stopped(&self) -> bool { ReplaySubject::is_stopped(self) }
}

impl<Item, Err> IntoObservable<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}
