//! Multicast hubs.
//!
//! A subject is an observer and an observable at once: every notification it
//! receives is forwarded to the subscribers attached at that moment. Once it
//! terminates, late subscribers get the terminal notification immediately.

use crate::{
  error::ObjectUnsubscribedError,
  observable::{IntoObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike, Teardown},
};
use std::{
  cell::{Cell, RefCell},
  convert::Infallible,
  fmt::{Debug, Formatter},
  rc::{Rc, Weak},
};

mod async_subject;
mod behavior_subject;
mod replay_subject;

pub use async_subject::AsyncSubject;
pub use behavior_subject::BehaviorSubject;
pub use replay_subject::ReplaySubject;

/// The object-safe face shared by every subject kind, so multicasting can
/// work with whichever one a factory builds.
pub trait SubjectLike<Item, Err> {
  /// An observer feeding this subject.
  fn as_observer(&self) -> Box<dyn Observer<Item, Err>>;

  /// An observable attaching subscribers to this subject.
  fn observable(&self) -> Observable<Item, Err>;

  /// `true` once the subject terminated or was disposed.
  fn is_stopped(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Terminal<Err> {
  Active,
  Errored(Err),
  Completed,
}

pub(crate) struct SubjectCore<Item, Err> {
  observers: RefCell<Vec<(usize, Subscriber<Item, Err>)>>,
  next_id: Cell<usize>,
  state: RefCell<Terminal<Err>>,
  disposed: Cell<bool>,
}

/// A plain multicast subject.
pub struct Subject<Item, Err = Infallible>(Rc<SubjectCore<Item, Err>>);

impl<Item, Err> Clone for Subject<Item, Err> {
  #[inline]
  fn clone(&self) -> Self { Subject(self.0.clone()) }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self {
    Subject(Rc::new(SubjectCore {
      observers: RefCell::new(vec![]),
      next_id: Cell::new(0),
      state: RefCell::new(Terminal::Active),
      disposed: Cell::new(false),
    }))
  }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Number of subscribers currently attached.
  pub fn subscribed_size(&self) -> usize { self.0.observers.borrow().len() }

  #[inline]
  pub fn observed(&self) -> bool { self.subscribed_size() > 0 }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.disposed.get() }

  /// Terminated by `error`/`complete`, or disposed.
  pub fn is_stopped(&self) -> bool {
    self.is_disposed() || !matches!(*self.0.state.borrow(), Terminal::Active)
  }

  /// `true` once `error` or `complete` was received, regardless of disposal.
  pub(crate) fn is_terminated(&self) -> bool { !matches!(*self.0.state.borrow(), Terminal::Active) }

  fn check_disposed(&self) -> Result<(), ObjectUnsubscribedError> {
    if self.is_disposed() { Err(ObjectUnsubscribedError) } else { Ok(()) }
  }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  /// Forward `value` to every subscriber attached right now.
  ///
  /// Subscribers added while the value is being delivered do not receive it.
  pub fn try_next(&self, value: Item) -> Result<(), ObjectUnsubscribedError> {
    self.check_disposed()?;
    if self.is_terminated() {
      return Ok(());
    }
    let snapshot: Vec<_> = self
      .0
      .observers
      .borrow()
      .iter()
      .map(|(_, s)| s.clone())
      .collect();
    if let Some((last, rest)) = snapshot.split_last() {
      for s in rest {
        s.next(value.clone());
      }
      last.next(value);
    }
    Ok(())
  }

  pub fn try_error(&self, err: Err) -> Result<(), ObjectUnsubscribedError> {
    self.check_disposed()?;
    if let Some(observers) = self.terminate(Terminal::Errored(err.clone())) {
      for (_, s) in observers {
        s.error(err.clone());
      }
    }
    Ok(())
  }

  pub fn try_complete(&self) -> Result<(), ObjectUnsubscribedError> {
    self.check_disposed()?;
    if let Some(observers) = self.terminate(Terminal::Completed) {
      for (_, s) in observers {
        s.complete();
      }
    }
    Ok(())
  }

  /// Switch to a terminal state and hand back the subscribers to notify, or
  /// `None` if the subject already terminated.
  fn terminate(&self, terminal: Terminal<Err>) -> Option<Vec<(usize, Subscriber<Item, Err>)>> {
    let mut state = self.0.state.borrow_mut();
    if !matches!(*state, Terminal::Active) {
      return None;
    }
    *state = terminal;
    drop(state);
    Some(std::mem::take(&mut *self.0.observers.borrow_mut()))
  }

  /// Attach `subscriber` while the subject is active. The returned teardown
  /// detaches it again.
  pub(crate) fn inner_subscribe(&self, subscriber: &Subscriber<Item, Err>) -> Teardown {
    if self.is_stopped() {
      return Teardown::Empty;
    }
    let id = self.0.next_id.get();
    self.0.next_id.set(id + 1);
    self
      .0
      .observers
      .borrow_mut()
      .push((id, subscriber.clone()));

    let weak: Weak<SubjectCore<Item, Err>> = Rc::downgrade(&self.0);
    Teardown::from_fn(move || {
      if let Some(core) = weak.upgrade() {
        core.observers.borrow_mut().retain(|(i, _)| *i != id);
      }
    })
  }

  pub(crate) fn thrown_error(&self) -> Option<Err> {
    match &*self.0.state.borrow() {
      Terminal::Errored(err) => Some(err.clone()),
      _ => None,
    }
  }

  /// Deliver the terminal notification to a subscriber arriving late.
  pub(crate) fn check_finalized_statuses(&self, subscriber: &Subscriber<Item, Err>) {
    let terminal = self.0.state.borrow().clone();
    match terminal {
      Terminal::Active => {}
      Terminal::Errored(err) => subscriber.error(err),
      Terminal::Completed => subscriber.complete(),
    }
  }

  /// Attach a subscriber, failing if the subject was disposed.
  pub fn try_subscribe_with(
    &self, subscriber: Subscriber<Item, Err>,
  ) -> Result<Subscription, ObjectUnsubscribedError> {
    self.check_disposed()?;
    let teardown = self.inner_subscribe(&subscriber);
    self.check_finalized_statuses(&subscriber);
    subscriber.add(teardown);
    Ok(subscriber.subscription().clone())
  }

  pub fn try_subscribe(
    &self, observer: impl Observer<Item, Err> + 'static,
  ) -> Result<Subscription, ObjectUnsubscribedError> {
    self.try_subscribe_with(Subscriber::new(observer))
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    let subject = self.clone();
    Observable::new(move |s: Subscriber<Item, Err>| {
      if let Err(err) = subject.try_subscribe_with(s) {
        protocol_violation(err);
      }
    })
  }
}

/// Raised by the `Observer` entry points, which cannot return an error.
pub(crate) fn protocol_violation(err: ObjectUnsubscribedError) -> ! {
  tracing::error!(error = %err, "subject used after it was disposed");
  panic!("{err}")
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
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

/// Disposes the subject: subscribers are dropped without notification and
/// any further use is an [`ObjectUnsubscribedError`].
impl<Item, Err> SubscriptionLike for Subject<Item, Err> {
  fn unsubscribe(&self) {
    self.0.disposed.set(true);
    let observers = std::mem::take(&mut *self.0.observers.borrow_mut());
    drop(observers);
  }

  #[inline]
  fn is_closed(&self) -> bool { self.is_disposed() }
}

impl<Item, Err> SubjectLike<Item, Err> for Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn as_observer(&self) -> Box<dyn Observer<Item, Err>> { Box::new(self.clone()) }

  fn observable(&self) -> Observable<Item, Err> { Subject::observable(self) }

  fn is_stopped(&self) -> bool { Subject::is_stopped(self) }
}

impl<Item, Err> IntoObservable<Item, Err> for Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

impl<Item, Err> IntoObservable<Item, Err> for &Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

impl<Item, Err: Debug> Debug for Subject<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subject")
      .field("observers", &self.subscribed_size())
      .field("state", &*self.0.state.borrow())
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Log = Rc<RefCell<Vec<String>>>;

  fn record(subject: &Subject<i32, &'static str>, name: &'static str, log: &Log) -> Subscription {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject.observable().subscribe_all(
      move |v| l1.borrow_mut().push(format!("{name} {v}")),
      move |e| l2.borrow_mut().push(format!("{name} error {e}")),
      move || l3.borrow_mut().push(format!("{name} complete")),
    )
  }

  #[test]
  fn multicasts_to_every_subscriber() {
    let subject = Subject::new();
    let log: Log = Rc::default();
    record(&subject, "a", &log);
    record(&subject, "b", &log);
    assert_eq!(subject.subscribed_size(), 2);

    subject.try_next(1).unwrap();
    subject.try_complete().unwrap();
    assert_eq!(
      *log.borrow(),
      vec!["a 1", "b 1", "a complete", "b complete"]
    );
    assert_eq!(subject.subscribed_size(), 0);
  }

  #[test]
  fn late_subscriber_gets_terminal_only() {
    let subject = Subject::new();
    subject.try_next(1).unwrap();
    subject.try_error("boom").unwrap();

    let log: Log = Rc::default();
    let subscription = record(&subject, "late", &log);
    assert_eq!(*log.borrow(), vec!["late error boom"]);
    assert!(subscription.is_closed());
    assert!(!subject.observed());
  }

  #[test]
  fn terminal_is_exclusive() {
    let subject = Subject::new();
    let log: Log = Rc::default();
    record(&subject, "a", &log);
    subject.try_complete().unwrap();
    subject.try_error("ignored").unwrap();
    subject.try_next(2).unwrap();
    assert_eq!(*log.borrow(), vec!["a complete"]);
  }

  #[test]
  fn unsubscribe_detaches() {
    let subject = Subject::new();
    let log: Log = Rc::default();
    let a = record(&subject, "a", &log);
    record(&subject, "b", &log);
    a.unsubscribe();
    assert_eq!(subject.subscribed_size(), 1);
    subject.try_next(1).unwrap();
    assert_eq!(*log.borrow(), vec!["b 1"]);
  }

  #[test]
  fn next_iterates_a_snapshot() {
    let subject: Subject<i32, &'static str> = Subject::new();
    let log: Log = Rc::default();
    let (inner, l) = (subject.clone(), log.clone());
    subject.observable().subscribe(move |v| {
      l.borrow_mut().push(format!("outer {v}"));
      if v == 1 {
        record(&inner, "late", &l);
      }
    });

    subject.try_next(1).unwrap();
    assert_eq!(*log.borrow(), vec!["outer 1"]);
    subject.try_next(2).unwrap();
    assert_eq!(*log.borrow(), vec!["outer 1", "outer 2", "late 2"]);
  }

  #[test]
  fn subscriber_removed_during_next_is_skipped() {
    let subject: Subject<i32, &'static str> = Subject::new();
    let log: Log = Rc::default();
    let second: Rc<RefCell<Option<Subscription>>> = Rc::default();
    let (l, s) = (log.clone(), second.clone());
    subject.observable().subscribe(move |v| {
      l.borrow_mut().push(format!("first {v}"));
      if let Some(s) = s.borrow().as_ref() {
        s.unsubscribe();
      }
    });
    *second.borrow_mut() = Some(record(&subject, "second", &log));

    subject.try_next(1).unwrap();
    subject.try_next(2).unwrap();
    assert_eq!(*log.borrow(), vec!["first 1", "first 2"]);
  }

  #[test]
  fn use_after_dispose_is_reported() {
    let subject: Subject<i32, ()> = Subject::new();
    subject.unsubscribe();
    assert_eq!(subject.try_next(1), Err(ObjectUnsubscribedError));
    assert_eq!(subject.try_complete(), Err(ObjectUnsubscribedError));
    assert!(subject.try_subscribe(crate::observer::FnObserver::next_only(|_: i32| {})).is_err());
  }

  #[test]
  #[should_panic(expected = "object unsubscribed")]
  fn observer_entry_point_panics_after_dispose() {
    let mut subject: Subject<i32, ()> = Subject::new();
    subject.unsubscribe();
    Observer::next(&mut subject, 1);
  }
}
