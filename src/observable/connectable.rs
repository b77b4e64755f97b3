use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  subject::SubjectLike,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike, Teardown},
};
use std::{
  cell::{Cell, RefCell},
  rc::{Rc, Weak},
};

type SubjectFactory<Item, Err> = dyn Fn() -> Rc<dyn SubjectLike<Item, Err>>;

/// A source shared through a subject, whose subscription starts only when
/// [`connect`](ConnectableObservable::connect) is called.
///
/// Subscribers attach to the current subject. If that subject already
/// terminated, the factory builds a fresh one, so each connection cycle is
/// independent of the previous one.
pub struct ConnectableObservable<Item, Err>(Rc<ConnectableInner<Item, Err>>);

struct ConnectableInner<Item, Err> {
  source: Observable<Item, Err>,
  factory: Box<SubjectFactory<Item, Err>>,
  subject: RefCell<Option<Rc<dyn SubjectLike<Item, Err>>>>,
  connection: RefCell<Option<Subscription>>,
  ref_count: Cell<usize>,
}

impl<Item, Err> Clone for ConnectableObservable<Item, Err> {
  fn clone(&self) -> Self { ConnectableObservable(self.0.clone()) }
}

impl<Item: 'static, Err: 'static> ConnectableObservable<Item, Err> {
  pub fn new<S, F>(source: Observable<Item, Err>, factory: F) -> Self
  where
    S: SubjectLike<Item, Err> + 'static,
    F: Fn() -> S + 'static,
  {
    let factory = move || -> Rc<dyn SubjectLike<Item, Err>> { Rc::new(factory()) };
    ConnectableObservable(Rc::new(ConnectableInner {
      source,
      factory: Box::new(factory),
      subject: RefCell::new(None),
      connection: RefCell::new(None),
      ref_count: Cell::new(0),
    }))
  }

  /// Subscribe the shared subject to the source. While a connection is
  /// alive, calling this again returns it.
  pub fn connect(&self) -> Subscription {
    if let Some(connection) = self.0.connection.borrow().as_ref() {
      return connection.clone();
    }

    let connection = Subscription::new();
    *self.0.connection.borrow_mut() = Some(connection.clone());
    let subject = self.get_subject();
    tracing::debug!("connecting shared source");

    let upstream = Subscriber::new(ConnectObserver {
      destination: subject.as_observer(),
      connectable: Rc::downgrade(&self.0),
    });
    let weak = Rc::downgrade(&self.0);
    upstream.add(Teardown::from_fn(move || teardown(&weak)));
    connection.add(upstream.subscription());
    self.0.source.subscribe_with(upstream);

    if connection.is_closed() {
      Subscription::closed()
    } else {
      connection
    }
  }

  /// The current subject, or a new one when there is none or it terminated.
  fn get_subject(&self) -> Rc<dyn SubjectLike<Item, Err>> {
    let mut slot = self.0.subject.borrow_mut();
    match slot.as_ref() {
      Some(subject) if !subject.is_stopped() => subject.clone(),
      _ => {
        let subject = (self.0.factory)();
        *slot = Some(subject.clone());
        subject
      }
    }
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    let this = self.clone();
    Observable::new(move |s: Subscriber<Item, Err>| {
      this.get_subject().observable().subscribe_with(s);
    })
  }

  /// `true` while the source subscription is alive.
  pub fn is_connected(&self) -> bool { self.0.connection.borrow().is_some() }

  pub(crate) fn ref_count_cell(&self) -> &Cell<usize> { &self.0.ref_count }

  pub(crate) fn current_connection(&self) -> Option<Subscription> {
    self.0.connection.borrow().clone()
  }
}

/// Reset the connectable so the next `connect` starts a fresh cycle.
fn teardown<Item, Err>(weak: &Weak<ConnectableInner<Item, Err>>) {
  let Some(inner) = weak.upgrade() else { return };
  inner.ref_count.set(0);
  inner.subject.borrow_mut().take();
  let connection = inner.connection.borrow_mut().take();
  if let Some(connection) = connection {
    tracing::debug!("disconnecting shared source");
    connection.unsubscribe();
  }
}

struct ConnectObserver<Item, Err> {
  destination: Box<dyn Observer<Item, Err>>,
  connectable: Weak<ConnectableInner<Item, Err>>,
}

impl<Item, Err> Observer<Item, Err> for ConnectObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.destination.next(value) }

  fn error(&mut self, err: Err) {
    teardown(&self.connectable);
    self.destination.error(err);
  }

  fn complete(&mut self) {
    teardown(&self.connectable);
    self.destination.complete();
  }
}

impl<Item: 'static, Err: 'static> IntoObservable<Item, Err> for ConnectableObservable<Item, Err> {
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}
