//! The teardown graph.
//!
//! A [`Subscription`] is a node owning finalizers: child subscriptions,
//! cancellable handles and plain callbacks. Closing a node runs each finalizer
//! exactly once, in registration order. Ownership only flows from parent to
//! child; a child keeps a `Weak` link to its parents so it can detach itself
//! when it closes first.

use crate::error::{raise_unsubscription_error, TeardownError, UnsubscriptionError};
use smallvec::SmallVec;
use std::{
  cell::RefCell,
  fmt::{Debug, Formatter},
  mem,
  panic::{catch_unwind, AssertUnwindSafe},
  rc::{Rc, Weak},
};

/// Anything that can be cancelled.
pub trait SubscriptionLike {
  /// Release the resource. Calling it again is a no-op.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;

  /// The graph node backing this handle, if it has one.
  #[inline]
  fn as_subscription(&self) -> Option<&Subscription> { None }
}

/// Introspection used by tests to assert complete teardown.
pub trait TearDownSize: SubscriptionLike {
  fn teardown_size(&self) -> usize;
}

/// A finalizer registered on a [`Subscription`].
///
/// A panicking callback does not stop the other finalizers of its node: the
/// panic is recorded as a [`TeardownError`] and reported with the rest.
pub enum Teardown {
  Empty,
  Subscription(Subscription),
  Handle(Box<dyn SubscriptionLike>),
  Fn(Box<dyn FnOnce()>),
  TryFn(Box<dyn FnOnce() -> Result<(), TeardownError>>),
}

/// Kind of a registered finalizer, reported by [`Subscription::finalizers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizerKind {
  Subscription,
  Handle,
  Callback,
}

impl Teardown {
  #[inline]
  pub fn from_fn(f: impl FnOnce() + 'static) -> Self { Teardown::Fn(Box::new(f)) }

  #[inline]
  pub fn try_from_fn(f: impl FnOnce() -> Result<(), TeardownError> + 'static) -> Self {
    Teardown::TryFn(Box::new(f))
  }

  #[inline]
  pub fn handle(handle: impl SubscriptionLike + 'static) -> Self {
    Teardown::Handle(Box::new(handle))
  }

  fn is_closed(&self) -> bool {
    match self {
      Teardown::Empty => true,
      Teardown::Subscription(s) => s.is_closed(),
      Teardown::Handle(h) => h.is_closed(),
      Teardown::Fn(_) | Teardown::TryFn(_) => false,
    }
  }

  fn kind(&self) -> Option<FinalizerKind> {
    match self {
      Teardown::Empty => None,
      Teardown::Subscription(_) => Some(FinalizerKind::Subscription),
      Teardown::Handle(_) => Some(FinalizerKind::Handle),
      Teardown::Fn(_) | Teardown::TryFn(_) => Some(FinalizerKind::Callback),
    }
  }

  fn execute(self, errors: &mut Vec<TeardownError>) {
    match self {
      Teardown::Empty => {}
      Teardown::Subscription(s) => {
        if let Err(err) = s.try_unsubscribe() {
          errors.extend(err.errors);
        }
      }
      Teardown::Handle(h) => h.unsubscribe(),
      Teardown::Fn(f) => {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
          let err = TeardownError(panic_message(payload.as_ref()));
          tracing::warn!(error = %err, "finalizer panicked");
          errors.push(err);
        }
      }
      Teardown::TryFn(f) => {
        if let Err(err) = f() {
          tracing::warn!(error = %err, "finalizer failed");
          errors.push(err);
        }
      }
    }
  }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(msg) = payload.downcast_ref::<&str>() {
    (*msg).to_string()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "finalizer panicked".to_string()
  }
}

impl From<()> for Teardown {
  #[inline]
  fn from(_: ()) -> Self { Teardown::Empty }
}

impl From<Subscription> for Teardown {
  #[inline]
  fn from(s: Subscription) -> Self { Teardown::Subscription(s) }
}

impl From<&Subscription> for Teardown {
  #[inline]
  fn from(s: &Subscription) -> Self { Teardown::Subscription(s.clone()) }
}

impl<T: Into<Teardown>> From<Option<T>> for Teardown {
  #[inline]
  fn from(t: Option<T>) -> Self { t.map_or(Teardown::Empty, Into::into) }
}

impl Debug for Teardown {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Teardown")
      .field("kind", &self.kind())
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// A node of the teardown graph. Cloning shares the node.
#[derive(Clone, Default)]
pub struct Subscription(Rc<RefCell<Inner>>);

#[derive(Default)]
struct Inner {
  closed: bool,
  finalizers: SmallVec<[Teardown; 1]>,
  parents: SmallVec<[Weak<RefCell<Inner>>; 1]>,
}

impl Subscription {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// A subscription that is already closed.
  pub fn closed() -> Self {
    let s = Self::default();
    s.0.borrow_mut().closed = true;
    s
  }

  /// Register a finalizer. If this node is already closed the finalizer runs
  /// right away instead. Adding a node to itself is ignored.
  pub fn add(&self, teardown: impl Into<Teardown>) {
    let teardown = teardown.into();
    match &teardown {
      Teardown::Empty => return,
      Teardown::Subscription(child) if self.is_same(child) || child.is_closed() => return,
      Teardown::Handle(h) if h.as_subscription().is_some_and(|node| self.is_same(node)) => return,
      _ => {}
    }

    let mut inner = self.0.borrow_mut();
    if inner.closed {
      drop(inner);
      let mut errors = vec![];
      teardown.execute(&mut errors);
      if !errors.is_empty() {
        raise_unsubscription_error(UnsubscriptionError { errors });
      }
    } else {
      inner.finalizers.retain(|t| !t.is_closed());
      if let Teardown::Subscription(child) = &teardown {
        child.0.borrow_mut().parents.push(Rc::downgrade(&self.0));
      }
      inner.finalizers.push(teardown);
    }
  }

  /// Detach a child subscription without closing it.
  pub fn remove(&self, child: &Subscription) {
    self.remove_child(&child.0);
    child
      .0
      .borrow_mut()
      .parents
      .retain(|p| !std::ptr::eq(p.as_ptr(), Rc::as_ptr(&self.0)));
  }

  fn remove_child(&self, child: &Rc<RefCell<Inner>>) {
    self
      .0
      .borrow_mut()
      .finalizers
      .retain(|t| !matches!(t, Teardown::Subscription(s) if Rc::ptr_eq(&s.0, child)));
  }

  /// Close this node, returning every finalizer failure instead of raising it.
  pub fn try_unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    let (finalizers, parents) = {
      let mut inner = self.0.borrow_mut();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      (mem::take(&mut inner.finalizers), mem::take(&mut inner.parents))
    };

    for parent in parents.iter().filter_map(Weak::upgrade) {
      Subscription(parent).remove_child(&self.0);
    }

    let mut errors = vec![];
    for teardown in finalizers {
      teardown.execute(&mut errors);
    }
    if errors.is_empty() { Ok(()) } else { Err(UnsubscriptionError { errors }) }
  }

  /// Kinds of the finalizers currently registered, in registration order.
  pub fn finalizers(&self) -> Vec<FinalizerKind> {
    self
      .0
      .borrow()
      .finalizers
      .iter()
      .filter_map(Teardown::kind)
      .collect()
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Subscription) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  #[inline]
  fn is_same(&self, other: &Subscription) -> bool { self.ptr_eq(other) }

  /// Activates RAII behaviour: the returned guard unsubscribes when dropped.
  ///
  /// **Attention:** if the guard is not bound to a variable it is dropped,
  /// and the subscription closed, immediately.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard(self) }
}

impl SubscriptionLike for Subscription {
  /// # Panics
  ///
  /// Panics with the aggregated [`UnsubscriptionError`] when a fallible
  /// finalizer failed. Every finalizer has run by then.
  fn unsubscribe(&self) {
    if let Err(err) = self.try_unsubscribe() {
      raise_unsubscription_error(err);
    }
  }

  /// A node that is being modified right now counts as open.
  #[inline]
  fn is_closed(&self) -> bool { self.0.try_borrow().is_ok_and(|inner| inner.closed) }

  #[inline]
  fn as_subscription(&self) -> Option<&Subscription> { Some(self) }
}

impl TearDownSize for Subscription {
  fn teardown_size(&self) -> usize { self.0.borrow().finalizers.len() }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.borrow();
    f.debug_struct("Subscription")
      .field("closed", &inner.closed)
      .field("teardown_count", &inner.finalizers.len())
      .finish()
  }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }

  #[inline]
  fn as_subscription(&self) -> Option<&Subscription> { (**self).as_subscription() }
}

/// An RAII implementation of a "scoped subscribed" subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[test]
  fn add_and_teardown_size() {
    let parent = Subscription::new();
    parent.add(Subscription::new());
    parent.add(Subscription::new());
    parent.add(Teardown::from_fn(|| {}));
    assert_eq!(parent.teardown_size(), 3);
    assert_eq!(
      parent.finalizers(),
      vec![
        FinalizerKind::Subscription,
        FinalizerKind::Subscription,
        FinalizerKind::Callback
      ]
    );
  }

  #[test]
  fn unsubscribe_is_idempotent() {
    let count = Rc::new(Cell::new(0));
    let s = Subscription::new();
    let c = count.clone();
    s.add(Teardown::from_fn(move || c.set(c.get() + 1)));

    s.unsubscribe();
    s.unsubscribe();

    assert_eq!(count.get(), 1);
    assert!(s.is_closed());
    assert_eq!(s.teardown_size(), 0);
  }

  #[test]
  fn finalizers_run_in_registration_order() {
    let order = Rc::new(RefCell::new(vec![]));
    let s = Subscription::new();
    for i in 0..3 {
      let order = order.clone();
      s.add(Teardown::from_fn(move || order.borrow_mut().push(i)));
    }
    s.unsubscribe();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
  }

  #[test]
  fn add_after_close_runs_immediately() {
    let ran = Rc::new(Cell::new(false));
    let s = Subscription::closed();
    let r = ran.clone();
    s.add(Teardown::from_fn(move || r.set(true)));
    assert!(ran.get());
    assert_eq!(s.teardown_size(), 0);
  }

  #[test]
  fn self_add_is_ignored() {
    let s = Subscription::new();
    s.add(s.clone());
    assert_eq!(s.teardown_size(), 0);
    s.unsubscribe();
    assert!(s.is_closed());
  }

  #[test]
  fn handle_to_the_same_node_is_ignored() {
    let s = Subscription::new();
    s.add(Teardown::handle(s.clone()));
    s.add(Teardown::from_fn(|| {}));
    assert_eq!(s.finalizers(), vec![FinalizerKind::Callback]);
    s.unsubscribe();
    assert!(s.is_closed());
  }

  #[test]
  fn closing_parent_closes_children() {
    let parent = Subscription::new();
    let child = Subscription::new();
    let grandchild = Subscription::new();
    child.add(&grandchild);
    parent.add(&child);

    parent.unsubscribe();
    assert!(child.is_closed());
    assert!(grandchild.is_closed());
  }

  #[test]
  fn closed_child_detaches_from_parent() {
    let parent = Subscription::new();
    let child = Subscription::new();
    parent.add(&child);
    assert_eq!(parent.teardown_size(), 1);

    child.unsubscribe();
    assert_eq!(parent.teardown_size(), 0);
    assert!(!parent.is_closed());
  }

  #[test]
  fn remove_does_not_close_child() {
    let parent = Subscription::new();
    let child = Subscription::new();
    parent.add(&child);
    parent.remove(&child);
    parent.unsubscribe();
    assert!(!child.is_closed());
  }

  #[test]
  fn reentrant_close_is_a_no_op() {
    let count = Rc::new(Cell::new(0));
    let s = Subscription::new();
    let inner = s.clone();
    let c = count.clone();
    s.add(Teardown::from_fn(move || {
      c.set(c.get() + 1);
      inner.unsubscribe();
    }));
    s.unsubscribe();
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn failing_finalizers_are_collected() {
    let ran_last = Rc::new(Cell::new(false));
    let parent = Subscription::new();
    let child = Subscription::new();
    child.add(Teardown::try_from_fn(|| Err("child".into())));
    parent.add(Teardown::try_from_fn(|| Err("first".into())));
    parent.add(&child);
    let r = ran_last.clone();
    parent.add(Teardown::from_fn(move || r.set(true)));

    let err = parent.try_unsubscribe().unwrap_err();
    assert_eq!(err.errors, vec![TeardownError::from("first"), TeardownError::from("child")]);
    assert!(ran_last.get());
    assert!(parent.try_unsubscribe().is_ok());
  }

  #[test]
  fn panicking_finalizer_does_not_skip_the_rest() {
    let ran_last = Rc::new(Cell::new(false));
    let s = Subscription::new();
    s.add(Teardown::from_fn(|| panic!("callback broke")));
    let r = ran_last.clone();
    s.add(Teardown::from_fn(move || r.set(true)));

    let err = s.try_unsubscribe().unwrap_err();
    assert_eq!(err.errors, vec![TeardownError::from("callback broke")]);
    assert!(ran_last.get());
  }

  #[test]
  #[should_panic(expected = "1 error(s) occurred during unsubscription: boom")]
  fn unsubscribe_raises_finalizer_errors() {
    let s = Subscription::new();
    s.add(Teardown::try_from_fn(|| Err("boom".into())));
    s.unsubscribe();
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let s = Subscription::new();
    {
      let _guard = s.clone().unsubscribe_when_dropped();
    }
    assert!(s.is_closed());
  }
}
