//! Observer trait and the closure-backed capability set.
//!
//! An observer consumes the notifications of one subscription: any number of
//! `next` calls followed by at most one `error` or `complete`. The
//! [`Subscriber`](crate::subscriber::Subscriber) wrapping it enforces that
//! protocol, so implementations do not have to.

use crate::error::unhandled_error;
use std::{cell::RefCell, rc::Rc};

pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  fn error(&mut self, err: Err);

  fn complete(&mut self);

  /// Sources check this between synchronous emissions and stop early once
  /// it turns `true`.
  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Marks an absent handler in a [`FnObserver`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHandler;

pub trait NextHandler<Item> {
  fn on_next(&mut self, value: Item);
}

pub trait ErrorHandler<Err> {
  fn on_error(&mut self, err: Err);
}

pub trait CompleteHandler {
  fn on_complete(&mut self);
}

impl<Item> NextHandler<Item> for NoHandler {
  #[inline]
  fn on_next(&mut self, _: Item) {}
}

impl<Item, F: FnMut(Item)> NextHandler<Item> for F {
  #[inline]
  fn on_next(&mut self, value: Item) { self(value) }
}

/// Without an error handler the error has nowhere to go, so it is raised.
impl<Err> ErrorHandler<Err> for NoHandler {
  fn on_error(&mut self, err: Err) { unhandled_error(err) }
}

impl<Err, F: FnMut(Err)> ErrorHandler<Err> for F {
  #[inline]
  fn on_error(&mut self, err: Err) { self(err) }
}

impl CompleteHandler for NoHandler {
  #[inline]
  fn on_complete(&mut self) {}
}

impl<F: FnMut()> CompleteHandler for F {
  #[inline]
  fn on_complete(&mut self) { self() }
}

/// An observer assembled from up to three closures. Which handlers exist is
/// fixed by the type parameters when the value is built.
#[derive(Clone)]
pub struct FnObserver<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> FnObserver<N, E, C> {
  #[inline]
  pub fn new(next: N, error: E, complete: C) -> Self { FnObserver { next, error, complete } }
}

impl<N> FnObserver<N, NoHandler, NoHandler> {
  #[inline]
  pub fn next_only(next: N) -> Self { Self::new(next, NoHandler, NoHandler) }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for FnObserver<N, E, C>
where
  N: NextHandler<Item>,
  E: ErrorHandler<Err>,
  C: CompleteHandler,
{
  #[inline]
  fn next(&mut self, value: Item) { self.next.on_next(value) }

  #[inline]
  fn error(&mut self, err: Err) { self.error.on_error(err) }

  #[inline]
  fn complete(&mut self) { self.complete.on_complete() }
}

/// One observer instance shared by several subscriptions. Each subscription
/// still gets its own subscriber and lifecycle.
impl<Item, Err, O> Observer<Item, Err> for Rc<RefCell<O>>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { self.borrow_mut().next(value) }

  #[inline]
  fn error(&mut self, err: Err) { self.borrow_mut().error(err) }

  #[inline]
  fn complete(&mut self) { self.borrow_mut().complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.borrow().is_closed() }
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}
