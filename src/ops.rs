//! Operators.
//!
//! Every operator is built the same way: for each downstream subscriber it
//! creates an upstream [`OperatorSubscriber`], registers that subscriber's
//! subscription as a child of the downstream one and only then subscribes it
//! to the source. Closing the downstream therefore always tears the upstream
//! down with it.

use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::Teardown,
};

pub mod audit;
pub mod concat;
pub mod debounce;
pub mod delay;
pub mod filter;
pub mod finalize;
pub mod map;
pub mod multicast;
pub mod observe_on;
pub mod race;
pub mod ref_count;
pub mod subscribe_on;
pub mod take;
pub mod take_until;
pub mod window_count;

type NextHook<Item, Out, Err> = Box<dyn FnMut(&Subscriber<Out, Err>, Item)>;
type ErrorHook<Out, Err> = Box<dyn FnMut(&Subscriber<Out, Err>, Err)>;
type CompleteHook<Out, Err> = Box<dyn FnMut(&Subscriber<Out, Err>)>;

/// Upstream half of an operator.
///
/// `on_next` is required. Without an `on_error` or `on_complete` hook the
/// notification is forwarded to the destination unchanged.
pub struct OperatorSubscriber<Item, Out, Err> {
  destination: Subscriber<Out, Err>,
  on_next: NextHook<Item, Out, Err>,
  on_error: Option<ErrorHook<Out, Err>>,
  on_complete: Option<CompleteHook<Out, Err>>,
  on_finalize: Option<Box<dyn FnOnce()>>,
}

impl<Item, Out, Err> OperatorSubscriber<Item, Out, Err>
where
  Item: 'static,
  Out: 'static,
  Err: 'static,
{
  pub fn new(
    destination: &Subscriber<Out, Err>, on_next: impl FnMut(&Subscriber<Out, Err>, Item) + 'static,
  ) -> Self {
    OperatorSubscriber {
      destination: destination.clone(),
      on_next: Box::new(on_next),
      on_error: None,
      on_complete: None,
      on_finalize: None,
    }
  }

  pub fn on_error(mut self, f: impl FnMut(&Subscriber<Out, Err>, Err) + 'static) -> Self {
    self.on_error = Some(Box::new(f));
    self
  }

  pub fn on_complete(mut self, f: impl FnMut(&Subscriber<Out, Err>) + 'static) -> Self {
    self.on_complete = Some(Box::new(f));
    self
  }

  /// Runs once when the upstream subscriber closes, for whatever reason.
  pub fn on_finalize(mut self, f: impl FnOnce() + 'static) -> Self {
    self.on_finalize = Some(Box::new(f));
    self
  }

  /// Build the upstream subscriber and attach it under the destination.
  pub fn into_subscriber(mut self) -> Subscriber<Item, Err> {
    let finalize = self.on_finalize.take();
    let destination = self.destination.clone();
    let upstream = Subscriber::new(self);
    if let Some(finalize) = finalize {
      upstream.add(Teardown::from_fn(finalize));
    }
    destination.add(upstream.subscription());
    upstream
  }

  /// Attach under the destination, then subscribe to `source`.
  pub fn subscribe_to(self, source: &Observable<Item, Err>) -> Subscriber<Item, Err> {
    let upstream = self.into_subscriber();
    source.subscribe_with(upstream.clone());
    upstream
  }
}

impl<Item: 'static, Err: 'static> OperatorSubscriber<Item, Item, Err> {
  /// Forward every value unchanged.
  pub fn forward(destination: &Subscriber<Item, Err>) -> Self {
    OperatorSubscriber::new(destination, |d: &Subscriber<Item, Err>, v| d.next(v))
  }
}

impl<Item, Out, Err> Observer<Item, Err> for OperatorSubscriber<Item, Out, Err>
where
  Out: 'static,
  Err: 'static,
{
  fn next(&mut self, value: Item) { (self.on_next)(&self.destination, value) }

  fn error(&mut self, err: Err) {
    match self.on_error.as_mut() {
      Some(f) => f(&self.destination, err),
      None => self.destination.error(err),
    }
  }

  fn complete(&mut self) {
    match self.on_complete.as_mut() {
      Some(f) => f(&self.destination),
      None => self.destination.complete(),
    }
  }

  fn is_closed(&self) -> bool { self.destination.is_stopped() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Build a new observable from this one. `op` runs once per subscription
  /// with the source and the downstream subscriber.
  pub fn operate<Out, F>(self, op: F) -> Observable<Out, Err>
  where
    Out: 'static,
    F: Fn(&Observable<Item, Err>, &Subscriber<Out, Err>) + 'static,
  {
    Observable::new(move |downstream: Subscriber<Out, Err>| op(&self, &downstream))
  }
}
