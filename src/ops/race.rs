//! Race operator implementation
//!
//! All candidates are subscribed at once. The first one to deliver any
//! notification wins and every other candidate is unsubscribed on the spot.

use super::OperatorSubscriber;
use crate::{
  observable::{IntoObservable, Observable},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};
use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

struct RaceState<Item, Err> {
  winner: Cell<Option<usize>>,
  candidates: RefCell<Vec<Subscriber<Item, Err>>>,
}

impl<Item, Err> RaceState<Item, Err> {
  /// Whether candidate `index` may deliver. The first caller becomes the
  /// winner and unsubscribes the others.
  fn claim(&self, index: usize) -> bool {
    match self.winner.get() {
      Some(winner) => winner == index,
      None => {
        self.winner.set(Some(index));
        let losers: Vec<_> = self
          .candidates
          .borrow_mut()
          .drain(..)
          .enumerate()
          .filter(|(i, _)| *i != index)
          .map(|(_, s)| s)
          .collect();
        for loser in losers {
          loser.unsubscribe();
        }
        true
      }
    }
  }
}

/// Mirror whichever of `sources` notifies first.
pub fn race<Item, Err, I>(sources: I) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  I: IntoIterator,
  I::Item: IntoObservable<Item, Err>,
{
  let sources: Rc<[Observable<Item, Err>]> = sources
    .into_iter()
    .map(IntoObservable::into_observable)
    .collect();
  Observable::new(move |d: Subscriber<Item, Err>| {
    let state = Rc::new(RaceState { winner: Cell::new(None), candidates: RefCell::default() });
    for (index, source) in sources.iter().enumerate() {
      if d.is_stopped() || state.winner.get().is_some() {
        break;
      }
      let (on_next, on_error, on_complete) = (state.clone(), state.clone(), state.clone());
      let candidate = OperatorSubscriber::new(&d, move |d: &Subscriber<Item, Err>, v| {
        if on_next.claim(index) {
          d.next(v);
        }
      })
      .on_error(move |d, err| {
        if on_error.claim(index) {
          d.error(err);
        }
      })
      .on_complete(move |d| {
        if on_complete.claim(index) {
          d.complete();
        }
      })
      .into_subscriber();
      state.candidates.borrow_mut().push(candidate.clone());
      source.subscribe_with(candidate);
    }
    if sources.is_empty() {
      d.complete();
    }
  })
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Race this observable against `other`, see [`race`].
  pub fn race_with<O>(self, other: O) -> Observable<Item, Err>
  where
    O: IntoObservable<Item, Err>,
  {
    race([self, other.into_observable()])
  }
}
