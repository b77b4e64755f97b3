use super::OperatorSubscriber;
use crate::{
  observable::{timer, IntoObservable, Observable},
  rc::MutRc,
  scheduler::{Duration, Scheduler},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};
use std::rc::Rc;

struct DebounceState<Item, D, Err> {
  last: Option<Item>,
  duration: Option<Subscriber<D, Err>>,
}

fn emit<Item, D, Err>(state: &MutRc<DebounceState<Item, D, Err>>, d: &Subscriber<Item, Err>)
where
  Item: 'static,
  Err: 'static,
{
  let (duration, value) = {
    let mut state = state.rc_deref_mut();
    (state.duration.take(), state.last.take())
  };
  if let Some(duration) = duration {
    duration.unsubscribe();
  }
  if let Some(value) = value {
    d.next(value);
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emit a value only once the duration selected for it passes without
  /// another source value arriving.
  ///
  /// Each new value cancels the running duration. On source completion the
  /// pending value, if any, is emitted before completing.
  pub fn debounce<D, O, F>(self, selector: F) -> Observable<Item, Err>
  where
    D: 'static,
    O: IntoObservable<D, Err>,
    F: Fn(&Item) -> O + 'static,
  {
    let selector = Rc::new(selector);
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let state = MutRc::own(DebounceState { last: None, duration: None });
      let selector = selector.clone();
      let on_next = {
        let state = state.clone();
        move |d: &Subscriber<Item, Err>, v: Item| {
          let duration = selector(&v).into_observable();
          let previous = {
            let mut state = state.rc_deref_mut();
            state.last = Some(v);
            state.duration.take()
          };
          if let Some(previous) = previous {
            previous.unsubscribe();
          }
          let fire = state.clone();
          let subscriber =
            OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, _: D| emit(&fire, d))
              .on_complete(|_| {})
              .into_subscriber();
          state.rc_deref_mut().duration = Some(subscriber.clone());
          duration.subscribe_with(subscriber);
        }
      };
      let on_complete = {
        let state = state.clone();
        move |d: &Subscriber<Item, Err>| {
          emit(&state, d);
          d.complete();
        }
      };
      OperatorSubscriber::new(d, on_next)
        .on_complete(on_complete)
        .on_finalize(move || {
          let mut state = state.rc_deref_mut();
          state.last = None;
          state.duration = None;
        })
        .subscribe_to(source);
    })
  }

  /// Emit a value only after `duration` of silence on `scheduler`.
  pub fn debounce_time<S>(self, duration: Duration, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    self.debounce(move |_| timer::<(), Err, S>((), duration, scheduler.clone()))
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn smoke() {
    let clock = VirtualTimeScheduler::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    let source = Subject::<i32, ()>::new();
    source
      .observable()
      .debounce_time(Duration::from_millis(10), clock.clone())
      .subscribe(move |v| s.borrow_mut().push(v));

    source.try_next(1).unwrap();
    clock.advance_by(Duration::from_millis(5));
    source.try_next(2).unwrap();
    clock.advance_by(Duration::from_millis(5));
    assert!(seen.borrow().is_empty());

    clock.advance_by(Duration::from_millis(5));
    assert_eq!(*seen.borrow(), vec![2]);

    source.try_next(3).unwrap();
    clock.advance_by(Duration::from_millis(10));
    assert_eq!(*seen.borrow(), vec![2, 3]);
  }

  #[test]
  fn completion_flushes_pending_value() {
    let clock = VirtualTimeScheduler::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    observable::from_iter::<_, ()>(vec![1, 2, 3])
      .debounce_time(Duration::from_millis(10), clock.clone())
      .subscribe_complete(
        move |v| l1.borrow_mut().push(v.to_string()),
        move || l2.borrow_mut().push("complete".to_string()),
      );
    assert_eq!(*log.borrow(), vec!["3", "complete"]);
  }

  #[test]
  fn duration_completion_does_not_emit() {
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    let source = Subject::<i32, ()>::new();
    source
      .observable()
      .debounce(|_| observable::empty::<(), ()>())
      .subscribe(move |v| s.borrow_mut().push(v));
    source.try_next(1).unwrap();
    assert!(seen.borrow().is_empty());
    source.try_complete().unwrap();
    assert_eq!(*seen.borrow(), vec![1]);
  }
}
