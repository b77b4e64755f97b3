//! Audit operator implementation
//!
//! While a duration observable is running, remember only the latest source
//! value. When the duration fires, emit that value and wait for the next
//! source value to start another duration.

use super::OperatorSubscriber;
use crate::{
  observable::{timer, IntoObservable, Observable},
  rc::MutRc,
  scheduler::{Duration, Scheduler},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};
use std::rc::Rc;

struct AuditState<Item, D, Err> {
  last: Option<Item>,
  duration: Option<Subscriber<D, Err>>,
  source_completed: bool,
}

impl<Item, D, Err> Default for AuditState<Item, D, Err> {
  fn default() -> Self { AuditState { last: None, duration: None, source_completed: false } }
}

/// Close the running duration and emit the value it held back.
fn end_duration<Item, D, Err>(state: &MutRc<AuditState<Item, D, Err>>, d: &Subscriber<Item, Err>)
where
  Item: 'static,
  Err: 'static,
{
  let (duration, value, completed) = {
    let mut state = state.rc_deref_mut();
    (state.duration.take(), state.last.take(), state.source_completed)
  };
  if let Some(duration) = duration {
    duration.unsubscribe();
  }
  if let Some(value) = value {
    d.next(value);
  }
  if completed {
    d.complete();
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Ignore source values for a duration chosen by `selector`, then emit the
  /// most recent one.
  ///
  /// The duration starts with the first value that arrives while none is
  /// running. Its first `next` or its completion ends it. A source completion
  /// during a duration is delayed until the held value has been emitted.
  pub fn audit<D, O, F>(self, selector: F) -> Observable<Item, Err>
  where
    D: 'static,
    O: IntoObservable<D, Err>,
    F: Fn(&Item) -> O + 'static,
  {
    self.try_audit(move |v| Ok(selector(v)))
  }

  /// Like [`audit`](Observable::audit), with a selector that can fail. A
  /// failure errors the stream.
  pub fn try_audit<D, O, F>(self, selector: F) -> Observable<Item, Err>
  where
    D: 'static,
    O: IntoObservable<D, Err>,
    F: Fn(&Item) -> Result<O, Err> + 'static,
  {
    let selector = Rc::new(selector);
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let state: MutRc<AuditState<Item, D, Err>> = MutRc::own(AuditState::default());
      let selector = selector.clone();
      let on_next = {
        let state = state.clone();
        move |d: &Subscriber<Item, Err>, v: Item| {
          let idle = state.rc_deref().duration.is_none();
          let duration = if idle {
            match selector(&v) {
              Ok(o) => Some(o.into_observable()),
              Err(err) => return d.error(err),
            }
          } else {
            None
          };
          state.rc_deref_mut().last = Some(v);

          if let Some(duration) = duration {
            let (on_fire, on_end) = (state.clone(), state.clone());
            let subscriber = OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, _: D| {
              end_duration(&on_fire, d)
            })
            .on_complete(move |d| end_duration(&on_end, d))
            .into_subscriber();
            state.rc_deref_mut().duration = Some(subscriber.clone());
            duration.subscribe_with(subscriber);
          }
        }
      };
      let on_complete = {
        let state = state.clone();
        move |d: &Subscriber<Item, Err>| {
          let pending = {
            let mut state = state.rc_deref_mut();
            state.source_completed = true;
            state.last.is_some() && state.duration.as_ref().is_some_and(|s| !s.is_closed())
          };
          if !pending {
            d.complete();
          }
        }
      };
      OperatorSubscriber::new(d, on_next)
        .on_complete(on_complete)
        .on_finalize(move || {
          state.rc_deref_mut().duration.take();
        })
        .subscribe_to(source);
    })
  }

  /// Audit with a fixed `duration` measured on `scheduler`.
  pub fn audit_time<S>(self, duration: Duration, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    self.audit(move |_| timer::<(), Err, S>((), duration, scheduler.clone()))
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  fn collect(
    source: Observable<i32, &'static str>,
  ) -> (Rc<RefCell<Vec<String>>>, Subscription) {
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let subscription = source.subscribe_all(
      move |v| l1.borrow_mut().push(v.to_string()),
      move |e| l2.borrow_mut().push(format!("error {e}")),
      move || l3.borrow_mut().push("complete".to_string()),
    );
    (log, subscription)
  }

  #[test]
  fn emits_latest_value_when_duration_fires() {
    let source = Subject::new();
    let gate = Subject::<(), &str>::new();
    let g = gate.clone();
    let (log, _) = collect(source.observable().audit(move |_| g.observable()));

    source.try_next(1).unwrap();
    source.try_next(2).unwrap();
    assert!(log.borrow().is_empty());
    gate.try_next(()).unwrap();
    assert_eq!(*log.borrow(), vec!["2"]);
    assert_eq!(gate.subscribed_size(), 0);

    source.try_next(3).unwrap();
    assert_eq!(gate.subscribed_size(), 1);
  }

  #[test]
  fn duration_completion_releases_value() {
    let source = Subject::new();
    let gate = Subject::<(), &str>::new();
    let g = gate.clone();
    let (log, _) = collect(source.observable().audit(move |_| g.observable()));

    source.try_next(1).unwrap();
    gate.try_complete().unwrap();
    assert_eq!(*log.borrow(), vec!["1"]);
  }

  #[test]
  fn completion_waits_for_pending_duration() {
    let source = Subject::new();
    let gate = Subject::<(), &str>::new();
    let g = gate.clone();
    let (log, _) = collect(source.observable().audit(move |_| g.observable()));

    source.try_next(1).unwrap();
    source.try_complete().unwrap();
    assert!(log.borrow().is_empty());
    gate.try_next(()).unwrap();
    assert_eq!(*log.borrow(), vec!["1", "complete"]);
  }

  #[test]
  fn duration_error_tears_down() {
    let source = Subject::new();
    let gate = Subject::<(), &str>::new();
    let g = gate.clone();
    let (log, _) = collect(source.observable().audit(move |_| g.observable()));

    source.try_next(1).unwrap();
    gate.try_error("late").unwrap();
    assert_eq!(*log.borrow(), vec!["error late"]);
    assert_eq!(source.subscribed_size(), 0);
  }

  #[test]
  fn selector_failure_errors() {
    let (log, _) = collect(
      observable::from_iter(vec![1, 2])
        .try_audit(|_| Err::<Observable<(), &str>, _>("no duration")),
    );
    assert_eq!(*log.borrow(), vec!["error no duration"]);
  }

  #[test]
  fn audit_time_on_virtual_clock() {
    let clock = VirtualTimeScheduler::new();
    let source = Subject::new();
    let (log, _) = collect(
      source
        .observable()
        .audit_time(Duration::from_millis(10), clock.clone()),
    );

    source.try_next(1).unwrap();
    clock.advance_by(Duration::from_millis(5));
    source.try_next(2).unwrap();
    clock.advance_by(Duration::from_millis(5));
    assert_eq!(*log.borrow(), vec!["2"]);

    source.try_next(3).unwrap();
    clock.advance_by(Duration::from_millis(10));
    assert_eq!(*log.borrow(), vec!["2", "3"]);
  }
}
