use super::OperatorSubscriber;
use crate::{
  observable::Observable,
  scheduler::{Duration, Scheduler, Task},
  subscriber::Subscriber,
};
use std::{cell::Cell, rc::Rc};

#[derive(Default)]
struct InFlight {
  count: Cell<usize>,
  completed: Cell<bool>,
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Shift every value by `delay` on `scheduler`.
  ///
  /// Completion is delivered once the last delayed value went out. Errors are
  /// forwarded at once and drop the values still in flight.
  pub fn delay<S>(self, delay: Duration, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let in_flight = Rc::new(InFlight::default());
      let scheduler = scheduler.clone();
      let on_complete = {
        let in_flight = in_flight.clone();
        move |d: &Subscriber<Item, Err>| {
          in_flight.completed.set(true);
          if in_flight.count.get() == 0 {
            d.complete();
          }
        }
      };
      OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, v: Item| {
        in_flight.count.set(in_flight.count.get() + 1);
        let (d2, in_flight) = (d.clone(), in_flight.clone());
        let handle = scheduler.schedule_task(
          Task::once(move || {
            d2.next(v);
            in_flight.count.set(in_flight.count.get() - 1);
            if in_flight.count.get() == 0 && in_flight.completed.get() {
              d2.complete();
            }
          }),
          delay,
        );
        d.add(handle);
      })
      .on_complete(on_complete)
      .subscribe_to(source);
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn shifts_values_and_completion() {
    let clock = VirtualTimeScheduler::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let c1 = clock.clone();
    let c2 = clock.clone();
    observable::from_iter::<_, ()>(vec![1, 2])
      .delay(Duration::from_millis(10), clock.clone())
      .subscribe_complete(
        move |v| l1.borrow_mut().push(format!("{v}@{:?}", c1.now())),
        move || l2.borrow_mut().push(format!("complete@{:?}", c2.now())),
      );
    assert!(log.borrow().is_empty());

    clock.flush();
    assert_eq!(*log.borrow(), vec!["1@10ms", "2@10ms", "complete@10ms"]);
  }

  #[test]
  fn error_is_not_delayed() {
    let clock = VirtualTimeScheduler::new();
    let source = Subject::<i32, &str>::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    source
      .observable()
      .delay(Duration::from_millis(10), clock.clone())
      .subscribe_err(
        move |v| l1.borrow_mut().push(v.to_string()),
        move |e| l2.borrow_mut().push(e.to_string()),
      );
    source.try_next(1).unwrap();
    source.try_error("bad").unwrap();
    clock.flush();
    assert_eq!(*log.borrow(), vec!["bad"]);
  }

  #[test]
  fn unsubscribe_cancels_pending_values() {
    let clock = VirtualTimeScheduler::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    let subscription = observable::of::<_, ()>(1)
      .delay(Duration::from_millis(10), clock.clone())
      .subscribe(move |v| s.borrow_mut().push(v));
    subscription.unsubscribe();
    clock.flush();
    assert!(seen.borrow().is_empty());
  }
}
