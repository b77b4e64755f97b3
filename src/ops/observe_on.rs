use super::OperatorSubscriber;
use crate::{
  observable::Observable,
  scheduler::{Duration, Scheduler, Task},
  subscriber::Subscriber,
};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Re-emit every notification from a task on `scheduler`.
  ///
  /// Notifications keep their order; unsubscribing cancels the ones not yet
  /// delivered.
  pub fn observe_on<S>(self, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let (on_error, on_complete) = (scheduler.clone(), scheduler.clone());
      let scheduler = scheduler.clone();
      OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, v: Item| {
        let target = d.clone();
        d.add(scheduler.schedule_task(Task::once(move || target.next(v)), Duration::ZERO));
      })
      .on_error(move |d, err| {
        let target = d.clone();
        d.add(on_error.schedule_task(Task::once(move || target.error(err)), Duration::ZERO));
      })
      .on_complete(move |d| {
        let target = d.clone();
        d.add(on_complete.schedule_task(Task::once(move || target.complete()), Duration::ZERO));
      })
      .subscribe_to(source);
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn defers_to_scheduler() {
    let clock = VirtualTimeScheduler::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    observable::from_iter::<_, ()>(vec![1, 2, 3])
      .observe_on(clock.clone())
      .subscribe_complete(
        move |v| l1.borrow_mut().push(v.to_string()),
        move || l2.borrow_mut().push("complete".to_string()),
      );
    assert!(log.borrow().is_empty());
    clock.flush();
    assert_eq!(*log.borrow(), vec!["1", "2", "3", "complete"]);
  }

  #[test]
  fn queue_scheduler_runs_in_order() {
    let queue = QueueScheduler::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    observable::from_iter::<_, ()>(0..4)
      .observe_on(queue)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
  }
}
