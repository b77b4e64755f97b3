use super::OperatorSubscriber;
use crate::{
  observable::Observable,
  scheduler::{Duration, Scheduler, Task},
  subscriber::Subscriber,
};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Subscribe to the source from a task on `scheduler` instead of on the
  /// caller's stack.
  pub fn subscribe_on<S>(self, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + 'static,
  {
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let (source, target) = (source.clone(), d.clone());
      let handle = scheduler.schedule_task(
        Task::once(move || {
          OperatorSubscriber::forward(&target).subscribe_to(&source);
        }),
        Duration::ZERO,
      );
      d.add(handle);
    })
  }
}
