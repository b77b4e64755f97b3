use crate::{
  observable::Observable,
  scheduler::{Duration, Scheduler, Task, TaskState},
  subscriber::Subscriber,
};

/// Emits `item` once after `delay` on `scheduler`, then completes.
pub fn timer<Item, Err, S>(item: Item, delay: Duration, scheduler: S) -> Observable<Item, Err>
where
  Item: Clone + 'static,
  Err: 'static,
  S: Scheduler + 'static,
{
  Observable::new(move |s: Subscriber<Item, Err>| {
    let item = item.clone();
    scheduler.schedule_task(
      Task::once(move || {
        s.next(item);
        s.complete();
      }),
      delay,
    )
  })
}

/// Emits `0, 1, 2, ...` every `period` on `scheduler`, until unsubscribed.
///
/// One task serves the whole sequence by sleeping between emissions.
pub fn interval<Err, S>(period: Duration, scheduler: S) -> Observable<usize, Err>
where
  Err: 'static,
  S: Scheduler + 'static,
{
  Observable::new(move |s: Subscriber<usize, Err>| {
    scheduler.schedule((s, 0), period, move |(s, count)| {
      if s.is_stopped() {
        return TaskState::Finished;
      }
      s.next(*count);
      *count += 1;
      TaskState::Sleeping(period)
    })
  })
}
