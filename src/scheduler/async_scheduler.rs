use super::{Duration, Scheduler, SleepProvider, Task, TaskHandle, TaskState};
use crate::subscription::SubscriptionLike;
use futures::{
  future::{abortable, FutureExt},
  task::{LocalSpawn, LocalSpawnExt},
};
use pin_project_lite::pin_project;
use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
  time::Instant,
};

pin_project! {
  /// Drives a [`Task`] on an executor, sleeping through the provider between
  /// steps.
  pub struct TaskFuture<P: SleepProvider> {
    task: Task,
    handle: TaskHandle,
    provider: P,
    #[pin]
    sleep: Option<P::SleepFuture>,
  }
}

impl<P: SleepProvider> TaskFuture<P> {
  pub fn new(task: Task, handle: TaskHandle, provider: P, delay: Duration) -> Self {
    let sleep = (!delay.is_zero()).then(|| provider.sleep(delay));
    TaskFuture { task, handle, provider, sleep }
  }
}

impl<P: SleepProvider> Future for TaskFuture<P> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut this = self.project();
    loop {
      if let Some(sleep) = this.sleep.as_mut().as_pin_mut() {
        if sleep.poll(cx).is_pending() {
          return Poll::Pending;
        }
        this.sleep.set(None);
      }
      if this.handle.is_closed() {
        return Poll::Ready(());
      }
      match this.task.step() {
        TaskState::Finished => {
          this.handle.mark_finished();
          return Poll::Ready(());
        }
        TaskState::Yield => {
          cx.waker().wake_by_ref();
          return Poll::Pending;
        }
        TaskState::Sleeping(duration) => this.sleep.set(Some(this.provider.sleep(duration))),
      }
    }
  }
}

/// Timer-based scheduler: every task becomes a future spawned on a local
/// executor, and delays are slept through the [`SleepProvider`].
#[derive(Clone)]
pub struct AsyncScheduler<Sp, P> {
  spawner: Sp,
  provider: P,
  epoch: Instant,
}

impl<Sp, P> AsyncScheduler<Sp, P> {
  pub fn new(spawner: Sp, provider: P) -> Self {
    AsyncScheduler { spawner, provider, epoch: Instant::now() }
  }

  #[inline]
  pub(crate) fn spawner(&self) -> &Sp { &self.spawner }
}

impl<Sp, P> Scheduler for AsyncScheduler<Sp, P>
where
  Sp: LocalSpawn,
  P: SleepProvider + Clone + 'static,
{
  fn now(&self) -> Duration { self.epoch.elapsed() }

  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    let future = TaskFuture::new(task, handle.clone(), self.provider.clone(), delay);
    let (future, abort) = abortable(future);
    handle.set_abort(abort);
    if let Err(err) = self.spawner.spawn_local(future.map(|_| ())) {
      tracing::warn!(error = %err, "executor rejected a scheduled task");
      handle.unsubscribe();
    }
    handle
  }
}

#[cfg(all(test, feature = "timer"))]
mod tests {
  use super::*;
  use crate::scheduler::FuturesTimeSleep;
  use futures::executor::LocalPool;
  use std::{
    cell::{Cell, RefCell},
    rc::Rc,
  };

  #[test]
  fn runs_after_delay() {
    let mut pool = LocalPool::new();
    let scheduler = AsyncScheduler::new(pool.spawner(), FuturesTimeSleep);
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let start = Instant::now();
    let handle = scheduler.schedule_task(Task::once(move || r.set(true)), Duration::from_millis(10));
    assert!(!ran.get());

    pool.run();
    assert!(ran.get());
    assert!(handle.is_finished());
    assert!(start.elapsed() >= Duration::from_millis(10));
  }

  #[test]
  fn periodic_task_and_cancel() {
    let mut pool = LocalPool::new();
    let scheduler = AsyncScheduler::new(pool.spawner(), FuturesTimeSleep);
    let ticks = Rc::new(RefCell::new(0));
    let t = ticks.clone();
    scheduler.schedule(0, Duration::ZERO, move |n| {
      *n += 1;
      *t.borrow_mut() = *n;
      if *n < 3 { TaskState::Sleeping(Duration::from_millis(1)) } else { TaskState::Finished }
    });
    pool.run();
    assert_eq!(*ticks.borrow(), 3);

    let cancelled = Rc::new(Cell::new(false));
    let c = cancelled.clone();
    let handle =
      scheduler.schedule_task(Task::once(move || c.set(true)), Duration::from_millis(5));
    handle.unsubscribe();
    pool.run();
    assert!(!cancelled.get());
  }

  #[test]
  fn yield_lets_other_work_run() {
    let mut pool = LocalPool::new();
    let scheduler = AsyncScheduler::new(pool.spawner(), FuturesTimeSleep);
    let log = Rc::new(RefCell::new(vec![]));
    let l1 = log.clone();
    scheduler.schedule(0, Duration::ZERO, move |n| {
      *n += 1;
      l1.borrow_mut().push(format!("a{n}"));
      if *n < 2 { TaskState::Yield } else { TaskState::Finished }
    });
    let l2 = log.clone();
    scheduler.schedule_task(Task::once(move || l2.borrow_mut().push("b".into())), Duration::ZERO);
    pool.run();
    assert_eq!(*log.borrow(), vec!["a1", "b", "a2"]);
  }
}
