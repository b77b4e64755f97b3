use super::{AsyncScheduler, Duration, Scheduler, SleepProvider, Task, TaskHandle, TaskState};
use crate::subscription::SubscriptionLike;
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  rc::Rc,
};

/// Microtask scheduler.
///
/// Zero-delay work is batched into a single drain future, so it runs as
/// soon as the current synchronous code returns to the executor, ahead of
/// anything waiting on a timer. Delayed work falls back to
/// [`AsyncScheduler`].
#[derive(Clone)]
pub struct AsapScheduler<Sp, P> {
  microtasks: Rc<Microtasks>,
  fallback: AsyncScheduler<Sp, P>,
}

#[derive(Default)]
struct Microtasks {
  queue: RefCell<VecDeque<(Task, TaskHandle)>>,
  drain_scheduled: Cell<bool>,
}

impl<Sp: Clone, P> AsapScheduler<Sp, P> {
  pub fn new(spawner: Sp, provider: P) -> Self {
    AsapScheduler {
      microtasks: Rc::default(),
      fallback: AsyncScheduler::new(spawner, provider),
    }
  }
}

impl<Sp, P> AsapScheduler<Sp, P>
where
  Sp: LocalSpawn + Clone + 'static,
  P: SleepProvider + Clone + 'static,
{
  fn push(&self, task: Task, handle: TaskHandle) {
    self
      .microtasks
      .queue
      .borrow_mut()
      .push_back((task, handle));
    if !self.microtasks.drain_scheduled.replace(true) {
      let this = self.clone();
      let spawned = self
        .fallback
        .spawner()
        .spawn_local(futures::future::lazy(move |_| this.drain()));
      if let Err(err) = spawned {
        tracing::warn!(error = %err, "executor rejected the microtask drain");
        self.microtasks.drain_scheduled.set(false);
      }
    }
  }

  /// Run the batch queued so far. Work queued while draining goes to the
  /// next batch.
  fn drain(&self) {
    self.microtasks.drain_scheduled.set(false);
    let batch = std::mem::take(&mut *self.microtasks.queue.borrow_mut());
    tracing::debug!(tasks = batch.len(), "draining microtasks");
    for (mut task, handle) in batch {
      if handle.is_closed() {
        continue;
      }
      match task.step() {
        TaskState::Finished => handle.mark_finished(),
        _ if handle.is_closed() => {}
        TaskState::Yield => self.push(task, handle),
        TaskState::Sleeping(delay) => {
          self.fallback.schedule_task(task.guarded(handle), delay);
        }
      }
    }
  }
}

impl<Sp, P> Scheduler for AsapScheduler<Sp, P>
where
  Sp: LocalSpawn + Clone + 'static,
  P: SleepProvider + Clone + 'static,
{
  fn now(&self) -> Duration { self.fallback.now() }

  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    if delay.is_zero() {
      let handle = TaskHandle::new();
      self.push(task, handle.clone());
      handle
    } else {
      self.fallback.schedule_task(task, delay)
    }
  }
}
