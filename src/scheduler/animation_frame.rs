use super::{AsyncScheduler, Duration, Scheduler, SleepProvider, Task, TaskHandle, TaskState};
use crate::subscription::SubscriptionLike;
use futures::task::LocalSpawn;
use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// Frame-aligned scheduler.
///
/// Zero-delay work waits for the next frame boundary and then runs as one
/// batch. Work queued during a frame lands in the following frame. Delayed
/// work behaves like [`AsyncScheduler`].
#[derive(Clone)]
pub struct AnimationFrameScheduler<Sp, P> {
  frame: Duration,
  state: Rc<FrameState>,
  fallback: AsyncScheduler<Sp, P>,
}

#[derive(Default)]
struct FrameState {
  queue: RefCell<Vec<(Task, TaskHandle)>>,
  frame_requested: Cell<bool>,
}

impl<Sp, P> AnimationFrameScheduler<Sp, P> {
  pub fn new(spawner: Sp, provider: P) -> Self { Self::with_frame(spawner, provider, DEFAULT_FRAME) }

  /// Use a frame period other than 16 ms.
  pub fn with_frame(spawner: Sp, provider: P, frame: Duration) -> Self {
    AnimationFrameScheduler {
      frame,
      state: Rc::default(),
      fallback: AsyncScheduler::new(spawner, provider),
    }
  }

  #[inline]
  pub fn frame(&self) -> Duration { self.frame }
}

impl<Sp, P> AnimationFrameScheduler<Sp, P>
where
  Sp: LocalSpawn + Clone + 'static,
  P: SleepProvider + Clone + 'static,
{
  fn until_next_frame(&self) -> Duration {
    let frame = self.frame.as_nanos().max(1);
    let elapsed = self.fallback.now().as_nanos() % frame;
    Duration::from_nanos((frame - elapsed) as u64)
  }

  fn push(&self, task: Task, handle: TaskHandle) {
    self.state.queue.borrow_mut().push((task, handle));
    if !self.state.frame_requested.replace(true) {
      let this = self.clone();
      self
        .fallback
        .schedule_task(Task::once(move || this.run_frame()), self.until_next_frame());
    }
  }

  fn run_frame(&self) {
    self.state.frame_requested.set(false);
    let batch = std::mem::take(&mut *self.state.queue.borrow_mut());
    tracing::debug!(tasks = batch.len(), "running animation frame");
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

impl<Sp, P> Scheduler for AnimationFrameScheduler<Sp, P>
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
