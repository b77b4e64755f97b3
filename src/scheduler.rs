//! Schedulers decide when a unit of work runs.
//!
//! Work is a [`Task`]: a closure stepped by the scheduler until it reports
//! [`TaskState::Finished`]. A task reschedules itself by returning
//! [`TaskState::Yield`] or [`TaskState::Sleeping`]; the scheduler's own loop
//! runs it again, so self-rescheduling never grows the stack.
//!
//! Every scheduler is an explicit value passed to the operators that need
//! one. There is no ambient default.

use crate::subscription::{SubscriptionLike, Teardown};
use futures::future::AbortHandle;
use std::{
  cell::{Cell, RefCell},
  fmt::{Debug, Formatter},
  future::Future,
  rc::Rc,
};

pub use std::time::Duration;

mod animation_frame;
mod asap;
mod async_scheduler;
mod queue;
mod sleep;
mod virtual_time;

pub use animation_frame::AnimationFrameScheduler;
pub use asap::AsapScheduler;
pub use async_scheduler::{AsyncScheduler, TaskFuture};
pub use queue::QueueScheduler;
#[cfg(feature = "timer")]
pub use sleep::FuturesTimeSleep;
#[cfg(feature = "tokio-scheduler")]
pub use sleep::{TokioLocalSpawner, TokioSleep};
pub use virtual_time::VirtualTimeScheduler;

/// What a task asks of its scheduler after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  Finished,
  /// Run again at the current time, after work already due.
  Yield,
  /// Run again after the given duration.
  Sleeping(Duration),
}

/// A unit of schedulable work.
pub struct Task(Box<dyn FnMut() -> TaskState>);

impl Task {
  /// A task stepping `work` over its own `state`.
  pub fn new<S: 'static>(
    mut state: S, mut work: impl FnMut(&mut S) -> TaskState + 'static,
  ) -> Self {
    Task(Box::new(move || work(&mut state)))
  }

  /// A task that runs `f` once.
  pub fn once(f: impl FnOnce() + 'static) -> Self {
    let mut f = Some(f);
    Task(Box::new(move || {
      if let Some(f) = f.take() {
        f();
      }
      TaskState::Finished
    }))
  }

  #[inline]
  pub fn step(&mut self) -> TaskState { (self.0)() }

  /// Wrap this task so it stops as soon as `handle` is cancelled and marks
  /// `handle` finished with it. Used when a scheduler hands a task over to
  /// another one while the caller keeps the original handle.
  pub(crate) fn guarded(mut self, handle: TaskHandle) -> Task {
    Task(Box::new(move || {
      if handle.is_closed() {
        return TaskState::Finished;
      }
      let state = self.step();
      if state == TaskState::Finished {
        handle.mark_finished();
      }
      state
    }))
  }
}

impl Debug for Task {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Task") }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
  Pending,
  Finished,
  Cancelled,
}

/// Cancellation handle of a scheduled task.
///
/// Unsubscribing prevents any further step. A step already running is never
/// interrupted.
#[derive(Clone)]
pub struct TaskHandle(Rc<HandleInner>);

struct HandleInner {
  state: Cell<HandleState>,
  abort: RefCell<Option<AbortHandle>>,
}

impl TaskHandle {
  pub fn new() -> Self {
    TaskHandle(Rc::new(HandleInner {
      state: Cell::new(HandleState::Pending),
      abort: RefCell::new(None),
    }))
  }

  /// A handle for work that already ran.
  pub fn finished() -> Self {
    let handle = Self::new();
    handle.mark_finished();
    handle
  }

  pub(crate) fn mark_finished(&self) {
    if self.0.state.get() == HandleState::Pending {
      self.0.state.set(HandleState::Finished);
      self.0.abort.borrow_mut().take();
    }
  }

  pub(crate) fn set_abort(&self, abort: AbortHandle) {
    if self.0.state.get() == HandleState::Cancelled {
      abort.abort();
    } else {
      *self.0.abort.borrow_mut() = Some(abort);
    }
  }

  #[inline]
  pub fn is_finished(&self) -> bool { self.0.state.get() == HandleState::Finished }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.state.get() == HandleState::Cancelled }
}

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&self) {
    if self.0.state.get() == HandleState::Pending {
      self.0.state.set(HandleState::Cancelled);
      let abort = self.0.abort.borrow_mut().take();
      if let Some(abort) = abort {
        abort.abort();
      }
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.state.get() != HandleState::Pending }
}

impl From<TaskHandle> for Teardown {
  #[inline]
  fn from(handle: TaskHandle) -> Self { Teardown::handle(handle) }
}

impl Debug for TaskHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("TaskHandle").field(&self.0.state.get()).finish()
  }
}

/// A Scheduler is an object to order task and schedule their execution.
pub trait Scheduler {
  /// Time elapsed since this scheduler's epoch, in its own time domain.
  fn now(&self) -> Duration;

  /// Run `task` after `delay`.
  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle;

  /// Run `work` over `state` after `delay`, again and again for as long as it
  /// asks to be rescheduled.
  fn schedule<S: 'static>(
    &self, state: S, delay: Duration, work: impl FnMut(&mut S) -> TaskState + 'static,
  ) -> TaskHandle
  where
    Self: Sized,
  {
    self.schedule_task(Task::new(state, work), delay)
  }
}

impl<T: Scheduler + ?Sized> Scheduler for Rc<T> {
  #[inline]
  fn now(&self) -> Duration { (**self).now() }

  #[inline]
  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    (**self).schedule_task(task, delay)
  }
}

/// Supplies the timer futures real-time schedulers wait on.
pub trait SleepProvider {
  type SleepFuture: Future<Output = ()>;

  fn sleep(&self, duration: Duration) -> Self::SleepFuture;
}
