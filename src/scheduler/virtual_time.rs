//! Deterministic virtual time.
//!
//! Time only moves when the owner calls [`VirtualTimeScheduler::advance_by`],
//! [`advance_to`](VirtualTimeScheduler::advance_to) or
//! [`flush`](VirtualTimeScheduler::flush). Tasks due at the same instant run
//! in the order they were scheduled.

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::subscription::SubscriptionLike;
use std::{cell::RefCell, cmp::Ordering, collections::BinaryHeap, rc::Rc};

#[derive(Default)]
struct VirtualState {
  now: Duration,
  queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
  max_time: Option<Duration>,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

/// A virtual clock with its own task queue. Clones share the clock.
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler(Rc<RefCell<VirtualState>>);

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// A scheduler whose `flush` stops at `max_time`, leaving later tasks
  /// queued.
  pub fn with_max_time(max_time: Duration) -> Self {
    let scheduler = Self::default();
    scheduler.0.borrow_mut().max_time = Some(max_time);
    scheduler
  }

  pub fn pending_count(&self) -> usize { self.0.borrow().queue.len() }

  pub fn is_empty(&self) -> bool { self.0.borrow().queue.is_empty() }

  /// Move the clock forward by `duration`, running everything due on the way.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.0.borrow().now + duration;
    self.advance_to(target);
  }

  /// Run everything due up to `target` and leave the clock there. The clock
  /// never moves backwards.
  pub fn advance_to(&self, target: Duration) {
    self.execute_until(Some(target));
    let mut state = self.0.borrow_mut();
    if state.now < target {
      state.now = target;
    }
  }

  /// Run every queued task, including the ones they schedule, up to the
  /// configured maximum time.
  pub fn flush(&self) {
    let limit = self.0.borrow().max_time;
    tracing::debug!(pending = self.pending_count(), "flushing virtual time scheduler");
    self.execute_until(limit);
  }

  fn execute_until(&self, limit: Option<Duration>) {
    loop {
      let next = {
        let mut state = self.0.borrow_mut();
        let due = state
          .queue
          .peek()
          .is_some_and(|t| limit.map_or(true, |limit| t.scheduled_time <= limit));
        if !due {
          break;
        }
        let scheduled = state.queue.pop();
        if let Some(scheduled) = &scheduled {
          if scheduled.scheduled_time > state.now {
            state.now = scheduled.scheduled_time;
          }
        }
        scheduled
      };
      let Some(mut scheduled) = next else { break };

      if scheduled.handle.is_closed() {
        continue;
      }
      tracing::trace!(
        task_id = scheduled.task_id,
        at = ?scheduled.scheduled_time,
        "running virtual task"
      );
      match scheduled.task.step() {
        TaskState::Finished => scheduled.handle.mark_finished(),
        _ if scheduled.handle.is_closed() => {}
        TaskState::Yield => self.push(scheduled.task, scheduled.handle, Duration::ZERO),
        TaskState::Sleeping(delay) => self.push(scheduled.task, scheduled.handle, delay),
      }
    }
  }

  fn push(&self, task: Task, handle: TaskHandle, delay: Duration) {
    let mut state = self.0.borrow_mut();
    let task_id = state.next_task_id;
    state.next_task_id += 1;
    let scheduled_time = state.now + delay;
    state.queue.push(ScheduledTask { scheduled_time, task_id, task, handle });
  }
}

impl Scheduler for VirtualTimeScheduler {
  #[inline]
  fn now(&self) -> Duration { self.0.borrow().now }

  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    self.push(task, handle.clone(), delay);
    handle
  }
}
