use super::{Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::subscription::SubscriptionLike;
use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  rc::Rc,
  time::Instant,
};

/// Synchronous trampoline.
///
/// Scheduling from outside runs the task right away, on the caller's stack.
/// Scheduling from inside a running task only queues the work; the outermost
/// call drains the queue in FIFO order once the current task returns.
/// Delayed work blocks the thread until it is due.
#[derive(Clone)]
pub struct QueueScheduler(Rc<QueueInner>);

struct QueueInner {
  epoch: Instant,
  active: Cell<bool>,
  queue: RefCell<VecDeque<Queued>>,
}

struct Queued {
  due: Instant,
  task: Task,
  handle: TaskHandle,
}

/// Resets the active flag even if a task panics.
struct ActiveGuard<'a>(&'a Cell<bool>);

impl Drop for ActiveGuard<'_> {
  fn drop(&mut self) { self.0.set(false) }
}

impl QueueScheduler {
  pub fn new() -> Self {
    QueueScheduler(Rc::new(QueueInner {
      epoch: Instant::now(),
      active: Cell::new(false),
      queue: RefCell::new(VecDeque::new()),
    }))
  }

  fn drain(&self) {
    let inner = &self.0;
    inner.active.set(true);
    let _guard = ActiveGuard(&inner.active);
    tracing::debug!("draining queue scheduler");

    loop {
      let next = {
        let mut queue = inner.queue.borrow_mut();
        let earliest = queue
          .iter()
          .enumerate()
          .min_by_key(|(idx, q)| (q.due, *idx))
          .map(|(idx, _)| idx);
        earliest.and_then(|idx| queue.remove(idx))
      };
      let Some(Queued { due, mut task, handle }) = next else { break };

      if handle.is_closed() {
        continue;
      }
      let now = Instant::now();
      if due > now {
        std::thread::sleep(due - now);
        if handle.is_closed() {
          continue;
        }
      }
      match task.step() {
        TaskState::Finished => handle.mark_finished(),
        _ if handle.is_closed() => {}
        TaskState::Yield => self.enqueue(task, handle, Duration::ZERO),
        TaskState::Sleeping(delay) => self.enqueue(task, handle, delay),
      }
    }
  }

  fn enqueue(&self, task: Task, handle: TaskHandle, delay: Duration) {
    let due = Instant::now() + delay;
    self
      .0
      .queue
      .borrow_mut()
      .push_back(Queued { due, task, handle });
  }
}

impl Default for QueueScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for QueueScheduler {
  fn now(&self) -> Duration { self.0.epoch.elapsed() }

  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    self.enqueue(task, handle.clone(), delay);
    if !self.0.active.get() {
      self.drain();
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn runs_synchronously_when_idle() {
    let scheduler = QueueScheduler::new();
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let handle = scheduler.schedule_task(Task::once(move || r.set(true)), Duration::ZERO);
    assert!(ran.get());
    assert!(handle.is_finished());
  }

  #[test]
  fn nested_work_is_deferred_not_recursive() {
    let scheduler = QueueScheduler::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (l, inner) = (log.clone(), scheduler.clone());
    scheduler.schedule_task(
      Task::once(move || {
        l.borrow_mut().push("outer start");
        let l2 = l.clone();
        inner.schedule_task(Task::once(move || l2.borrow_mut().push("inner")), Duration::ZERO);
        l.borrow_mut().push("outer end");
      }),
      Duration::ZERO,
    );
    assert_eq!(*log.borrow(), vec!["outer start", "outer end", "inner"]);
  }

  #[test]
  fn self_rescheduling_runs_as_a_loop() {
    let scheduler = QueueScheduler::new();
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    scheduler.schedule(0, Duration::ZERO, move |n| {
      *n += 1;
      c.set(*n);
      if *n < 10_000 { TaskState::Yield } else { TaskState::Finished }
    });
    assert_eq!(count.get(), 10_000);
  }

  #[test]
  fn delayed_work_blocks_until_due() {
    let scheduler = QueueScheduler::new();
    let start = Instant::now();
    scheduler.schedule_task(Task::once(|| {}), Duration::from_millis(5));
    assert!(start.elapsed() >= Duration::from_millis(5));
  }
}
