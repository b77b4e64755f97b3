//! Timer backends for the real-time schedulers.

#[cfg(feature = "timer")]
pub use futures_time_sleep::FuturesTimeSleep;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_sleep::{TokioLocalSpawner, TokioSleep};

#[cfg(feature = "timer")]
mod futures_time_sleep {
  use crate::scheduler::{Duration, SleepProvider};

  /// Executor-agnostic timers from `futures-time`.
  #[derive(Clone, Copy, Debug, Default)]
  pub struct FuturesTimeSleep;

  impl SleepProvider for FuturesTimeSleep {
    type SleepFuture =
      futures::future::Map<futures_time::task::Sleep, fn(futures_time::time::Instant)>;

    fn sleep(&self, duration: Duration) -> Self::SleepFuture {
      use futures::FutureExt;
      futures_time::task::sleep(duration.into()).map(drop as fn(futures_time::time::Instant))
    }
  }
}

#[cfg(feature = "tokio-scheduler")]
mod tokio_sleep {
  use crate::scheduler::{Duration, SleepProvider};
  use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};

  /// Timers from the tokio runtime. Requires a runtime with the time driver
  /// enabled.
  #[derive(Clone, Copy, Debug, Default)]
  pub struct TokioSleep;

  impl SleepProvider for TokioSleep {
    type SleepFuture = tokio::time::Sleep;

    fn sleep(&self, duration: Duration) -> Self::SleepFuture { tokio::time::sleep(duration) }
  }

  /// Spawns onto the current `tokio::task::LocalSet`.
  ///
  /// # Panics
  ///
  /// Spawning panics when called outside a `LocalSet`.
  #[derive(Clone, Copy, Debug, Default)]
  pub struct TokioLocalSpawner;

  impl LocalSpawn for TokioLocalSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
      tokio::task::spawn_local(future);
      Ok(())
    }
  }

  #[cfg(test)]
  mod tests {
    use super::*;
    use crate::{
      scheduler::{AsyncScheduler, Scheduler, Task},
      subscription::SubscriptionLike,
    };
    use std::{cell::Cell, rc::Rc};

    #[tokio::test(flavor = "current_thread")]
    async fn runs_on_a_local_set() {
      let local = tokio::task::LocalSet::new();
      let ran = Rc::new(Cell::new(false));
      let r = ran.clone();
      local
        .run_until(async move {
          let scheduler = AsyncScheduler::new(TokioLocalSpawner, TokioSleep);
          let handle =
            scheduler.schedule_task(Task::once(move || r.set(true)), Duration::from_millis(5));
          tokio::time::sleep(Duration::from_millis(20)).await;
          assert!(handle.is_closed());
        })
        .await;
      assert!(ran.get());
    }
  }
}
