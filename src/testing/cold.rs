use super::{marbles::SubscriptionLog, test_scheduler::SubscriptionLogs, TestMessage, TestScheduler};
use crate::{
  observable::{IntoObservable, Observable},
  scheduler::{Scheduler, Task},
  subscriber::Subscriber,
  subscription::Teardown,
};
use std::rc::Rc;

/// Replays its marble diagram from the start for every subscriber, counting
/// frames from the moment of subscription.
pub struct ColdObservable<Item, Err> {
  scheduler: TestScheduler,
  messages: Rc<[TestMessage<Item, Err>]>,
  subscriptions: SubscriptionLogs,
}

impl<Item, Err> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    ColdObservable {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub(crate) fn new(scheduler: TestScheduler, messages: Vec<TestMessage<Item, Err>>) -> Self {
    ColdObservable { scheduler, messages: messages.into(), subscriptions: SubscriptionLogs::default() }
  }

  /// Every subscription made so far.
  pub fn subscriptions(&self) -> SubscriptionLogs { self.subscriptions.clone() }

  pub fn observable(&self) -> Observable<Item, Err> {
    let this = self.clone();
    Observable::new(move |s: Subscriber<Item, Err>| {
      let index = {
        let mut logs = this.subscriptions.borrow_mut();
        logs.push(SubscriptionLog {
          subscribed_frame: this.scheduler.frame(),
          unsubscribed_frame: None,
        });
        logs.len() - 1
      };
      for message in this.messages.iter() {
        let (target, notification) = (s.clone(), message.notification.clone());
        let handle = this.scheduler.schedule_task(
          Task::once(move || notification.accept(&mut target.clone())),
          this.scheduler.frames(message.frame),
        );
        s.add(handle);
      }

      let (scheduler, logs) = (this.scheduler.clone(), this.subscriptions.clone());
      Teardown::from_fn(move || {
        if let Some(log) = logs.borrow_mut().get_mut(index) {
          log.unsubscribed_frame = Some(scheduler.frame());
        }
      })
    })
  }
}

impl<Item, Err> IntoObservable<Item, Err> for ColdObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

impl<Item, Err> IntoObservable<Item, Err> for &ColdObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}
