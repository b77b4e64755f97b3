use super::{marbles::SubscriptionLog, test_scheduler::SubscriptionLogs, TestMessage, TestScheduler};
use crate::{
  observable::{IntoObservable, Observable},
  scheduler::{Scheduler, Task},
  subject::Subject,
  subscriber::Subscriber,
  subscription::Teardown,
};
use std::rc::Rc;

/// Emits its marble diagram on the test clock whether or not anybody
/// listens. Subscribers only see what happens after they attach.
pub struct HotObservable<Item, Err> {
  scheduler: TestScheduler,
  messages: Rc<[TestMessage<Item, Err>]>,
  subject: Subject<Item, Err>,
  subscriptions: SubscriptionLogs,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self {
    HotObservable {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
      subject: self.subject.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub(crate) fn new(scheduler: TestScheduler, messages: Vec<TestMessage<Item, Err>>) -> Self {
    HotObservable {
      scheduler,
      messages: messages.into(),
      subject: Subject::new(),
      subscriptions: SubscriptionLogs::default(),
    }
  }

  /// Schedule every notification at its frame.
  pub(crate) fn setup(&self) {
    for message in self.messages.iter() {
      let (mut subject, notification) = (self.subject.clone(), message.notification.clone());
      self.scheduler.schedule_task(
        Task::once(move || notification.accept(&mut subject)),
        self.scheduler.frames(message.frame),
      );
    }
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
      this.subject.observable().subscribe_with(s.clone());

      let (scheduler, logs) = (this.scheduler.clone(), this.subscriptions.clone());
      Teardown::from_fn(move || {
        if let Some(log) = logs.borrow_mut().get_mut(index) {
          log.unsubscribed_frame = Some(scheduler.frame());
        }
      })
    })
  }
}

impl<Item, Err> IntoObservable<Item, Err> for HotObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

impl<Item, Err> IntoObservable<Item, Err> for &HotObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn into_observable(self) -> Observable<Item, Err> { self.observable() }
}

#[cfg(test)]
mod tests {
  use crate::testing::TestScheduler;

  #[test]
  fn late_subscriber_misses_earlier_values() {
    let scheduler = TestScheduler::new();
    let source = scheduler.hot("-a-b-c|");
    scheduler
      .expect_observable(source.observable().subscribe_on(scheduler.clone()))
      .to_be("-a-b-c|");
    scheduler
      .expect_observable_with_unsubscription(&source, "^--!")
      .to_be("-a-");
    scheduler
      .expect_subscriptions(source.subscriptions())
      .to_be(&["^--!", "^-----!"]);
    scheduler.flush();
  }

  #[test]
  fn values_before_subscription_point_are_dropped() {
    let scheduler = TestScheduler::new();
    let source = scheduler.hot("a-^-b-|");
    scheduler.expect_observable(&source).to_be("--b-|");
    scheduler.flush();
  }
}
