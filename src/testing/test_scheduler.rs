use super::{
  marbles::{parse_marbles, parse_marbles_as_subscriptions, to_marbles, SubscriptionLog, TestMessage},
  ColdObservable, HotObservable,
};
use crate::{
  error::MarbleError,
  notification::Notification,
  observable::IntoObservable,
  observer::FnObserver,
  scheduler::{Duration, Scheduler, Task, TaskHandle, VirtualTimeScheduler},
  subscription::{Subscription, SubscriptionLike},
};
use std::{
  cell::RefCell,
  fmt::{Debug, Display},
  rc::Rc,
};

const DEFAULT_FRAME: Duration = Duration::from_millis(1);
const DEFAULT_MAX_FRAMES: usize = 750;

/// Shared record of the subscriptions made to a test observable.
pub type SubscriptionLogs = Rc<RefCell<Vec<SubscriptionLog>>>;

/// A virtual clock measured in marble frames, collecting expectations that
/// are checked on [`flush`](TestScheduler::flush).
///
/// ```
/// use rxgraph::testing::TestScheduler;
///
/// let scheduler = TestScheduler::new();
/// let source = scheduler.cold("-a-b|");
/// scheduler.expect_observable(source.observable().take(1)).to_be("-(a|)");
/// scheduler.flush();
/// ```
#[derive(Clone)]
pub struct TestScheduler(Rc<TestInner>);

struct TestInner {
  clock: VirtualTimeScheduler,
  frame: Duration,
  max_frames: usize,
  hot_setups: RefCell<Vec<Box<dyn FnOnce()>>>,
  flush_tests: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Default for TestScheduler {
  fn default() -> Self { Self::build(DEFAULT_FRAME, DEFAULT_MAX_FRAMES) }
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  fn build(frame: Duration, max_frames: usize) -> Self {
    let max_time = frame * u32::try_from(max_frames).unwrap_or(u32::MAX);
    TestScheduler(Rc::new(TestInner {
      clock: VirtualTimeScheduler::with_max_time(max_time),
      frame,
      max_frames,
      hot_setups: RefCell::default(),
      flush_tests: RefCell::default(),
    }))
  }

  /// Use `frame` of virtual time per marble character. Call it before
  /// creating any test observable.
  pub fn with_frame_duration(self, frame: Duration) -> Self { Self::build(frame, self.0.max_frames) }

  /// Stop `flush` after `max_frames` frames.
  pub fn with_max_frames(self, max_frames: usize) -> Self { Self::build(self.0.frame, max_frames) }

  /// Virtual time spanned by `n` frames.
  pub fn frames(&self, n: usize) -> Duration {
    self.0.frame * u32::try_from(n).unwrap_or(u32::MAX)
  }

  /// The current frame, saturating at `usize::MAX`.
  pub fn frame(&self) -> usize {
    let frame = self.0.clock.now().as_nanos() / self.0.frame.as_nanos().max(1);
    usize::try_from(frame).unwrap_or(usize::MAX)
  }

  /// A cold observable of characters. `#` errors with `"error"`.
  ///
  /// # Panics
  ///
  /// Panics on malformed marbles, or when they contain `^`.
  pub fn cold(&self, marbles: &str) -> ColdObservable<char, &'static str> {
    self.cold_with(marbles, &[], "error")
  }

  /// A cold observable whose characters map through `values`. When `Item`
  /// is `char`, a character missing from the table stands for itself.
  pub fn cold_with<Item, Err>(
    &self, marbles: &str, values: &[(char, Item)], error: Err,
  ) -> ColdObservable<Item, Err>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    if let Some(index) = marbles.find('^') {
      let err = MarbleError::NotAllowed { ch: '^', index, context: "cold" };
      invalid_marbles(marbles, &err);
    }
    let messages = self.parse(marbles, values, error);
    ColdObservable::new(self.clone(), messages)
  }

  /// A hot observable of characters. `#` errors with `"error"`.
  ///
  /// # Panics
  ///
  /// Panics on malformed marbles.
  pub fn hot(&self, marbles: &str) -> HotObservable<char, &'static str> {
    self.hot_with(marbles, &[], "error")
  }

  /// A hot observable whose characters map through `values`.
  ///
  /// Its notifications are scheduled when [`flush`](TestScheduler::flush)
  /// starts, at their frame counted from `^`.
  pub fn hot_with<Item, Err>(
    &self, marbles: &str, values: &[(char, Item)], error: Err,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    let messages = self.parse(marbles, values, error);
    let hot = HotObservable::new(self.clone(), messages);
    let setup = hot.clone();
    self.0.hot_setups.borrow_mut().push(Box::new(move || setup.setup()));
    hot
  }

  fn parse<Item, Err>(
    &self, marbles: &str, values: &[(char, Item)], error: Err,
  ) -> Vec<TestMessage<Item, Err>>
  where
    Item: Clone + 'static,
    Err: Clone,
  {
    let lookup = |c: char| value_for(values, c);
    parse_marbles(marbles, lookup, error).unwrap_or_else(|err| invalid_marbles(marbles, &err))
  }

  /// Record what `observable` emits from frame 0 until the end of the flush.
  pub fn expect_observable<Item, Err>(
    &self, observable: impl IntoObservable<Item, Err>,
  ) -> ObservableExpectation<Item, Err>
  where
    Item: 'static,
    Err: 'static,
  {
    self.expect_observable_with_unsubscription(observable, "^")
  }

  /// Like [`expect_observable`](TestScheduler::expect_observable), but
  /// subscribe at the `^` frame of `subscription` and unsubscribe at its `!`
  /// frame.
  pub fn expect_observable_with_unsubscription<Item, Err>(
    &self, observable: impl IntoObservable<Item, Err>, subscription: &str,
  ) -> ObservableExpectation<Item, Err>
  where
    Item: 'static,
    Err: 'static,
  {
    let log = parse_marbles_as_subscriptions(subscription)
      .unwrap_or_else(|err| invalid_marbles(subscription, &err))
      .unwrap_or(SubscriptionLog { subscribed_frame: 0, unsubscribed_frame: None });
    let observable = observable.into_observable();
    let actual: Rc<RefCell<Vec<TestMessage<Item, Err>>>> = Rc::default();
    let handle: Rc<RefCell<Option<Subscription>>> = Rc::default();

    let (scheduler, record, slot) = (self.clone(), actual.clone(), handle.clone());
    self.schedule_task(
      Task::once(move || {
        let push = move |notification: Notification<Item, Err>| {
          let frame = scheduler.frame();
          record.borrow_mut().push(TestMessage { frame, notification });
        };
        let (on_next, on_error, on_complete) = (push.clone(), push.clone(), push);
        let subscription = observable.actual_subscribe(FnObserver::new(
          move |v: Item| on_next(Notification::Next(v)),
          move |e: Err| on_error(Notification::Error(e)),
          move || on_complete(Notification::Complete),
        ));
        *slot.borrow_mut() = Some(subscription);
      }),
      self.frames(log.subscribed_frame),
    );
    if let Some(unsubscribed) = log.unsubscribed_frame {
      self.schedule_task(
        Task::once(move || {
          if let Some(subscription) = handle.borrow_mut().take() {
            subscription.unsubscribe();
          }
        }),
        self.frames(unsubscribed),
      );
    }
    ObservableExpectation { scheduler: self.clone(), actual }
  }

  /// Compare the subscriptions recorded in `logs` on flush.
  pub fn expect_subscriptions(&self, logs: SubscriptionLogs) -> SubscriptionsExpectation {
    SubscriptionsExpectation { scheduler: self.clone(), actual: logs }
  }

  /// Start the hot observables, run the clock up to the frame limit, then
  /// check every expectation.
  ///
  /// # Panics
  ///
  /// Panics with both diagrams when an expectation does not hold.
  pub fn flush(&self) {
    let setups = std::mem::take(&mut *self.0.hot_setups.borrow_mut());
    for setup in setups {
      setup();
    }
    self.0.clock.flush();
    let tests = std::mem::take(&mut *self.0.flush_tests.borrow_mut());
    for test in tests {
      test();
    }
  }

  fn push_test(&self, test: impl FnOnce() + 'static) {
    self.0.flush_tests.borrow_mut().push(Box::new(test));
  }
}

impl Scheduler for TestScheduler {
  #[inline]
  fn now(&self) -> Duration { self.0.clock.now() }

  #[inline]
  fn schedule_task(&self, task: Task, delay: Duration) -> TaskHandle {
    self.0.clock.schedule_task(task, delay)
  }
}

fn value_for<Item: Clone + 'static>(values: &[(char, Item)], c: char) -> Option<Item> {
  values
    .iter()
    .find(|(k, _)| *k == c)
    .map(|(_, v)| v.clone())
    .or_else(|| (&c as &dyn std::any::Any).downcast_ref::<Item>().cloned())
}

fn invalid_marbles(marbles: &str, err: &MarbleError) -> ! {
  panic!("invalid marbles {marbles:?}: {err}")
}

/// Pending check of an observable's notifications.
pub struct ObservableExpectation<Item, Err> {
  scheduler: TestScheduler,
  actual: Rc<RefCell<Vec<TestMessage<Item, Err>>>>,
}

impl ObservableExpectation<char, &'static str> {
  /// Expect the character notifications in `marbles`, `#` meaning the
  /// error `"error"`.
  pub fn to_be(self, marbles: &str) { self.to_be_with(marbles, &[], "error") }
}

impl<Item, Err> ObservableExpectation<Item, Err>
where
  Item: Clone + PartialEq + Debug + Display + 'static,
  Err: Clone + PartialEq + Debug + 'static,
{
  /// Expect the notifications in `marbles`, mapping characters through
  /// `values`.
  pub fn to_be_with(self, marbles: &str, values: &[(char, Item)], error: Err) {
    let expected = self.scheduler.parse(marbles, values, error);
    let (marbles, actual) = (marbles.to_string(), self.actual);
    self.scheduler.push_test(move || {
      let actual = actual.borrow();
      assert!(
        *actual == expected,
        "observable did not match\nexpected: {marbles}\n  actual: {}\n\nexpected: {expected:?}\n  actual: {actual:?}",
        to_marbles(&actual),
      );
    });
  }
}

/// Pending check of the subscriptions made to a test observable.
pub struct SubscriptionsExpectation {
  scheduler: TestScheduler,
  actual: SubscriptionLogs,
}

impl SubscriptionsExpectation {
  /// Expect one subscription per diagram, in order. Diagrams without `^`
  /// stand for no subscription.
  pub fn to_be(self, marbles: &[&str]) {
    let expected: Vec<SubscriptionLog> = marbles
      .iter()
      .filter_map(|m| {
        parse_marbles_as_subscriptions(m).unwrap_or_else(|err| invalid_marbles(m, &err))
      })
      .collect();
    let (marbles, actual) = (marbles.join(", "), self.actual);
    self.scheduler.push_test(move || {
      let actual = actual.borrow();
      assert!(
        *actual == expected,
        "subscriptions did not match\nexpected: [{marbles}]\nexpected: {expected:?}\n  actual: {actual:?}",
      );
    });
  }
}
