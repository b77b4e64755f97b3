//! Prelude module for convenient imports

pub use crate::{
  error::{
    MarbleError, ObjectUnsubscribedError, TeardownError, UnsubscriptionError, ValueError,
  },
  notification::Notification,
  observable::{self, ConnectableObservable, IntoObservable, Observable},
  observer::{FnObserver, NoHandler, Observer},
  ops::OperatorSubscriber,
  rc::MutRc,
  scheduler::{
    AnimationFrameScheduler, AsapScheduler, AsyncScheduler, Duration, QueueScheduler, Scheduler,
    SleepProvider, Task, TaskHandle, TaskState, VirtualTimeScheduler,
  },
  subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject, SubjectLike},
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionGuard, SubscriptionLike, TearDownSize, Teardown},
  testing::TestScheduler,
};
