//! Virtual-time marble testing.
//!
//! [`TestScheduler`] drives cold and hot observables built from marble
//! diagrams and checks what an observable emits, frame by frame, against an
//! expected diagram once [`flush`](TestScheduler::flush) runs the clock.
//! See [`marbles`](parse_marbles) for the notation.

mod cold;
mod hot;
mod marbles;
mod test_scheduler;

pub use cold::ColdObservable;
pub use hot::HotObservable;
pub use marbles::{
  parse_marbles, parse_marbles_as_subscriptions, to_marbles, SubscriptionLog, TestMessage,
};
pub use test_scheduler::{
  ObservableExpectation, SubscriptionLogs, SubscriptionsExpectation, TestScheduler,
};
