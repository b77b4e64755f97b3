//! # rxgraph
//!
//! A push-based reactive stream engine: observables, subscribers, subjects,
//! pluggable schedulers and a virtual-time marble test harness.
//!
//! ```rust
//! use rxgraph::prelude::*;
//!
//! observable::from_iter::<_, ()>(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("value: {v}"));
//! ```
//!
//! ## Key concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A cold, re-subscribable producer of notifications |
//! | [`Subscriber`] | The per-subscription sink that enforces the event grammar |
//! | [`Subscription`] | A node in the teardown graph |
//! | [`Subject`] | A multicasting observer and observable |
//! | [`Scheduler`] | Decides when deferred work runs |
//!
//! Everything is single-threaded and reference counted. Schedulers are
//! explicit values; nothing reads an ambient clock.
//!
//! ## Feature flags
//!
//! - **`timer`** (default): real-time sleeping via `futures-time`
//! - **`tokio-scheduler`**: a tokio `LocalSet` spawner and sleep provider
//!
//! [`Observable`]: observable::Observable
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler

pub mod error;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;
