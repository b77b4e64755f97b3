use crate::{
  observable::Observable,
  subscriber::Subscriber,
  subscription::Teardown,
};

/// Creates an observable from a producer function.
///
/// ```
/// use rxgraph::prelude::*;
///
/// let source = observable::create(|s: Subscriber<i32, ()>| {
///   s.next(1);
///   s.complete();
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn create<Item, Err, F, T>(producer: F) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  F: Fn(Subscriber<Item, Err>) -> T + 'static,
  T: Into<Teardown>,
{
  Observable::new(producer)
}

/// Like [`create`], for producers that can fail while setting up. An `Err`
/// is delivered to the subscriber as an error notification.
pub fn try_create<Item, Err, F, T>(producer: F) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  F: Fn(&Subscriber<Item, Err>) -> Result<T, Err> + 'static,
  T: Into<Teardown>,
{
  Observable::new(move |s: Subscriber<Item, Err>| match producer(&s) {
    Ok(teardown) => teardown.into(),
    Err(err) => {
      s.error(err);
      Teardown::Empty
    }
  })
}
