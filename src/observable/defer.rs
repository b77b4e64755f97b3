use crate::{
  observable::{IntoObservable, Observable},
  subscriber::Subscriber,
};

/// Creates an observable that calls `factory` on every subscription and
/// subscribes to the observable it returns.
pub fn defer<Item, Err, F, O>(factory: F) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  F: Fn() -> O + 'static,
  O: IntoObservable<Item, Err>,
{
  Observable::new(move |s: Subscriber<Item, Err>| {
    factory().into_observable().subscribe_with(s);
  })
}
