use crate::{observable::Observable, subscriber::Subscriber};

/// Creates an observable producing a single value.
///
/// Completes immediately after emitting the value given. Never emits an error.
///
/// # Arguments
///
/// * `v` - A value to emit.
pub fn of<Item, Err>(v: Item) -> Observable<Item, Err>
where
  Item: Clone + 'static,
  Err: 'static,
{
  Observable::new(move |s: Subscriber<Item, Err>| {
    s.next(v.clone());
    s.complete();
  })
}

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Stops early if the
/// subscriber is closed in the middle of the loop.
pub fn from_iter<Iter, Err>(iter: Iter) -> Observable<Iter::Item, Err>
where
  Iter: IntoIterator + Clone + 'static,
  Iter::Item: 'static,
  Err: 'static,
{
  Observable::new(move |s: Subscriber<Iter::Item, Err>| {
    for v in iter.clone() {
      if s.is_stopped() {
        return;
      }
      s.next(v);
    }
    s.complete();
  })
}

/// Creates an observable that completes without emitting.
pub fn empty<Item: 'static, Err: 'static>() -> Observable<Item, Err> {
  Observable::new(|s: Subscriber<Item, Err>| s.complete())
}

/// Creates an observable that never emits anything.
pub fn never<Item: 'static, Err: 'static>() -> Observable<Item, Err> {
  Observable::new(|_: Subscriber<Item, Err>| {})
}

/// Creates an observable that errors with `err` as soon as it is subscribed.
pub fn throw_err<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: 'static,
  Err: Clone + 'static,
{
  Observable::new(move |s: Subscriber<Item, Err>| s.error(err.clone()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::SubscriptionLike;
  use std::{
    cell::{Cell, RefCell},
    rc::Rc,
  };

  #[test]
  fn of_emits_then_completes() {
    let (value, completed) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(false)));
    let (v, c) = (value.clone(), completed.clone());
    of::<_, ()>(100).subscribe_complete(move |x| v.set(x), move || c.set(true));
    assert_eq!(value.get(), 100);
    assert!(completed.get());
  }

  #[test]
  fn from_iter_stops_when_closed_mid_loop() {
    let seen = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<crate::subscription::Subscription>>> = Rc::new(RefCell::new(None));
    let subscriber = {
      let (seen, slot) = (seen.clone(), slot.clone());
      Subscriber::new(crate::observer::FnObserver::next_only(move |v: i32| {
        seen.borrow_mut().push(v);
        if v == 2 {
          if let Some(s) = slot.borrow().as_ref() {
            s.unsubscribe();
          }
        }
      }))
    };
    *slot.borrow_mut() = Some(subscriber.subscription().clone());
    from_iter::<_, ()>(1..100).subscribe_with(subscriber);
    assert_eq!(*seen.borrow(), vec![1, 2]);
  }

  #[test]
  fn empty_never_throw() {
    let completed = Rc::new(Cell::new(false));
    let c = completed.clone();
    empty::<i32, ()>().subscribe_complete(|_| {}, move || c.set(true));
    assert!(completed.get());

    let subscription = never::<i32, ()>().subscribe(|_| {});
    assert!(!subscription.is_closed());

    let error = Rc::new(RefCell::new(None));
    let e = error.clone();
    throw_err::<i32, _>("oops").subscribe_err(|_| {}, move |err| *e.borrow_mut() = Some(err));
    assert_eq!(*error.borrow(), Some("oops"));
  }
}
