//! Map operator implementation
//!
//! `map` applies a function to every value. `try_map` does the same with a
//! fallible function, turning an `Err` into an error notification.

use super::OperatorSubscriber;
use crate::{observable::Observable, subscriber::Subscriber};
use std::rc::Rc;

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Creates a new stream which calls a closure on each element and uses its
  /// return as the value.
  pub fn map<Out, F>(self, f: F) -> Observable<Out, Err>
  where
    Out: 'static,
    F: Fn(Item) -> Out + 'static,
  {
    let f = Rc::new(f);
    self.operate(move |source, d: &Subscriber<Out, Err>| {
      let f = f.clone();
      OperatorSubscriber::new(d, move |d: &Subscriber<Out, Err>, v| d.next(f(v)))
        .subscribe_to(source);
    })
  }

  /// Like [`map`](Observable::map), but a failing call errors the stream and
  /// stops it.
  pub fn try_map<Out, F>(self, f: F) -> Observable<Out, Err>
  where
    Out: 'static,
    F: Fn(Item) -> Result<Out, Err> + 'static,
  {
    let f = Rc::new(f);
    self.operate(move |source, d: &Subscriber<Out, Err>| {
      let f = f.clone();
      OperatorSubscriber::new(d, move |d: &Subscriber<Out, Err>, v| match f(v) {
        Ok(v) => d.next(v),
        Err(err) => d.error(err),
      })
      .subscribe_to(source);
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn primitive_type() {
    let i = Rc::new(RefCell::new(0));
    let c = i.clone();
    observable::from_iter::<_, ()>(100..101)
      .map(|v| v * 2)
      .subscribe(move |v| *c.borrow_mut() += v);
    assert_eq!(*i.borrow(), 200);
  }

  #[test]
  fn map_types_mixed() {
    let i = Rc::new(RefCell::new(0));
    let c = i.clone();
    observable::from_iter::<_, ()>(vec!['a', 'b', 'c'])
      .map(|_v| 1)
      .subscribe(move |v| *c.borrow_mut() += v);
    assert_eq!(*i.borrow(), 3);
  }

  #[test]
  fn try_map_failure_becomes_error() {
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    observable::from_iter::<_, &str>(vec![1, 2, 0, 4])
      .try_map(|v| if v == 0 { Err("zero") } else { Ok(10 / v) })
      .subscribe_all(
        move |v| l1.borrow_mut().push(format!("{v}")),
        move |e| l2.borrow_mut().push(format!("error {e}")),
        move || l3.borrow_mut().push("complete".to_string()),
      );
    assert_eq!(*log.borrow(), vec!["10", "5", "error zero"]);
  }

  #[test]
  fn try_map_error_stops_the_source() {
    let source = Subject::<i32, &str>::new();
    let errors = Rc::new(RefCell::new(0));
    let e = errors.clone();
    source
      .observable()
      .try_map(|v| if v < 0 { Err("negative") } else { Ok(v) })
      .subscribe_err(|_| {}, move |_| *e.borrow_mut() += 1);
    source.try_next(-1).unwrap();
    assert_eq!(source.subscribed_size(), 0);
    assert_eq!(*errors.borrow(), 1);
  }
}
