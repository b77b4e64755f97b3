use super::OperatorSubscriber;
use crate::{observable::Observable, subscriber::Subscriber};
use std::rc::Rc;

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emit only the values that satisfy `predicate`.
  pub fn filter<F>(self, predicate: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) -> bool + 'static,
  {
    let predicate = Rc::new(predicate);
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      let predicate = predicate.clone();
      OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, v| {
        if predicate(&v) {
          d.next(v);
        }
      })
      .subscribe_to(source);
    })
  }
}
