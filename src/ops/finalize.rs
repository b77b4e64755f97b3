use super::OperatorSubscriber;
use crate::{observable::Observable, subscriber::Subscriber, subscription::Teardown};
use std::rc::Rc;

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Call `f` when the subscription ends, whether it completed, errored or
  /// was unsubscribed.
  pub fn finalize<F>(self, f: F) -> Observable<Item, Err>
  where
    F: Fn() + 'static,
  {
    let f = Rc::new(f);
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      OperatorSubscriber::forward(d).subscribe_to(source);
      let f = f.clone();
      d.add(Teardown::from_fn(move || f()));
    })
  }
}
