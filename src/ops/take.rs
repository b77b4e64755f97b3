use super::OperatorSubscriber;
use crate::{observable::Observable, subscriber::Subscriber};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emit only the first `count` values, then complete and unsubscribe from
  /// the source.
  pub fn take(self, count: usize) -> Observable<Item, Err> {
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      if count == 0 {
        d.complete();
        return;
      }
      let mut seen = 0;
      OperatorSubscriber::new(d, move |d: &Subscriber<Item, Err>, v| {
        seen += 1;
        if seen <= count {
          d.next(v);
          if seen == count {
            d.complete();
          }
        }
      })
      .subscribe_to(source);
    })
  }
}
