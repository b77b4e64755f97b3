//! TakeUntil operator implementation
//!
//! Emits the values of the source until a second observable, the notifier,
//! emits a value.

use super::OperatorSubscriber;
use crate::{
  observable::{IntoObservable, Observable},
  subscriber::Subscriber,
};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Mirror the source until `notifier` emits, then complete.
  ///
  /// The notifier is subscribed first, so a notifier that fires during
  /// subscription prevents the source from ever being subscribed. A notifier
  /// completing without a value changes nothing; a notifier error is
  /// forwarded.
  pub fn take_until<N, O>(self, notifier: O) -> Observable<Item, Err>
  where
    N: 'static,
    O: IntoObservable<N, Err>,
  {
    let notifier = notifier.into_observable();
    self.operate(move |source, d: &Subscriber<Item, Err>| {
      OperatorSubscriber::new(d, |d: &Subscriber<Item, Err>, _: N| d.complete())
        .on_complete(|_| {})
        .subscribe_to(&notifier);
      if !d.is_stopped() {
        OperatorSubscriber::forward(d).subscribe_to(source);
      }
    })
  }
}
