//! WindowCount operator implementation
//!
//! Splits the source into windows of at most `size` values, opening a new
//! window every `start_every` values. Each window is itself an observable.

use super::OperatorSubscriber;
use crate::{observable::Observable, rc::MutRc, subject::Subject, subscriber::Subscriber};
use std::collections::VecDeque;

struct Windows<Item, Err> {
  open: VecDeque<Subject<Item, Err>>,
  count: usize,
}

impl<Item, Err> Windows<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn open(&mut self) -> Observable<Item, Err> {
    let window = Subject::new();
    let observable = window.observable();
    self.open.push_back(window);
    observable
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  /// Emit windows of at most `size` values, starting a new one every
  /// `start_every` values. `None` starts a window whenever the previous one
  /// is full.
  ///
  /// The first window opens at subscription. When `start_every` is smaller
  /// than `size` the windows overlap, and each value goes to every window
  /// open at that moment. On completion every open window completes, even
  /// an empty one; an error is forwarded to every open window.
  pub fn window_count(
    self, size: usize, start_every: Option<usize>,
  ) -> Observable<Observable<Item, Err>, Err> {
    let start_every = start_every.filter(|n| *n > 0).unwrap_or(size).max(1);
    self.operate(move |source, d: &Subscriber<Observable<Item, Err>, Err>| {
      let windows = MutRc::own(Windows { open: VecDeque::new(), count: 0 });
      let first = windows.rc_deref_mut().open();
      d.next(first);

      let on_next = {
        let windows = windows.clone();
        move |d: &Subscriber<Observable<Item, Err>, Err>, v: Item| {
          let (snapshot, closing, opened) = {
            let mut state = windows.rc_deref_mut();
            let snapshot: Vec<_> = state.open.iter().cloned().collect();
            let filled = (state.count + 1).checked_sub(size);
            let closing = match filled {
              Some(c) if c % start_every == 0 => state.open.pop_front(),
              _ => None,
            };
            state.count += 1;
            let opened = (state.count % start_every == 0).then(|| state.open());
            (snapshot, closing, opened)
          };
          for window in snapshot {
            // windows are only reachable through their observable, so they
            // are never disposed
            let _ = window.try_next(v.clone());
          }
          if let Some(window) = closing {
            let _ = window.try_complete();
          }
          if let Some(window) = opened {
            d.next(window);
          }
        }
      };
      let on_error = {
        let windows = windows.clone();
        move |d: &Subscriber<Observable<Item, Err>, Err>, err: Err| {
          let open = std::mem::take(&mut windows.rc_deref_mut().open);
          for window in open {
            let _ = window.try_error(err.clone());
          }
          d.error(err);
        }
      };
      let on_complete = {
        let windows = windows.clone();
        move |d: &Subscriber<Observable<Item, Err>, Err>| {
          let open = std::mem::take(&mut windows.rc_deref_mut().open);
          for window in open {
            let _ = window.try_complete();
          }
          d.complete();
        }
      };
      OperatorSubscriber::new(d, on_next)
        .on_error(on_error)
        .on_complete(on_complete)
        .on_finalize(move || windows.rc_deref_mut().open.clear())
        .subscribe_to(source);
    })
  }
}
