use std::{
  cell::{Ref, RefCell, RefMut},
  fmt::{Debug, Formatter},
  rc::Rc,
};

/// Shared mutable state for operators whose callbacks outlive a single
/// borrow, like the pending value of `audit` or the open windows of
/// `window_count`.
#[derive(Default)]
pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }

  #[inline]
  pub fn rc_deref(&self) -> Ref<'_, T> { self.0.borrow() }

  #[inline]
  pub fn rc_deref_mut(&self) -> RefMut<'_, T> { self.0.borrow_mut() }

  /// Replace the inner value, returning the old one. The borrow ends before
  /// the caller touches the result, so dropping or notifying with it is safe.
  #[inline]
  pub fn replace(&self, t: T) -> T { self.0.replace(t) }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl<T: Default> MutRc<T> {
  #[inline]
  pub fn take(&self) -> T { self.0.take() }
}

impl<T> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Debug> Debug for MutRc<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("MutRc").field(&*self.0.borrow()).finish()
  }
}
