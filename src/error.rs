//! Error types shared across the engine.
//!
//! Stream errors travel through the `Err` type parameter of an observable and
//! are never wrapped. The types here cover protocol violations (using a
//! disposed subject), teardown failures and malformed marble strings.

use thiserror::Error;

/// Raised when a subject is used after `unsubscribe()` has disposed it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("object unsubscribed")]
pub struct ObjectUnsubscribedError;

/// Why the current value of a `BehaviorSubject` could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError<Err> {
  /// The subject terminated with this error.
  #[error("behavior subject has errored")]
  Errored(Err),
  #[error(transparent)]
  Unsubscribed(#[from] ObjectUnsubscribedError),
}

/// A single fallible finalizer failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("teardown failed: {0}")]
pub struct TeardownError(pub String);

impl From<String> for TeardownError {
  fn from(msg: String) -> Self { TeardownError(msg) }
}

impl From<&str> for TeardownError {
  fn from(msg: &str) -> Self { TeardownError(msg.to_string()) }
}

/// Every finalizer failure collected while closing one subscription,
/// including failures of nested child subscriptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} error(s) occurred during unsubscription: {}", .errors.len(), join(.errors))]
pub struct UnsubscriptionError {
  pub errors: Vec<TeardownError>,
}

fn join(errors: &[TeardownError]) -> String {
  errors
    .iter()
    .map(|e| e.0.as_str())
    .collect::<Vec<_>>()
    .join("; ")
}

/// Malformed marble diagrams.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarbleError {
  #[error("nested groups are not supported (index {0})")]
  NestedGroup(usize),
  #[error("group opened at index {0} is never closed")]
  UnclosedGroup(usize),
  #[error("unexpected ')' at index {0}")]
  UnmatchedGroupEnd(usize),
  #[error("found a second subscription point '^' at index {0}")]
  DuplicateSubscription(usize),
  #[error("found a second unsubscription point '!' at index {0}")]
  DuplicateUnsubscription(usize),
  #[error("'{ch}' at index {index} is not allowed in {context} marbles")]
  NotAllowed { ch: char, index: usize, context: &'static str },
  #[error("no value is mapped to '{0}'")]
  UnknownValue(char),
}

/// Surfaces an error that reached a subscriber without an error handler.
///
/// The error cannot be formatted without extra bounds, so the report names
/// its type instead.
pub(crate) fn unhandled_error<Err>(_err: Err) -> ! {
  let error_type = std::any::type_name::<Err>();
  tracing::error!(error_type, "error notification reached an observer without an error handler");
  panic!("unhandled error of type `{error_type}`: subscribe with an error handler to recover")
}

/// Re-raises the aggregated failures of a teardown that has no caller to
/// return them to.
pub(crate) fn raise_unsubscription_error(err: UnsubscriptionError) -> ! {
  tracing::warn!(count = err.errors.len(), "teardown finished with errors");
  panic!("{err}")
}
