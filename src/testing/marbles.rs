//! Marble notation.
//!
//! One character is one frame. `-` is an empty frame, `|` completes, `#`
//! errors, `^` marks the subscription point and `(..)` puts everything
//! inside on the frame where the group opens. Spaces are ignored. Every
//! other character is a value.

use crate::{error::MarbleError, notification::Notification};
use std::fmt::{Display, Write};

/// A notification observed, or expected, at a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage<Item, Err> {
  pub frame: usize,
  pub notification: Notification<Item, Err>,
}

/// When a subscription started and, if it did, when it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribed_frame: usize,
  pub unsubscribed_frame: Option<usize>,
}

/// Parse a marble diagram into timed notifications.
///
/// Frames are counted from the `^` marker when there is one; whatever comes
/// before it is dropped. `values` maps a character to its value, and `#`
/// produces `error`.
pub fn parse_marbles<Item, Err, V>(
  marbles: &str, values: V, error: Err,
) -> Result<Vec<TestMessage<Item, Err>>, MarbleError>
where
  Err: Clone,
  V: Fn(char) -> Option<Item>,
{
  let mut messages = vec![];
  let mut frame = 0;
  let mut group: Option<(usize, usize)> = None;
  let mut subscribed: Option<usize> = None;

  for (index, c) in marbles.chars().enumerate() {
    let at = group.map_or(frame, |(start, _)| start);
    let notification = match c {
      ' ' => continue,
      '-' => None,
      '(' => {
        if group.is_some() {
          return Err(MarbleError::NestedGroup(index));
        }
        group = Some((frame, index));
        None
      }
      ')' => {
        if group.take().is_none() {
          return Err(MarbleError::UnmatchedGroupEnd(index));
        }
        None
      }
      '^' => {
        if subscribed.is_some() {
          return Err(MarbleError::DuplicateSubscription(index));
        }
        subscribed = Some(at);
        None
      }
      '!' => return Err(MarbleError::NotAllowed { ch: c, index, context: "source" }),
      '|' => Some(Notification::Complete),
      '#' => Some(Notification::Error(error.clone())),
      c => Some(Notification::Next(values(c).ok_or(MarbleError::UnknownValue(c))?)),
    };
    if let Some(notification) = notification {
      messages.push(TestMessage { frame: at, notification });
    }
    frame += 1;
  }
  if let Some((_, index)) = group {
    return Err(MarbleError::UnclosedGroup(index));
  }

  let offset = subscribed.unwrap_or(0);
  Ok(
    messages
      .into_iter()
      .filter(|m| m.frame >= offset)
      .map(|m| TestMessage { frame: m.frame - offset, ..m })
      .collect(),
  )
}

/// Parse a subscription diagram such as `"--^---!"`.
///
/// Returns `None` for a diagram without `^`, which describes no
/// subscription at all. `!` does not take up a frame.
pub fn parse_marbles_as_subscriptions(
  marbles: &str,
) -> Result<Option<SubscriptionLog>, MarbleError> {
  let mut frame = 0;
  let mut group: Option<(usize, usize)> = None;
  let mut subscribed = None;
  let mut unsubscribed = None;

  for (index, c) in marbles.chars().enumerate() {
    let at = group.map_or(frame, |(start, _)| start);
    match c {
      ' ' => continue,
      '-' => {}
      '(' => {
        if group.is_some() {
          return Err(MarbleError::NestedGroup(index));
        }
        group = Some((frame, index));
      }
      ')' => {
        if group.take().is_none() {
          return Err(MarbleError::UnmatchedGroupEnd(index));
        }
      }
      '^' => {
        if subscribed.is_some() {
          return Err(MarbleError::DuplicateSubscription(index));
        }
        subscribed = Some(at);
      }
      '!' => {
        if unsubscribed.is_some() {
          return Err(MarbleError::DuplicateUnsubscription(index));
        }
        unsubscribed = Some(at);
        continue;
      }
      c => return Err(MarbleError::NotAllowed { ch: c, index, context: "subscription" }),
    }
    frame += 1;
  }
  if let Some((_, index)) = group {
    return Err(MarbleError::UnclosedGroup(index));
  }

  match (subscribed, unsubscribed) {
    (None, None) => Ok(None),
    (None, Some(_)) => Err(MarbleError::NotAllowed {
      ch: '!',
      index: marbles.find('!').unwrap_or_default(),
      context: "subscription without '^' in",
    }),
    (Some(subscribed_frame), unsubscribed_frame) => {
      Ok(Some(SubscriptionLog { subscribed_frame, unsubscribed_frame }))
    }
  }
}

/// Render timed notifications back into marbles. Notifications sharing a
/// frame are grouped.
pub fn to_marbles<Item: Display, Err>(messages: &[TestMessage<Item, Err>]) -> String {
  let mut out = String::new();
  let mut cursor = 0;
  let mut i = 0;
  while i < messages.len() {
    let frame = messages[i].frame;
    let end = messages[i..]
      .iter()
      .position(|m| m.frame != frame)
      .map_or(messages.len(), |n| i + n);

    if frame > cursor {
      out.extend(std::iter::repeat('-').take(frame - cursor));
      cursor = frame;
    }
    let mut symbols = String::new();
    for m in &messages[i..end] {
      match &m.notification {
        Notification::Next(v) => {
          let _ = write!(symbols, "{v}");
        }
        Notification::Error(_) => symbols.push('#'),
        Notification::Complete => symbols.push('|'),
      }
    }
    let text = if end - i > 1 { format!("({symbols})") } else { symbols };
    cursor += text.chars().count();
    out.push_str(&text);
    i = end;
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chars(marbles: &str) -> Result<Vec<TestMessage<char, &'static str>>, MarbleError> {
    parse_marbles(marbles, Some, "error")
  }

  fn next(frame: usize, v: char) -> TestMessage<char, &'static str> {
    TestMessage { frame, notification: Notification::Next(v) }
  }

  #[test]
  fn frames_and_terminals() {
    assert_eq!(
      chars("-a--b|").unwrap(),
      vec![
        next(1, 'a'),
        next(4, 'b'),
        TestMessage { frame: 5, notification: Notification::Complete },
      ]
    );
    assert_eq!(
      chars("--#").unwrap(),
      vec![TestMessage { frame: 2, notification: Notification::Error("error") }]
    );
  }

  #[test]
  fn groups_share_a_frame() {
    assert_eq!(
      chars("-(ab|)-c").unwrap(),
      vec![
        next(1, 'a'),
        next(1, 'b'),
        TestMessage { frame: 1, notification: Notification::Complete },
        next(7, 'c'),
      ]
    );
  }

  #[test]
  fn subscription_point_offsets_frames() {
    assert_eq!(chars("a-^-b").unwrap(), vec![next(2, 'b')]);
  }

  #[test]
  fn spaces_are_ignored() {
    assert_eq!(chars(" -a - b").unwrap(), vec![next(1, 'a'), next(3, 'b')]);
  }

  #[test]
  fn value_table() {
    let messages = parse_marbles("-x|", |c| (c == 'x').then_some(42), ()).unwrap();
    assert_eq!(messages[0].notification, Notification::Next(42));
    assert_eq!(
      parse_marbles("-y|", |c| (c == 'x').then_some(42), ()),
      Err(MarbleError::UnknownValue('y'))
    );
  }

  #[test]
  fn malformed_groups() {
    assert_eq!(chars("((a))"), Err(MarbleError::NestedGroup(1)));
    assert_eq!(chars("-(a"), Err(MarbleError::UnclosedGroup(1)));
    assert_eq!(chars("a)"), Err(MarbleError::UnmatchedGroupEnd(1)));
    assert_eq!(chars("^-^"), Err(MarbleError::DuplicateSubscription(2)));
    assert_eq!(
      chars("-a-!"),
      Err(MarbleError::NotAllowed { ch: '!', index: 3, context: "source" })
    );
  }

  #[test]
  fn subscription_marbles() {
    assert_eq!(
      parse_marbles_as_subscriptions("--^---!").unwrap(),
      Some(SubscriptionLog { subscribed_frame: 2, unsubscribed_frame: Some(6) })
    );
    assert_eq!(
      parse_marbles_as_subscriptions("^").unwrap(),
      Some(SubscriptionLog { subscribed_frame: 0, unsubscribed_frame: None })
    );
    assert_eq!(
      parse_marbles_as_subscriptions("-(^!)").unwrap(),
      Some(SubscriptionLog { subscribed_frame: 1, unsubscribed_frame: Some(1) })
    );
    assert_eq!(parse_marbles_as_subscriptions("---").unwrap(), None);
    assert_eq!(
      parse_marbles_as_subscriptions("^-^"),
      Err(MarbleError::DuplicateSubscription(2))
    );
    assert!(matches!(
      parse_marbles_as_subscriptions("^-a"),
      Err(MarbleError::NotAllowed { ch: 'a', index: 2, .. })
    ));
  }

  #[test]
  fn renders_back() {
    for marbles in ["-a--b|", "-(ab|)", "---#", "a-(bc)-d"] {
      assert_eq!(to_marbles(&chars(marbles).unwrap()), marbles);
    }
  }
}
