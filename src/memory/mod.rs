//! Conversation history handling.
//!
//! The service is stateless: every request carries the whole conversation
//! so far as a JSON array of `[question, answer]` pairs. This module turns
//! that untrusted value into typed [`Turn`]s and bounds how much of it is
//! forwarded to the generator.

use crate::types::{AppError, Result, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of most recent turns forwarded to the generator.
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 20;

/// What to do with history entries that are not `[question, answer]` pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicy {
    /// Silently drop malformed entries.
    #[default]
    Lenient,
    /// Reject the whole request on the first malformed entry.
    Strict,
}

/// Convert a raw `history` value into turns, preserving order.
///
/// An absent or `null` history is empty. An entry is well-formed when it is
/// an array whose first two elements are strings; anything after the
/// second element is ignored.
pub fn normalize(raw: Option<&Value>, policy: HistoryPolicy) -> Result<Vec<Turn>> {
    let entries = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return match policy {
                HistoryPolicy::Lenient => {
                    tracing::debug!(kind = value_kind(other), "Ignoring non-array history");
                    Ok(Vec::new())
                }
                HistoryPolicy::Strict => Err(AppError::InvalidInput(format!(
                    "history must be an array of [question, answer] pairs, got {}",
                    value_kind(other)
                ))),
            };
        }
    };

    let mut turns = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match as_turn(entry) {
            Some(turn) => turns.push(turn),
            None if policy == HistoryPolicy::Strict => {
                return Err(AppError::InvalidInput(format!(
                    "history entry {} is not a [question, answer] pair",
                    position
                )));
            }
            None => {
                tracing::debug!(position, "Dropping malformed history entry");
            }
        }
    }

    Ok(turns)
}

fn as_turn(entry: &Value) -> Option<Turn> {
    match entry.as_array()?.as_slice() {
        [Value::String(question), Value::String(answer), ..] => {
            Some(Turn::new(question.clone(), answer.clone()))
        }
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Keep only the `max_turns` most recent turns. `0` keeps everything.
pub fn truncate_history(turns: &[Turn], max_turns: usize) -> &[Turn] {
    if max_turns == 0 || turns.len() <= max_turns {
        turns
    } else {
        &turns[turns.len() - max_turns..]
    }
}
