//! Shape and content checks for a parsed model response.
//!
//! Rules are checked in a fixed order and the first violation is reported:
//!
//! 1. `main` and `sub` present, `sub` is an array
//! 2. `main.emoji` and `main.reason` are non-empty strings
//! 3. `sub` has at least two entries, each with non-empty `emoji`/`reason`
//! 4. every emoji field contains a Unicode emoji codepoint
//!
//! Duplicate emoji across main/sub are allowed here.

use std::ops::RangeInclusive;

use serde_json::Value;

use crate::error::AppError;
use crate::models::{Suggestion, SuggestionSet};

const EMOJI_RANGES: &[RangeInclusive<u32>] = &[
    0x1F600..=0x1F64F, // emoticons
    0x1F300..=0x1F5FF, // misc symbols and pictographs
    0x1F680..=0x1F6FF, // transport and map
    0x1F1E0..=0x1F1FF, // regional indicators (flags)
    0x1F900..=0x1F9FF, // supplemental symbols and pictographs
    0x2600..=0x26FF,   // misc symbols
    0x2700..=0x27BF,   // dingbats
];

/// Returns true if `s` contains at least one codepoint from the emoji ranges.
pub fn contains_emoji(s: &str) -> bool {
    s.chars()
        .any(|c| EMOJI_RANGES.iter().any(|r| r.contains(&(c as u32))))
}

/// Validate a parsed candidate and convert it into a [`SuggestionSet`].
///
/// Only the first two `sub` entries are kept.
pub fn validate(candidate: &Value) -> Result<SuggestionSet, AppError> {
    let main = candidate.get("main").filter(|v| !v.is_null());
    let sub = candidate.get("sub").and_then(Value::as_array);
    let (Some(main), Some(sub)) = (main, sub) else {
        return Err(AppError::ValidationError(
            "response must contain `main` and a `sub` array".into(),
        ));
    };

    let main = suggestion_from(main)
        .ok_or_else(|| AppError::ValidationError("`main` needs a non-empty emoji and reason".into()))?;

    if sub.len() < 2 {
        return Err(AppError::ValidationError(format!(
            "`sub` needs at least 2 suggestions, got {}",
            sub.len()
        )));
    }
    let sub = sub
        .iter()
        .map(suggestion_from)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            AppError::ValidationError("every `sub` entry needs a non-empty emoji and reason".into())
        })?;

    if !contains_emoji(&main.emoji) {
        return Err(AppError::ValidationError(format!(
            "main emoji {:?} is not a Unicode emoji",
            main.emoji
        )));
    }
    if let Some(bad) = sub.iter().find(|s| !contains_emoji(&s.emoji)) {
        return Err(AppError::ValidationError(format!(
            "sub emoji {:?} is not a Unicode emoji",
            bad.emoji
        )));
    }

    let mut sub = sub;
    sub.truncate(2);
    Ok(SuggestionSet {
        main,
        sub,
        is_fallback: None,
        error_message: None,
    })
}

fn suggestion_from(value: &Value) -> Option<Suggestion> {
    let emoji = non_empty_str(value.get("emoji"))?;
    let reason = non_empty_str(value.get("reason"))?;
    Some(Suggestion::new(emoji, reason))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
