//! Turns free-form model output into a [`SuggestionSet`].
//!
//! Model output is unreliable text that only nominally contains JSON, so
//! parsing degrades through a cascade of independent stages, first success
//! wins:
//!
//! 1. direct parse of the trimmed text
//! 2. extraction of a fenced ```json block or the largest `{...}` span
//! 3. structural repair (trailing comma, missing closers) of the text from
//!    the first `{` to the end of the output
//! 4. regex scraping of `"emoji"` / `"reason"` fields
//! 5. a fixed "parse failed" set
//!
//! [`parse`] is total: it never fails and always returns one main and two
//! sub suggestions.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{Suggestion, SuggestionSet};

/// Emoji used to fill missing sub suggestions, in order of preference.
pub const PADDING_EMOJIS: [&str; 4] = ["💡", "✨", "🚀", "🎯"];

/// Reason attached to scraped or padded suggestions that had none.
pub const INCOMPLETE_REASON: &str = "APIレスポンスが不完全でした";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fenced json regex")
});

static EMOJI_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']emoji["']\s*:\s*["']([^"']+)["']"#).expect("valid emoji field regex")
});

static REASON_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']reason["']\s*:\s*["']([^"']+)["']"#).expect("valid reason field regex")
});

/// Which stage of the cascade produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Direct,
    Extracted,
    Repaired,
    Scraped,
    Fallback,
}

/// Parse model output into a suggestion set. Never fails.
pub fn parse(raw: &str) -> SuggestionSet {
    parse_with_stage(raw).0
}

/// Like [`parse`], also reporting which stage succeeded.
pub fn parse_with_stage(raw: &str) -> (SuggestionSet, ParseStage) {
    let trimmed = raw.trim();

    if let Some(set) = parse_object(trimmed).and_then(into_suggestion_set) {
        return (set, ParseStage::Direct);
    }

    let extracted = extract_json(trimmed);
    if let Some(set) = extracted.and_then(parse_object).and_then(into_suggestion_set) {
        tracing::debug!("Parsed suggestions from extracted JSON span");
        return (set, ParseStage::Extracted);
    }

    if let Some(value) = repair(trimmed) {
        let recovered = suggestion_count(&value);
        if let Some(set) = into_suggestion_set(value) {
            // a repair that closed structures too early drops trailing suggestions
            return match scrape_fields(raw) {
                Some(scraped) if emoji_fields(raw).len().min(3) > recovered => {
                    tracing::debug!("Scrape recovered more suggestions than repair");
                    (scraped, ParseStage::Scraped)
                }
                _ => {
                    tracing::debug!("Parsed suggestions after structural repair");
                    (set, ParseStage::Repaired)
                }
            };
        }
    }

    if let Some(set) = scrape_fields(raw) {
        tracing::debug!("Scraped suggestions from malformed output");
        return (set, ParseStage::Scraped);
    }

    tracing::warn!("No suggestions recoverable from model output");
    (parse_failed_set(), ParseStage::Fallback)
}

/// Recover the first JSON object from stages 1-3 without checking its shape.
///
/// Used when the caller wants to run the validator on the raw candidate.
pub fn parse_value(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }
    if let Some(value) = extract_json(trimmed).and_then(parse_object) {
        return Some(value);
    }
    repair(trimmed)
}

/// Parse `text` as JSON, accepting only objects.
pub fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Locate a JSON object inside surrounding prose.
///
/// Prefers a fenced code block; otherwise returns the span from the first
/// `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return Some(inner.as_str().trim());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Strip one trailing comma, then append the closers of every structure
/// still open at the end of `text`, innermost first.
///
/// Brackets inside string literals are ignored. Text that ends inside a
/// string is left unclosed.
pub fn close_structure(text: &str) -> String {
    let mut repaired = strip_trailing_comma(text);

    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in repaired.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' if open.last() == Some(&c) => {
                open.pop();
            }
            _ => {}
        }
    }

    repaired.extend(open.iter().rev());
    repaired
}

/// Strip one trailing comma, then append the `]` and `}` needed to balance
/// the raw bracket and brace counts.
///
/// Counting is purely by character occurrence, so closers inside string
/// values are counted too.
pub fn repair_structure(text: &str) -> String {
    let mut repaired = strip_trailing_comma(text);

    let count = |c: char| repaired.chars().filter(|&x| x == c).count();
    let missing_brackets = count('[').saturating_sub(count(']'));
    let missing_braces = count('{').saturating_sub(count('}'));

    repaired.push_str(&"]".repeat(missing_brackets));
    repaired.push_str(&"}".repeat(missing_braces));
    repaired
}

/// Collect `emoji`/`reason` fields in document order and assemble a set.
///
/// Returns `None` when no emoji field is present at all.
pub fn scrape_fields(text: &str) -> Option<SuggestionSet> {
    let emojis = emoji_fields(text);
    if emojis.is_empty() {
        return None;
    }
    let reasons: Vec<&str> = REASON_FIELD
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let pair = |i: usize| {
        Suggestion::new(
            emojis[i],
            reasons.get(i).copied().unwrap_or(INCOMPLETE_REASON),
        )
    };

    let mut set = SuggestionSet {
        main: pair(0),
        sub: (1..emojis.len().min(3)).map(pair).collect(),
        is_fallback: None,
        error_message: None,
    };
    pad_sub(&mut set);
    Some(set)
}

/// The terminal result when nothing could be recovered.
pub fn parse_failed_set() -> SuggestionSet {
    SuggestionSet::new(
        Suggestion::new("📝", "parse failed"),
        Suggestion::new("💡", INCOMPLETE_REASON),
        Suggestion::new("✨", INCOMPLETE_REASON),
    )
}

/// Fill `sub` up to two entries from [`PADDING_EMOJIS`], skipping emoji
/// already in the set, and drop anything past the second entry.
pub fn pad_sub(set: &mut SuggestionSet) {
    set.sub.truncate(2);
    while set.sub.len() < 2 {
        let next = PADDING_EMOJIS
            .iter()
            .find(|e| !set.emojis().any(|used| used == **e))
            .copied()
            .unwrap_or(PADDING_EMOJIS[set.sub.len()]);
        set.sub.push(Suggestion::new(next, INCOMPLETE_REASON));
    }
}

fn emoji_fields(text: &str) -> Vec<&str> {
    EMOJI_FIELD
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn strip_trailing_comma(text: &str) -> String {
    let trimmed = text.trim();
    trimmed.strip_suffix(',').unwrap_or(trimmed).to_string()
}

/// Stage 3: close what the output left open, trying nesting order first and
/// raw counts second.
fn repair(trimmed: &str) -> Option<Value> {
    let candidate = repair_candidate(trimmed);
    parse_object(&close_structure(candidate))
        .or_else(|| parse_object(&repair_structure(candidate)))
}

/// A complete fenced block, otherwise everything from the first `{` on.
/// Truncated output has lost its closers, so the last `}` is not its end.
fn repair_candidate(trimmed: &str) -> &str {
    if let Some(inner) = FENCED_JSON.captures(trimmed).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    trimmed
        .find('{')
        .map(|start| &trimmed[start..])
        .unwrap_or(trimmed)
}

/// Suggestions actually present in a parsed object, before padding.
fn suggestion_count(value: &Value) -> usize {
    let main = usize::from(value.get("main").is_some_and(Value::is_object));
    let sub = value
        .get("sub")
        .and_then(Value::as_array)
        .map_or(0, |s| s.len().min(2));
    main + sub
}

fn into_suggestion_set(value: Value) -> Option<SuggestionSet> {
    let mut set: SuggestionSet = serde_json::from_value(value).ok()?;
    set.is_fallback = None;
    set.error_message = None;
    pad_sub(&mut set);
    Some(set)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const WELL_FORMED: &str = r#"{"main":{"emoji":"🔦","reason":"照らす"},"sub":[{"emoji":"🌋","reason":"熱い"},{"emoji":"🦉","reason":"賢い"}]}"#;

    fn expected() -> SuggestionSet {
        SuggestionSet::new(
            Suggestion::new("🔦", "照らす"),
            Suggestion::new("🌋", "熱い"),
            Suggestion::new("🦉", "賢い"),
        )
    }

    fn assert_shape(set: &SuggestionSet) {
        assert!(!set.main.emoji.is_empty());
        assert_eq!(set.sub.len(), 2);
        assert!(set.sub.iter().all(|s| !s.reason.is_empty()));
    }

    #[test]
    fn well_formed_output_round_trips() {
        let (set, stage) = parse_with_stage(&format!("\n  {WELL_FORMED}  \n"));
        assert_eq!(set, expected());
        assert_eq!(stage, ParseStage::Direct);
    }

    #[test]
    fn fenced_block_is_extracted() {
        let raw = format!("こちらが提案です:\n```json\n{WELL_FORMED}\n```\n以上です。");
        let (set, stage) = parse_with_stage(&raw);
        assert_eq!(set, expected());
        assert_eq!(stage, ParseStage::Extracted);
    }

    #[test]
    fn braced_span_is_extracted_from_prose() {
        let raw = format!("Sure! {WELL_FORMED} Hope that helps.");
        assert_eq!(extract_json(&raw), Some(WELL_FORMED));
        assert_eq!(parse(&raw), expected());
    }

    #[test]
    fn missing_trailing_closers_are_repaired() {
        // drop "}", "]}" and "}]}" in turn
        for cut in 1..=3 {
            let truncated = &WELL_FORMED[..WELL_FORMED.len() - cut];
            let (set, stage) = parse_with_stage(truncated);
            assert_eq!(set, expected(), "cut {cut}");
            assert_eq!(stage, ParseStage::Repaired, "cut {cut}");
            assert_eq!(parse_value(truncated).map(|v| suggestion_count(&v)), Some(3));
        }
    }

    #[test]
    fn truncated_output_after_prose_is_repaired() {
        let raw = format!("提案です: {}", &WELL_FORMED[..WELL_FORMED.len() - 3]);
        assert_eq!(parse(&raw), expected());
    }

    #[test]
    fn closing_ignores_brackets_inside_strings() {
        let raw = r#"{"main":{"emoji":"🔥","reason":"配列 [a, {b"},"sub":[{"emoji":"🌋","reason":"\"}\""}"#;
        assert_eq!(
            close_structure(raw),
            format!("{raw}]}}")
        );
    }

    #[test]
    fn scrape_wins_when_repair_recovers_fewer_suggestions() {
        let raw = r#"{"main":{"emoji":"🔥","reason":"a"},"sub":[{"emoji":"🌋","reason":"b"}],"alt":{"emoji":"🦉","reason":"c"}"#;
        let (set, stage) = parse_with_stage(raw);
        assert_eq!(stage, ParseStage::Scraped);
        assert_eq!(set.sub[1], Suggestion::new("🦉", "c"));
    }

    #[test]
    fn repair_strips_single_trailing_comma() {
        let raw = r#"{"main":{"emoji":"🔥","reason":"a"},"sub":[{"emoji":"🌋","reason":"b"},{"emoji":"🦉","reason":"c"},"#;
        let repaired = repair_structure(raw);
        assert!(repaired.ends_with("}]}"), "{repaired}");
        assert!(parse_object(&repaired).is_some());
    }

    #[test]
    fn repair_appends_brackets_before_braces() {
        assert_eq!(repair_structure(r#"{"a":[1,2"#), r#"{"a":[1,2]}"#);
        assert_eq!(repair_structure("{}"), "{}");
    }

    #[test]
    fn scraping_recovers_fields_from_broken_json() {
        let raw = r#"{"main": {"emoji": "🔥", "reason": "熱量" "sub": [{"emoji": "🌋" "reason": "噴火"}"#;
        let (set, stage) = parse_with_stage(raw);
        assert_eq!(stage, ParseStage::Scraped);
        assert_eq!(set.main, Suggestion::new("🔥", "熱量"));
        assert_eq!(set.sub[0], Suggestion::new("🌋", "噴火"));
        // padded from the rotation
        assert_eq!(set.sub[1].emoji, "💡");
        assert_eq!(set.sub[1].reason, INCOMPLETE_REASON);
    }

    #[test]
    fn scraping_pads_missing_reasons() {
        let set = scrape_fields(r#"'emoji': '🔥' , "emoji": "🌋""#).unwrap();
        assert_eq!(set.main.reason, INCOMPLETE_REASON);
        assert_eq!(set.sub[0].emoji, "🌋");
    }

    #[test]
    fn padding_skips_emoji_already_used() {
        let set = scrape_fields(r#""emoji": "💡", "reason": "idea""#).unwrap();
        assert_eq!(set.main.emoji, "💡");
        assert_eq!(set.sub[0].emoji, "✨");
        assert_eq!(set.sub[1].emoji, "🚀");
    }

    #[test]
    fn scraping_without_emoji_returns_none() {
        assert!(scrape_fields(r#"{"reason": "only a reason"}"#).is_none());
    }

    #[test]
    fn arbitrary_text_yields_parse_failed_set() {
        for raw in ["", "   ", "I cannot help with that.", "{{{{", "]]]}}}", "{\"main\": 3}"] {
            let (set, stage) = parse_with_stage(raw);
            assert_eq!(stage, ParseStage::Fallback, "{raw:?}");
            assert_eq!(set, parse_failed_set());
            assert_shape(&set);
        }
    }

    #[test]
    fn short_sub_list_is_padded_and_long_list_truncated() {
        let short = r#"{"main":{"emoji":"🔥","reason":"a"},"sub":[]}"#;
        let set = parse(short);
        assert_shape(&set);
        assert_eq!(set.sub[0].emoji, "💡");
        assert_eq!(set.sub[1].emoji, "✨");

        let long = r#"{"main":{"emoji":"🔥","reason":"a"},"sub":[
            {"emoji":"1️⃣","reason":"b"},{"emoji":"🌋","reason":"c"},{"emoji":"🦉","reason":"d"}]}"#;
        assert_eq!(parse(long).sub.len(), 2);
    }

    #[test]
    fn model_supplied_fallback_flags_are_dropped() {
        let raw = r#"{"main":{"emoji":"🔥","reason":"a"},"sub":[{"emoji":"🌋","reason":"b"},{"emoji":"🦉","reason":"c"}],"isFallback":true,"errorMessage":"x"}"#;
        let set = parse(raw);
        assert!(!set.is_fallback());
        assert!(set.error_message.is_none());
    }

    #[test]
    fn parse_value_returns_unvalidated_object() {
        let value = parse_value("```json\n{\"main\": \"abc\"}\n```").unwrap();
        assert_eq!(value["main"], "abc");
        assert!(parse_value("no json here").is_none());
    }

    const EMOJI: [&str; 8] = ["🔦", "🌋", "🦉", "🔥", "🦀", "🚀", "☕", "✅"];

    fn suggestion() -> impl Strategy<Value = Suggestion> {
        (
            prop::sample::select(EMOJI.to_vec()),
            "[a-zA-Z0-9ぁ-んァ-ン ]{1,20}",
        )
            .prop_map(|(emoji, reason)| Suggestion::new(emoji, reason))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn parse_never_panics_and_keeps_shape(raw in "\\PC{0,200}") {
            let set = parse(&raw);
            prop_assert_eq!(set.sub.len(), 2);
        }

        #[test]
        fn parse_keeps_shape_on_json_like_noise(raw in r#"[{}\[\]",: a-z🔥]{0,80}"#) {
            let set = parse(&raw);
            prop_assert_eq!(set.sub.len(), 2);
        }

        #[test]
        fn omitted_trailing_closers_round_trip(
            main in suggestion(),
            first in suggestion(),
            second in suggestion(),
            cut in 0usize..=3,
        ) {
            let set = SuggestionSet::new(main, first, second);
            let json = serde_json::to_string(&set).unwrap();
            prop_assert!(json.ends_with("}]}"), "serialized set must end with closers: {}", json);

            let truncated = &json[..json.len() - cut];
            prop_assert_eq!(parse(truncated), set);
        }
    }
}
