//! Recovery parser
//!
//! Turns raw model output into a [`RawPlan`]. The text is expected to hold a
//! single JSON object, possibly fenced in markdown and possibly cut off by an
//! output-length limit. Repairs escalate through tiers, each keeping less of
//! the document in exchange for validity:
//!
//! 1. fence stripping and a direct parse
//! 2. cut back to the last complete day and re-balance the days array
//! 3. cut back to the last complete event and close its day with a zeroed budget
//! 4. cut at the last closing brace anywhere
//!
//! All scanning works on a small token stream that skips string contents, so
//! braces inside descriptions never count as structure.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::raw::RawPlan;

const BUDGET_KEY: &str = "daily_budget_breakdown";
const CATEGORY_KEY: &str = "category";
const DAYS_KEY: &str = "days";
const EVENTS_KEY: &str = "events";
const DAY_HEADER_KEY: &str = "day_number";

const ZEROED_BUDGET: &str = r#""daily_budget_breakdown":{"accommodation":"$0","food":"$0","activities":"$0","transportation":"$0","total":"$0"}"#;

/// Which repair produced the parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    Direct,
    WholeDays,
    PartialDay,
    LastBrace,
}

impl RecoveryTier {
    pub fn describe(&self) -> &'static str {
        match self {
            RecoveryTier::Direct => "parsed without repair",
            RecoveryTier::WholeDays => "truncated output cut back to the last complete day",
            RecoveryTier::PartialDay => {
                "truncated output cut back to the last complete event; day budget zeroed"
            }
            RecoveryTier::LastBrace => "truncated output cut at the last closing brace",
        }
    }
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Every tier failed; both texts are kept for diagnostics
    #[error("model output could not be parsed after all repair attempts ({} bytes)", .original.len())]
    Unparseable { original: String, cleaned: String },

    #[error("recovered document has an unexpected shape: {0}")]
    UnexpectedShape(String),
}

/// A recovered plan plus the tier that produced it
#[derive(Debug, Clone)]
pub struct Recovered {
    pub plan: RawPlan,
    pub tier: RecoveryTier,
}

/// Recover a plan from raw model output
pub fn recover(raw_text: &str) -> Result<RawPlan, RecoveryError> {
    recover_plan(raw_text).map(|recovered| recovered.plan)
}

/// Recover a plan, reporting which tier succeeded
pub fn recover_plan(raw_text: &str) -> Result<Recovered, RecoveryError> {
    let (value, tier) = recover_value(raw_text)?;

    if !value.is_object() {
        return Err(RecoveryError::UnexpectedShape(format!(
            "expected a JSON object, found {}",
            json_type_name(&value)
        )));
    }

    let plan: RawPlan = serde_json::from_value(value)
        .map_err(|e| RecoveryError::UnexpectedShape(e.to_string()))?;

    debug!(
        tier = ?tier,
        days = plan.days.len(),
        events = plan.event_count(),
        "Recovered plan"
    );

    Ok(Recovered { plan, tier })
}

/// Recover the JSON tree without interpreting it
pub fn recover_value(raw_text: &str) -> Result<(Value, RecoveryTier), RecoveryError> {
    let cleaned = clean(raw_text);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Ok((value, RecoveryTier::Direct));
    }

    let doc = Document::new(cleaned);
    let attempts = [
        (RecoveryTier::WholeDays, doc.cut_to_whole_days()),
        (RecoveryTier::PartialDay, doc.cut_to_partial_day()),
        (RecoveryTier::LastBrace, Some(doc.cut_at_last_brace())),
    ];

    let mut last_attempt = cleaned.to_string();
    for (tier, candidate) in attempts {
        let Some(candidate) = candidate else {
            continue;
        };
        match serde_json::from_str::<Value>(&candidate) {
            Ok(value) => return Ok((value, tier)),
            Err(e) => {
                debug!(tier = ?tier, error = %e, "Repair attempt did not parse");
                last_attempt = candidate;
            }
        }
    }

    Err(RecoveryError::Unparseable {
        original: raw_text.to_string(),
        cleaned: last_attempt,
    })
}

/// Strip markdown fences and any prose before the first brace
fn clean(raw_text: &str) -> &str {
    let stripped = strip_code_fences(raw_text);
    if stripped.starts_with('{') || stripped.starts_with('[') {
        return stripped;
    }
    match stripped.find('{') {
        Some(start) => &stripped[start..],
        None => stripped,
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` line and a trailing ```` ``` ````
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    let trimmed = s.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        s = rest;
    }

    s.trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Token scanning
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
    Str,
}

/// Structural token; `end` is exclusive
#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// A container left open at some cut point
#[derive(Debug, Clone)]
struct OpenContainer<'a> {
    kind: TokenKind,
    /// Object key this container is the value of, if any
    key: Option<&'a str>,
}

/// Scalars other than strings are skipped. An unterminated string ends the
/// stream.
fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let kind = match bytes[i] {
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'[' => TokenKind::OpenBracket,
            b']' => TokenKind::CloseBracket,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'"' => {
                let start = i;
                i += 1;
                let mut closed = false;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'"' => {
                            closed = true;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                if !closed {
                    break;
                }
                tokens.push(Token {
                    kind: TokenKind::Str,
                    start,
                    end: i + 1,
                });
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        };
        tokens.push(Token {
            kind,
            start: i,
            end: i + 1,
        });
        i += 1;
    }

    tokens
}

struct Document<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Document<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: tokenize(text),
        }
    }

    fn kind(&self, idx: usize) -> Option<TokenKind> {
        self.tokens.get(idx).map(|t| t.kind)
    }

    fn str_content(&self, idx: usize) -> &'a str {
        let token = self.tokens[idx];
        &self.text[token.start + 1..token.end - 1]
    }

    /// Token `idx` is the string `key` used as an object key
    fn is_key(&self, idx: usize, key: &str) -> bool {
        self.kind(idx) == Some(TokenKind::Str)
            && self.kind(idx + 1) == Some(TokenKind::Colon)
            && self.str_content(idx) == key
    }

    fn key_positions<'s>(&'s self, key: &'s str) -> impl Iterator<Item = usize> + 's {
        (0..self.tokens.len()).filter(move |&idx| self.is_key(idx, key))
    }

    fn count_keys_before(&self, key: &str, cut: usize) -> usize {
        self.key_positions(key)
            .filter(|&idx| self.tokens[idx].end <= cut)
            .count()
    }

    /// Token index of the bracket closing the container opened at `open`
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::OpenBrace | TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBrace | TokenKind::CloseBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// First `}` after token `after` that closes a container opened before it
    fn next_unmatched_close(&self, after: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(after + 1) {
            match token.kind {
                TokenKind::OpenBrace | TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBrace if depth == 0 => return Some(idx),
                TokenKind::CloseBracket if depth == 0 => return None,
                TokenKind::CloseBrace | TokenKind::CloseBracket => depth -= 1,
                _ => {}
            }
        }
        None
    }

    /// Closing-brace token indices of every complete budget breakdown object
    fn budget_span_ends(&self) -> Vec<usize> {
        self.key_positions(BUDGET_KEY)
            .filter(|&idx| self.kind(idx + 2) == Some(TokenKind::OpenBrace))
            .filter_map(|idx| self.matching_close(idx + 2))
            .collect()
    }

    fn has_days_array_before(&self, cut: usize) -> bool {
        self.key_positions(DAYS_KEY).any(|idx| {
            self.kind(idx + 2) == Some(TokenKind::OpenBracket) && self.tokens[idx + 2].end <= cut
        })
    }

    /// Containers still open after byte offset `cut`, outermost first
    fn open_stack(&self, cut: usize) -> Vec<OpenContainer<'a>> {
        let mut stack = Vec::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            if token.end > cut {
                break;
            }
            match token.kind {
                TokenKind::OpenBrace | TokenKind::OpenBracket => {
                    let key = (idx >= 2
                        && self.kind(idx - 1) == Some(TokenKind::Colon)
                        && self.kind(idx - 2) == Some(TokenKind::Str))
                    .then(|| self.str_content(idx - 2));
                    stack.push(OpenContainer {
                        kind: token.kind,
                        key,
                    });
                }
                TokenKind::CloseBrace | TokenKind::CloseBracket => {
                    stack.pop();
                }
                _ => {}
            }
        }
        stack
    }

    fn last_top_level_close(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut last = None;
        for (idx, token) in self.tokens.iter().enumerate() {
            match token.kind {
                TokenKind::OpenBrace | TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBrace | TokenKind::CloseBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && token.kind == TokenKind::CloseBrace {
                        last = Some(idx);
                    }
                }
                _ => {}
            }
        }
        last
    }

    /// Tier 2: keep only whole days
    fn cut_to_whole_days(&self) -> Option<String> {
        for budget_end in self.budget_span_ends().into_iter().rev() {
            let Some(day_close) = self.next_unmatched_close(budget_end) else {
                continue;
            };
            let cut = self.tokens[day_close].end;

            if !self.has_days_array_before(cut) {
                return self
                    .last_top_level_close()
                    .map(|idx| self.text[..self.tokens[idx].end].to_string());
            }

            debug!(
                days = self.count_keys_before(DAY_HEADER_KEY, cut),
                "Cutting truncated output back to last complete day"
            );
            let stack = self.open_stack(cut);
            return Some(close_open_containers(&self.text[..cut], &stack, false));
        }
        None
    }

    /// Tier 3: keep the events of the current day up to the last one with a category
    fn cut_to_partial_day(&self) -> Option<String> {
        let key = self
            .key_positions(CATEGORY_KEY)
            .filter(|&idx| self.kind(idx + 2) == Some(TokenKind::Str))
            .last()?;
        let value = key + 2;

        let cut = match self.next_unmatched_close(value) {
            Some(close) => self.tokens[close].end,
            None => self.tokens[value].end,
        };

        if self.count_keys_before(DAY_HEADER_KEY, cut) == 0 {
            return None;
        }

        debug!("Cutting truncated output back to last complete event");
        let stack = self.open_stack(cut);
        Some(close_open_containers(&self.text[..cut], &stack, true))
    }

    /// Tier 4: best effort
    fn cut_at_last_brace(&self) -> String {
        match self.text.rfind('}') {
            Some(idx) => self.text[..=idx].to_string(),
            None => self.text.to_string(),
        }
    }
}

/// Append closers for every open container, innermost first
///
/// With `add_budget`, an object whose `events` array was just closed also
/// gets a zeroed budget breakdown.
fn close_open_containers(prefix: &str, stack: &[OpenContainer<'_>], add_budget: bool) -> String {
    let mut out = prefix.trim_end().trim_end_matches(',').to_string();
    let mut child_key: Option<&str> = None;

    for container in stack.iter().rev() {
        match container.kind {
            TokenKind::OpenBracket => out.push(']'),
            _ => {
                if add_budget && child_key == Some(EVENTS_KEY) {
                    out.push(',');
                    out.push_str(ZEROED_BUDGET);
                }
                out.push('}');
            }
        }
        child_key = container.key;
    }

    out
}
