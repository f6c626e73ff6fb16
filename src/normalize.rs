//! Field-name normalization
//!
//! Workbook identifiers arrive in several vendor-qualified shapes
//! (`sum:[federated.x].[Capacity]:qk`, `[INDEX] * [Capacity]`, `yr:Date:ok`).
//! [`clean_field_name`] reduces them to plain field names and
//! [`normalize_key`] / [`normalize_key_strict`] produce identity keys for
//! deduplication. Keys are never shown to users.

use once_cell::sync::Lazy;
use regex::Regex;

/// Literal returned by [`clean_field_name`] when there is no field.
///
/// Downstream stages treat it as "no field", never as a field named `None`.
pub const NO_FIELD: &str = "None";

static DATE_PART_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[a-z]+:)+").unwrap());
/// Date-part tokens inside a bracketed shelf reference (`[yr:Order Date:ok]`).
static BRACKETED_DATE_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:[it]?(?:yr|qr|mn|wk|dy|hr|mi|sc|wd|md|my|mdy):)+").unwrap()
});
static SCHEMA_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]+\.[^\]]+\]\.").unwrap());
static AGGREGATION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:sum|none|avg|min|max|attr|usr|tmn|pcto|win|med|pcdf|mn):").unwrap()
});
static PILL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i):(?:qk|nk|ok)").unwrap());
static ORDINAL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r":[0-9]+").unwrap());

/// Which characters a normalized key drops besides case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// Whitespace, hyphens and brackets removed. Used by the workbook
    /// knowledge base and everything that looks fields up in it.
    Compact,
    /// Compact plus underscores. Used by the extraction reconciler and
    /// relationship deduplication.
    Strict,
}

/// Normalize with an explicit [`KeyStyle`].
pub fn normalize_with(text: &str, style: KeyStyle) -> String {
    text.chars()
        .filter(|c| {
            !(c.is_whitespace()
                || *c == '-'
                || *c == '['
                || *c == ']'
                || (style == KeyStyle::Strict && *c == '_'))
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Registry identity key: lowercase, whitespace/hyphen/bracket-stripped.
pub fn normalize_key(text: &str) -> String {
    normalize_with(text, KeyStyle::Compact)
}

/// Reconciler identity key: [`normalize_key`] with underscores removed too.
pub fn normalize_key_strict(text: &str) -> String {
    normalize_with(text, KeyStyle::Strict)
}

/// True when `text` means "no field" (empty, or `none` in any case).
pub fn is_no_field(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none")
}

/// Clean a raw workbook/classifier field reference.
///
/// Strips date-part and aggregation prefixes, schema qualifiers, pill
/// suffixes and wrapping symbols, then decomposes `*` / `/` expressions into
/// their constituent fields. Multiple results are joined with `", "`.
pub fn clean_field_name(text: &str) -> String {
    if is_no_field(text) {
        return NO_FIELD.to_string();
    }

    let text = DATE_PART_PREFIX.replace(text, "");
    let text = SCHEMA_QUALIFIER.replace_all(&text, "");
    let text = BRACKETED_DATE_PART.replace_all(&text, "[");
    let text = AGGREGATION_PREFIX.replace_all(&text, "");
    let text = PILL_SUFFIX.replace_all(&text, "");
    let text = ORDINAL_SUFFIX.replace_all(&text, "");
    let text: String = text
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '"' | '(' | ')'))
        .collect();

    let mut parts: Vec<&str> = Vec::new();
    for part in text.split(['*', '/']) {
        let part = part.trim();
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return NO_FIELD.to_string();
    }
    parts.join(", ")
}

/// Clean and split into individual field names, dropping "no field" results.
pub fn clean_field_parts(text: &str) -> Vec<String> {
    let cleaned = clean_field_name(text);
    if cleaned == NO_FIELD {
        return Vec::new();
    }
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !is_no_field(p))
        .map(str::to_string)
        .collect()
}

// ============================================
// Titles
// ============================================

const TITLE_SPECIAL_CASES: &[(&str, &str)] = &[
    ("pv", "PV"),
    ("ess", "ESS"),
    ("kw", "kW"),
    ("kwh", "kWh"),
    ("mw", "MW"),
    ("gw", "GW"),
    ("dc", "DC"),
    ("ac", "AC"),
    ("bess", "BESS"),
    ("ev", "EV"),
    ("roi", "ROI"),
    ("yoy", "YoY"),
    ("qoq", "QoQ"),
    ("lcoe", "LCOE"),
];

const TITLE_SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "at", "by", "for", "from", "in", "into", "of",
    "off", "on", "onto", "out", "over", "up", "with", "to", "as", "per",
];

/// Title-case a chart title, keeping industry acronyms and small words.
///
/// Whitespace runs, `-` and `/` are preserved verbatim as separators.
pub fn smart_title(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut first_word_found = false;
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String, first_word_found: &mut bool| {
        if word.is_empty() {
            return;
        }
        let lower = word.to_lowercase();
        if let Some((_, special)) = TITLE_SPECIAL_CASES.iter().find(|(k, _)| *k == lower) {
            out.push_str(special);
            *first_word_found = true;
        } else if *first_word_found && TITLE_SMALL_WORDS.contains(&lower.as_str()) {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = word.chars().next() {
                out.extend(first.to_uppercase());
                chars.next();
            }
            out.push_str(chars.as_str());
            *first_word_found = true;
        }
        word.clear();
    };

    for c in text.chars() {
        if c.is_whitespace() || c == '-' || c == '/' {
            flush(&mut word, &mut out, &mut first_word_found);
            out.push(c);
        } else {
            word.push(c);
        }
    }
    flush(&mut word, &mut out, &mut first_word_found);
    out
}

/// Text before the first `(`, trimmed: `"Title (v2)"` becomes `"Title"`.
pub fn strip_trailing_parenthetical(title: &str) -> &str {
    title.split('(').next().unwrap_or(title).trim()
}
