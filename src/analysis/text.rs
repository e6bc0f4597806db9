//! Description text cleanup: entity decoding, markup stripping, truncation
//! and a script-based language hint.

use regex::Regex;
use std::sync::LazyLock;

/// Default display limit for generated descriptions.
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

/// Entity table applied in order on every decode pass.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#34;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&amp;nbsp;", " "),
];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PROMO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)为我助力|boostme|点赞|like|订阅|subscribe").unwrap());

/// Vietnamese letters outside Latin-1 that other Latin scripts rarely use.
const VIETNAMESE_CHARS: &[char] = &[
    '\u{0102}', '\u{0103}', '\u{0110}', '\u{0111}', '\u{0128}', '\u{0129}', '\u{0168}',
    '\u{0169}', '\u{01A0}', '\u{01A1}',
];

fn is_han(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{30FF}').contains(&c)
}

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7AF}').contains(&c)
}

fn in_range(text: &str, lo: char, hi: char) -> bool {
    text.chars().any(|c| (lo..=hi).contains(&c))
}

/// Guess a two-letter language code from the Unicode scripts present.
///
/// Ranges are checked in a fixed priority order and the first hit wins, so
/// any Han character makes mixed CJK text "zh".
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| is_han(c) || is_kana(c) || is_hangul(c)) {
        if text.chars().any(is_han) {
            return "zh";
        }
        if text.chars().any(is_kana) {
            return "ja";
        }
        return "ko";
    }

    if in_range(text, '\u{0400}', '\u{04FF}') {
        return "ru";
    }
    if in_range(text, '\u{0600}', '\u{06FF}') {
        return "ar";
    }
    if in_range(text, '\u{0590}', '\u{05FF}') {
        return "he";
    }
    if in_range(text, '\u{0E00}', '\u{0E7F}') {
        return "th";
    }
    if text.chars().any(|c| VIETNAMESE_CHARS.contains(&c)) {
        return "vi";
    }

    "en"
}

fn decode_entities_once(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, &(entity, plain)| acc.replace(entity, plain))
}

fn clean_pass(text: &str) -> String {
    let mut decoded = text.to_string();
    loop {
        let next = decode_entities_once(&decoded);
        if next == decoded {
            break;
        }
        decoded = next;
    }

    let stripped = TAG_RE.replace_all(&decoded, "");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Decode (possibly multiply) HTML-encoded text, strip tags and collapse
/// whitespace.
///
/// Stripping tags can splice a new entity together (`&am<b>p;`), so the
/// whole pass repeats until the output is stable. This keeps the function
/// idempotent.
pub fn clean_html_text(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Shorten text to at most `max_length` characters, preferring to cut at
/// a sentence, line or clause boundary in the last fifth of the window.
pub fn truncate_description(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let window: Vec<char> = text.chars().take(max_length).collect();
    let threshold = max_length as f64 * 0.8;
    let last = |needle: char| window.iter().rposition(|&c| c == needle);

    if let Some(pos) = last('.').filter(|&p| p as f64 > threshold) {
        return window[..=pos].iter().collect();
    }
    if let Some(pos) = last('\n').filter(|&p| p as f64 > threshold) {
        return window[..pos].iter().collect();
    }
    if let Some(pos) = last(',').filter(|&p| p as f64 > threshold) {
        return window[..pos].iter().collect();
    }

    let cut = max_length.saturating_sub(3);
    let mut truncated: String = window[..cut].iter().collect();
    truncated.push_str("...");
    // A limit below the ellipsis width cannot hold it.
    truncated.chars().take(max_length).collect()
}

/// Pull up to two meaningful sentences out of a marketing-style blurb.
pub fn extract_description(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let cleaned = clean_html_text(raw);
    let sentences: Vec<&str> = cleaned
        .split(['.', '!', '。'])
        .map(str::trim)
        .filter(|s| s.chars().count() >= 10 && !PROMO_RE.is_match(s))
        .take(2)
        .collect();

    if !sentences.is_empty() {
        return sentences.join(". ");
    }

    let mut fallback: String = cleaned.chars().take(100).collect();
    if cleaned.chars().count() > 100 {
        fallback.push_str("...");
    }
    fallback
}
