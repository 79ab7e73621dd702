//! Text cleanup for result titles and descriptions.

use std::sync::LazyLock;

use regex::Regex;

/// Tags, closing tags, comments, doctypes and processing instructions.
/// A bare `<` not followed by a tag-like character is left alone.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^>]*>|<[!?][^>]*>").expect("valid tag regex")
});

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit regex"));

/// ArchivesSpace content sometimes carries EAD markup. Remove every tag
/// and keep the text between them; entities are not touched.
pub fn strip_tags(s: &str) -> String {
    TAG.replace_all(s, "").into_owned()
}

pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// `strip_tags` followed by entity decoding.
pub fn strip_and_decode(s: &str) -> String {
    decode_entities(&strip_tags(s))
}

pub fn escape_html(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

/// Description markup expected by the host's result list.
pub fn wrap_description(text: &str) -> String {
    format!(
        "<div class=\"block-with-text\"><p>{}</p></div>",
        escape_html(text)
    )
}

pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First run of ASCII digits, e.g. `"42"` from `"Search Results (42 found)"`.
pub fn first_digits(s: &str) -> Option<&str> {
    DIGITS.find(s).map(|m| m.as_str())
}
