use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything except RFC 3986 unreserved characters.
const TERM_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The user's query term in the two encodings a host hands to a searcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    not_escaped: String,
    uri_escaped: String,
}

impl SearchTerm {
    pub fn new(raw: &str) -> Self {
        Self {
            not_escaped: raw.to_string(),
            uri_escaped: escape(raw),
        }
    }

    /// Use encodings already computed by the host. `uri_escaped` is inserted
    /// into query strings verbatim, so it must be percent-encoded.
    pub fn from_parts(not_escaped: impl Into<String>, uri_escaped: impl Into<String>) -> Self {
        Self {
            not_escaped: not_escaped.into(),
            uri_escaped: uri_escaped.into(),
        }
    }

    pub fn not_escaped(&self) -> &str {
        &self.not_escaped
    }

    pub fn uri_escaped(&self) -> &str {
        &self.uri_escaped
    }
}

fn escape(s: &str) -> String {
    utf8_percent_encode(s, TERM_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_escapes_reserved_characters() {
        let term = SearchTerm::new("civil war & letters");
        assert_eq!(term.not_escaped(), "civil war & letters");
        assert_eq!(term.uri_escaped(), "civil%20war%20%26%20letters");
    }

    #[test]
    fn new_keeps_unreserved_characters() {
        let term = SearchTerm::new("a-b_c.d~e");
        assert_eq!(term.uri_escaped(), "a-b_c.d~e");
    }

    #[test]
    fn new_escapes_solr_syntax_and_multibyte() {
        let term = SearchTerm::new("title:\"é\"");
        assert_eq!(term.uri_escaped(), "title%3A%22%C3%A9%22");
    }

    #[test]
    fn from_parts_keeps_host_encodings() {
        let term = SearchTerm::from_parts("a b", "a+b");
        assert_eq!(term.not_escaped(), "a b");
        assert_eq!(term.uri_escaped(), "a+b");
    }
}
