//! Query-string construction for the Solr endpoint and the native search UI.
//!
//! Solr wants array parameters as repeated keys (`fq=a&fq=b`), while the
//! ArchivesSpace public UI wants bracketed keys (`q[]=a&q[]=b`). Clause text
//! is form-encoded here, except for the pre-escaped search term, which is
//! inserted verbatim so it is never encoded twice.

use std::collections::BTreeMap;

use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::config::{Config, Strategy};
use crate::request::SearchTerm;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Escaped(String),
}

/// One parameter value, assembled from plain and pre-escaped pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    segments: Vec<Segment>,
}

impl Clause {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Text(s.into())],
        }
    }

    /// Already percent-encoded text, written to the query string unchanged.
    pub fn escaped(s: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Escaped(s.into())],
        }
    }

    pub fn then(mut self, other: Clause) -> Self {
        self.segments.extend(other.segments);
        self
    }

    pub fn then_text(self, s: impl Into<String>) -> Self {
        self.then(Clause::text(s))
    }

    pub fn join(clauses: impl IntoIterator<Item = Clause>, separator: &str) -> Clause {
        let mut joined = Clause::default();
        for (i, clause) in clauses.into_iter().enumerate() {
            if i > 0 {
                joined = joined.then_text(separator);
            }
            joined = joined.then(clause);
        }
        joined
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(s) => out.extend(byte_serialize(s.as_bytes())),
                Segment::Escaped(s) => out.push_str(s),
            }
        }
        out
    }
}

/// A parameter is either a single value or an ordered list of clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Single(Clause),
    List(Vec<Clause>),
}

impl Param {
    pub fn clauses(&self) -> Vec<Clause> {
        match self {
            Param::Single(c) => vec![c.clone()],
            Param::List(cs) => cs.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, Param>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, param: Param) {
        self.0.insert(key.into(), param);
    }

    /// Clauses configured for `key`; empty when the key is absent.
    pub fn clauses(&self, key: &str) -> Vec<Clause> {
        self.0.get(key).map(Param::clauses).unwrap_or_default()
    }

    /// Keys present in `other` replace the same keys here.
    pub fn merge(mut self, other: QueryParams) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Repeated-key encoding: `fq=a&fq=b`.
    pub fn to_solr_query(&self) -> String {
        let mut pairs = Vec::new();
        for (key, param) in &self.0 {
            let key = encode_key(key);
            for clause in param.clauses() {
                pairs.push(format!("{key}={}", clause.encode()));
            }
        }
        pairs.join("&")
    }

    /// Bracketed-array encoding: `q%5B%5D=a&q%5B%5D=b`. An empty list still
    /// emits its key with an empty value.
    pub fn to_bracketed_query(&self) -> String {
        let mut pairs = Vec::new();
        for (key, param) in &self.0 {
            match param {
                Param::Single(clause) => {
                    pairs.push(format!("{}={}", encode_key(key), clause.encode()));
                }
                Param::List(clauses) if clauses.is_empty() => {
                    pairs.push(format!("{}=", encode_key(&format!("{key}[]"))));
                }
                Param::List(clauses) => {
                    let key = encode_key(&format!("{key}[]"));
                    pairs.extend(clauses.iter().map(|c| format!("{key}={}", c.encode())));
                }
            }
        }
        pairs.join("&")
    }
}

impl FromIterator<(String, Param)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, Param)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn encode_key(key: &str) -> String {
    byte_serialize(key.as_bytes()).collect()
}

fn term(term: &SearchTerm) -> Clause {
    Clause::escaped(term.uri_escaped())
}

/// Full-text clause on the `fullrecord` field.
fn fulltext_clause(strategy: Strategy, search: &SearchTerm) -> Clause {
    match strategy {
        Strategy::SolrStripOnly => Clause::text("fullrecord:(")
            .then(term(search))
            .then_text(")"),
        Strategy::Solr | Strategy::Html => Clause::text("(fullrecord:(")
            .then(term(search))
            .then_text("))"),
    }
}

/// Filter restricting hits to the configured record types, if any.
fn type_filter(strategy: Strategy, object_types: &[String]) -> Option<Clause> {
    if object_types.is_empty() {
        return None;
    }
    let clause = match strategy {
        Strategy::SolrStripOnly => {
            let alternation = object_types
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(" OR ");
            format!("types:({alternation})")
        }
        Strategy::Solr | Strategy::Html => {
            let grouped = object_types
                .iter()
                .map(|t| format!("types:(\"{t}\")"))
                .collect::<Vec<_>>()
                .join(" OR ");
            format!("({grouped})")
        }
    };
    Some(Clause::text(clause))
}

/// Parameters sent to the Solr endpoint.
pub fn solr_params(config: &Config, search: &SearchTerm) -> QueryParams {
    let base = config.base_params();

    let mut q = base.clauses("q");
    q.push(fulltext_clause(config.strategy, search));

    let mut fq = base.clauses("fq");
    fq.extend(type_filter(config.strategy, &config.object_types));

    let mut overrides = QueryParams::new();
    overrides.insert("q", Param::Single(Clause::join(q, " AND ")));
    overrides.insert("fq", Param::List(fq));
    base.merge(overrides)
}

/// Parameters sent to the public-UI HTML search page.
pub fn html_params(config: &Config, search: &SearchTerm) -> QueryParams {
    let base = config.base_params();
    let mut q = base.clauses("q");
    q.push(term(search));

    let mut overrides = QueryParams::new();
    overrides.insert("q", Param::List(q));
    base.merge(overrides)
}

/// Parameters for the human-facing "view all results" link.
pub fn native_params(config: &Config, search: &SearchTerm) -> QueryParams {
    let base = config.native_base_params();
    let mut q = base.clauses("q");
    q.push(term(search));

    let mut overrides = QueryParams::new();
    overrides.insert("q", Param::List(q));
    base.merge(overrides)
}

/// Replace the query of `base` with `query`.
pub fn with_query(base: &str, query: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    if query.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(query));
    }
    Ok(url)
}
