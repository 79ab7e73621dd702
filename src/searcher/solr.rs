use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use super::SearchResult;
use crate::text::{strip_and_decode, strip_tags, wrap_description};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SolrResponse {
    #[serde(default)]
    response: Option<SolrBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolrBody {
    num_found: Option<u64>,
    #[serde(default)]
    docs: Vec<SolrDoc>,
}

/// The three fields a hit is built from. Multi-valued fields use their
/// first string; anything else counts as absent.
#[derive(Debug, Default, Deserialize)]
struct SolrDoc {
    #[serde(default, deserialize_with = "first_string")]
    uri: Option<String>,
    #[serde(default, deserialize_with = "first_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "first_string")]
    summary: Option<String>,
}

fn first_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        }),
        _ => None,
    }))
}

impl SolrResponse {
    pub(crate) fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// `numFound`, or 0 when the response omits it.
    pub(crate) fn num_found(&self) -> u64 {
        self.response
            .as_ref()
            .and_then(|r| r.num_found)
            .unwrap_or(0)
    }

    /// One record per doc, in response order. `native_host` is the base for
    /// relative `uri` values; `decode` selects entity decoding after stripping.
    pub(crate) fn to_results(&self, native_host: Option<&Url>, decode: bool) -> Vec<SearchResult> {
        let docs = self.response.as_ref().map(|r| r.docs.as_slice()).unwrap_or_default();
        let clean = |s: &str| if decode { strip_and_decode(s) } else { strip_tags(s) };

        docs.iter()
            .map(|doc| SearchResult {
                link: hyperlink(native_host, doc.uri.as_deref()),
                title: doc.title.as_deref().map(clean).unwrap_or_default(),
                description: wrap_description(&clean(doc.summary.as_deref().unwrap_or_default())),
            })
            .collect()
    }
}

/// Absolute link to the record page; empty when the doc has no usable `uri`.
fn hyperlink(native_host: Option<&Url>, uri: Option<&str>) -> String {
    match (native_host, uri) {
        (Some(base), Some(uri)) if !uri.is_empty() => {
            base.join(uri).map(String::from).unwrap_or_default()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANNED: &str = r#"{"response":{"numFound":3,"docs":[{"uri":"/objects/1","title":"A & B","summary":"<p>x</p>"}]}}"#;

    fn host() -> Url {
        Url::parse("https://archives.example.org/search").unwrap()
    }

    #[test]
    fn reads_num_found_and_docs() {
        let response = SolrResponse::parse(CANNED).unwrap();
        assert_eq!(response.num_found(), 3);

        let results = response.to_results(Some(&host()), true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].link, "https://archives.example.org/objects/1");
        assert_eq!(results[0].title, "A & B");
        assert_eq!(
            results[0].description,
            "<div class=\"block-with-text\"><p>x</p></div>"
        );
    }

    #[test]
    fn missing_num_found_is_zero() {
        let response = SolrResponse::parse(r#"{"response":{"docs":[]}}"#).unwrap();
        assert_eq!(response.num_found(), 0);

        let response = SolrResponse::parse("{}").unwrap();
        assert_eq!(response.num_found(), 0);
        assert!(response.to_results(Some(&host()), true).is_empty());
    }

    #[test]
    fn decoding_variant_decodes_entities_after_stripping() {
        let body = r#"{"response":{"docs":[{"title":"<title>Smith &amp; Sons</title>","summary":"Caf&eacute; <emph>menus</emph>"}]}}"#;
        let results = SolrResponse::parse(body).unwrap().to_results(Some(&host()), true);

        assert_eq!(results[0].title, "Smith & Sons");
        assert_eq!(
            results[0].description,
            "<div class=\"block-with-text\"><p>Café menus</p></div>"
        );
    }

    #[test]
    fn strip_only_variant_keeps_entities() {
        let body = r#"{"response":{"docs":[{"title":"<title>Smith &amp; Sons</title>"}]}}"#;
        let results = SolrResponse::parse(body).unwrap().to_results(Some(&host()), false);

        assert_eq!(results[0].title, "Smith &amp; Sons");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let body = r#"{"response":{"numFound":1,"docs":[{"title":null,"summary":42}]}}"#;
        let results = SolrResponse::parse(body).unwrap().to_results(Some(&host()), true);

        assert_eq!(results[0].link, "");
        assert_eq!(results[0].title, "");
        assert_eq!(
            results[0].description,
            "<div class=\"block-with-text\"><p></p></div>"
        );
    }

    #[test]
    fn multi_valued_fields_use_first_string() {
        let body = r#"{"response":{"docs":[{"uri":["/r/1","/r/2"],"title":[1,"First","Second"]}]}}"#;
        let results = SolrResponse::parse(body).unwrap().to_results(Some(&host()), true);

        assert_eq!(results[0].link, "https://archives.example.org/r/1");
        assert_eq!(results[0].title, "First");
    }

    #[test]
    fn preserves_response_order() {
        let body = r#"{"response":{"docs":[{"title":"b"},{"title":"a"},{"title":"c"}]}}"#;
        let titles: Vec<_> = SolrResponse::parse(body)
            .unwrap()
            .to_results(Some(&host()), true)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(SolrResponse::parse("<html>not json</html>").is_err());
    }
}
