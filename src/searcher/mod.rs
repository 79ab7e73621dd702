//! The ArchivesSpace searcher: one instance per user query.

mod html;
mod solr;

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, Strategy};
use crate::http;
use crate::query::{self, with_query};
use crate::request::SearchTerm;
use solr::SolrResponse;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", http::MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("search() has not been called")]
    NotSearched,

    #[error("search() already ran on this searcher")]
    AlreadySearched,
}

/// A normalized hit. Fields are never absent; missing data is an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub link: String,
    pub title: String,
    pub description: String,
}

/// Hit count as reported by the source. HTML pages only offer a scraped
/// string, which is empty when the page has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Total {
    Count(u64),
    Scraped(String),
}

impl Total {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Total::Count(n) => Some(*n),
            Total::Scraped(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Total::Count(n) => write!(f, "{n}"),
            Total::Scraped(s) => f.write_str(s),
        }
    }
}

enum Response {
    Solr(SolrResponse),
    Html(String),
}

/// Queries one ArchivesSpace endpoint for one term.
///
/// Not meant to be shared: build one per incoming query, call [`search`]
/// once, then read [`results`] and [`total`].
///
/// [`search`]: Searcher::search
/// [`results`]: Searcher::results
/// [`total`]: Searcher::total
pub struct Searcher {
    http: Client,
    config: Arc<Config>,
    term: SearchTerm,
    response: Option<Response>,
    total: Option<Total>,
    results: OnceCell<Vec<SearchResult>>,
}

impl Searcher {
    pub fn new(http: Client, config: Arc<Config>, term: SearchTerm) -> Self {
        Self {
            http,
            config,
            term,
            response: None,
            total: None,
            results: OnceCell::new(),
        }
    }

    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    /// URL fetched by [`Searcher::search`].
    pub fn query_url(&self) -> Result<Url, SearchError> {
        let params = match self.config.strategy {
            Strategy::Solr | Strategy::SolrStripOnly => query::solr_params(&self.config, &self.term),
            Strategy::Html => query::html_params(&self.config, &self.term),
        };
        Ok(with_query(&self.config.search_url, &params.to_solr_query())?)
    }

    pub async fn search(&mut self) -> Result<(), SearchError> {
        if self.response.is_some() {
            return Err(SearchError::AlreadySearched);
        }

        let url = self.query_url()?;
        debug!(url = %url, strategy = ?self.config.strategy, "searching");

        let (final_url, body) = http::download(&self.http, url.as_str()).await?;

        let (response, total) = match self.config.strategy {
            Strategy::Solr | Strategy::SolrStripOnly => {
                let parsed = SolrResponse::parse(&body)?;
                let total = Total::Count(parsed.num_found());
                (Response::Solr(parsed), total)
            }
            Strategy::Html => {
                let total = Total::Scraped(html::scrape_total(&body));
                (Response::Html(body), total)
            }
        };

        info!(term = %self.term.not_escaped(), url = %final_url, total = %total, "search complete");
        self.response = Some(response);
        self.total = Some(total);
        Ok(())
    }

    /// Hits in source order. Built on first call and reused afterwards.
    pub fn results(&self) -> Result<&[SearchResult], SearchError> {
        let response = self.response.as_ref().ok_or(SearchError::NotSearched)?;
        let results = self.results.get_or_init(|| match response {
            Response::Solr(parsed) => {
                let native_host = Url::parse(&self.config.loaded_link).ok();
                let decode = self.config.strategy != Strategy::SolrStripOnly;
                parsed.to_results(native_host.as_ref(), decode)
            }
            Response::Html(body) => match &self.config.selectors {
                Some(selectors) => {
                    let host = Url::parse(&self.config.search_url).ok();
                    html::extract(body, selectors, host.as_ref(), &self.config.sanitize_tags)
                }
                None => Vec::new(),
            },
        });
        Ok(results)
    }

    pub fn total(&self) -> Result<&Total, SearchError> {
        self.total.as_ref().ok_or(SearchError::NotSearched)
    }

    /// "View all results" link into the native search UI.
    pub fn loaded_link(&self) -> Result<String, SearchError> {
        match self.config.strategy {
            Strategy::Solr | Strategy::SolrStripOnly => {
                let params = query::native_params(&self.config, &self.term);
                Ok(with_query(&self.config.loaded_link, &params.to_bracketed_query())?.into())
            }
            Strategy::Html => Ok(self.query_url()?.into()),
        }
    }
}
