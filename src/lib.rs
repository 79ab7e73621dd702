//! ArchivesSpace searcher for federated search hosts.
//!
//! A host loads a [`Config`] once at startup, then builds one [`Searcher`] per
//! incoming query: `search()` fetches, `results()` and `total()` read the
//! normalized hits, `loaded_link()` points back at the native search UI.

pub mod config;
pub mod http;
pub mod query;
pub mod request;
pub mod searcher;
pub mod text;

pub use config::{Config, ConfigError, HttpSettings, Strategy};
pub use request::SearchTerm;
pub use searcher::{SearchError, SearchResult, Searcher, Total};

pub const USER_AGENT: &str = concat!("aspace-searcher/", env!("CARGO_PKG_VERSION"));
