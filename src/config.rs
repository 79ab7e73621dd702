//! Searcher configuration: one YAML file, one section per deployment
//! environment, loaded once at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use scraper::Selector;
use serde::Deserialize;
use tracing::{debug, info};

use crate::query::{Clause, Param, QueryParams};

/// Looked up in order when no explicit path is given. The host-local copy
/// overrides the bundled default.
pub const CANDIDATE_PATHS: [&str; 2] = [
    "config/searchers/archives_space_config.yml",
    "config/archives_space_config.yml",
];

pub const DEFAULT_ENVIRONMENT: &str = "development";

static TEMPLATE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid template regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found (looked in: {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no section for environment '{0}'")]
    MissingEnvironment(String),

    #[error("'{0}' is required")]
    MissingKey(&'static str),

    #[error("invalid URL in '{key}': {source}")]
    InvalidUrl {
        key: &'static str,
        source: url::ParseError,
    },

    #[error("invalid selector in '{key}': {message}")]
    InvalidSelector { key: &'static str, message: String },

    #[error("environment variable {0} is not set and has no fallback")]
    UnsetVariable(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// How the endpoint is queried and its response read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Solr JSON; titles and summaries are tag-stripped, then entity-decoded.
    #[default]
    Solr,
    /// Solr JSON; tag-stripped only, entities left as sent.
    SolrStripOnly,
    /// Public-UI HTML page scraped with CSS selectors.
    Html,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// A query parameter as written in YAML: `wt: json`, `fq: [a, b]` or `q:`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    List(Vec<Scalar>),
    Single(Scalar),
    Empty(()),
}

impl ParamValue {
    fn to_param(&self) -> Param {
        match self {
            ParamValue::List(items) => {
                Param::List(items.iter().map(|s| Clause::text(s.to_string())).collect())
            }
            ParamValue::Single(s) => Param::Single(Clause::text(s.to_string())),
            ParamValue::Empty(()) => Param::List(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            max_redirects: 5,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// One environment's section, as written in the file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    strategy: Strategy,
    search_url: Option<String>,
    loaded_link: Option<String>,
    #[serde(default)]
    query_params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    native_query_params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    object_types: Vec<String>,
    row_selector: Option<String>,
    link_selector: Option<String>,
    description_selector: Option<String>,
    #[serde(default)]
    sanitize_tags: Vec<String>,
    #[serde(default)]
    http: HttpSettings,
}

/// Selectors for the HTML strategy, compiled at load time.
#[derive(Debug, Clone)]
pub struct HtmlSelectors {
    pub row: Selector,
    pub link: Selector,
    pub description: Selector,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: Strategy,
    pub search_url: String,
    pub loaded_link: String,
    pub query_params: BTreeMap<String, ParamValue>,
    pub native_query_params: BTreeMap<String, ParamValue>,
    pub object_types: Vec<String>,
    pub selectors: Option<HtmlSelectors>,
    pub sanitize_tags: Vec<String>,
    pub http: HttpSettings,
}

impl Config {
    /// Load `explicit`, or else the first of [`CANDIDATE_PATHS`] that exists
    /// under the working directory.
    pub fn discover(explicit: Option<&Path>, environment: &str) -> Result<Self, ConfigError> {
        Self::discover_in(Path::new("."), explicit, environment)
    }

    fn discover_in(
        root: &Path,
        explicit: Option<&Path>,
        environment: &str,
    ) -> Result<Self, ConfigError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(p) => vec![p.to_path_buf()],
            None => CANDIDATE_PATHS.iter().map(|c| root.join(c)).collect(),
        };
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::NotFound(candidates.clone()))?;
        Self::load(path, environment)
    }

    pub fn load(path: &Path, environment: &str) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&source, environment)?;
        info!(path = %path.display(), environment, strategy = ?config.strategy, "config loaded");
        Ok(config)
    }

    pub fn from_yaml_str(source: &str, environment: &str) -> Result<Self, ConfigError> {
        Self::parse(source, environment, |name| std::env::var(name).ok())
    }

    fn parse(
        source: &str,
        environment: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let expanded = expand_template(source, lookup)?;
        let mut sections: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&expanded)?;
        let section = sections
            .remove(environment)
            .ok_or_else(|| ConfigError::MissingEnvironment(environment.to_string()))?;
        let raw: RawConfig = serde_yaml::from_value(section)?;
        debug!(environment, "config section parsed");
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let search_url = required_url("search_url", raw.search_url)?;
        let loaded_link = required_url("loaded_link", raw.loaded_link)?;

        let selectors = match raw.strategy {
            Strategy::Html => Some(HtmlSelectors {
                row: required_selector("row_selector", raw.row_selector)?,
                link: required_selector("link_selector", raw.link_selector)?,
                description: required_selector("description_selector", raw.description_selector)?,
            }),
            Strategy::Solr | Strategy::SolrStripOnly => None,
        };

        Ok(Self {
            strategy: raw.strategy,
            search_url,
            loaded_link,
            query_params: raw.query_params,
            native_query_params: raw.native_query_params,
            object_types: raw.object_types,
            selectors,
            sanitize_tags: raw
                .sanitize_tags
                .into_iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            http: raw.http,
        })
    }

    /// `query_params` ready for merging and encoding.
    pub fn base_params(&self) -> QueryParams {
        to_query_params(&self.query_params)
    }

    /// `native_query_params` ready for merging and encoding.
    pub fn native_base_params(&self) -> QueryParams {
        to_query_params(&self.native_query_params)
    }
}

fn to_query_params(map: &BTreeMap<String, ParamValue>) -> QueryParams {
    map.iter().map(|(k, v)| (k.clone(), v.to_param())).collect()
}

fn required_url(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingKey(key))?;
    url::Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { key, source })?;
    Ok(value)
}

fn required_selector(key: &'static str, value: Option<String>) -> Result<Selector, ConfigError> {
    let value = value.ok_or(ConfigError::MissingKey(key))?;
    Selector::parse(&value).map_err(|e| ConfigError::InvalidSelector {
        key,
        message: e.to_string(),
    })
}

/// Expand `${NAME}` and `${NAME:-fallback}` using `lookup`. Empty values
/// count as unset when a fallback is given. Comment lines are left as is.
pub fn expand_template(
    source: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            out.push_str(line);
        } else {
            out.push_str(&expand_line(line, &lookup)?);
        }
    }
    Ok(out)
}

fn expand_line(
    line: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = TEMPLATE_VAR.replace_all(line, |caps: &Captures| {
        let name = &caps[1];
        match (lookup(name), caps.get(2)) {
            (Some(v), Some(fallback)) if v.is_empty() => fallback.as_str().to_string(),
            (Some(v), _) => v,
            (None, Some(fallback)) => fallback.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ConfigError::UnsetVariable(name)),
        None => Ok(expanded.into_owned()),
    }
}
