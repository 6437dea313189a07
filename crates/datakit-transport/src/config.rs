//! Service endpoint configuration loaded from YAML.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::method::RequestMethod;

/// Where and how to reach a data service.
///
/// Every field except `url` is optional in YAML. A header takes a single
/// value or a list of values:
///
/// ```yaml
/// url: https://data.example.com
/// path: /movies
/// method: POST
/// headers:
///   Accept: application/json
///   X-Tag: [blue, green]
/// params:
///   lang: en
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Absolute base URL of the service
    pub url: String,
    /// Path appended to the base URL
    pub path: String,
    /// Default method for requests built from this config
    pub method: RequestMethod,
    /// Headers sent with every request, in declaration order
    #[serde(deserialize_with = "one_or_many")]
    pub headers: IndexMap<String, Vec<String>>,
    /// Query parameters sent with every request
    pub params: IndexMap<String, String>,
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Appends a header value, keeping earlier values for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Parses a config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(path = %path.display(), url = %config.url, "loaded service config");
        Ok(config)
    }

    /// Serializes this config back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<IndexMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, values)| match values {
            OneOrMany::One(value) => (name, vec![value]),
            OneOrMany::Many(values) => (name, values),
        })
        .collect())
}
