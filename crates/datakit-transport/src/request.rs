//! Immutable request envelope and its builder.

use datakit_query::Query;
use indexmap::IndexMap;
use url::Url;

use crate::config::ServiceConfig;
use crate::error::RequestError;
use crate::method::RequestMethod;
use crate::multimap::MultiMap;

/// A request ready to hand to a [`Transport`](crate::Transport).
///
/// Built through [`Request::builder`]; read-only afterwards. The attached
/// query is kept only in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: RequestMethod,
    url: Option<String>,
    path: String,
    params: IndexMap<String, String>,
    headers: MultiMap,
    forms: MultiMap,
    body: Option<String>,
    encoded_query: String,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    pub fn forms(&self) -> &MultiMap {
        &self.forms
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The attached query as URL query parameters; empty for an empty query.
    pub fn encoded_query(&self) -> &str {
        &self.encoded_query
    }

    /// Composes url, path, params and the encoded query into one URL.
    ///
    /// Params come first, followed by the encoded query.
    pub fn full_url(&self) -> Result<Url, RequestError> {
        let base = self.url.as_deref().ok_or(RequestError::MissingUrl)?;
        let mut url = parse_url(base)?;
        append_path(&mut url, &self.path);

        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        if !self.encoded_query.is_empty() {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => {
                    format!("{}&{}", existing, self.encoded_query)
                }
                _ => self.encoded_query.clone(),
            };
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}

/// Builder for [`Request`].
///
/// ```
/// use datakit_query::Query;
/// use datakit_transport::{Request, RequestMethod};
///
/// let request = Request::builder()
///     .method(RequestMethod::Get)
///     .url("https://data.example.com")
///     .path("/movies")
///     .query(Query::builder().limit(5).build())
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     request.full_url().unwrap().as_str(),
///     "https://data.example.com/movies?limit=5"
/// );
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RequestBuilder {
    method: RequestMethod,
    url: Option<String>,
    path: String,
    params: IndexMap<String, String>,
    headers: MultiMap,
    forms: MultiMap,
    body: Option<String>,
    query: Query,
}

impl RequestBuilder {
    /// Seeds a builder with the url, path, method, headers and params of a
    /// service config.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut builder = RequestBuilder {
            method: config.method,
            path: config.path.clone(),
            params: config.params.clone(),
            ..Self::default()
        };
        if !config.url.is_empty() {
            builder.url = Some(config.url.clone());
        }
        for (name, values) in &config.headers {
            for value in values {
                builder.headers.insert(name.as_str(), value.as_str());
            }
        }
        builder
    }

    pub fn method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets a query parameter, replacing an earlier value for the same name.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a header; repeated names keep every value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a form field; repeated names keep every value.
    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.forms.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attaches a query, replacing the default empty one.
    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Validates and finalizes the request.
    ///
    /// Fails when both a non-empty body and form fields are set, when the
    /// url is not absolute, or when the query cannot be encoded.
    pub fn build(self) -> Result<Request, RequestError> {
        if self.body.as_deref().is_some_and(|body| !body.is_empty()) && !self.forms.is_empty() {
            return Err(RequestError::BodyAndForms);
        }
        if let Some(url) = &self.url {
            parse_url(url)?;
        }
        let encoded_query = self.query.encoded_query_string()?;

        tracing::debug!(
            method = %self.method,
            url = self.url.as_deref().unwrap_or(""),
            path = %self.path,
            headers = self.headers.len(),
            forms = self.forms.len(),
            "built request"
        );

        Ok(Request {
            method: self.method,
            url: self.url,
            path: self.path,
            params: self.params,
            headers: self.headers,
            forms: self.forms,
            body: self.body,
            encoded_query,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, RequestError> {
    Url::parse(raw).map_err(|source| RequestError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Appends `path` to the path of `url`, leaving its query and fragment alone.
fn append_path(url: &mut Url, path: &str) {
    if path.is_empty() {
        return;
    }
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
}

#[cfg(test)]
mod tests {
    use super::*;
    use datakit_query::{Aggregation, Filter, QueryError};

    #[test]
    fn body_and_forms_are_exclusive() {
        let result = Request::builder().body("x").form("a", "b").build();
        assert!(matches!(result, Err(RequestError::BodyAndForms)));

        assert!(Request::builder().body("x").build().is_ok());
        assert!(Request::builder().form("a", "b").build().is_ok());
    }

    #[test]
    fn empty_body_allows_forms() {
        let request = Request::builder().body("").form("a", "b").build().unwrap();
        assert_eq!(request.forms().get("a"), Some("b"));
    }

    #[test]
    fn defaults() {
        let request = Request::builder().build().unwrap();
        assert_eq!(request.method(), RequestMethod::Get);
        assert_eq!(request.url(), None);
        assert_eq!(request.path(), "");
        assert_eq!(request.body(), None);
        assert_eq!(request.encoded_query(), "");
        assert!(request.headers().is_empty());
        assert!(matches!(request.full_url(), Err(RequestError::MissingUrl)));
    }

    #[test]
    fn relative_url_rejected() {
        let result = Request::builder().url("movies/1").build();
        match result {
            Err(RequestError::InvalidUrl { url, .. }) => assert_eq!(url, "movies/1"),
            other => panic!("expected invalid url, got {other:?}"),
        }
    }

    #[test]
    fn circular_query_fails_build() {
        let node = Aggregation::count("n", "id");
        node.clone().add_nested_aggregation([node.clone()]).unwrap();
        let query = Query::builder().aggregate(node).build();

        let result = Request::builder().query(query).build();
        assert!(matches!(
            result,
            Err(RequestError::Query(QueryError::CircularReference { .. }))
        ));
    }

    #[test]
    fn encoded_query_attached() {
        let query = Query::builder().filter(Filter::gt("year", 2000)).build();
        let expected = query.encoded_query_string().unwrap();

        let request = Request::builder().query(query).build().unwrap();
        assert_eq!(request.encoded_query(), expected);
        assert!(request.encoded_query().starts_with("filter="));
    }

    #[test]
    fn full_url_combines_parts() {
        let request = Request::builder()
            .url("https://data.example.com/")
            .path("/movies")
            .param("lang", "en")
            .param("lang", "pt")
            .query(Query::builder().fetch().build())
            .build()
            .unwrap();

        assert_eq!(
            request.full_url().unwrap().as_str(),
            "https://data.example.com/movies?lang=pt&type=%22fetch%22"
        );
    }

    #[test]
    fn full_url_keeps_base_query_and_prefix() {
        let request = Request::builder()
            .url("https://data.example.com/api/?token=abc#top")
            .path("movies")
            .param("lang", "en")
            .query(Query::builder().limit(5).build())
            .build()
            .unwrap();

        assert_eq!(
            request.full_url().unwrap().as_str(),
            "https://data.example.com/api/movies?token=abc&lang=en&limit=5#top"
        );
    }

    #[test]
    fn headers_keep_repeats() {
        let request = Request::builder()
            .header("X-Tag", "a")
            .header("Accept", "application/json")
            .header("X-Tag", "b")
            .build()
            .unwrap();

        assert_eq!(request.headers().get_all("X-Tag"), ["a", "b"]);
        assert_eq!(request.headers().len(), 3);
    }

    #[test]
    fn from_config_keeps_repeated_headers() {
        let config = ServiceConfig::new("https://data.example.com")
            .header("name1", "value1")
            .header("name3", "value3")
            .header("name3", "value4");

        let request = RequestBuilder::from_config(&config)
            .header("name3", "value5")
            .build()
            .unwrap();

        assert_eq!(request.headers().get_all("name3"), ["value3", "value4", "value5"]);
        assert_eq!(request.headers().get("name1"), Some("value1"));
        assert_eq!(request.headers().len(), 4);
    }

    #[test]
    fn from_config() {
        let mut config = ServiceConfig::new("https://data.example.com")
            .header("Accept", "application/json");
        config.path = "/movies".to_string();
        config.method = RequestMethod::Post;
        config.params.insert("lang".to_string(), "en".to_string());

        let request = RequestBuilder::from_config(&config)
            .header("X-Extra", "1")
            .build()
            .unwrap();

        assert_eq!(request.method(), RequestMethod::Post);
        assert_eq!(request.url(), Some("https://data.example.com"));
        assert_eq!(request.headers().get("Accept"), Some("application/json"));
        assert_eq!(request.headers().get("X-Extra"), Some("1"));
        assert_eq!(
            request.full_url().unwrap().as_str(),
            "https://data.example.com/movies?lang=en"
        );
    }
}
