use serde::de::DeserializeOwned;

use crate::error::TransportError;
use crate::multimap::MultiMap;

/// A response returned by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: MultiMap,
    body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: MultiMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|source| TransportError::Conversion {
            target: std::any::type_name::<T>(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Movie {
        title: String,
    }

    #[test]
    fn success_range() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(301, "").is_success());
        assert!(!Response::new(404, "").is_success());
    }

    #[test]
    fn json_body() {
        let response = Response::new(200, r#"{"title":"Ran"}"#)
            .with_header("Content-Type", "application/json");
        let movie: Movie = response.json().unwrap();
        assert_eq!(movie.title, "Ran");
        assert_eq!(response.headers().get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn json_conversion_error_names_target() {
        let err = Response::new(200, "[1, 2]").json::<Movie>().unwrap_err();
        match err {
            TransportError::Conversion { target, .. } => assert!(target.ends_with("Movie")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
