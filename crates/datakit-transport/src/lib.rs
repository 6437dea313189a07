//! Datakit Transport - Request envelope and transport seam for datakit queries.
//!
//! Turns a built [`Query`](datakit_query::Query) into a [`Request`] and hands
//! it to a pluggable [`Transport`]. This crate performs no network I/O itself.
//!
//! # Example
//!
//! ```rust
//! use datakit_query::{Filter, Query};
//! use datakit_transport::{Call, RequestBuilder, Response, ServiceConfig, TransportError};
//!
//! let yaml = "url: https://data.example.com\npath: /movies\n";
//! let config = ServiceConfig::from_yaml_str(yaml).unwrap();
//!
//! let request = RequestBuilder::from_config(&config)
//!     .query(Query::builder().filter(Filter::equal("studio", "ghibli")).build())
//!     .build()
//!     .unwrap();
//!
//! let transport = |_: &datakit_transport::Request| -> Result<Response, TransportError> {
//!     Ok(Response::new(200, r#"[{"title": "Mononoke"}]"#))
//! };
//!
//! let titles: Vec<serde_json::Value> = Call::new(request, &transport).execute_as().unwrap();
//! assert_eq!(titles[0]["title"], "Mononoke");
//! ```

mod config;
mod error;
mod method;
mod multimap;
mod request;
mod response;
mod transport;

pub use config::ServiceConfig;
pub use error::{ConfigError, RequestError, TransportError};
pub use method::RequestMethod;
pub use multimap::MultiMap;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::{Call, Transport};
