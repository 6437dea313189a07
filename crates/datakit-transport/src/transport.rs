use serde::de::DeserializeOwned;

use crate::error::TransportError;
use crate::request::Request;
use crate::response::Response;

/// Something that can deliver a [`Request`] and return its [`Response`].
///
/// No sender ships with this crate; plug in an HTTP client, or a closure in
/// tests:
///
/// ```
/// use datakit_transport::{Request, Response, Transport, TransportError};
///
/// let echo = |request: &Request| -> Result<Response, TransportError> {
///     Ok(Response::new(200, request.encoded_query()))
/// };
///
/// let request = Request::builder().build().unwrap();
/// assert_eq!(echo.send(&request).unwrap().status(), 200);
/// ```
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&Request) -> Result<Response, TransportError> + Send + Sync,
{
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self(request)
    }
}

/// A request bound to the transport that will send it.
pub struct Call<'t> {
    request: Request,
    transport: &'t dyn Transport,
}

impl<'t> Call<'t> {
    pub fn new(request: Request, transport: &'t dyn Transport) -> Self {
        Self { request, transport }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Sends the request and returns the raw response.
    pub fn execute(&self) -> Result<Response, TransportError> {
        tracing::debug!(
            method = %self.request.method(),
            path = %self.request.path(),
            "sending request"
        );
        let response = self.transport.send(&self.request).map_err(|err| {
            tracing::warn!(error = %err, "request failed");
            err
        })?;
        tracing::debug!(status = response.status(), "received response");
        Ok(response)
    }

    /// Sends the request and deserializes the response body as `T`.
    pub fn execute_as<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        self.execute()?.json()
    }
}

impl std::fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
