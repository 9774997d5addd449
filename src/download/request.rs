//! Fetch requests and the attribution context that travels with them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::error::FetchError;

/// A caller-supplied description of one resource to retrieve.
///
/// Built once with the `with_*` methods and then handed by value to
/// [`Dispatcher::fetch`](super::Dispatcher::fetch), which consumes it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fetcher_core::download::FetchRequest;
///
/// let request = FetchRequest::parse("http://example.com/page#intro")
///     .unwrap()
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(request.wire_url().as_str(), "http://example.com/page");
/// assert_eq!(request.url().fragment(), Some("intro"));
/// ```
#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: Url,
    /// The caller's text before URL normalisation.
    raw: String,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl FetchRequest {
    /// Creates a `GET` request for the given URL.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            raw: url.as_str().to_string(),
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Parses `url` and creates a `GET` request for it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] if the URL cannot be parsed.
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_request(url, e.to_string()))?;
        Ok(Self {
            raw: url.to_string(),
            ..Self::new(parsed)
        })
    }

    /// Sets the request method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header, keeping any existing values for the same name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends a header given as strings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] if the name or value is not a
    /// valid HTTP header token.
    pub fn try_with_header(self, name: &str, value: &str) -> Result<Self, FetchError> {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
            FetchError::invalid_request(self.url.as_str(), format!("header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(value.trim()).map_err(|e| {
            FetchError::invalid_request(self.url.as_str(), format!("header value for '{name}': {e}"))
        })?;
        Ok(self.with_header(header_name, header_value))
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Overrides the process-wide download timeout for this request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The URL exactly as the caller supplied it, fragment included.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL text as the caller wrote it, without percent-encoding applied.
    ///
    /// Same as `url().as_str()` for requests built with [`FetchRequest::new`].
    #[must_use]
    pub fn raw_url(&self) -> &str {
        &self.raw
    }

    /// The URL scheme used for transport dispatch.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The URL sent on the wire: the caller URL with its fragment removed.
    #[must_use]
    pub fn wire_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The per-request timeout override, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Opaque attribution token identifying the logical requester.
///
/// The core never inspects it; it is handed to observers and recorded on
/// log spans so downstream consumers can attribute traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchContext {
    name: Arc<str>,
}

impl FetchContext {
    /// Creates a context with the given requester name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The requester name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::FetchErrorKind;

    #[test]
    fn test_parse_defaults_to_get_without_body() {
        let request = FetchRequest::parse("http://example.com/data").unwrap();
        assert_eq!(*request.method(), Method::GET);
        assert!(request.body().is_none());
        assert!(request.timeout().is_none());
        assert_eq!(request.scheme(), "http");
    }

    #[test]
    fn test_parse_rejects_relative_url() {
        let error = FetchRequest::parse("/just/a/path").unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::InvalidRequest);
    }

    #[test]
    fn test_wire_url_strips_fragment_but_url_keeps_it() {
        let request = FetchRequest::parse("http://example.test/page#section").unwrap();
        assert_eq!(request.wire_url().as_str(), "http://example.test/page");
        assert_eq!(request.url().as_str(), "http://example.test/page#section");
    }

    #[test]
    fn test_parse_keeps_raw_text_alongside_normalised_url() {
        let request = FetchRequest::parse("file:///tmp/my file.txt").unwrap();
        assert_eq!(request.raw_url(), "file:///tmp/my file.txt");
        assert_eq!(request.url().as_str(), "file:///tmp/my%20file.txt");

        let built = FetchRequest::new(Url::parse("http://example.com/a").unwrap());
        assert_eq!(built.raw_url(), "http://example.com/a");
    }

    #[test]
    fn test_try_with_header_appends_values() {
        let request = FetchRequest::parse("http://example.com/")
            .unwrap()
            .try_with_header("Accept", "text/html")
            .unwrap()
            .try_with_header("accept", "application/json")
            .unwrap();
        let values: Vec<_> = request.headers().get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_try_with_header_rejects_bad_name() {
        let error = FetchRequest::parse("http://example.com/")
            .unwrap()
            .try_with_header("bad header", "x")
            .unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::InvalidRequest);
        assert!(error.to_string().contains("bad header"));
    }

    #[test]
    fn test_context_display_is_name() {
        let ctx = FetchContext::new("spider-1");
        assert_eq!(ctx.to_string(), "spider-1");
        assert_eq!(ctx.clone(), ctx);
    }
}
