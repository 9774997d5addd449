//! Fully buffered responses produced by every transport.
//!
//! A [`Response`] is only constructed once the complete body is available.
//! Its [`ResponseKind`] is assigned by the classifier and tells consumers
//! how to interpret the bytes.
//!
//! ## Notes
//! - `headers` is a case-insensitive multimap. File responses have none.
//! - `url` is the caller's URL, fragment included. The fragment is never
//!   sent on the wire.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Content classification of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Opaque bytes. Also the fallback when classification is inconclusive.
    #[default]
    Binary,
    /// Generic text.
    Text,
    /// HTML or XHTML markup.
    Html,
    /// XML documents and feeds.
    Xml,
    /// JSON documents.
    Json,
}

impl ResponseKind {
    /// Returns the stable label for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::Html => "html",
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    /// Returns true if the body should be decoded as text.
    #[must_use]
    pub fn is_textual(self) -> bool {
        !matches!(self, Self::Binary)
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed response.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    kind: ResponseKind,
}

impl Response {
    /// Creates a response from its parts.
    #[must_use]
    pub fn new(url: Url, status: u16, headers: HeaderMap, body: Vec<u8>, kind: ResponseKind) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            kind,
        }
    }

    /// The request URL this response answers (fragment preserved).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Numeric status code. `200` for file responses.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the response and returns the body.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Classifier-assigned kind.
    #[must_use]
    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Charset declared in the `Content-Type` header, lowercased.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        let content_type = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        charset_param(content_type)
    }

    /// Decodes the body as text using the declared charset.
    ///
    /// A byte order mark wins over the declared charset. Unknown or missing
    /// labels fall back to UTF-8. Malformed sequences become U+FFFD.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        let encoding = self
            .charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.body);
        text
    }

    /// Deserialises the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Extracts the `charset` parameter of a media type.
pub(crate) fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    })
}
