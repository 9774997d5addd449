//! Response classification from headers, names, and body content.
//!
//! [`classify`] picks the [`ResponseKind`] used to wrap downloaded bytes.
//! Rules are applied in order and the first conclusive one wins:
//!
//! 1. `Content-Type` header (generic types like `application/octet-stream`
//!    are inconclusive)
//! 2. `Content-Disposition` filename extension
//! 3. explicit filename extension, then URL path extension
//! 4. sniffing the first [`BODY_SNIFF_LEN`] bytes of the body
//!
//! When nothing matches, [`classify_strict`] reports
//! [`FetchError::ClassificationAmbiguous`] and [`classify`] falls back to
//! [`ResponseKind::Binary`].
//!
//! # Example
//!
//! ```
//! use fetcher_core::download::{ClassifyArgs, ResponseKind, classify};
//!
//! let kind = classify(&ClassifyArgs {
//!     filename: Some("/tmp/notes.txt"),
//!     body: Some(b"hello".as_slice()),
//!     ..ClassifyArgs::default()
//! });
//! assert_eq!(kind, ResponseKind::Text);
//! ```

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use tracing::debug;
use url::Url;

use super::constants::BODY_SNIFF_LEN;
use super::error::FetchError;
use super::response::ResponseKind;

/// Inputs available to the classifier. Every field is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyArgs<'a> {
    /// Response headers (network transports only).
    pub headers: Option<&'a HeaderMap>,
    /// URL of the resource.
    pub url: Option<&'a Url>,
    /// Local filename (file transport only).
    pub filename: Option<&'a str>,
    /// Body bytes.
    pub body: Option<&'a [u8]>,
}

/// Media types that say nothing about the payload.
const GENERIC_MIME_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/x-download",
    "application/force-download",
    "application/unknown",
];

/// Classifies a response, falling back to [`ResponseKind::Binary`].
///
/// Pure and deterministic: identical arguments always give the same kind.
#[must_use]
pub fn classify(args: &ClassifyArgs<'_>) -> ResponseKind {
    classify_strict(args).unwrap_or_else(|error| {
        debug!(error = %error, "classification ambiguous, using default kind");
        ResponseKind::default()
    })
}

/// Classifies a response, reporting when no rule was conclusive.
///
/// # Errors
///
/// Returns [`FetchError::ClassificationAmbiguous`] if headers, names, and
/// body all fail to identify the content.
pub fn classify_strict(args: &ClassifyArgs<'_>) -> Result<ResponseKind, FetchError> {
    if let Some(headers) = args.headers {
        if let Some(kind) = from_content_type_header(headers) {
            return Ok(kind);
        }
        if let Some(kind) = from_content_disposition(headers) {
            return Ok(kind);
        }
    }
    if let Some(kind) = args.filename.and_then(from_filename) {
        return Ok(kind);
    }
    if let Some(kind) = args.url.and_then(from_url) {
        return Ok(kind);
    }
    if let Some(kind) = args.body.and_then(from_body) {
        return Ok(kind);
    }

    let target = args
        .url
        .map(|u| u.as_str().to_string())
        .or_else(|| args.filename.map(str::to_string))
        .unwrap_or_else(|| "<unnamed>".to_string());
    Err(FetchError::classification_ambiguous(target))
}

fn from_content_type_header(headers: &HeaderMap) -> Option<ResponseKind> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    from_mime_type(value)
}

/// Maps a media type (parameters allowed) to a kind.
///
/// Returns `None` for generic or unrecognised types so later rules can run.
pub(crate) fn from_mime_type(content_type: &str) -> Option<ResponseKind> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime.is_empty() || GENERIC_MIME_TYPES.contains(&mime.as_str()) {
        return None;
    }

    let kind = match mime.as_str() {
        "text/html" | "application/xhtml+xml" | "application/vnd.wap.xhtml+xml" => ResponseKind::Html,
        "application/xml" | "text/xml" | "application/atom+xml" | "application/rdf+xml"
        | "application/rss+xml" => ResponseKind::Xml,
        "application/json" | "application/x-json" | "text/json" => ResponseKind::Json,
        "application/javascript" | "application/x-javascript" | "application/ecmascript" => {
            ResponseKind::Text
        }
        m if m.ends_with("+json") => ResponseKind::Json,
        m if m.ends_with("+xml") && !m.starts_with("image/") => ResponseKind::Xml,
        m if m.starts_with("text/") => ResponseKind::Text,
        m if m.starts_with("image/")
            || m.starts_with("audio/")
            || m.starts_with("video/")
            || m.starts_with("font/") =>
        {
            ResponseKind::Binary
        }
        "application/pdf" | "application/zip" | "application/gzip" | "application/x-gzip"
        | "application/x-tar" | "application/msword" | "application/epub+zip" => {
            ResponseKind::Binary
        }
        _ => return None,
    };
    Some(kind)
}

fn from_content_disposition(headers: &HeaderMap) -> Option<ResponseKind> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let filename = disposition_filename(value)?;
    from_filename(&filename)
}

/// Extracts the `filename` parameter of a Content-Disposition header.
///
/// Only the extension matters here, so RFC 5987 `filename*=` values are used
/// without percent-decoding.
fn disposition_filename(header: &str) -> Option<String> {
    header.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        let name = name.trim().to_ascii_lowercase();
        if name != "filename" && name != "filename*" {
            return None;
        }
        let value = value.trim();
        let value = value.rsplit("''").next().unwrap_or(value);
        let value = value.trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn from_url(url: &Url) -> Option<ResponseKind> {
    let last_segment = url.path_segments()?.next_back()?;
    from_filename(last_segment)
}

/// Maps a filename or path by its extension.
pub(crate) fn from_filename(name: &str) -> Option<ResponseKind> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }

    let kind = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" | "xhtml" | "shtml" => ResponseKind::Html,
        "xml" | "rss" | "atom" | "rdf" | "xsl" | "xsd" => ResponseKind::Xml,
        "json" | "jsonld" | "geojson" => ResponseKind::Json,
        "txt" | "text" | "csv" | "tsv" | "md" | "css" | "js" | "log" | "ini" | "toml" | "yaml"
        | "yml" => ResponseKind::Text,
        "pdf" | "png" | "jpg" | "jpeg" | "gif" | "webp" | "ico" | "zip" | "gz" | "tgz" | "bz2"
        | "xz" | "tar" | "7z" | "exe" | "bin" | "mp3" | "mp4" | "avi" | "mov" | "woff" | "woff2"
        | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "epub" => ResponseKind::Binary,
        _ => return None,
    };
    Some(kind)
}

/// Sniffs leading body bytes.
pub(crate) fn from_body(body: &[u8]) -> Option<ResponseKind> {
    if body.is_empty() {
        return None;
    }
    let chunk = &body[..body.len().min(BODY_SNIFF_LEN)];
    if looks_binary(chunk) {
        return Some(ResponseKind::Binary);
    }

    let lowered = chunk.to_ascii_lowercase();
    if contains(&lowered, b"<html") {
        return Some(ResponseKind::Html);
    }
    if lowered.trim_ascii_start().starts_with(b"<?xml") {
        return Some(ResponseKind::Xml);
    }
    if looks_like_json(body) {
        return Some(ResponseKind::Json);
    }
    Some(ResponseKind::Text)
}

/// True when the chunk holds control bytes that never appear in text.
fn looks_binary(chunk: &[u8]) -> bool {
    chunk
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}

fn looks_like_json(body: &[u8]) -> bool {
    let trimmed = body.trim_ascii();
    matches!(trimmed.first(), Some(b'{' | b'['))
        && serde_json::from_slice::<serde::de::IgnoredAny>(trimmed).is_ok()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
