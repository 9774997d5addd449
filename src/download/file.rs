//! Local file transport for `file://` URLs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use super::classify::{ClassifyArgs, classify};
use super::constants::FILE_RESPONSE_STATUS;
use super::error::FetchError;
use super::handler::DownloadHandler;
use super::request::{FetchContext, FetchRequest};
use super::response::Response;

const FILE_URL_PREFIX: &str = "file://";

/// Reads `file://` URLs from the local filesystem.
///
/// Responses carry status `200`, no headers, and a kind derived from the
/// filename and body. No notifications are fired.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDownloadHandler;

impl FileDownloadHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Extracts the filesystem path from a `file://` URL as the caller wrote it.
///
/// Takes the text after the `file://` prefix, up to any fragment. Nothing is
/// decoded: `my%20file.txt` names a file with a literal `%20`.
pub(crate) fn path_from_file_url(raw: &str) -> PathBuf {
    let rest = raw.strip_prefix(FILE_URL_PREFIX).unwrap_or(raw);
    let path = rest.split_once('#').map_or(rest, |(path, _)| path);
    PathBuf::from(path)
}

async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut body = Vec::new();
    file.read_to_end(&mut body).await?;
    Ok(body)
}

#[async_trait]
impl DownloadHandler for FileDownloadHandler {
    fn name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip(self, request, ctx), fields(url = %request.url(), context = %ctx))]
    async fn download(
        &self,
        request: &FetchRequest,
        ctx: &FetchContext,
    ) -> Result<Response, FetchError> {
        let path = path_from_file_url(request.raw_url());
        let body = read_file(&path)
            .await
            .map_err(|e| FetchError::file_access(path.clone(), e))?;

        let filename = path.to_string_lossy();
        let kind = classify(&ClassifyArgs {
            filename: Some(&*filename),
            body: Some(body.as_slice()),
            ..ClassifyArgs::default()
        });
        debug!(path = %path.display(), bytes = body.len(), %kind, "file read");

        Ok(Response::new(
            request.url().clone(),
            FILE_RESPONSE_STATUS,
            HeaderMap::new(),
            body,
            kind,
        ))
    }
}
