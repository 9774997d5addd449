//! Transport strategy trait.

use async_trait::async_trait;

use super::error::FetchError;
use super::request::{FetchContext, FetchRequest};
use super::response::Response;

/// A transport capable of fetching URLs of one or more schemes.
///
/// Implementations are registered with the
/// [`Dispatcher`](super::Dispatcher), which owns the effective timeout and
/// cancellation; `download` only needs to produce the response.
#[async_trait]
pub trait DownloadHandler: Send + Sync {
    /// Short transport name, used as the notification sender tag.
    fn name(&self) -> &'static str;

    /// Fetches `request` and returns the fully buffered response.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] variant matching the failure.
    async fn download(
        &self,
        request: &FetchRequest,
        ctx: &FetchContext,
    ) -> Result<Response, FetchError>;
}
