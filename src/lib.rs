//! Fetcher Core Library
//!
//! A URL-scheme-dispatched download core: callers submit a request and a
//! context, and get back a pending result that settles with a classified,
//! fully buffered response or a typed error.
//!
//! # Architecture
//!
//! - [`download`] - dispatcher, transports, resolution cache, classifier, notifications
//! - [`settings`] - process-wide fetch settings loaded from TOML

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod settings;
mod user_agent;

// Re-export commonly used types
pub use download::{
    Dispatcher, DispatcherError, FetchContext, FetchError, FetchErrorKind, FetchRequest,
    PendingFetch, ResolutionCache, Response, ResponseKind, Signals,
};
pub use settings::{FetchSettings, SettingsError};
