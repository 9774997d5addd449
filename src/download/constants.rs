//! Constants for the download module (timeouts, sniffing, file responses).

/// Default whole-fetch timeout (3 minutes).
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 180;

/// Default TCP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Upper bound accepted for any configured timeout (1 hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Status reported for `file://` responses, which have no real status line.
pub const FILE_RESPONSE_STATUS: u16 = 200;

/// Number of leading body bytes inspected when sniffing content.
pub const BODY_SNIFF_LEN: usize = 5000;

/// Default port for plain HTTP.
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// Default port for HTTP over TLS.
pub const HTTPS_DEFAULT_PORT: u16 = 443;
