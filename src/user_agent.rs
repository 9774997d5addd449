//! Default User-Agent for network transports.

/// Default User-Agent for HTTP and HTTPS fetches (identifies the tool).
#[must_use]
pub(crate) fn default_fetch_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fetcher/{version}")
}

/// The configured override if present, otherwise the default.
#[must_use]
pub(crate) fn resolve_user_agent(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map_or_else(default_fetch_user_agent, str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_carries_crate_version() {
        let ua = default_fetch_user_agent();
        assert_eq!(
            ua.strip_prefix("fetcher/"),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must be fetcher/<version>: {ua}"
        );
    }

    #[test]
    fn test_resolve_prefers_non_empty_override() {
        assert_eq!(resolve_user_agent(Some("probe/2")), "probe/2");
        assert_eq!(resolve_user_agent(Some("  ")), default_fetch_user_agent());
        assert_eq!(resolve_user_agent(None), default_fetch_user_agent());
    }
}
