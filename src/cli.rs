//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch URLs through the scheme-dispatched download core.
///
/// Supports http://, https:// and file:// URLs. Every URL is fetched
/// concurrently and summarised on its own line.
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to fetch
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Request method (defaults to GET, or POST when --data is given)
    #[arg(short = 'X', long)]
    pub method: Option<String>,

    /// Extra request header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Per-request timeout in seconds (1-3600), overrides the configured default
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Disable the https transport
    #[arg(long)]
    pub no_tls: bool,

    /// Settings file (defaults to $XDG_CONFIG_HOME/fetcher/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Requester name attached to notifications and log spans
    #[arg(long, default_value = "cli")]
    pub context: String,

    /// Print one JSON object per URL instead of a summary line
    #[arg(long)]
    pub json: bool,

    /// Write the response body to this file (single URL only)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The method to send: explicit, else POST with a body, else GET.
    #[must_use]
    pub fn effective_method(&self) -> &str {
        match (&self.method, &self.data) {
            (Some(method), _) => method,
            (None, Some(_)) => "POST",
            (None, None) => "GET",
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got \"{raw}\""))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in \"{raw}\""));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_url_parses_with_defaults() {
        let args = Args::try_parse_from(["fetcher", "http://example.com/"]).unwrap();
        assert_eq!(args.urls, vec!["http://example.com/"]);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.json);
        assert!(!args.no_tls);
        assert_eq!(args.context, "cli");
        assert_eq!(args.effective_method(), "GET");
    }

    #[test]
    fn test_cli_requires_url() {
        let err = Args::try_parse_from(["fetcher"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["fetcher", "-vv", "file:///tmp/x"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_headers_are_split_and_trimmed() {
        let args = Args::try_parse_from([
            "fetcher",
            "-H",
            "Accept: application/json",
            "--header",
            "X-Trace:abc",
            "http://example.com/",
        ])
        .unwrap();
        assert_eq!(
            args.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_cli_header_without_colon_is_rejected() {
        let err = Args::try_parse_from(["fetcher", "-H", "Accept", "http://example.com/"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_data_implies_post_unless_method_given() {
        let args = Args::try_parse_from(["fetcher", "-d", "a=1", "http://example.com/"]).unwrap();
        assert_eq!(args.effective_method(), "POST");

        let args =
            Args::try_parse_from(["fetcher", "-X", "PUT", "-d", "a=1", "http://example.com/"])
                .unwrap();
        assert_eq!(args.effective_method(), "PUT");
    }

    #[test]
    fn test_cli_timeout_range() {
        let args = Args::try_parse_from(["fetcher", "-t", "5", "http://example.com/"]).unwrap();
        assert_eq!(args.timeout, Some(5));

        let err = Args::try_parse_from(["fetcher", "-t", "0", "http://example.com/"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_multiple_urls_and_flags() {
        let args = Args::try_parse_from([
            "fetcher",
            "--json",
            "--no-tls",
            "--context",
            "crawler-7",
            "http://a.test/",
            "file:///tmp/b.txt",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 2);
        assert!(args.json);
        assert!(args.no_tls);
        assert_eq!(args.context, "crawler-7");
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["fetcher", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
