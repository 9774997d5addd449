//! CLI entry point for the fetcher tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fetcher_core::download::{
    Dispatcher, FetchContext, FetchError, FetchRequest, LogObserver, ResolutionCache, Response,
    Signals,
};
use fetcher_core::settings::FetchSettings;
use futures_util::future::join_all;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    if args.output.is_some() && args.urls.len() > 1 {
        bail!("--output can only be used with a single URL");
    }

    let mut settings = match &args.config {
        Some(path) => FetchSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => FetchSettings::load_default().context("failed to load default settings")?,
    };
    if args.no_tls {
        settings.tls_enabled = false;
    }

    let method = Method::from_bytes(args.effective_method().as_bytes())
        .with_context(|| format!("invalid method '{}'", args.effective_method()))?;

    let signals = Signals::new();
    signals.connect(Arc::new(LogObserver));
    let dispatcher = Dispatcher::new(settings, Arc::new(ResolutionCache::system()), signals)
        .context("failed to initialise dispatcher")?;
    let ctx = FetchContext::new(args.context.as_str());

    info!(urls = args.urls.len(), "fetching");
    let outcomes = join_all(args.urls.iter().map(|url| {
        let request = build_request(url, &method, &args);
        let ctx = ctx.clone();
        let dispatcher = &dispatcher;
        async move { dispatcher.fetch(request?, ctx).await }
    }))
    .await;

    let mut failed = 0usize;
    for (url, outcome) in args.urls.iter().zip(&outcomes) {
        if outcome.is_err() {
            failed += 1;
        }
        print_outcome(url, outcome, args.json);
    }

    let succeeded = outcomes.len() - failed;
    if let (Some(path), Some(Ok(response))) = (&args.output, outcomes.into_iter().next()) {
        let body = response.into_body();
        tokio::fs::write(path, &body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = body.len(), "body written");
    }

    info!(
        succeeded,
        failed,
        cached_hosts = dispatcher.resolution_cache().len(),
        "done"
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_request(url: &str, method: &Method, args: &Args) -> Result<FetchRequest, FetchError> {
    let mut request = FetchRequest::parse(url)?.with_method(method.clone());
    for (name, value) in &args.headers {
        request = request.try_with_header(name, value)?;
    }
    if let Some(data) = &args.data {
        request = request.with_body(data.as_bytes());
    }
    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    Ok(request)
}

fn print_outcome(url: &str, outcome: &Result<Response, FetchError>, as_json: bool) {
    match (outcome, as_json) {
        (Ok(response), true) => println!(
            "{}",
            json!({
                "url": url,
                "ok": true,
                "status": response.status(),
                "kind": response.kind(),
                "bytes": response.body().len(),
            })
        ),
        (Err(error), true) => println!(
            "{}",
            json!({
                "url": url,
                "ok": false,
                "error": error.kind().as_str(),
                "message": error.to_string(),
            })
        ),
        (Ok(response), false) => println!(
            "{} {} {} bytes {url}",
            response.status(),
            response.kind(),
            response.body().len()
        ),
        (Err(error), false) => println!("error[{}] {url}: {error}", error.kind()),
    }
}
