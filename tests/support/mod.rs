//! Shared helpers for dispatcher integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fetcher_core::download::{
    Dispatcher, FetchContext, FetchObserver, HostResolver, Notification, ObserverError,
    ResolutionCache, Signal, Signals,
};
use fetcher_core::settings::FetchSettings;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::MockServer;

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("FETCHER_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if StdTcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; socket-based test cannot run in this environment",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!("{message}. Set FETCHER_REQUIRE_SOCKET_TESTS=0 to allow local skip behavior.");
    }

    eprintln!("{message}. Skipping test. Set FETCHER_REQUIRE_SOCKET_TESTS=1 to fail-fast instead.");
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}

/// Resolver backed by a fixed table that counts every lookup.
///
/// Unknown names fail with `NotFound`.
#[derive(Default)]
pub struct CountingResolver {
    table: HashMap<String, IpAddr>,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn with_hosts(hosts: &[&str]) -> Arc<Self> {
        let table = hosts
            .iter()
            .map(|host| ((*host).to_string(), IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .collect();
        Arc::new(Self {
            table,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for CountingResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(host)
            .map(|ip| vec![*ip])
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown host {host}")))
    }
}

/// One delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub signal: Signal,
    pub sender: String,
    pub context: String,
    pub url: String,
}

/// Observer that records every notification in delivery order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.events().into_iter().map(|e| e.signal).collect()
    }
}

impl FetchObserver for RecordingObserver {
    fn on_notification(
        &self,
        notification: &Notification<'_>,
        ctx: &FetchContext,
        sender: &str,
    ) -> Result<(), ObserverError> {
        let url = match notification {
            Notification::RequestUploaded { request } => request.url().to_string(),
            Notification::ResponseDownloaded { response } => response.url().to_string(),
        };
        self.events.lock().unwrap().push(Recorded {
            signal: notification.signal(),
            sender: sender.to_string(),
            context: ctx.name().to_string(),
            url,
        });
        Ok(())
    }
}

/// Observer that always returns an error.
pub struct FailingObserver;

impl FetchObserver for FailingObserver {
    fn on_notification(
        &self,
        _notification: &Notification<'_>,
        _ctx: &FetchContext,
        _sender: &str,
    ) -> Result<(), ObserverError> {
        Err("observer rejected notification".into())
    }
}

/// Observer that always panics.
pub struct PanickingObserver;

impl FetchObserver for PanickingObserver {
    fn on_notification(
        &self,
        _notification: &Notification<'_>,
        _ctx: &FetchContext,
        _sender: &str,
    ) -> Result<(), ObserverError> {
        panic!("observer blew up");
    }
}

/// Dispatcher wired to a counting resolver and a recording observer.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub resolver: Arc<CountingResolver>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(settings: FetchSettings, hosts: &[&str]) -> Self {
        Self::with_signals(settings, hosts, Signals::new())
    }

    pub fn with_signals(settings: FetchSettings, hosts: &[&str], signals: Signals) -> Self {
        let resolver = CountingResolver::with_hosts(hosts);
        let observer = Arc::new(RecordingObserver::default());
        signals.connect(observer.clone());
        let cache = Arc::new(ResolutionCache::new(resolver.clone()));
        let dispatcher = Dispatcher::new(settings, cache, signals).unwrap();
        Self {
            dispatcher,
            resolver,
            observer,
        }
    }

    pub fn ctx() -> FetchContext {
        FetchContext::new("integration")
    }
}

/// Plain TCP server that answers anything (including a TLS ClientHello)
/// with a plaintext HTTP error and closes. Returns its address.
pub async fn start_plaintext_server() -> Option<SocketAddr> {
    if should_skip_socket_bound_test() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });
    Some(addr)
}
