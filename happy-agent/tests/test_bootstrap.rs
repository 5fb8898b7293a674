#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use happy_agent::{supervise, Bootstrap, Config, Startup};
use happy_offline::{OfflineState, WarningSink};
use happy_reconnect::ReconnectionState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct CaptureSink {
    warnings: Mutex<Vec<Vec<String>>>,
}

impl WarningSink for CaptureSink {
    fn emit(&self, lines: &[String]) {
        self.warnings.lock().unwrap().push(lines.to_vec());
    }
}

#[derive(Default)]
struct Traffic {
    gets: AtomicUsize,
    posts: AtomicUsize,
}

/// Reads one full request and returns its method.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buffer = [0u8; 1024];
    loop {
        let n = socket.read(&mut buffer).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        let text = String::from_utf8_lossy(&request);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&request)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Sync server stand-in. The first session request hits a server that is
/// still starting (503); after that the server is up but rejects the
/// credentials on every session request, while the unauthenticated
/// reachability probe sees a plain 401.
async fn spawn_server(traffic: Arc<Traffic>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let traffic = Arc::clone(&traffic);
            tokio::spawn(async move {
                let method = read_request(&mut socket).await;
                let status_line = if method == "POST" {
                    match traffic.posts.fetch_add(1, Ordering::SeqCst) {
                        0 => "503 Service Unavailable",
                        _ => "401 Unauthorized",
                    }
                } else {
                    traffic.gets.fetch_add(1, Ordering::SeqCst);
                    "401 Unauthorized"
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });
    format!("http://{}", addr)
}

fn fast_config(server_url: &str) -> Config {
    Config {
        server_url: server_url.to_string(),
        initial_delay_ms: 20,
        min_delay_ms: 20,
        max_delay_ms: 40,
        auth_token: Some("expired-token".to_string()),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_rejected_credentials_end_offline_run() {
    let traffic = Arc::new(Traffic::default());
    let server_url = spawn_server(Arc::clone(&traffic)).await;
    let config = fast_config(&server_url);

    let sink = Arc::new(CaptureSink::default());
    let offline = Arc::new(OfflineState::with_sink(sink.clone()));
    let bootstrap = Bootstrap::from_config(&config, Arc::clone(&offline));

    let handle = match bootstrap.start(&config).await {
        Startup::Offline(handle) => handle,
        Startup::Online(_) => panic!("Expected offline start"),
    };

    let state = tokio::time::timeout(Duration::from_secs(10), supervise(&handle, &offline))
        .await
        .unwrap();

    assert_eq!(state, ReconnectionState::AuthFailed);
    assert!(!handle.is_reconnected());
    assert_eq!(handle.failures(), 0);
    assert!(offline.is_offline());

    // Reachability probe once, then the session request that was rejected.
    assert_eq!(traffic.gets.load(Ordering::SeqCst), 1);
    assert_eq!(traffic.posts.load(Ordering::SeqCst), 2);

    offline.flush();
    let warnings = sink.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0][0].contains("Session creation failed: 503 - service unavailable"));
}
