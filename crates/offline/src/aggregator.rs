use crate::failure::OfflineFailure;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Label used in warnings until the host sets its own.
pub const DEFAULT_BACKEND: &str = "Happy server";

/// How long failures are collected after going offline before the warning
/// is printed.
pub const DEFAULT_FLUSH_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineMode {
    Online,
    Offline,
}

/// Destination of the consolidated offline warning.
pub trait WarningSink: Send + Sync {
    fn emit(&self, lines: &[String]);
}

/// Prints warnings to stdout.
pub struct StdoutSink;

impl WarningSink for StdoutSink {
    fn emit(&self, lines: &[String]) {
        for line in lines {
            println!("{}", line);
        }
    }
}

struct Inner {
    mode: OfflineMode,
    // Keyed by operation; kept in first-report order for stable output.
    failures: Vec<OfflineFailure>,
    backend: String,
    // Bumped on every online-to-offline transition so a stale flush never
    // prints for a later outage.
    outage: u64,
    flush_pending: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            mode: OfflineMode::Online,
            failures: Vec::new(),
            backend: DEFAULT_BACKEND.to_string(),
            outage: 0,
            flush_pending: false,
        }
    }

    fn record(&mut self, failure: OfflineFailure) {
        match self
            .failures
            .iter_mut()
            .find(|existing| existing.operation == failure.operation)
        {
            Some(existing) => *existing = failure,
            None => self.failures.push(failure),
        }
    }

    fn render(&self) -> Vec<String> {
        let summaries: Vec<String> = self.failures.iter().map(OfflineFailure::summary).collect();
        let mut lines = vec![format!(
            "⚠️  {} unreachable, offline mode with auto-reconnect enabled - error details: {}",
            self.backend,
            summaries.join("; ")
        )];
        lines.extend(
            self.failures
                .iter()
                .flat_map(|failure| failure.details.iter())
                .map(|detail| format!("   → {}", detail)),
        );
        lines
    }

    /// Render the pending warning and mark it printed.
    fn take_pending(&mut self) -> Option<Vec<String>> {
        if !self.flush_pending {
            return None;
        }
        self.flush_pending = false;
        Some(self.render())
    }
}

struct Shared {
    inner: Mutex<Inner>,
    sink: Arc<dyn WarningSink>,
}

impl Shared {
    /// Timer callback: print the warning for `outage` unless it was already
    /// printed or superseded.
    fn flush_outage(&self, outage: u64) {
        let lines = {
            let mut inner = self.inner.lock();
            if inner.outage != outage {
                return;
            }
            inner.take_pending()
        };
        if let Some(lines) = lines {
            self.emit(&lines);
        }
    }

    fn emit(&self, lines: &[String]) {
        if let Some(headline) = lines.first() {
            warn!("{}", headline);
        }
        self.sink.emit(lines);
    }
}

/// Shared offline-mode reporter.
///
/// Construct one per process and hand out `Arc<OfflineState>` to every
/// component that talks to the server.
///
/// The first failure of an outage opens a short collection window. Every
/// failure reported before it closes lands in the one consolidated warning;
/// later failures are recorded silently. Inside a Tokio runtime the window is
/// a spawned task, elsewhere a timer thread. A zero window prints
/// immediately.
pub struct OfflineState {
    shared: Arc<Shared>,
    flush_window: Duration,
}

impl Default for OfflineState {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineState {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(StdoutSink))
    }

    pub fn with_sink(sink: Arc<dyn WarningSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::new()),
                sink,
            }),
            flush_window: DEFAULT_FLUSH_WINDOW,
        }
    }

    pub fn with_flush_window(mut self, flush_window: Duration) -> Self {
        self.flush_window = flush_window;
        self
    }

    pub fn flush_window(&self) -> Duration {
        self.flush_window
    }

    /// Name of the server shown in warnings.
    pub fn set_backend(&self, backend: impl Into<String>) {
        self.shared.inner.lock().backend = backend.into();
    }

    pub fn backend(&self) -> String {
        self.shared.inner.lock().backend.clone()
    }

    /// Record a failure. Returns true when this call took the state offline
    /// and so scheduled the outage's single warning.
    pub fn fail(&self, failure: OfflineFailure) -> bool {
        let outage = {
            let mut inner = self.shared.inner.lock();
            debug!(
                "Offline failure reported: operation={}, caller={:?}, code={:?}",
                failure.operation, failure.caller, failure.error_code
            );
            inner.record(failure);

            if inner.mode == OfflineMode::Offline {
                return false;
            }
            inner.mode = OfflineMode::Offline;
            inner.outage += 1;
            inner.flush_pending = true;
            inner.outage
        };

        if self.flush_window.is_zero() {
            self.shared.flush_outage(outage);
        } else {
            self.schedule_flush(outage);
        }
        true
    }

    fn schedule_flush(&self, outage: u64) {
        let shared = Arc::clone(&self.shared);
        let window = self.flush_window;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(window).await;
                    shared.flush_outage(outage);
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(window);
                    shared.flush_outage(outage);
                });
            }
        }
    }

    /// Print the pending warning now instead of waiting for the window.
    /// Returns whether anything was printed.
    pub fn flush(&self) -> bool {
        let lines = self.shared.inner.lock().take_pending();
        match lines {
            Some(lines) => {
                self.shared.emit(&lines);
                true
            }
            None => false,
        }
    }

    /// Connectivity is back: forget failures and re-arm the warning.
    ///
    /// A warning still inside its collection window is printed first, so
    /// every outage produces exactly one.
    pub fn recover(&self) {
        let pending = {
            let mut inner = self.shared.inner.lock();
            if inner.mode == OfflineMode::Offline {
                debug!("Leaving offline mode");
            }
            let pending = inner.take_pending();
            inner.mode = OfflineMode::Online;
            inner.failures.clear();
            pending
        };
        if let Some(lines) = pending {
            self.shared.emit(&lines);
        }
    }

    pub fn is_offline(&self) -> bool {
        self.shared.inner.lock().mode == OfflineMode::Offline
    }

    pub fn mode(&self) -> OfflineMode {
        self.shared.inner.lock().mode
    }

    /// Back to the freshly constructed state, backend label included. A
    /// pending warning is dropped.
    pub fn reset(&self) {
        let mut inner = self.shared.inner.lock();
        let outage = inner.outage;
        *inner = Inner::new();
        inner.outage = outage;
    }

    /// Failures recorded during the current outage.
    pub fn failures(&self) -> Vec<OfflineFailure> {
        self.shared.inner.lock().failures.clone()
    }

    /// Warning lines for the failures currently recorded, or nothing when
    /// there are none.
    pub fn render_warning(&self) -> Vec<String> {
        let inner = self.shared.inner.lock();
        if inner.failures.is_empty() {
            return Vec::new();
        }
        inner.render()
    }
}
