//! Provider health tracking — rolling-window error rate monitoring.
//!
//! Tracks per-provider request outcomes in a fixed-size ring buffer. When a
//! provider's error rate exceeds the threshold it is marked degraded, a
//! `provider_degraded` gauge is set, and the periodic sweep turns the
//! provider off in [`EnabledProviders`] until it recovers. The engine only
//! reads the flags; this module is the single writer.

use std::collections::HashMap;
use std::sync::Mutex;

use mosaic_core::messages::ProviderKind;
use mosaic_settings::EnabledProviders;
use tracing::{info, warn};

/// Default window size for tracking recent requests.
const DEFAULT_WINDOW_SIZE: usize = 10;

/// Default error rate threshold (50%) to mark a provider as degraded.
const DEFAULT_DEGRADED_THRESHOLD: f64 = 0.5;

/// Per-provider health tracker.
///
/// Thread-safe (interior `Mutex`). Create one at startup and share via
/// `Arc<ProviderHealthTracker>`.
pub struct ProviderHealthTracker {
    inner: Mutex<Inner>,
    window_size: usize,
    threshold: f64,
}

struct Inner {
    /// Per-provider ring buffers: `true` = success, `false` = failure.
    providers: HashMap<ProviderKind, ProviderWindow>,
}

struct ProviderWindow {
    outcomes: Vec<bool>,
    cursor: usize,
    total: usize,
}

impl ProviderWindow {
    fn new(size: usize) -> Self {
        Self {
            outcomes: vec![true; size],
            cursor: 0,
            total: 0,
        }
    }

    fn record(&mut self, success: bool) {
        self.outcomes[self.cursor] = success;
        self.cursor = (self.cursor + 1) % self.outcomes.len();
        self.total += 1;
    }

    #[allow(clippy::cast_precision_loss)] // window size is tiny
    fn error_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.outcomes.len().min(self.total);
        let failures = self.outcomes[..count].iter().filter(|&&ok| !ok).count();
        failures as f64 / count as f64
    }
}

impl ProviderHealthTracker {
    /// Create a new tracker with default settings.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_WINDOW_SIZE, DEFAULT_DEGRADED_THRESHOLD)
    }

    /// Create a tracker with custom window size and threshold.
    pub fn with_config(window_size: usize, threshold: f64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                providers: HashMap::new(),
            }),
            window_size: window_size.max(1),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Record a successful request for a provider.
    pub fn record_success(&self, provider: ProviderKind) {
        self.record(provider, true);
    }

    /// Record a failed request for a provider.
    pub fn record_failure(&self, provider: ProviderKind) {
        self.record(provider, false);
    }

    /// Check if a provider is currently degraded (error rate above threshold).
    pub fn is_degraded(&self, provider: ProviderKind) -> bool {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .providers
            .get(&provider)
            .is_some_and(|w| w.total >= 2 && w.error_rate() > self.threshold)
    }

    /// Current error rate for a provider (0.0–1.0).
    pub fn error_rate(&self, provider: ProviderKind) -> f64 {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .providers
            .get(&provider)
            .map_or(0.0, ProviderWindow::error_rate)
    }

    /// Refresh provider availability from current health.
    ///
    /// Disables degraded providers and re-enables recovered ones that still
    /// have credentials (`configured` is the key-presence baseline from
    /// startup). Call this from the periodic health sweep.
    pub fn refresh_enabled(&self, configured: EnabledProviders, enabled: &mut EnabledProviders) {
        for kind in ProviderKind::all() {
            let want = configured.is_enabled(kind) && !self.is_degraded(kind);
            if want != enabled.is_enabled(kind) {
                info!(provider = %kind, enabled = want, "provider availability changed");
                enabled.set_enabled(kind, want);
            }
        }
    }

    fn record(&self, provider: ProviderKind, success: bool) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = inner
            .providers
            .entry(provider)
            .or_insert_with(|| ProviderWindow::new(self.window_size));
        window.record(success);

        let rate = window.error_rate();
        let degraded = window.total >= 2 && rate > self.threshold;

        let gauge_val = if degraded { 1.0 } else { 0.0 };
        metrics::gauge!("provider_degraded", "provider" => provider.as_str()).set(gauge_val);

        if degraded && !success {
            warn!(
                provider = %provider,
                error_rate = format!("{:.0}%", rate * 100.0),
                window = self.window_size,
                "provider degraded — high error rate"
            );
        }
    }
}

impl std::fmt::Debug for ProviderHealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHealthTracker")
            .field("window_size", &self.window_size)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
