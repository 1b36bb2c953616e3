//! Logging, metrics, and crash reporting for the Galileo runtime.
//!
//! The runtime itself never decides *how* to log — it calls into `tracing`
//! the way every other crate in this workspace does, and this crate owns the
//! one-time process bootstrap (`init_observability`) plus a small histogram-
//! backed counter set that the physics step and orchestrator tick use to
//! record per-frame timings without pulling in a full metrics backend.

use anyhow::Result;
use dashmap::DashMap;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for the observability stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub tracing_level: String,
    pub metrics_enabled: bool,
    pub crash_reporting_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            tracing_level: "INFO".to_string(),
            metrics_enabled: true,
            crash_reporting_enabled: true,
        }
    }
}

/// Initialize tracing with JSON output and env-filter based level selection.
fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let level = match config.tracing_level.as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_thread_ids(true)
                .with_thread_names(true),
        );

    // Tests in this workspace run in-process and may call this more than
    // once; a subscriber already being installed is not a bootstrap failure.
    let _ = subscriber.try_init();
    info!("tracing initialized at level {}", config.tracing_level);
    Ok(())
}

/// Install a panic hook that logs via `tracing` instead of stderr, so a
/// user-callback panic inside the runtime surfaces in the same structured
/// log stream as everything else.
fn init_crash_reporting() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();
        error!("panic: {}\n{}", panic_info, backtrace);
    }));
    info!("crash reporting initialized");
}

/// Bootstrap the full observability stack once, at process start.
pub fn init_observability(config: ObservabilityConfig) -> Result<()> {
    init_tracing(&config)?;
    if config.crash_reporting_enabled {
        init_crash_reporting();
    }
    Ok(())
}

/// A named set of latency histograms, one per metric name, recorded with
/// microsecond resolution. Used by `galileo-physics` (step duration) and
/// `galileo-orchestrator` (tick duration) to keep a rolling p50/p99 without
/// a metrics-backend dependency.
#[derive(Default)]
pub struct Metrics {
    histograms: DashMap<&'static str, Mutex<Histogram<u64>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            histograms: DashMap::new(),
        }
    }

    /// Record a duration sample under `name`.
    pub fn record(&self, name: &'static str, dt: Duration) {
        let entry = self
            .histograms
            .entry(name)
            .or_insert_with(|| Mutex::new(Histogram::new(3).expect("valid histogram precision")));
        let mut hist = entry.lock().expect("metrics histogram mutex poisoned");
        let _ = hist.record(dt.as_micros() as u64);
    }

    /// p50/p99 in microseconds for `name`, or `None` if nothing recorded yet.
    pub fn percentiles(&self, name: &str) -> Option<(u64, u64)> {
        let entry = self.histograms.get(name)?;
        let hist = entry.lock().expect("metrics histogram mutex poisoned");
        Some((hist.value_at_quantile(0.5), hist.value_at_quantile(0.99)))
    }

    pub fn sample_count(&self, name: &str) -> u64 {
        self.histograms
            .get(name)
            .map(|h| h.lock().expect("metrics histogram mutex poisoned").len())
            .unwrap_or(0)
    }
}

/// Macros for common structured-logging spans, matching the level names the
/// rest of the workspace uses.
#[macro_export]
macro_rules! trace_span {
    ($name:expr) => {
        tracing::span!(tracing::Level::TRACE, $name)
    };
}

#[macro_export]
macro_rules! debug_span {
    ($name:expr) => {
        tracing::span!(tracing::Level::DEBUG, $name)
    };
}

#[macro_export]
macro_rules! info_span {
    ($name:expr) => {
        tracing::span!(tracing::Level::INFO, $name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.tracing_level, "INFO");
        assert!(config.metrics_enabled);
        assert!(config.crash_reporting_enabled);
    }

    #[test]
    fn metrics_record_and_query() {
        let metrics = Metrics::new();
        metrics.record("physics.step", Duration::from_micros(100));
        metrics.record("physics.step", Duration::from_micros(200));
        metrics.record("physics.step", Duration::from_micros(150));

        assert_eq!(metrics.sample_count("physics.step"), 3);
        let (p50, p99) = metrics.percentiles("physics.step").unwrap();
        assert!(p50 >= 100 && p50 <= 200);
        assert!(p99 >= p50);
    }

    #[test]
    fn metrics_missing_name_is_none() {
        let metrics = Metrics::new();
        assert!(metrics.percentiles("nonexistent").is_none());
        assert_eq!(metrics.sample_count("nonexistent"), 0);
    }

    #[test]
    fn init_observability_is_idempotent() {
        let config = ObservabilityConfig::default();
        assert!(init_observability(config.clone()).is_ok());
        assert!(init_observability(config).is_ok());
    }
}
