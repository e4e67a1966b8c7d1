use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    plans_total: AtomicU64,
    model_calls_total: AtomicU64,
    model_failures_total: AtomicU64,
    format_fallbacks_total: AtomicU64,
    rows_dropped_total: AtomicU64,
    model_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub plans_total: u64,
    pub model_calls_total: u64,
    pub model_failures_total: u64,
    pub format_fallbacks_total: u64,
    pub rows_dropped_total: u64,
    pub avg_model_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_plan(&self) {
        self.plans_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_call(&self) {
        self.model_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_failure(&self) {
        self.model_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_format_fallback(&self) {
        self.format_fallbacks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_dropped(&self, rows: usize) {
        self.rows_dropped_total
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn observe_model_latency(&self, duration: Duration) {
        self.model_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self.model_calls_total.load(Ordering::Relaxed);
        let latency = self.model_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            plans_total: self.plans_total.load(Ordering::Relaxed),
            model_calls_total: calls,
            model_failures_total: self.model_failures_total.load(Ordering::Relaxed),
            format_fallbacks_total: self.format_fallbacks_total.load(Ordering::Relaxed),
            rows_dropped_total: self.rows_dropped_total.load(Ordering::Relaxed),
            avg_model_latency_millis: if calls == 0 {
                0.0
            } else {
                latency as f64 / calls as f64
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Installs the global subscriber once. Output goes to stderr so stdout
/// carries only the itinerary.
pub fn init_tracing(service_name: &str, format: LogFormat) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,gotham_agents=info,gotham_data=info,gotham_llm=info",
                service_name.replace('-', "_")
            ))
        });

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        match format {
            LogFormat::Json => builder
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_is_averaged_over_model_calls() {
        let metrics = AppMetrics::default();
        metrics.inc_model_call();
        metrics.inc_model_call();
        metrics.observe_model_latency(Duration::from_millis(300));
        metrics.observe_model_latency(Duration::from_millis(100));
        metrics.add_rows_dropped(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.model_calls_total, 2);
        assert_eq!(snapshot.rows_dropped_total, 7);
        assert!((snapshot.avg_model_latency_millis - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
