//! Execution counters for stream terminals.
//!
//! Attach a [`MetricsCollector`] to a stream with
//! [`Stream::with_metrics`](crate::Stream::with_metrics); every terminal run on that
//! stream then adds to the collector's counters:
//!
//! | Counter | Meaning |
//! |---|---|
//! | `elements_read` | elements pulled out of the stream's source; rows re-read after a parallel barrier are not counted |
//! | `partitions` | leaf partitions evaluated (1 for a sequential run) |
//! | `barriers` | stateful stages executed as a gather/re-split barrier |
//! | `short_circuits` | terminals that settled their result before the input ran out |
//!
//! Custom values can be registered through the [`Metric`] trait next to the built-in
//! counters. Everything exports to JSON.
//!
//! ```
//! use ironstream::*;
//! use ironstream::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let metrics = MetricsCollector::new();
//! let hit = range(0, 1_000)
//!     .with_metrics(metrics.clone())
//!     .filter(|n: &i64| *n == 10)
//!     .find_first()?;
//! assert_eq!(hit, Some(10));
//! assert_eq!(metrics.counter("elements_read"), 11);
//! assert_eq!(metrics.counter("short_circuits"), 1);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A named value reported alongside the built-in counters.
pub trait Metric: Send + Sync {
    /// The name of this metric (e.g. `cache_hits`).
    fn name(&self) -> &str;

    /// The current value as JSON.
    fn value(&self) -> Value;

    fn description(&self) -> Option<&str> {
        None
    }
}

/// Thread-safe, cheaply clonable metrics sink. Clones share the same counters.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    metrics: HashMap<String, Box<dyn Metric>>,
    counters: HashMap<String, u64>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay meaningful even if a caller closure panicked mid-run.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a custom metric, replacing any metric with the same name.
    pub fn register(&self, metric: Box<dyn Metric>) {
        self.lock().metrics.insert(metric.name().to_string(), metric);
    }

    pub fn register_all(&self, metrics: Vec<Box<dyn Metric>>) {
        for metric in metrics {
            self.register(metric);
        }
    }

    /// Mark the start of a terminal run. The first start of a collector is kept.
    pub fn record_start(&self) {
        let mut inner = self.lock();
        inner.start_time.get_or_insert_with(Instant::now);
    }

    pub fn record_end(&self) {
        self.lock().end_time = Some(Instant::now());
    }

    /// Time between the first recorded start and the last recorded end.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.lock();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut inner = self.lock();
        *inner.counters.entry(name.to_string()).or_default() += value;
    }

    pub fn set_counter(&self, name: &str, value: u64) {
        self.lock().counters.insert(name.to_string(), value);
    }

    /// Current value of a counter; 0 if it was never incremented.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Reset counters and timings; registered metrics are kept.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.counters.clear();
        inner.start_time = None;
        inner.end_time = None;
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.lock();
        let mut out = serde_json::Map::new();

        for (name, count) in &inner.counters {
            out.insert(name.clone(), json!({ "value": count }));
        }
        for (name, metric) in &inner.metrics {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                obj.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(obj));
        }
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            out.insert(
                "execution_time_ms".to_string(),
                json!({
                    "value": end.saturating_duration_since(start).as_millis(),
                    "description": "Wall-clock time across terminal runs in milliseconds",
                }),
            );
        }
        Value::Object(out)
    }

    /// Print every counter and metric to stdout, sorted by name.
    pub fn print(&self) {
        println!("\n========== Stream Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("------------------------------------");
        }
        let mut lines: Vec<(String, String)> = self
            .snapshot()
            .into_iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        lines.sort();
        for (name, value) in lines {
            println!("{name}: {value}");
        }
        println!("====================================\n");
    }

    /// Write [`to_json`](Self::to_json) to `path`, pretty-printed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Name/value pairs of all counters and registered metrics.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.lock();
        inner
            .counters
            .iter()
            .map(|(name, count)| (name.clone(), json!(count)))
            .chain(
                inner
                    .metrics
                    .iter()
                    .map(|(name, metric)| (name.clone(), metric.value())),
            )
            .collect()
    }
}

/// A fixed counter value.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, 0)
    }

    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }
}

/// A single numeric reading.
pub struct GaugeMetric {
    name: String,
    value: f64,
    description: Option<String>,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.value)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
