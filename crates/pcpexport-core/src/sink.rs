//! Metric sink contract and the built-in sinks.
//!
//! A sink receives `(metric name, optional instance label, value as text)`.
//! It never reports failure back to the exporters: a value that cannot be
//! stored is the sink's problem and must not stop the values that follow.

use std::io::{self, Write};

use serde::Serialize;
use tracing::{trace, warn};

/// External metric ingestion interface.
///
/// `instance` is `None` for global metrics and carries a label such as
/// `"cpu3"`, `"serial5"` or an interface name for per-instance metrics.
pub trait MetricSink {
    fn put_value(&mut self, name: &str, instance: Option<&str>, value: &str);
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn put_value(&mut self, name: &str, instance: Option<&str>, value: &str) {
        (**self).put_value(name, instance, value);
    }
}

/// One emitted value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    pub name: String,
    pub instance: Option<String>,
    pub value: String,
}

impl MetricRecord {
    /// Numeric value, `None` if the text does not parse.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

/// Sink that keeps every record in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<MetricRecord>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str, instance: Option<&str>) -> Option<&MetricRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && r.instance.as_deref() == instance)
    }

    pub fn value(&self, name: &str, instance: Option<&str>) -> Option<f64> {
        self.get(name, instance).and_then(MetricRecord::as_f64)
    }

    /// Every record carrying the given instance label.
    pub fn for_instance<'a>(&'a self, instance: &'a str) -> impl Iterator<Item = &'a MetricRecord> {
        self.records
            .iter()
            .filter(move |r| r.instance.as_deref() == Some(instance))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl MetricSink for RecordingSink {
    fn put_value(&mut self, name: &str, instance: Option<&str>, value: &str) {
        self.records.push(MetricRecord {
            name: name.to_string(),
            instance: instance.map(str::to_string),
            value: value.to_string(),
        });
    }
}

/// Failed writes to an output stream, logged once.
#[derive(Debug, Default)]
pub struct WriteErrors {
    count: u64,
}

impl WriteErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `e`; only the first failure gets a log line, the rest repeat it.
    pub fn record(&mut self, e: &io::Error, what: &str) {
        self.count += 1;
        if self.count == 1 {
            warn!(error = %e, "failed to write {what}");
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Sink writing one line per value: `name value` or `name[instance] value`.
pub struct WriterSink<W: Write> {
    out: W,
    errors: WriteErrors,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            errors: WriteErrors::new(),
        }
    }

    /// Number of lines that could not be written.
    pub fn write_errors(&self) -> u64 {
        self.errors.count()
    }

    /// Writes a free-form line (period headers and the like).
    pub fn comment(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "# {text}") {
            self.record_error(&e);
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            self.record_error(&e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn record_error(&mut self, e: &io::Error) {
        self.errors.record(e, "metric");
    }
}

impl<W: Write> MetricSink for WriterSink<W> {
    fn put_value(&mut self, name: &str, instance: Option<&str>, value: &str) {
        let res = match instance {
            Some(inst) => writeln!(self.out, "{name}[{inst}] {value}"),
            None => writeln!(self.out, "{name} {value}"),
        };
        if let Err(e) = res {
            self.record_error(&e);
        }
    }
}

/// Formats values the way consumers of the metric names expect and counts
/// what was handed to the sink.
pub struct Emitter<'a> {
    sink: &'a mut dyn MetricSink,
    emitted: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a mut dyn MetricSink) -> Self {
        Self { sink, emitted: 0 }
    }

    /// Rate or percentage, six decimals.
    pub fn float(&mut self, name: &str, instance: Option<&str>, value: f64) {
        self.text(name, instance, &format!("{value:.6}"));
    }

    /// Gauge, plain integer.
    pub fn count(&mut self, name: &str, instance: Option<&str>, value: u64) {
        self.text(name, instance, &value.to_string());
    }

    pub fn text(&mut self, name: &str, instance: Option<&str>, value: &str) {
        trace!(metric = name, instance, value, "put_value");
        self.sink.put_value(name, instance, value);
        self.emitted += 1;
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
