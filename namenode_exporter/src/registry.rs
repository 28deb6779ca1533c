//! The metrics registry.
//!
//! The registry owns every collector and is built once in `main`, then
//! handed to the HTTP server. Nothing is installed as a global recorder:
//! each call to [`Registry::gather`] records the samples of that scrape into
//! a scrape-local Prometheus recorder and renders it, so a failed cycle
//! cannot leave stale values behind for the next one.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, warn};

use crate::{
    metric::{Descriptor, Kind, Sample},
    namenode, process,
};

/// Errors produced by [`Registry`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A collector announced a metric name already owned by another.
    #[error("Metric {0} is already registered")]
    AlreadyRegistered(String),
}

/// A source of samples, asked once per scrape.
#[derive(Debug)]
pub enum Collector {
    /// See [`crate::namenode::Exporter`] for details.
    Namenode(namenode::Exporter),
    /// See [`crate::process::Process`] for details.
    Process(process::Process),
}

impl Collector {
    /// Every metric this collector may emit.
    #[must_use]
    pub fn describe(&self) -> Vec<&'static Descriptor> {
        match self {
            Collector::Namenode(_) => namenode::Exporter::describe(),
            Collector::Process(_) => process::Process::describe(),
        }
    }

    /// Run one collection cycle.
    pub async fn collect(&self) -> Vec<Sample> {
        match self {
            Collector::Namenode(inner) => inner.collect().await,
            Collector::Process(inner) => inner.collect().await,
        }
    }
}

/// An explicit set of collectors.
#[derive(Debug, Default)]
pub struct Registry {
    collectors: Vec<Collector>,
}

impl Registry {
    /// Create an empty [`Registry`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collector.
    ///
    /// # Errors
    ///
    /// Function will return an error if the collector describes a metric
    /// name some other registered collector already describes.
    pub fn register(&mut self, collector: Collector) -> Result<(), Error> {
        let existing: Vec<String> = self.describe().into_iter().map(Descriptor::fq_name).collect();
        for descriptor in collector.describe() {
            let name = descriptor.fq_name();
            if existing.contains(&name) {
                return Err(Error::AlreadyRegistered(name));
            }
        }
        self.collectors.push(collector);
        Ok(())
    }

    /// Every metric announced by the registered collectors.
    #[must_use]
    pub fn describe(&self) -> Vec<&'static Descriptor> {
        self.collectors
            .iter()
            .flat_map(Collector::describe)
            .collect()
    }

    /// Collect from every collector, in registration order, and render the
    /// result in the Prometheus text format.
    pub async fn gather(&self) -> String {
        let mut samples = Vec::new();
        for collector in &self.collectors {
            samples.extend(collector.collect().await);
        }
        debug!("gathered {} samples", samples.len());
        render(&self.describe(), &samples)
    }
}

/// Render `samples` in the Prometheus text format, with help text taken from
/// `descriptors`.
#[must_use]
pub fn render(descriptors: &[&'static Descriptor], samples: &[Sample]) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        describe(descriptors);
        record(samples);
    });
    handle.render()
}

/// Announce help text for `descriptors` to the current recorder.
pub(crate) fn describe(descriptors: &[&'static Descriptor]) {
    for descriptor in descriptors {
        match descriptor.kind() {
            Kind::Gauge => describe_gauge!(descriptor.fq_name(), descriptor.help()),
            Kind::Counter => describe_counter!(descriptor.fq_name(), descriptor.help()),
        }
    }
}

/// Record `samples` into the current recorder.
///
/// Gauges are set as-is. Counters are recorded with
/// [`metrics::Counter::absolute`], which takes a `u64`: a fractional counter
/// value is truncated toward zero, so `10.7` is exposed as `10`. NaN values,
/// negative counters and counters above `u64::MAX` are skipped with a
/// warning.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub(crate) fn record(samples: &[Sample]) {
    for sample in samples {
        let name = sample.descriptor.fq_name();
        let value = sample.value;
        match sample.descriptor.kind() {
            Kind::Gauge => {
                if value.is_nan() {
                    warn!("Skipping NaN gauge value for {name}");
                    continue;
                }
                gauge!(name).set(value);
            }
            Kind::Counter => {
                if value.is_nan() {
                    warn!("Skipping NaN counter value for {name}");
                    continue;
                }
                if value < 0.0 {
                    warn!("Skipping negative counter value for {name}");
                    continue;
                }
                if value > u64::MAX as f64 {
                    warn!("Counter value above maximum limit for {name}");
                    continue;
                }
                // Guarded by the sign and range checks above.
                counter!(name).absolute(value as u64);
            }
        }
    }
}
