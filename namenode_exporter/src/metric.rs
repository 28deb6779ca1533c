//! Metric identities and the samples emitted against them.
//!
//! A [`Descriptor`] is created once, at compile time, for every metric this
//! program understands. Collectors never build descriptors on the fly; they
//! emit [`Sample`] values that borrow one of the `static` descriptors.

/// Namespace shared by every metric this program exports.
pub const NAMESPACE: &str = "namenode";

/// The value kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A point-in-time reading with no monotonicity guarantee.
    Gauge,
    /// A reading the source promises is non-decreasing.
    Counter,
}

/// The immutable identity of an exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    subsystem: Option<&'static str>,
    name: &'static str,
    help: &'static str,
    kind: Kind,
}

impl Descriptor {
    /// Create a gauge descriptor.
    #[must_use]
    pub const fn gauge(
        subsystem: Option<&'static str>,
        name: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            subsystem,
            name,
            help,
            kind: Kind::Gauge,
        }
    }

    /// Create a counter descriptor.
    #[must_use]
    pub const fn counter(
        subsystem: Option<&'static str>,
        name: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            subsystem,
            name,
            help,
            kind: Kind::Counter,
        }
    }

    /// The fully qualified metric name, `<namespace>_<subsystem>_<name>`.
    #[must_use]
    pub fn fq_name(&self) -> String {
        build_fq_name(NAMESPACE, self.subsystem.unwrap_or_default(), self.name)
    }

    /// Human readable description of the metric.
    #[must_use]
    pub fn help(&self) -> &'static str {
        self.help
    }

    /// Whether this metric is a gauge or a counter.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// Join the non-empty components of a metric name with `_`.
#[must_use]
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// One reading of a metric, produced by a collection cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// The metric this reading belongs to.
    pub descriptor: &'static Descriptor,
    /// The reading itself.
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(descriptor: &'static Descriptor, value: f64) -> Self {
        Self { descriptor, value }
    }
}
