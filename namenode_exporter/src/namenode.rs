//! The NameNode collector.
//!
//! Each call to [`Exporter::collect`] is one collection cycle: fetch the JMX
//! servlet once, decode the bean list and translate every recognized bean
//! into samples through the field mapping table in [`table`]. The cycle
//! always yields an `up` sample first. Fetch and decode failures end the
//! cycle with `up = 0`; a recognized bean with a missing or mistyped
//! attribute loses the rest of its samples but the cycle carries on with the
//! next bean.

mod table;

use tracing::{error, trace, warn};

use crate::{
    fetch::Fetcher,
    jmx::{self, Bean, Envelope},
    metric::{Descriptor, Sample},
};

pub use table::{BeanKind, UP};
use table::Fault;

/// A recognized bean lacked an attribute, or carried it with the wrong type.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionError {
    /// The attribute is absent from the bean.
    #[error("bean {bean} has no attribute {attribute}")]
    Missing {
        /// Name of the bean
        bean: &'static str,
        /// Name of the attribute
        attribute: &'static str,
    },
    /// The attribute is present with an unexpected JSON type.
    #[error("bean {bean} attribute {attribute} should be a {expected}, found {found}")]
    Mistyped {
        /// Name of the bean
        bean: &'static str,
        /// Name of the attribute
        attribute: &'static str,
        /// The JSON type the table requires
        expected: &'static str,
        /// The JSON type actually present
        found: &'static str,
    },
}

/// Collects NameNode metrics from its JMX servlet.
#[derive(Debug)]
pub struct Exporter {
    fetcher: Fetcher,
}

impl Exporter {
    /// Create a new [`Exporter`] reading from `fetcher`.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Every metric this collector may emit.
    #[must_use]
    pub fn describe() -> Vec<&'static Descriptor> {
        table::descriptors().collect()
    }

    /// Run one collection cycle.
    ///
    /// Never fails: problems reaching or decoding the JMX servlet are
    /// reported as `up = 0` and logged.
    pub async fn collect(&self) -> Vec<Sample> {
        let body = match self.fetcher.fetch().await {
            Ok(body) => body,
            Err(err) => return cycle_failed(&err),
        };
        match translate(&body) {
            Ok(samples) => samples,
            Err(err) => cycle_failed(&err),
        }
    }
}

fn cycle_failed(err: &dyn std::error::Error) -> Vec<Sample> {
    error!("Failed to collect metrics from namenode: {err}");
    vec![Sample::new(&UP, 0.0)]
}

/// Translate a raw JMX status document into samples.
///
/// The first sample is always `up = 1`. Field samples follow in bean order,
/// then table order within a bean.
///
/// # Errors
///
/// Function will return an error if `body` is not a JMX envelope.
pub fn translate(body: &[u8]) -> Result<Vec<Sample>, jmx::Error> {
    let envelope = Envelope::from_slice(body)?;

    let mut samples = vec![Sample::new(&UP, 1.0)];
    for bean in &envelope.beans {
        let Some(kind) = jmx::bean_name(bean).and_then(BeanKind::from_name) else {
            continue;
        };
        if let Err(err) = translate_bean(kind, bean, &mut samples) {
            warn!("Skipping remainder of bean: {err}");
        }
    }
    Ok(samples)
}

/// Push one sample per table row of `kind`, stopping at the first fault.
pub(crate) fn translate_bean(
    kind: BeanKind,
    bean: &Bean,
    samples: &mut Vec<Sample>,
) -> Result<(), CoercionError> {
    for field in kind.fields() {
        let value = field
            .coercion
            .apply(bean.get(field.attribute))
            .map_err(|fault| match fault {
                Fault::Missing => CoercionError::Missing {
                    bean: kind.name(),
                    attribute: field.attribute,
                },
                Fault::Mistyped { expected, found } => CoercionError::Mistyped {
                    bean: kind.name(),
                    attribute: field.attribute,
                    expected,
                    found,
                },
            })?;
        trace!("{} = {value}", field.attribute);
        samples.push(Sample::new(field.descriptor, value));
    }
    Ok(())
}
