//! Resource usage of the NameNode process.
//!
//! Enabled by pointing the exporter at the NameNode's PID file. The PID is
//! re-read on every scrape so a restarted NameNode is picked up without
//! restarting the exporter. Only Linux exposes the data needed here; on other
//! platforms the collector describes its metrics and emits nothing.

use std::{io, num::ParseIntError, path::PathBuf};

use tracing::warn;

use crate::metric::{Descriptor, Sample};

static CPU_SECONDS: Descriptor = Descriptor::counter(
    Some("process"),
    "cpu_seconds_total",
    "Total user and system CPU time spent in seconds.",
);
static OPEN_FDS: Descriptor =
    Descriptor::gauge(Some("process"), "open_fds", "Number of open file descriptors.");
static MAX_FDS: Descriptor = Descriptor::gauge(
    Some("process"),
    "max_fds",
    "Maximum number of open file descriptors.",
);
static VIRTUAL_MEMORY: Descriptor = Descriptor::gauge(
    Some("process"),
    "virtual_memory_bytes",
    "Virtual memory size in bytes.",
);
static RESIDENT_MEMORY: Descriptor = Descriptor::gauge(
    Some("process"),
    "resident_memory_bytes",
    "Resident memory size in bytes.",
);
static START_TIME: Descriptor = Descriptor::gauge(
    Some("process"),
    "start_time_seconds",
    "Start time of the process since unix epoch in seconds.",
);

/// Errors produced by [`Process`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::io::Error`]
    #[error("Unable to read PID file {path}: {source}")]
    Io {
        /// The PID file
        path: PathBuf,
        /// The underlying failure
        #[source]
        source: io::Error,
    },
    /// The PID file did not hold a process id.
    #[error("PID file {path} does not contain a PID: {source}")]
    Parse {
        /// The PID file
        path: PathBuf,
        /// The underlying failure
        #[source]
        source: ParseIntError,
    },
    #[cfg(target_os = "linux")]
    /// Wrapper for [`procfs::ProcError`]
    #[error("Unable to read procfs: {0}")]
    Proc(#[from] procfs::ProcError),
}

/// Collector of resource usage for the process named by a PID file.
#[derive(Debug, Clone)]
pub struct Process {
    pid_file: PathBuf,
}

impl Process {
    /// Create a new [`Process`]
    #[must_use]
    pub fn new(pid_file: PathBuf) -> Self {
        Self { pid_file }
    }

    /// Every metric this collector may emit.
    #[must_use]
    pub fn describe() -> Vec<&'static Descriptor> {
        vec![
            &CPU_SECONDS,
            &OPEN_FDS,
            &MAX_FDS,
            &VIRTUAL_MEMORY,
            &RESIDENT_MEMORY,
            &START_TIME,
        ]
    }

    /// Sample the process. Any failure is logged and yields no samples.
    pub async fn collect(&self) -> Vec<Sample> {
        let result = match self.read_pid().await {
            Ok(pid) => sample(pid),
            Err(err) => Err(err),
        };
        match result {
            Ok(samples) => samples,
            Err(err) => {
                warn!("Unable to collect process metrics: {err}");
                Vec::new()
            }
        }
    }

    async fn read_pid(&self) -> Result<i32, Error> {
        let contents = tokio::fs::read_to_string(&self.pid_file)
            .await
            .map_err(|source| Error::Io {
                path: self.pid_file.clone(),
                source,
            })?;
        contents.trim().parse().map_err(|source| Error::Parse {
            path: self.pid_file.clone(),
            source,
        })
    }
}

#[cfg(target_os = "linux")]
#[allow(clippy::cast_precision_loss)]
fn sample(pid: i32) -> Result<Vec<Sample>, Error> {
    use procfs::process::LimitValue;

    let process = procfs::process::Process::new(pid)?;
    let stat = process.stat()?;
    let ticks_per_second = procfs::ticks_per_second() as f64;
    let page_size = procfs::page_size();
    let boot_time = procfs::boot_time_secs()?;

    let mut samples = vec![
        Sample::new(
            &CPU_SECONDS,
            (stat.utime + stat.stime) as f64 / ticks_per_second,
        ),
        Sample::new(&OPEN_FDS, process.fd_count()? as f64),
    ];
    match process.limits()?.max_open_files.soft_limit {
        LimitValue::Value(max) => samples.push(Sample::new(&MAX_FDS, max as f64)),
        // Unlimited has no finite representation; leave the gauge out.
        LimitValue::Unlimited => {}
    }
    samples.push(Sample::new(&VIRTUAL_MEMORY, stat.vsize as f64));
    samples.push(Sample::new(
        &RESIDENT_MEMORY,
        stat.rss.saturating_mul(page_size) as f64,
    ));
    samples.push(Sample::new(
        &START_TIME,
        stat.starttime as f64 / ticks_per_second + boot_time as f64,
    ));
    Ok(samples)
}

#[cfg(not(target_os = "linux"))]
#[allow(clippy::unnecessary_wraps)]
fn sample(_pid: i32) -> Result<Vec<Sample>, Error> {
    Ok(Vec::new())
}
