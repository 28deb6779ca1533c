//! The field mapping table.
//!
//! Every metric the NameNode collector can emit is declared here, together
//! with the bean and attribute it is read from and the rule used to turn the
//! attribute into a float. The table is fixed at build time.

use serde_json::Value;

use crate::{jmx, metric::Descriptor};

/// Indicates whether the NameNode JMX endpoint could be fetched and decoded.
pub static UP: Descriptor = Descriptor::gauge(None, "up", "Could the namenode be reached.");

pub(crate) static UPTIME: Descriptor = Descriptor::gauge(
    None,
    "uptime_seconds",
    "Number of seconds since the namenode started.",
);
pub(crate) static STATE: Descriptor = Descriptor::gauge(
    None,
    "state",
    "Indicate namenode state (0 - standby, 1 - active).",
);
pub(crate) static FS_OPERATIONAL: Descriptor = Descriptor::gauge(
    None,
    "fs_operational",
    "The filesystem state of this namenode.",
);
pub(crate) static SAFEMODE_ON: Descriptor = Descriptor::gauge(
    None,
    "safemode_on",
    "The safemode state of this namenode.",
);
pub(crate) static DATA_NODES_LIVE: Descriptor = Descriptor::gauge(
    None,
    "data_nodes_live",
    "The number of live datanodes in this DFS.",
);
pub(crate) static DATA_NODES_DEAD: Descriptor = Descriptor::gauge(
    None,
    "data_nodes_dead",
    "The number of dead datanodes in this DFS.",
);

// dfs capacity
pub(crate) static DFS_FILES_TOTAL: Descriptor =
    Descriptor::gauge(Some("dfs"), "files_total", "Total number of files in DFS.");
pub(crate) static DFS_PERCENT_USED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "percent_used",
    "Percentage of the configured DFS capacity used by DFS.",
);
pub(crate) static DFS_PERCENT_REMAINING: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "percent_remaining",
    "Percentage of the configured DFS capacity remaining.",
);
pub(crate) static DFS_CAPACITY_BYTES_TOTAL: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "capacity_bytes_total",
    "Total configured DFS storage capacity in bytes.",
);
pub(crate) static DFS_CAPACITY_BYTES_USED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "capacity_bytes_used",
    "The usage of the DFS in bytes.",
);
pub(crate) static DFS_CAPACITY_BYTES_REMAINING: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "capacity_bytes_remaining",
    "The remaining capacity of the DFS in bytes.",
);
pub(crate) static DFS_NON_DFS_BYTES_USED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "non_dfs_bytes_used",
    "Non-DFS usage in bytes.",
);

// dfs blocks
pub(crate) static DFS_BLOCKS_TOTAL: Descriptor =
    Descriptor::gauge(Some("dfs"), "blocks_total", "Total blocks in DFS.");
pub(crate) static DFS_BLOCKS_UNDER_REPLICATED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "blocks_under_replicated",
    "Under replicated blocks in DFS.",
);
pub(crate) static DFS_BLOCKS_PENDING_REPLICATION: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "blocks_pending_replication",
    "Blocks waiting for replication in DFS.",
);
pub(crate) static DFS_BLOCKS_SCHEDULED_REPLICATION: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "blocks_scheduled_replication",
    "Blocks scheduled for replication in DFS.",
);
pub(crate) static DFS_BLOCKS_POSTPONED_MISREPLICATED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "blocks_postponed_misreplicated",
    "Misreplicated blocks whose processing has been postponed.",
);
pub(crate) static DFS_BLOCKS_PENDING_DELETION: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "blocks_pending_deletion",
    "Blocks waiting for deletion in DFS.",
);
pub(crate) static DFS_BLOCKS_MISSING: Descriptor =
    Descriptor::gauge(Some("dfs"), "blocks_missing", "Missing blocks in DFS.");
pub(crate) static DFS_BLOCKS_CORRUPT: Descriptor =
    Descriptor::gauge(Some("dfs"), "blocks_corrupt", "Corrupted blocks in DFS.");
pub(crate) static DFS_BLOCKS_EXCESS: Descriptor =
    Descriptor::gauge(Some("dfs"), "blocks_excess", "Excess blocks in DFS.");
pub(crate) static DFS_BLOCK_POOL_BYTES_USED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "block_pool_bytes_used",
    "Bytes used by the block pool of this namenode.",
);
pub(crate) static DFS_BLOCK_POOL_PERCENT_USED: Descriptor = Descriptor::gauge(
    Some("dfs"),
    "block_pool_percent_used",
    "Percentage of the configured DFS capacity used by the block pool.",
);

// jvm
pub(crate) static JVM_LOG_FATAL: Descriptor = Descriptor::counter(
    Some("jvm"),
    "log_fatal",
    "Number of FATAL log events emitted by the namenode.",
);
pub(crate) static JVM_LOG_ERROR: Descriptor = Descriptor::counter(
    Some("jvm"),
    "log_error",
    "Number of ERROR log events emitted by the namenode.",
);
pub(crate) static JVM_LOG_WARN: Descriptor = Descriptor::counter(
    Some("jvm"),
    "log_warn",
    "Number of WARN log events emitted by the namenode.",
);
pub(crate) static JVM_LOG_INFO: Descriptor = Descriptor::counter(
    Some("jvm"),
    "log_info",
    "Number of INFO log events emitted by the namenode.",
);
pub(crate) static JVM_MEM_HEAP_MEGABYTES_USED: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "mem_heap_megabytes_used",
    "Heap memory used in megabytes.",
);
pub(crate) static JVM_MEM_HEAP_MEGABYTES_COMMITTED: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "mem_heap_megabytes_committed",
    "Heap memory committed in megabytes.",
);
pub(crate) static JVM_MEM_NON_HEAP_MEGABYTES_USED: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "mem_non_heap_megabytes_used",
    "Non-heap memory used in megabytes.",
);
pub(crate) static JVM_MEM_NON_HEAP_MEGABYTES_COMMITTED: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "mem_non_heap_megabytes_committed",
    "Non-heap memory committed in megabytes.",
);
pub(crate) static JVM_THREADS_NEW: Descriptor =
    Descriptor::gauge(Some("jvm"), "threads_new", "Threads in NEW state.");
pub(crate) static JVM_THREADS_RUNNABLE: Descriptor =
    Descriptor::gauge(Some("jvm"), "threads_runnable", "Threads in RUNNABLE state.");
pub(crate) static JVM_THREADS_BLOCKED: Descriptor =
    Descriptor::gauge(Some("jvm"), "threads_blocked", "Threads in BLOCKED state.");
pub(crate) static JVM_THREADS_WAITING: Descriptor =
    Descriptor::gauge(Some("jvm"), "threads_waiting", "Threads in WAITING state.");
pub(crate) static JVM_THREADS_TIMED_WAITING: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "threads_timed_waiting",
    "Threads in TIMED_WAITING state.",
);
pub(crate) static JVM_THREADS_TERMINATED: Descriptor = Descriptor::gauge(
    Some("jvm"),
    "threads_terminated",
    "Threads in TERMINATED state.",
);

/// How a bean attribute becomes a sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coercion {
    /// The attribute must be a JSON number and is passed through.
    Number,
    /// The attribute must be a string; `1.0` when equal to the literal.
    Equals(&'static str),
    /// The attribute must be a string; `1.0` when non-empty.
    NonEmpty,
}

/// Why an attribute could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fault {
    Missing,
    Mistyped {
        expected: &'static str,
        found: &'static str,
    },
}

impl Coercion {
    pub(crate) fn apply(self, value: Option<&Value>) -> Result<f64, Fault> {
        let value = value.ok_or(Fault::Missing)?;
        match self {
            Coercion::Number => value.as_f64().ok_or(Fault::Mistyped {
                expected: "number",
                found: jmx::kind_of(value),
            }),
            Coercion::Equals(literal) => {
                let s = as_string(value)?;
                Ok(if s == literal { 1.0 } else { 0.0 })
            }
            Coercion::NonEmpty => {
                let s = as_string(value)?;
                Ok(if s.is_empty() { 0.0 } else { 1.0 })
            }
        }
    }
}

fn as_string(value: &Value) -> Result<&str, Fault> {
    value.as_str().ok_or(Fault::Mistyped {
        expected: "string",
        found: jmx::kind_of(value),
    })
}

/// One row of the table: which attribute feeds which metric, and how.
#[derive(Debug)]
pub(crate) struct Field {
    pub(crate) attribute: &'static str,
    pub(crate) descriptor: &'static Descriptor,
    pub(crate) coercion: Coercion,
}

const fn number(attribute: &'static str, descriptor: &'static Descriptor) -> Field {
    Field {
        attribute,
        descriptor,
        coercion: Coercion::Number,
    }
}

static RUNTIME: [Field; 1] = [number("Uptime", &UPTIME)];

static NAME_NODE_STATUS: [Field; 1] = [Field {
    attribute: "State",
    descriptor: &STATE,
    coercion: Coercion::Equals("active"),
}];

static FS_NAMESYSTEM: [Field; 9] = [
    number("BlocksTotal", &DFS_BLOCKS_TOTAL),
    number("UnderReplicatedBlocks", &DFS_BLOCKS_UNDER_REPLICATED),
    number("PendingReplicationBlocks", &DFS_BLOCKS_PENDING_REPLICATION),
    number("ScheduledReplicationBlocks", &DFS_BLOCKS_SCHEDULED_REPLICATION),
    number(
        "PostponedMisreplicatedBlocks",
        &DFS_BLOCKS_POSTPONED_MISREPLICATED,
    ),
    number("PendingDeletionBlocks", &DFS_BLOCKS_PENDING_DELETION),
    number("MissingBlocks", &DFS_BLOCKS_MISSING),
    number("CorruptBlocks", &DFS_BLOCKS_CORRUPT),
    number("ExcessBlocks", &DFS_BLOCKS_EXCESS),
];

static FS_NAMESYSTEM_STATE: [Field; 7] = [
    Field {
        attribute: "FSState",
        descriptor: &FS_OPERATIONAL,
        coercion: Coercion::Equals("Operational"),
    },
    number("NumLiveDataNodes", &DATA_NODES_LIVE),
    number("NumDeadDataNodes", &DATA_NODES_DEAD),
    number("FilesTotal", &DFS_FILES_TOTAL),
    number("CapacityTotal", &DFS_CAPACITY_BYTES_TOTAL),
    number("CapacityUsed", &DFS_CAPACITY_BYTES_USED),
    number("CapacityRemaining", &DFS_CAPACITY_BYTES_REMAINING),
];

static NAME_NODE_INFO: [Field; 6] = [
    Field {
        attribute: "Safemode",
        descriptor: &SAFEMODE_ON,
        coercion: Coercion::NonEmpty,
    },
    number("PercentUsed", &DFS_PERCENT_USED),
    number("PercentRemaining", &DFS_PERCENT_REMAINING),
    number("NonDfsUsedSpace", &DFS_NON_DFS_BYTES_USED),
    number("BlockPoolUsedSpace", &DFS_BLOCK_POOL_BYTES_USED),
    number("PercentBlockPoolUsed", &DFS_BLOCK_POOL_PERCENT_USED),
];

static JVM_METRICS: [Field; 14] = [
    number("LogFatal", &JVM_LOG_FATAL),
    number("LogError", &JVM_LOG_ERROR),
    number("LogWarn", &JVM_LOG_WARN),
    number("LogInfo", &JVM_LOG_INFO),
    number("MemHeapUsedM", &JVM_MEM_HEAP_MEGABYTES_USED),
    number("MemHeapCommittedM", &JVM_MEM_HEAP_MEGABYTES_COMMITTED),
    number("MemNonHeapUsedM", &JVM_MEM_NON_HEAP_MEGABYTES_USED),
    number("MemNonHeapCommittedM", &JVM_MEM_NON_HEAP_MEGABYTES_COMMITTED),
    number("ThreadsNew", &JVM_THREADS_NEW),
    number("ThreadsRunnable", &JVM_THREADS_RUNNABLE),
    number("ThreadsBlocked", &JVM_THREADS_BLOCKED),
    number("ThreadsWaiting", &JVM_THREADS_WAITING),
    number("ThreadsTimedWaiting", &JVM_THREADS_TIMED_WAITING),
    number("ThreadsTerminated", &JVM_THREADS_TERMINATED),
];

/// The beans the collector knows how to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeanKind {
    /// `java.lang:type=Runtime`
    Runtime,
    /// `Hadoop:service=NameNode,name=NameNodeStatus`
    NameNodeStatus,
    /// `Hadoop:service=NameNode,name=FSNamesystem`
    FsNamesystem,
    /// `Hadoop:service=NameNode,name=FSNamesystemState`
    FsNamesystemState,
    /// `Hadoop:service=NameNode,name=NameNodeInfo`
    NameNodeInfo,
    /// `Hadoop:service=NameNode,name=JvmMetrics`
    JvmMetrics,
}

impl BeanKind {
    /// Every recognized bean, in table order.
    pub const ALL: [BeanKind; 6] = [
        BeanKind::Runtime,
        BeanKind::NameNodeStatus,
        BeanKind::FsNamesystem,
        BeanKind::FsNamesystemState,
        BeanKind::NameNodeInfo,
        BeanKind::JvmMetrics,
    ];

    /// Look up a bean by the value of its `name` attribute.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The value of the `name` attribute identifying this bean.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BeanKind::Runtime => "java.lang:type=Runtime",
            BeanKind::NameNodeStatus => "Hadoop:service=NameNode,name=NameNodeStatus",
            BeanKind::FsNamesystem => "Hadoop:service=NameNode,name=FSNamesystem",
            BeanKind::FsNamesystemState => "Hadoop:service=NameNode,name=FSNamesystemState",
            BeanKind::NameNodeInfo => "Hadoop:service=NameNode,name=NameNodeInfo",
            BeanKind::JvmMetrics => "Hadoop:service=NameNode,name=JvmMetrics",
        }
    }

    pub(crate) fn fields(self) -> &'static [Field] {
        match self {
            BeanKind::Runtime => &RUNTIME,
            BeanKind::NameNodeStatus => &NAME_NODE_STATUS,
            BeanKind::FsNamesystem => &FS_NAMESYSTEM,
            BeanKind::FsNamesystemState => &FS_NAMESYSTEM_STATE,
            BeanKind::NameNodeInfo => &NAME_NODE_INFO,
            BeanKind::JvmMetrics => &JVM_METRICS,
        }
    }
}

/// Every descriptor the table can emit, `up` first.
pub(crate) fn descriptors() -> impl Iterator<Item = &'static Descriptor> {
    std::iter::once(&UP).chain(
        BeanKind::ALL
            .into_iter()
            .flat_map(|kind| kind.fields().iter().map(|field| field.descriptor)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn bean_names_round_trip() {
        for kind in BeanKind::ALL {
            assert_eq!(BeanKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BeanKind::from_name("java.lang:type=Memory"), None);
        assert_eq!(BeanKind::from_name(""), None);
    }

    #[test]
    fn descriptor_names_are_unique() {
        let names: Vec<String> = descriptors().map(Descriptor::fq_name).collect();
        let unique: FxHashSet<&String> = names.iter().collect();
        assert_eq!(names.len(), 39);
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn only_log_events_are_counters() {
        let counters: Vec<String> = descriptors()
            .filter(|d| d.kind() == crate::metric::Kind::Counter)
            .map(Descriptor::fq_name)
            .collect();
        assert_eq!(
            counters,
            vec![
                "namenode_jvm_log_fatal",
                "namenode_jvm_log_error",
                "namenode_jvm_log_warn",
                "namenode_jvm_log_info",
            ]
        );
    }

    #[test]
    fn missing_attribute_is_a_fault() {
        assert_eq!(Coercion::Number.apply(None), Err(Fault::Missing));
        assert_eq!(Coercion::NonEmpty.apply(None), Err(Fault::Missing));
    }

    #[test]
    fn number_rejects_strings() {
        assert_eq!(
            Coercion::Number.apply(Some(&Value::from("12"))),
            Err(Fault::Mistyped {
                expected: "number",
                found: "string"
            })
        );
    }

    #[test]
    fn equals_rejects_non_strings() {
        assert_eq!(
            Coercion::Equals("active").apply(Some(&Value::Null)),
            Err(Fault::Mistyped {
                expected: "string",
                found: "null"
            })
        );
    }

    #[test]
    fn equals_is_case_sensitive() {
        let coercion = Coercion::Equals("active");
        assert_eq!(coercion.apply(Some(&Value::from("active"))), Ok(1.0));
        assert_eq!(coercion.apply(Some(&Value::from("Active"))), Ok(0.0));
        assert_eq!(coercion.apply(Some(&Value::from("standby"))), Ok(0.0));
        assert_eq!(coercion.apply(Some(&Value::from(""))), Ok(0.0));
    }

    #[test]
    fn whitespace_is_not_empty() {
        assert_eq!(Coercion::NonEmpty.apply(Some(&Value::from(" "))), Ok(1.0));
        assert_eq!(Coercion::NonEmpty.apply(Some(&Value::from("\t\n"))), Ok(1.0));
        assert_eq!(Coercion::NonEmpty.apply(Some(&Value::from(""))), Ok(0.0));
    }

    // Numbers pass through untouched.
    proptest! {
        #[test]
        fn number_passes_through(n in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let value = Value::from(n);
            prop_assert_eq!(Coercion::Number.apply(Some(&value)), Ok(n));
        }
    }

    // Only the exact literal maps to 1.0.
    proptest! {
        #[test]
        fn equals_matches_only_literal(s in ".*") {
            let expected = if s == "active" { 1.0 } else { 0.0 };
            prop_assert_eq!(Coercion::Equals("active").apply(Some(&Value::from(s))), Ok(expected));
        }
    }

    // Any non-empty string maps to 1.0.
    proptest! {
        #[test]
        fn non_empty_tracks_length(s in "\\PC*") {
            let expected = if s.is_empty() { 0.0 } else { 1.0 };
            prop_assert_eq!(Coercion::NonEmpty.apply(Some(&Value::from(s))), Ok(expected));
        }
    }
}
