//! Prometheus exporter for the HDFS NameNode.
//!
//! This library supports the `namenode_exporter` binary found elsewhere in
//! this project. Each scrape of the exporter fetches the NameNode's JMX
//! status document, translates a fixed set of beans into metrics and renders
//! them in the Prometheus text format.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod fetch;
pub mod httpd;
pub mod jmx;
pub mod metric;
pub mod namenode;
pub mod process;
pub mod registry;
pub mod signals;
