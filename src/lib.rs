//! Topology synthesis and 3D layout for multi-layer network topologies.
//!
//! Pipeline, each stage a pure function of the previous ones:
//!
//! ```text
//! Registry ──► decode ──► graph::compose ──┬──► pairs::find_pairs ──┐
//!                                          └────────────────────────┴──► layout ──► partition
//! ```
//!
//! `model::build_topology_report` bundles every output into one serializable
//! report for whatever renders it.

pub mod diagnostics;
pub mod facts;
pub mod graph;
pub mod layout;
pub mod model;
pub mod naming;
pub mod pairs;
pub mod partition;

pub type Result<T> = anyhow::Result<T>;
