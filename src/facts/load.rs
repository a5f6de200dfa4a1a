//! Reading edge facts from disk.

use crate::Result;
use crate::facts::{DeviceRef, PeeringFact, PhysicalFact, RedundancyFact, TopologyFacts};
use anyhow::{Context, bail};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;

/// Per-layer collector output: `{ "nodes": [...], "edges": [...] }`.
/// Other top-level keys ("groups", "peers", ...) are ignored.
#[derive(Debug, Deserialize)]
#[serde(bound = "F: DeserializeOwned")]
struct SourceDoc<F> {
    #[serde(default)]
    nodes: Vec<DeviceRef>,

    #[serde(default)]
    edges: Vec<F>,
}

/// Load a single combined facts document.
pub fn load_combined(path: &str) -> Result<TopologyFacts> {
    let text = fs::read_to_string(path).with_context(|| format!("read facts file {}", path))?;
    let facts: TopologyFacts =
        serde_json::from_str(&text).with_context(|| format!("parse facts file {}", path))?;
    tracing::info!(
        path,
        devices = facts.devices.len(),
        physical = facts.physical.len(),
        redundancy = facts.redundancy.len(),
        peering = facts.peering.len(),
        "loaded facts"
    );
    Ok(facts)
}

/// Load and merge per-layer collector documents. At least one must be given.
/// `devices` is an optional JSON list of extra device names.
pub fn load_sources(
    devices: Option<&str>,
    physical: Option<&str>,
    redundancy: Option<&str>,
    peering: Option<&str>,
) -> Result<TopologyFacts> {
    if physical.is_none() && redundancy.is_none() && peering.is_none() {
        bail!("no edge fact sources given (physical, redundancy or peering)");
    }

    let mut facts = TopologyFacts::default();

    if let Some(path) = devices {
        let text =
            fs::read_to_string(path).with_context(|| format!("read devices file {}", path))?;
        let names: Vec<DeviceRef> = serde_json::from_str(&text)
            .with_context(|| format!("parse devices file {}", path))?;
        facts.devices.extend(names);
    }
    if let Some(path) = physical {
        let doc = read_source::<PhysicalFact>(path, "physical")?;
        facts.devices.extend(doc.nodes);
        facts.physical = doc.edges;
    }
    if let Some(path) = redundancy {
        let doc = read_source::<RedundancyFact>(path, "redundancy")?;
        facts.devices.extend(doc.nodes);
        facts.redundancy = doc.edges;
    }
    if let Some(path) = peering {
        let doc = read_source::<PeeringFact>(path, "peering")?;
        facts.devices.extend(doc.nodes);
        facts.peering = doc.edges;
    }

    Ok(facts)
}

fn read_source<F: DeserializeOwned>(path: &str, layer: &str) -> Result<SourceDoc<F>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read {} facts file {}", layer, path))?;
    let doc: SourceDoc<F> = serde_json::from_str(&text)
        .with_context(|| format!("parse {} facts file {}", layer, path))?;
    tracing::info!(path, layer, nodes = doc.nodes.len(), edges = doc.edges.len(), "loaded facts");
    Ok(doc)
}
