//! Hand-off model: graph + pairs + layout + site partitions as one
//! serializable report.

use crate::Result;
use crate::facts::TopologyFacts;
use crate::graph::{ComposeStats, Composition, Edge, Layer, compose_facts};
use crate::layout::{Layout, LayoutStats, Position, layout};
use crate::naming::{DecodeFailure, Registry, RegistrySummary, RoleDescriptor};
use crate::pairs::{self, PairRelation};
use crate::partition::partition;
use anyhow::bail;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Level and lane from the device's tier.
    Tier,
    /// Sentinel level, lane 0.
    Sentinel,
    /// Left out of the layout.
    Excluded,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub name: String,
    pub valid: bool,
    pub site: String,
    pub tier: String,
    pub role: String,
    pub ordinal: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DecodeFailure>,

    /// Display name of the tier ("Core", ...), empty for invalid nodes.
    pub tier_name: String,

    /// Visual treatment; the default descriptor for unknown roles.
    pub style: RoleDescriptor,

    /// Named in the device list, not only seen as an edge endpoint.
    pub declared: bool,

    pub placement: Placement,
    pub position: Option<Position>,

    /// HA partners of this device.
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub site: String,
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub pairs: Vec<PairRelation>,
    pub positions: BTreeMap<String, Position>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub nodes: usize,
    pub valid_nodes: usize,
    pub invalid_nodes: usize,
    pub edges: usize,
    pub edges_by_layer: BTreeMap<Layer, usize>,
    pub pairs: usize,
    pub sites: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    pub registry: RegistrySummary,
    pub nodes: BTreeMap<String, NodeView>,
    pub edges: Vec<Edge>,
    pub pairs: Vec<PairRelation>,
    pub sites: BTreeMap<String, SiteView>,
    pub compose: ComposeStats,
    pub layout: LayoutStats,
    pub totals: TotalsView,
}

/// Run the whole pipeline on loaded facts.
pub fn synthesize(facts: &TopologyFacts, registry: &Registry) -> Result<TopologyReport> {
    let composition = compose_facts(facts, registry);
    let pairs = pairs::detect(&composition.graph, registry.pairing());
    let placed = layout(&composition.graph, &pairs, registry);
    build_topology_report(registry, &composition, &pairs, &placed)
}

/// Assemble the report. Fails when `pairs` or `placed` name devices the
/// graph does not have, i.e. they were computed from a different graph.
pub fn build_topology_report(
    registry: &Registry,
    composition: &Composition,
    pairs: &BTreeSet<PairRelation>,
    placed: &Layout,
) -> Result<TopologyReport> {
    let graph = &composition.graph;

    // 1) Inputs must describe the same node set.
    for name in placed.positions.keys() {
        if graph.node(name).is_none() {
            bail!("layout places device '{}' which is not in the graph", name);
        }
    }
    for pair in pairs {
        for name in [pair.a(), pair.b()] {
            if graph.node(name).is_none() {
                bail!(
                    "pair {} / {} names device '{}' which is not in the graph",
                    pair.a(),
                    pair.b(),
                    name
                );
            }
        }
    }

    // 2) Partners per device.
    let mut partners: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for pair in pairs {
        partners.entry(pair.a()).or_default().push(pair.b().to_string());
        partners.entry(pair.b()).or_default().push(pair.a().to_string());
    }

    // 3) Node views.
    let mut nodes: BTreeMap<String, NodeView> = BTreeMap::new();
    for node in graph.nodes() {
        let fact = &node.fact;
        let position = placed.position(&node.name).copied();
        let placement = match position {
            None => Placement::Excluded,
            Some(_) if fact.valid && registry.tier_info(&fact.tier).is_some() => Placement::Tier,
            Some(_) => Placement::Sentinel,
        };
        let tier_name = if fact.valid {
            registry.tier_display_name(&fact.tier)
        } else {
            String::new()
        };

        nodes.insert(
            node.name.clone(),
            NodeView {
                name: node.name.clone(),
                valid: fact.valid,
                site: fact.site.clone(),
                tier: fact.tier.clone(),
                role: fact.role.clone(),
                ordinal: fact.ordinal.clone(),
                failure: fact.failure.clone(),
                tier_name,
                style: registry.role_info(&fact.role).clone(),
                declared: node.declared,
                placement,
                position,
                partners: partners.remove(node.name.as_str()).unwrap_or_default(),
            },
        );
    }

    // 4) Site views.
    let sites: BTreeMap<String, SiteView> = partition(graph, placed, pairs)
        .into_iter()
        .map(|(site, part)| {
            let view = SiteView {
                site: site.to_string(),
                nodes: part.nodes.iter().map(|n| n.name.clone()).collect(),
                edges: part.edges.into_iter().cloned().collect(),
                pairs: part.pairs.into_iter().cloned().collect(),
                positions: part
                    .positions
                    .into_iter()
                    .map(|(name, pos)| (name.to_string(), pos))
                    .collect(),
            };
            (site.to_string(), view)
        })
        .collect();

    let mut edges_by_layer: BTreeMap<Layer, usize> =
        Layer::ALL.into_iter().map(|l| (l, 0)).collect();
    for edge in graph.edges() {
        *edges_by_layer.entry(edge.layer()).or_default() += 1;
    }
    let valid_nodes = nodes.values().filter(|n| n.valid).count();

    Ok(TopologyReport {
        registry: registry.summary(),
        totals: TotalsView {
            nodes: nodes.len(),
            valid_nodes,
            invalid_nodes: nodes.len() - valid_nodes,
            edges: graph.edges().len(),
            edges_by_layer,
            pairs: pairs.len(),
            sites: sites.len(),
        },
        nodes,
        edges: graph.edges().to_vec(),
        pairs: pairs.iter().cloned().collect(),
        sites,
        compose: composition.stats.clone(),
        layout: placed.stats.clone(),
    })
}
