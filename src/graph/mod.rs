//! Multi-layer topology graph.
//!
//! Physical links, redundancy-group links and routing peerings are merged
//! into one graph. Nodes are unique by device name; edges keep their layer,
//! so two devices joined in several layers have several distinct edges.

use crate::facts::{PeeringFact, PeeringKind, PhysicalFact, RedundancyFact, TopologyFacts};
use crate::naming::{NamingFact, Registry, decode};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Physical,
    Redundancy,
    Peering,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Physical, Layer::Redundancy, Layer::Peering];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Physical => "physical",
            Layer::Redundancy => "redundancy",
            Layer::Peering => "peering",
        }
    }
}

/// Layer-specific edge attributes, oriented to the edge's `a`/`b` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum EdgeAttrs {
    Physical {
        a_interface: Option<String>,
        b_interface: Option<String>,
    },
    Redundancy {
        group: Option<String>,
        virtual_ip: Option<String>,
        active_priority: Option<u32>,
        standby_priority: Option<u32>,
    },
    Peering {
        kind: Option<PeeringKind>,
        a_as: Option<u32>,
        b_as: Option<u32>,
        /// As reported by the side that announced the peering.
        neighbor_ip: Option<String>,
    },
}

impl EdgeAttrs {
    pub fn layer(&self) -> Layer {
        match self {
            EdgeAttrs::Physical { .. } => Layer::Physical,
            EdgeAttrs::Redundancy { .. } => Layer::Redundancy,
            EdgeAttrs::Peering { .. } => Layer::Peering,
        }
    }

    /// Part of the edge identity beyond (layer, a, b): parallel physical
    /// links on different ports, or the same pair in different groups, stay
    /// distinct.
    fn discriminator(&self) -> String {
        match self {
            EdgeAttrs::Physical {
                a_interface,
                b_interface,
            } => format!(
                "{}|{}",
                a_interface.as_deref().unwrap_or_default(),
                b_interface.as_deref().unwrap_or_default()
            ),
            EdgeAttrs::Redundancy { group, .. } => group.clone().unwrap_or_default(),
            EdgeAttrs::Peering { .. } => String::new(),
        }
    }

    fn swapped(self) -> Self {
        match self {
            EdgeAttrs::Physical {
                a_interface,
                b_interface,
            } => EdgeAttrs::Physical {
                a_interface: b_interface,
                b_interface: a_interface,
            },
            EdgeAttrs::Peering {
                kind,
                a_as,
                b_as,
                neighbor_ip,
            } => EdgeAttrs::Peering {
                kind,
                a_as: b_as,
                b_as: a_as,
                neighbor_ip,
            },
            other => other,
        }
    }
}

/// An undirected edge; `a < b` always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub a: String,
    pub b: String,

    #[serde(flatten)]
    pub attrs: EdgeAttrs,
}

impl Edge {
    pub fn layer(&self) -> Layer {
        self.attrs.layer()
    }

    pub fn touches(&self, name: &str) -> bool {
        self.a == name || self.b == name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub fact: NamingFact,
    /// False when the device only appeared as an edge endpoint.
    pub declared: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub self_loops: usize,
    pub blank_endpoints: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeStats {
    pub layers: BTreeMap<Layer, LayerStats>,
    pub declared_nodes: usize,
    pub edge_only_nodes: usize,
    pub invalid_nodes: usize,
    pub blank_devices: usize,
}

impl ComposeStats {
    pub fn skipped(&self) -> usize {
        self.layers
            .values()
            .map(|l| l.duplicates + l.self_loops + l.blank_endpoints)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edges in the order their facts were accepted, physical first.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_of_layer(&self, layer: Layer) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.layer() == layer)
    }

    pub fn edges_between<'g>(&'g self, x: &'g str, y: &'g str) -> impl Iterator<Item = &'g Edge> {
        let (a, b) = ordered(x, y);
        self.edges.iter().filter(move |e| e.a == a && e.b == b)
    }

    /// Devices joined to `name` by any layer.
    pub fn neighbors(&self, name: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.touches(name))
            .map(|e| if e.a == name { e.b.as_str() } else { e.a.as_str() })
            .collect()
    }

    /// Distinct connected pairs over all layers, each as `(a, b)` with `a < b`.
    pub fn connected_pairs(&self) -> BTreeSet<(&str, &str)> {
        self.edges
            .iter()
            .map(|e| (e.a.as_str(), e.b.as_str()))
            .collect()
    }

    /// Sites observed among valid nodes.
    pub fn sites(&self) -> BTreeSet<&str> {
        self.nodes
            .values()
            .filter(|n| n.fact.valid)
            .map(|n| n.fact.site.as_str())
            .collect()
    }

    pub fn invalid_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.fact.valid)
    }
}

fn ordered<'s>(x: &'s str, y: &'s str) -> (&'s str, &'s str) {
    if x <= y { (x, y) } else { (y, x) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub graph: Graph,
    pub stats: ComposeStats,
}

/// Compose a graph from loaded facts.
pub fn compose_facts(facts: &TopologyFacts, registry: &Registry) -> Composition {
    compose(
        facts.device_names(),
        &facts.physical,
        &facts.redundancy,
        &facts.peering,
        registry,
    )
}

/// Merge the declared devices and the three edge streams into one graph.
///
/// - every distinct name (declared or edge endpoint) becomes one node,
///   decoded once
/// - self-loops, blank endpoints and repeats of an edge already accepted in
///   the same layer are skipped and counted, never fatal
pub fn compose<'a>(
    devices: impl IntoIterator<Item = &'a str>,
    physical: &[PhysicalFact],
    redundancy: &[RedundancyFact],
    peering: &[PeeringFact],
    registry: &Registry,
) -> Composition {
    let mut builder = Builder {
        registry,
        graph: Graph::default(),
        stats: ComposeStats::default(),
        seen: BTreeSet::new(),
    };

    for name in devices {
        if name.trim().is_empty() {
            builder.stats.blank_devices += 1;
            tracing::warn!("skipping blank device name");
            continue;
        }
        builder.ensure_node(name, true);
    }

    for f in physical {
        builder.add_edge(
            &f.source,
            &f.target,
            EdgeAttrs::Physical {
                a_interface: f.source_interface.clone(),
                b_interface: f.target_interface.clone(),
            },
        );
    }
    for f in redundancy {
        builder.add_edge(
            &f.source,
            &f.target,
            EdgeAttrs::Redundancy {
                group: f.group.clone(),
                virtual_ip: f.virtual_ip.clone(),
                active_priority: f.active_priority,
                standby_priority: f.standby_priority,
            },
        );
    }
    for f in peering {
        builder.add_edge(
            &f.source,
            &f.target,
            EdgeAttrs::Peering {
                kind: f.kind(),
                a_as: f.local_as,
                b_as: f.remote_as,
                neighbor_ip: f.neighbor_ip.clone(),
            },
        );
    }

    let Builder {
        graph, mut stats, ..
    } = builder;
    for layer in Layer::ALL {
        stats.layers.entry(layer).or_default();
    }

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        edge_only_nodes = stats.edge_only_nodes,
        invalid_nodes = stats.invalid_nodes,
        skipped = stats.skipped(),
        "composed topology graph"
    );

    Composition { graph, stats }
}

struct Builder<'r> {
    registry: &'r Registry,
    graph: Graph,
    stats: ComposeStats,
    seen: BTreeSet<(Layer, String, String, String)>,
}

impl Builder<'_> {
    fn ensure_node(&mut self, name: &str, declared: bool) {
        if let Some(node) = self.graph.nodes.get_mut(name) {
            if declared && !node.declared {
                node.declared = true;
                self.stats.declared_nodes += 1;
                self.stats.edge_only_nodes -= 1;
            }
            return;
        }

        let fact = decode(name, self.registry);
        match &fact.failure {
            Some(reason) => {
                self.stats.invalid_nodes += 1;
                tracing::warn!(device = name, %reason, "device name did not decode");
            }
            None => tracing::debug!(
                device = name,
                site = %fact.site,
                tier = %fact.tier,
                role = %fact.role,
                ordinal = %fact.ordinal,
                "decoded device"
            ),
        }
        if declared {
            self.stats.declared_nodes += 1;
        } else {
            self.stats.edge_only_nodes += 1;
        }

        self.graph.nodes.insert(
            name.to_string(),
            Node {
                name: name.to_string(),
                fact,
                declared,
            },
        );
    }

    fn add_edge(&mut self, source: &str, target: &str, attrs: EdgeAttrs) {
        let layer = attrs.layer();
        let stats = self.stats.layers.entry(layer).or_default();

        if source.trim().is_empty() || target.trim().is_empty() {
            stats.blank_endpoints += 1;
            tracing::warn!(
                layer = layer.as_str(),
                source,
                target,
                "skipping edge with blank endpoint"
            );
            return;
        }
        if source == target {
            stats.self_loops += 1;
            tracing::warn!(layer = layer.as_str(), device = source, "skipping self-loop");
            return;
        }

        let (a, b, attrs) = if source < target {
            (source, target, attrs)
        } else {
            (target, source, attrs.swapped())
        };

        let key = (layer, a.to_string(), b.to_string(), attrs.discriminator());
        if !self.seen.insert(key) {
            stats.duplicates += 1;
            tracing::debug!(layer = layer.as_str(), a, b, "skipping duplicate edge");
            return;
        }
        stats.accepted += 1;

        self.ensure_node(a, false);
        self.ensure_node(b, false);
        self.graph.edges.push(Edge {
            a: a.to_string(),
            b: b.to_string(),
            attrs,
        });
    }
}
