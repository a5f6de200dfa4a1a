//! Per-site views over the combined graph and layout.
//!
//! A partition borrows everything it shows. Positions are copied from the
//! global layout, so a device sits at the same coordinates in its site view
//! and in the combined view.

use crate::graph::{Edge, Graph, Node};
use crate::layout::{Layout, Position};
use crate::pairs::PairRelation;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitePartition<'g> {
    pub site: &'g str,
    pub nodes: Vec<&'g Node>,
    /// Only edges with both endpoints in the site.
    pub edges: Vec<&'g Edge>,
    pub positions: BTreeMap<&'g str, Position>,
    pub pairs: Vec<&'g PairRelation>,
}

impl SitePartition<'_> {
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }
}

/// Split the combined view by site. Invalid nodes have no site and appear
/// in no partition.
pub fn partition<'g>(
    graph: &'g Graph,
    layout: &Layout,
    pairs: &'g BTreeSet<PairRelation>,
) -> BTreeMap<&'g str, SitePartition<'g>> {
    let mut out: BTreeMap<&'g str, SitePartition<'g>> = BTreeMap::new();
    let mut site_of: BTreeMap<&'g str, &'g str> = BTreeMap::new();

    for node in graph.nodes().filter(|n| n.fact.valid) {
        let site = node.fact.site.as_str();
        site_of.insert(node.name.as_str(), site);

        let part = out.entry(site).or_insert_with(|| SitePartition {
            site,
            nodes: Vec::new(),
            edges: Vec::new(),
            positions: BTreeMap::new(),
            pairs: Vec::new(),
        });
        part.nodes.push(node);
        if let Some(p) = layout.position(&node.name) {
            part.positions.insert(node.name.as_str(), *p);
        }
    }

    let shared_site = |a: &str, b: &str| match (site_of.get(a), site_of.get(b)) {
        (Some(x), Some(y)) if x == y => Some(*x),
        _ => None,
    };

    for edge in graph.edges() {
        if let Some(part) = shared_site(&edge.a, &edge.b).and_then(|s| out.get_mut(s)) {
            part.edges.push(edge);
        }
    }
    for pair in pairs {
        if let Some(part) = shared_site(pair.a(), pair.b()).and_then(|s| out.get_mut(s)) {
            part.pairs.push(pair);
        }
    }

    for part in out.values() {
        tracing::debug!(
            site = part.site,
            nodes = part.nodes.len(),
            edges = part.edges.len(),
            pairs = part.pairs.len(),
            "site partition"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{PeeringFact, PhysicalFact};
    use crate::graph::compose;
    use crate::layout::layout;
    use crate::naming::{PairMode, Registry};
    use crate::pairs::find_pairs;
    use pretty_assertions::assert_eq;

    fn phys(s: &str, t: &str) -> PhysicalFact {
        PhysicalFact {
            source: s.into(),
            target: t.into(),
            source_interface: None,
            target_interface: None,
        }
    }

    #[test]
    fn partitions_reuse_global_positions() {
        let reg = Registry::builtin().unwrap();
        let g = compose(
            ["junk"],
            &[
                phys("npccosr01", "npcdisw01"),
                phys("npccosr02", "npcdisw01"),
                phys("wpccosr01", "wpcdisw01"),
            ],
            &[],
            &[PeeringFact {
                source: "npccosr01".into(),
                target: "wpccosr01".into(),
                peering_type: None,
                local_as: Some(65001),
                remote_as: Some(65002),
                neighbor_ip: None,
            }],
            &reg,
        )
        .graph;
        let pairs = find_pairs(g.nodes().map(|n| &n.fact), PairMode::AllPairs);
        let placed = layout(&g, &pairs, &reg);
        let parts = partition(&g, &placed, &pairs);

        assert_eq!(parts.keys().copied().collect::<Vec<_>>(), vec!["npc", "wpc"]);

        let npc = &parts["npc"];
        assert_eq!(npc.nodes.len(), 3);
        assert_eq!(npc.edges.len(), 2);
        assert_eq!(npc.pairs.len(), 1);
        assert!(!npc.contains("junk"));

        // The cross-site peering lives only in the combined graph.
        assert_eq!(parts["wpc"].edges.len(), 1);

        for part in parts.values() {
            for (name, pos) in &part.positions {
                assert_eq!(Some(pos), placed.position(name));
            }
        }
        assert!(placed.position("junk").is_some());
    }

    #[test]
    fn empty_graph_has_no_partitions() {
        let reg = Registry::builtin().unwrap();
        let g = compose(Vec::<&str>::new(), &[], &[], &[], &reg).graph;
        let pairs = BTreeSet::new();
        let placed = layout(&g, &pairs, &reg);
        assert!(partition(&g, &placed, &pairs).is_empty());
    }
}
