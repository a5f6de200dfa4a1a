//! Deterministic 3D placement.
//!
//! - z (level): the tier's vertical level
//! - x (lane): the tier's lane times the lane width
//! - y (spread): a spring arrangement inside each (level, lane) group, then
//!   a small nudge apart for HA pairs that never brings two devices closer
//!
//! Devices that cannot be placed by tier go to the sentinel level on lane 0,
//! or are left out, depending on configuration.

pub mod spring;

use crate::graph::Graph;
use crate::naming::{InvalidNodePolicy, Registry};
use crate::pairs::PairRelation;
use serde::Serialize;
use spring::SpringParams;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Lane axis.
    pub x: f64,
    /// Spread axis.
    pub y: f64,
    /// Level axis.
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub placement_groups: usize,
    pub largest_group: usize,
    pub sentinel_placed: usize,
    pub excluded: usize,
    pub pairs_offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub positions: BTreeMap<String, Position>,
    pub stats: LayoutStats,
}

impl Layout {
    pub fn position(&self, name: &str) -> Option<&Position> {
        self.positions.get(name)
    }
}

/// Placement group: level bits + lane. Bits keep the key `Ord`; only
/// equality matters.
type SlotKey = (u64, i32);

struct Slot<'g> {
    level: f64,
    lane: i32,
    members: Vec<&'g str>,
}

/// Place every node of `graph`.
///
/// Pure in (graph, pairs, registry): node and edge order do not matter, and
/// two calls on the same inputs give identical maps.
pub fn layout(graph: &Graph, pairs: &BTreeSet<PairRelation>, registry: &Registry) -> Layout {
    let settings = registry.layout();
    let mut stats = LayoutStats::default();

    // 1) Level and lane per node; group nodes sharing both.
    let mut slots: BTreeMap<SlotKey, Slot<'_>> = BTreeMap::new();
    for node in graph.nodes() {
        let placed = node
            .fact
            .valid
            .then(|| registry.tier_info(&node.fact.tier))
            .flatten();
        let (level, lane) = match placed {
            Some(info) => (info.level, info.lane),
            None => match settings.invalid_nodes {
                InvalidNodePolicy::Sentinel => {
                    stats.sentinel_placed += 1;
                    (settings.sentinel_level, 0)
                }
                InvalidNodePolicy::Exclude => {
                    stats.excluded += 1;
                    tracing::debug!(device = %node.name, "excluded from layout");
                    continue;
                }
            },
        };
        // -0.0 and 0.0 are the same level.
        let level = level + 0.0;
        slots
            .entry((level.to_bits(), lane))
            .or_insert_with(|| Slot {
                level,
                lane,
                members: Vec::new(),
            })
            .members
            .push(node.name.as_str());
    }

    // 2) Links inside each group. Nodes iterate in name order, so member
    // indices are stable.
    let mut where_is: BTreeMap<&str, (SlotKey, usize)> = BTreeMap::new();
    for (key, slot) in &slots {
        for (i, name) in slot.members.iter().enumerate() {
            where_is.insert(*name, (*key, i));
        }
    }
    let mut links: BTreeMap<SlotKey, Vec<(usize, usize)>> = BTreeMap::new();
    for (a, b) in graph.connected_pairs() {
        if let (Some((ka, ia)), Some((kb, ib))) = (where_is.get(a), where_is.get(b)) {
            if ka == kb {
                links.entry(*ka).or_default().push((*ia, *ib));
            }
        }
    }

    // 3) Spread inside each group.
    let params = SpringParams {
        k: settings.spring_k,
        iterations: settings.spring_iterations,
        scale: settings.spread_scale,
        min_separation: settings.min_separation,
    };
    let mut spreads: BTreeMap<SlotKey, Vec<f64>> = BTreeMap::new();
    for (key, slot) in &slots {
        let group_links = links.get(key).map(Vec::as_slice).unwrap_or_default();
        spreads.insert(*key, spring::spread(&slot.members, group_links, &params));
        stats.largest_group = stats.largest_group.max(slot.members.len());
    }
    stats.placement_groups = slots.len();

    // 4) HA pairs: the member lower on the spread axis is nudged down, the
    // other up. Nudges from several pairs add up and are applied as widened
    // gaps, so no two members of a group end up closer than before.
    let offset = registry.pairing().offset;
    let mut nudges: BTreeMap<SlotKey, Vec<f64>> = BTreeMap::new();
    for pair in pairs {
        let (Some(&(ka, ia)), Some(&(kb, ib))) = (where_is.get(pair.a()), where_is.get(pair.b()))
        else {
            continue;
        };
        if ka != kb {
            continue;
        }
        let Some(ys) = spreads.get(&ka) else {
            continue;
        };
        let (low, high) = if ys[ia].total_cmp(&ys[ib]).then(ia.cmp(&ib)).is_le() {
            (ia, ib)
        } else {
            (ib, ia)
        };
        let n = nudges.entry(ka).or_insert_with(|| vec![0.0; ys.len()]);
        n[low] -= offset;
        n[high] += offset;
        stats.pairs_offset += 1;
    }
    for (key, n) in &nudges {
        if let Some(ys) = spreads.get_mut(key) {
            spring::nudge_apart(ys, n);
        }
    }

    let mut positions = BTreeMap::new();
    for (key, slot) in &slots {
        let Some(ys) = spreads.get(key) else {
            continue;
        };
        let x = registry.lane_x(slot.lane);
        for (name, &y) in slot.members.iter().zip(ys) {
            tracing::trace!(device = name, x, y, z = slot.level, "placed");
            positions.insert(
                name.to_string(),
                Position {
                    x,
                    y,
                    z: slot.level,
                },
            );
        }
    }

    tracing::info!(
        placed = positions.len(),
        groups = stats.placement_groups,
        largest_group = stats.largest_group,
        sentinel = stats.sentinel_placed,
        excluded = stats.excluded,
        "layout done"
    );

    Layout { positions, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{PhysicalFact, RedundancyFact};
    use crate::graph::compose;
    use crate::naming::{PairMode, RegistrySpec, TierSpec};
    use crate::pairs::find_pairs;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn phys(s: &str, t: &str) -> PhysicalFact {
        PhysicalFact {
            source: s.into(),
            target: t.into(),
            source_interface: None,
            target_interface: None,
        }
    }

    fn graph_of(devices: &[&str], links: &[(&str, &str)], reg: &Registry) -> Graph {
        let physical: Vec<PhysicalFact> = links.iter().map(|(s, t)| phys(s, t)).collect();
        compose(devices.iter().copied(), &physical, &[], &[], reg).graph
    }

    #[test]
    fn level_and_lane_come_from_the_tier() {
        let reg = Registry::builtin().unwrap();
        let g = graph_of(&["npccosr01", "npcdisw01", "npcwdfw01"], &[], &reg);
        let out = layout(&g, &BTreeSet::new(), &reg);

        let co = out.position("npccosr01").unwrap();
        assert_eq!((co.x, co.y, co.z), (0.0, 0.0, 3.5));
        let di = out.position("npcdisw01").unwrap();
        assert_eq!((di.x, di.z), (0.0, 2.5));
        let wd = out.position("npcwdfw01").unwrap();
        assert_eq!((wd.x, wd.z), (-10.0, 1.0));
        assert_eq!(out.stats.placement_groups, 3);
    }

    #[test]
    fn pair_members_are_offset_symmetrically() {
        let reg = Registry::builtin().unwrap();
        let redundancy = [RedundancyFact {
            source: "npccosr02".into(),
            target: "npccosr01".into(),
            group: Some("10".into()),
            virtual_ip: None,
            active_priority: None,
            standby_priority: None,
        }];
        let g = compose(Vec::<&str>::new(), &[], &redundancy, &[], &reg).graph;
        let pairs = find_pairs(g.nodes().map(|n| &n.fact), reg.pairing().mode);
        assert_eq!(pairs.len(), 1);

        let plain = layout(&g, &BTreeSet::new(), &reg);
        let nudged = layout(&g, &pairs, &reg);
        let dy = |l: &Layout, n: &str| l.position(n).unwrap().y;

        let (low, high) = if dy(&plain, "npccosr01") < dy(&plain, "npccosr02") {
            ("npccosr01", "npccosr02")
        } else {
            ("npccosr02", "npccosr01")
        };
        assert!((dy(&nudged, low) - (dy(&plain, low) - 0.3)).abs() < 1e-9);
        assert!((dy(&nudged, high) - (dy(&plain, high) + 0.3)).abs() < 1e-9);
        assert_eq!(nudged.stats.pairs_offset, 1);

        let (a, b) = (
            nudged.position("npccosr01").unwrap(),
            nudged.position("npccosr02").unwrap(),
        );
        assert_eq!((a.x, a.z), (b.x, b.z));
    }

    #[test]
    fn invalid_nodes_follow_policy() {
        let reg = Registry::builtin().unwrap();
        let g = graph_of(&["zzcosr01", "npccosr01", "junk"], &[], &reg);

        let out = layout(&g, &BTreeSet::new(), &reg);
        assert_eq!(out.positions.len(), 3);
        assert_eq!(out.stats.sentinel_placed, 2);
        let sentinel = out.position("zzcosr01").unwrap();
        // Lowest builtin tier is the cache tier at level 0.0.
        assert_eq!((sentinel.x, sentinel.z), (0.0, 0.0));

        let mut spec = RegistrySpec::builtin();
        spec.layout.invalid_nodes = Some(InvalidNodePolicy::Exclude);
        let reg = spec.validate_and_build().unwrap();
        let out = layout(&g, &BTreeSet::new(), &reg);
        assert_eq!(out.positions.keys().collect::<Vec<_>>(), vec!["npccosr01"]);
        assert_eq!(out.stats.excluded, 2);
    }

    #[test]
    fn unknown_tier_at_layout_time_falls_back_to_sentinel() {
        let mut spec = RegistrySpec::builtin();
        spec.tiers.insert("xx".into(), TierSpec::new(9.0, 1, "Extra"));
        let wide = spec.validate_and_build().unwrap();
        let g = graph_of(&["npcxxsr01"], &[], &wide);
        assert!(g.node("npcxxsr01").unwrap().fact.valid);

        let narrow = Registry::builtin().unwrap();
        let out = layout(&g, &BTreeSet::new(), &narrow);
        assert_eq!(out.position("npcxxsr01").unwrap().z, 0.0);
        assert_eq!(out.stats.sentinel_placed, 1);
    }

    #[test]
    fn crowded_group_keeps_minimum_separation() {
        let reg = Registry::builtin().unwrap();
        let names: Vec<String> = (1..=8).map(|i| format!("npcaccsw{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let g = graph_of(&refs, &[("npcaccsw01", "npcaccsw02")], &reg);
        let out = layout(&g, &BTreeSet::new(), &reg);

        let mut ys: Vec<f64> = out.positions.values().map(|p| p.y).collect();
        ys.sort_by(f64::total_cmp);
        for w in ys.windows(2) {
            assert!(w[1] - w[0] >= 0.5 - 1e-9);
        }
        assert_eq!(out.stats.largest_group, 8);
    }

    /// Same-slot members keep `min_separation`, and no pair ends up closer
    /// than it was without pair offsets.
    fn assert_offsets_only_widen(g: &Graph, pairs: &BTreeSet<PairRelation>, reg: &Registry) {
        let plain = layout(g, &BTreeSet::new(), reg);
        let nudged = layout(g, pairs, reg);
        let min_sep = reg.layout().min_separation;

        let mut by_slot: BTreeMap<(u64, u64), Vec<f64>> = BTreeMap::new();
        for p in nudged.positions.values() {
            by_slot.entry((p.x.to_bits(), p.z.to_bits())).or_default().push(p.y);
        }
        for ys in by_slot.values_mut() {
            ys.sort_by(f64::total_cmp);
            for w in ys.windows(2) {
                assert!(w[1] - w[0] >= min_sep - 1e-9, "{:?}", ys);
            }
        }

        for pair in pairs {
            let gap = |l: &Layout| (l.position(pair.a()).unwrap().y - l.position(pair.b()).unwrap().y).abs();
            assert!(
                gap(&nudged) >= gap(&plain) - 1e-9,
                "{} / {} moved closer",
                pair.a(),
                pair.b()
            );
        }
    }

    #[test]
    fn pair_offsets_keep_a_crowded_slot_apart() {
        let reg = Registry::builtin().unwrap();
        let mut names = vec!["npccosr01", "npccosr02", "npccofw01", "npccofw02", "npccofw03"];
        names.extend(["npccolb01", "npccosw01", "npccoxx01", "npccoyy01", "npccozz01"]);
        let g = graph_of(
            &names,
            &[("npccosr01", "npccofw01"), ("npccosr02", "npccofw02")],
            &reg,
        );
        let pairs = find_pairs(g.nodes().map(|n| &n.fact), PairMode::AllPairs);
        assert_eq!(pairs.len(), 4);

        assert_offsets_only_widen(&g, &pairs, &reg);
        let out = layout(&g, &pairs, &reg);
        assert_eq!(out.stats.largest_group, names.len());
        assert_eq!(out.stats.pairs_offset, 4);
    }

    #[test]
    fn negative_zero_level_shares_the_slot() {
        let mut spec = RegistrySpec::builtin();
        spec.tiers.insert("za".into(), TierSpec::new(0.0, 1, "Zero"));
        spec.tiers.insert("zb".into(), TierSpec::new(-0.0, 1, "Negative zero"));
        let reg = spec.validate_and_build().unwrap();
        let g = graph_of(&["npczasr01", "npczbsr01"], &[], &reg);
        let out = layout(&g, &BTreeSet::new(), &reg);

        assert_eq!(out.stats.placement_groups, 1);
        let (a, b) = (out.position("npczasr01").unwrap(), out.position("npczbsr01").unwrap());
        assert_eq!((a.x, a.z.to_bits()), (b.x, b.z.to_bits()));
        assert!((a.y - b.y).abs() >= reg.layout().min_separation - 1e-9);
    }

    proptest! {
        #[test]
        fn layout_ignores_fact_order(seed in any::<u64>()) {
            let reg = Registry::builtin().unwrap();
            let devices = ["npccosr01", "npccosr02", "npcdisw01", "npcdisw02", "npcdisw03", "junk01"];
            let links = [
                ("npccosr01", "npcdisw01"),
                ("npccosr02", "npcdisw02"),
                ("npcdisw01", "npcdisw02"),
                ("npcdisw03", "npcdisw02"),
            ];

            // Rotate both lists by a seed-derived amount.
            let mut d2 = devices.to_vec();
            d2.rotate_left((seed % devices.len() as u64) as usize);
            let mut l2 = links.to_vec();
            l2.rotate_left((seed % links.len() as u64) as usize);
            let l2: Vec<(&str, &str)> = l2.into_iter().map(|(a, b)| if seed % 2 == 0 { (a, b) } else { (b, a) }).collect();

            let g1 = graph_of(&devices, &links, &reg);
            let g2 = graph_of(&d2, &l2, &reg);
            let p1 = find_pairs(g1.nodes().map(|n| &n.fact), reg.pairing().mode);
            let p2 = find_pairs(g2.nodes().map(|n| &n.fact), reg.pairing().mode);

            prop_assert_eq!(layout(&g1, &p1, &reg), layout(&g2, &p2, &reg));
        }

        #[test]
        fn pair_offsets_never_close_gaps(
            members in prop::collection::btree_set(
                (prop::sample::select(vec!["sr", "fw", "sw", "lb", "qq"]), 1u32..6),
                1..14,
            ),
            adjacent in any::<bool>(),
        ) {
            let reg = Registry::builtin().unwrap();
            let names: Vec<String> =
                members.iter().map(|(role, o)| format!("npcco{role}{o:02}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let g = graph_of(&refs, &[], &reg);
            let mode = if adjacent { PairMode::Adjacent } else { PairMode::AllPairs };
            let pairs = find_pairs(g.nodes().map(|n| &n.fact), mode);
            assert_offsets_only_widen(&g, &pairs, &reg);
        }
    }
}
