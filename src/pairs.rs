//! High-availability pair detection from naming facts alone.
//!
//! Devices whose names share site, tier and role but carry different
//! ordinals (`npccosr01` / `npccosr02`) are taken to be redundant peers.
//! Grouping happens first, so the pairwise step only ever runs inside one
//! small group.

use crate::graph::Graph;
use crate::naming::{NamingFact, PairMode, PairingSettings};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// An unordered pair of distinct devices, stored with `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PairRelation {
    a: String,
    b: String,
}

impl PairRelation {
    /// `None` when both names are the same device.
    pub fn new(x: &str, y: &str) -> Option<Self> {
        match x.cmp(y) {
            std::cmp::Ordering::Less => Some(Self {
                a: x.to_string(),
                b: y.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                a: y.to_string(),
                b: x.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    /// The partner of `name`, if `name` is a member.
    pub fn other(&self, name: &str) -> Option<&str> {
        if self.a == name {
            Some(&self.b)
        } else if self.b == name {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Find HA pairs among `facts`. Invalid facts never pair.
///
/// Two members with the same ordinal (the same device spelled differently)
/// do not pair with each other. Output is independent of input order.
pub fn find_pairs<'f>(
    facts: impl IntoIterator<Item = &'f NamingFact>,
    mode: PairMode,
) -> BTreeSet<PairRelation> {
    // (site, tier, role) -> ordinal -> names. Ordinals are fixed-width
    // digit strings, so string order is numeric order.
    let mut groups: BTreeMap<(&str, &str, &str), BTreeMap<&str, BTreeSet<&str>>> =
        BTreeMap::new();
    for fact in facts {
        if let Some(key) = fact.group_key() {
            groups
                .entry(key)
                .or_default()
                .entry(fact.ordinal.as_str())
                .or_default()
                .insert(fact.name.as_str());
        }
    }

    let mut pairs = BTreeSet::new();
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let by_ordinal: Vec<&BTreeSet<&str>> = members.values().collect();
        for (i, left) in by_ordinal.iter().enumerate() {
            let partners = match mode {
                PairMode::AllPairs => &by_ordinal[i + 1..],
                PairMode::Adjacent => &by_ordinal[i + 1..by_ordinal.len().min(i + 2)],
            };
            for right in partners {
                for x in left.iter() {
                    for y in right.iter() {
                        pairs.extend(PairRelation::new(x, y));
                    }
                }
            }
        }
    }

    tracing::debug!(pairs = pairs.len(), groups = groups.len(), "detected pairs");
    pairs
}

/// Pairs for a composed graph under the configured settings; empty when
/// pairing is disabled.
pub fn detect(graph: &Graph, settings: &PairingSettings) -> BTreeSet<PairRelation> {
    if !settings.enabled {
        return BTreeSet::new();
    }
    let pairs = find_pairs(graph.nodes().map(|n| &n.fact), settings.mode);
    tracing::info!(pairs = pairs.len(), mode = ?settings.mode, "pair detection done");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{Registry, decode};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn facts(names: &[&str]) -> Vec<NamingFact> {
        let reg = Registry::builtin().unwrap();
        names.iter().map(|n| decode(n, &reg)).collect()
    }

    fn pair(x: &str, y: &str) -> PairRelation {
        PairRelation::new(x, y).unwrap()
    }

    #[test]
    fn relation_is_unordered() {
        assert_eq!(pair("b", "a"), pair("a", "b"));
        assert_eq!(pair("b", "a").a(), "a");
        assert_eq!(PairRelation::new("a", "a"), None);
        assert_eq!(pair("a", "b").other("a"), Some("b"));
        assert_eq!(pair("a", "b").other("c"), None);
    }

    #[test]
    fn two_member_group_is_one_pair() {
        let f = facts(&["npccosr01", "npccosr02", "npcdisw01", "wpccosr01"]);
        assert_eq!(
            find_pairs(&f, PairMode::AllPairs),
            BTreeSet::from([pair("npccosr01", "npccosr02")])
        );
    }

    #[test]
    fn invalid_and_same_ordinal_never_pair() {
        let f = facts(&["zzcosr01", "zzcosr02", "npccosr01", "NPCCOSR01"]);
        assert!(find_pairs(&f, PairMode::AllPairs).is_empty());
    }

    #[test]
    fn larger_groups_by_mode() {
        let f = facts(&["npcaccsw03", "npcaccsw01", "npcaccsw02"]);
        assert_eq!(
            find_pairs(&f, PairMode::AllPairs),
            BTreeSet::from([
                pair("npcaccsw01", "npcaccsw02"),
                pair("npcaccsw01", "npcaccsw03"),
                pair("npcaccsw02", "npcaccsw03"),
            ])
        );
        assert_eq!(
            find_pairs(&f, PairMode::Adjacent),
            BTreeSet::from([
                pair("npcaccsw01", "npcaccsw02"),
                pair("npcaccsw02", "npcaccsw03"),
            ])
        );
    }

    #[test]
    fn role_is_part_of_the_key() {
        let f = facts(&["npccosr01", "npccofw02"]);
        assert!(find_pairs(&f, PairMode::AllPairs).is_empty());
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["npc", "wpc", "ukrc"]),
            prop::sample::select(vec!["co", "di", "acc"]),
            prop::sample::select(vec!["sr", "sw"]),
            1u32..5,
        )
            .prop_map(|(s, t, r, o)| format!("{s}{t}{r}{o:02}"))
    }

    proptest! {
        #[test]
        fn pairs_ignore_input_order_and_never_self_pair(
            names in prop::collection::vec(name_strategy(), 0..16),
            adjacent in any::<bool>(),
        ) {
            let mode = if adjacent { PairMode::Adjacent } else { PairMode::AllPairs };
            let forward = facts(&names.iter().map(String::as_str).collect::<Vec<_>>());
            let mut backward = forward.clone();
            backward.reverse();

            let pairs = find_pairs(&forward, mode);
            prop_assert_eq!(&pairs, &find_pairs(&backward, mode));
            for p in &pairs {
                prop_assert!(p.a() < p.b());
                let (fa, fb) = (decode_of(&forward, p.a()), decode_of(&forward, p.b()));
                prop_assert_eq!(fa.group_key(), fb.group_key());
                prop_assert_ne!(&fa.ordinal, &fb.ordinal);
            }
        }
    }

    fn decode_of<'a>(facts: &'a [NamingFact], name: &str) -> &'a NamingFact {
        facts.iter().find(|f| f.name == name).unwrap()
    }
}
