//! Structured hostname decoding.
//!
//! Device names follow `{site}{tier}{role}{ordinal}` with no separators,
//! e.g. `npccosr01` = npc + co + sr + 01. Decoding is a pure function of the
//! name and the registry; a name that does not fit still yields a record,
//! flagged invalid, so callers can show the device without placing it.

use crate::naming::registry::Registry;
use serde::Serialize;
use thiserror::Error;

/// Why a device name did not decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeFailure {
    #[error("device name is blank")]
    Blank,

    #[error("no configured site code is a prefix of the name")]
    UnknownSite,

    #[error("only {remaining} characters after the site code, too short for tier, role and ordinal")]
    TooShort { remaining: usize },

    #[error("name does not end in a {width}-digit ordinal")]
    BadOrdinal { width: usize },

    #[error("no configured tier code follows the site code")]
    UnknownTier,

    #[error("role segment {segment:?} is not a role code")]
    BadRole { segment: String },
}

/// Decoded form of a device name. `name` is always the raw input; the four
/// code fields are empty unless `valid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NamingFact {
    pub name: String,
    pub site: String,
    pub tier: String,
    pub role: String,
    pub ordinal: String,
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DecodeFailure>,
}

impl NamingFact {
    fn invalid(name: &str, failure: DecodeFailure) -> Self {
        Self {
            name: name.to_string(),
            site: String::new(),
            tier: String::new(),
            role: String::new(),
            ordinal: String::new(),
            valid: false,
            failure: Some(failure),
        }
    }

    /// (site, tier, role) for valid facts: the HA grouping key.
    pub fn group_key(&self) -> Option<(&str, &str, &str)> {
        self.valid
            .then(|| (self.site.as_str(), self.tier.as_str(), self.role.as_str()))
    }

    /// Ordinal as a number, for ordering group members.
    pub fn ordinal_value(&self) -> Option<u64> {
        self.ordinal.parse().ok()
    }
}

/// Decode one device name.
///
/// Matching is case-insensitive and ignores surrounding whitespace. The site
/// is the longest configured site code that prefixes the name (no
/// backtracking to shorter sites). The tier is the longest configured tier
/// code that leaves a well-formed `role + ordinal` tail, preferring tails
/// whose role is a known code.
pub fn decode(name: &str, registry: &Registry) -> NamingFact {
    let key = name.trim().to_ascii_lowercase();
    if key.is_empty() {
        return NamingFact::invalid(name, DecodeFailure::Blank);
    }

    // 1) Site: greedy longest prefix.
    let site = match registry
        .sites_longest_first()
        .iter()
        .find(|s| key.starts_with(s.as_str()))
    {
        Some(s) => s,
        None => return NamingFact::invalid(name, DecodeFailure::UnknownSite),
    };
    let rest = &key[site.len()..];

    // 2) Room for at least one tier char, one role char and the ordinal.
    let width = registry.ordinal_width();
    if rest.len() < width + 2 {
        return NamingFact::invalid(
            name,
            DecodeFailure::TooShort {
                remaining: rest.len(),
            },
        );
    }

    // 3) Fixed-width numeric ordinal. Checked on bytes first so the split
    // below always lands on a char boundary.
    let split = rest.len() - width;
    if !rest.as_bytes()[split..].iter().all(u8::is_ascii_digit) {
        return NamingFact::invalid(name, DecodeFailure::BadOrdinal { width });
    }

    // 4) Tier + role. Try tiers longest first; a known role wins over a
    // merely well-formed one. A tier must leave at least one role char.
    let tail = registry.tail_pattern();
    let mut candidates = registry
        .tiers_longest_first()
        .iter()
        .filter(|t| t.len() < split && rest.starts_with(t.as_str()))
        .peekable();
    if candidates.peek().is_none() {
        return NamingFact::invalid(name, DecodeFailure::UnknownTier);
    }

    let mut well_formed: Option<(&str, String, String)> = None;
    let mut first_segment: Option<&str> = None;
    for tier in candidates {
        let after_tier = &rest[tier.len()..];
        if first_segment.is_none() {
            first_segment = Some(&rest[tier.len()..split]);
        }

        let Some(caps) = tail.captures(after_tier) else {
            continue;
        };
        let (Some(role), Some(ordinal)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let role = role.as_str().to_string();
        let ordinal = ordinal.as_str().to_string();

        if registry.is_known_role(&role) {
            return valid_fact(name, site, tier, role, ordinal);
        }
        if well_formed.is_none() {
            well_formed = Some((tier.as_str(), role, ordinal));
        }
    }

    match well_formed {
        Some((tier, role, ordinal)) => valid_fact(name, site, tier, role, ordinal),
        None => NamingFact::invalid(
            name,
            DecodeFailure::BadRole {
                segment: first_segment.unwrap_or_default().to_string(),
            },
        ),
    }
}

fn valid_fact(name: &str, site: &str, tier: &str, role: String, ordinal: String) -> NamingFact {
    NamingFact {
        name: name.to_string(),
        site: site.to_string(),
        tier: tier.to_string(),
        role,
        ordinal,
        valid: true,
        failure: None,
    }
}
