//! Naming scheme registry: which site, tier and role codes exist and what
//! each one means for placement and display.
//!
//! Two representations:
//! - RegistrySpec: raw JSON input (serde-friendly, every key optional so a
//!   document can be laid over the builtin scheme)
//! - Registry: validated, immutable, shared by every pipeline stage
//!
//! JSON shape:
//! {
//!   "sites": ["npc", "wpc"],
//!   "tiers": { "co": { "level": 3.5, "lane": 0, "name": "Core" } },
//!   "roles": { "sr": { "shape": "diamond", "size": 12, "color": "#FF6B6B" } },
//!   "default_role": { "shape": "circle", "size": 8, "color": "#AAAAAA" },
//!   "ordinal_width": 2,
//!   "layout": { "lane_width": 2.0, "spring_iterations": 100, ... },
//!   "pairing": { "enabled": true, "offset": 0.3, "mode": "all_pairs" }
//! }

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Lowest lane a tier may be assigned to.
pub const LANE_MIN: i32 = -10;
/// Highest lane a tier may be assigned to.
pub const LANE_MAX: i32 = 10;
/// Hard cap on spring iterations so a layout always terminates quickly.
pub const MAX_SPRING_ITERATIONS: usize = 10_000;
pub const DEFAULT_ORDINAL_WIDTH: usize = 2;

const SITE_TIER_CODE: &str = "lowercase letters and digits";
const ROLE_CODE: &str = "lowercase letters";

/// Configuration errors. Any of these stops the pipeline before it starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("no {0} configured")]
    EmptyTable(&'static str),

    #[error("invalid {kind} code {code:?}: expected {expected}")]
    InvalidCode {
        kind: &'static str,
        code: String,
        expected: &'static str,
    },

    #[error("site {0:?} is listed more than once")]
    DuplicateSite(String),

    #[error("tier {0:?} has no level")]
    MissingLevel(String),

    #[error("tier {tier:?} has non-finite level {level}")]
    NonFiniteLevel { tier: String, level: f64 },

    #[error("tier {0:?} has no lane")]
    MissingLane(String),

    #[error("tier {tier:?} lane {lane} out of range [{min}, {max}]")]
    LaneOutOfRange {
        tier: String,
        lane: i64,
        min: i32,
        max: i32,
    },

    #[error("invalid setting {setting} = {value}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        value: String,
        reason: &'static str,
    },
}

// =============================================================================
// RAW CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySpec {
    #[serde(default)]
    pub sites: Vec<String>,

    #[serde(default)]
    pub tiers: BTreeMap<String, TierSpec>,

    #[serde(default)]
    pub roles: BTreeMap<String, RoleDescriptor>,

    #[serde(default)]
    pub default_role: Option<RoleDescriptor>,

    #[serde(default)]
    pub ordinal_width: Option<usize>,

    #[serde(default)]
    pub layout: LayoutSpec,

    #[serde(default)]
    pub pairing: PairingSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierSpec {
    #[serde(default)]
    pub level: Option<f64>,

    // Wider than the stored lane so out-of-range values reach validation.
    #[serde(default)]
    pub lane: Option<i64>,

    /// Optional display name ("Core", "Access", ...).
    #[serde(default)]
    pub name: Option<String>,
}

impl TierSpec {
    pub fn new(level: f64, lane: i64, name: &str) -> Self {
        Self {
            level: Some(level),
            lane: Some(lane),
            name: Some(name.to_string()),
        }
    }

    fn merge(&mut self, other: TierSpec) {
        if other.level.is_some() {
            self.level = other.level;
        }
        if other.lane.is_some() {
            self.lane = other.lane;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
    }
}

/// Visual treatment for a role code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDescriptor {
    pub shape: String,
    pub size: u32,
    pub color: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl RoleDescriptor {
    pub fn new(shape: &str, size: u32, color: &str, description: &str) -> Self {
        Self {
            shape: shape.to_string(),
            size,
            color: color.to_string(),
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSpec {
    #[serde(default)]
    pub lane_width: Option<f64>,

    #[serde(default)]
    pub spread_scale: Option<f64>,

    #[serde(default)]
    pub spring_k: Option<f64>,

    #[serde(default)]
    pub spring_iterations: Option<usize>,

    #[serde(default)]
    pub min_separation: Option<f64>,

    #[serde(default)]
    pub invalid_nodes: Option<InvalidNodePolicy>,

    /// Level for devices that cannot be placed by tier. Defaults to the
    /// lowest configured tier level.
    #[serde(default)]
    pub sentinel_level: Option<f64>,
}

impl LayoutSpec {
    fn merge(&mut self, other: LayoutSpec) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            lane_width,
            spread_scale,
            spring_k,
            spring_iterations,
            min_separation,
            invalid_nodes,
            sentinel_level
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairingSpec {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub offset: Option<f64>,

    #[serde(default)]
    pub mode: Option<PairMode>,
}

impl PairingSpec {
    fn merge(&mut self, other: PairingSpec) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.offset.is_some() {
            self.offset = other.offset;
        }
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }
}

/// What to do with devices whose names did not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidNodePolicy {
    /// Place them at the sentinel level, lane 0.
    #[default]
    Sentinel,
    /// Leave them out of the position map.
    Exclude,
}

/// Which members of a (site, tier, role) group form pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairMode {
    /// Every unordered pair of distinct ordinals.
    #[default]
    AllPairs,
    /// Only neighbours in ordinal order.
    Adjacent,
}

impl RegistrySpec {
    /// The stock naming scheme: `{site}{tier}{role}{NN}`, e.g. `npccosr01`.
    pub fn builtin() -> Self {
        let sites = [
            "npc", "wpc", "apc", "apd", "ukrc", "ukpc", "ch2", "va1", "ma5", "ld5",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let tiers = [
            ("igw", 5.0, 0, "Internet Gateway"),
            ("pub", 4.5, 2, "Public DMZ"),
            ("co", 3.5, 0, "Core"),
            ("dc", 3.0, -2, "Data Center Core"),
            ("di", 2.5, 0, "Distribution"),
            ("lb", 2.0, -3, "Load Balancer"),
            ("acc", 1.5, 0, "Access"),
            ("wd", 1.0, -5, "Workstation Distribution"),
            ("prv", 0.5, 5, "Private"),
            ("csh", 0.0, 8, "Customer Hub"),
        ]
        .into_iter()
        .map(|(code, level, lane, name)| (code.to_string(), TierSpec::new(level, lane, name)))
        .collect();

        let roles = [
            ("sr", RoleDescriptor::new("diamond", 12, "#FF6B6B", "Switch Router")),
            ("sw", RoleDescriptor::new("square", 10, "#4ECDC4", "Switch")),
            ("fw", RoleDescriptor::new("diamond-open", 14, "#FFD93D", "Firewall")),
            ("lb", RoleDescriptor::new("circle", 11, "#95E1D3", "Load Balancer")),
        ]
        .into_iter()
        .map(|(code, d)| (code.to_string(), d))
        .collect();

        Self {
            sites,
            tiers,
            roles,
            default_role: Some(RoleDescriptor::new("circle", 8, "#AAAAAA", "Unknown Device")),
            ordinal_width: Some(DEFAULT_ORDINAL_WIDTH),
            layout: LayoutSpec {
                lane_width: Some(2.0),
                spread_scale: Some(3.0),
                spring_k: Some(2.0),
                spring_iterations: Some(100),
                min_separation: Some(0.5),
                invalid_nodes: Some(InvalidNodePolicy::Sentinel),
                sentinel_level: None,
            },
            pairing: PairingSpec {
                enabled: Some(true),
                offset: Some(0.3),
                mode: Some(PairMode::AllPairs),
            },
        }
    }

    /// Lay `other` over `self`: codes in `other` replace or extend ours,
    /// settings present in `other` win.
    pub fn overlay(mut self, other: RegistrySpec) -> Self {
        for site in other.sites {
            if !self.sites.contains(&site) {
                self.sites.push(site);
            }
        }
        for (code, tier) in other.tiers {
            self.tiers
                .entry(code)
                .and_modify(|t| t.merge(tier.clone()))
                .or_insert(tier);
        }
        self.roles.extend(other.roles);
        if other.default_role.is_some() {
            self.default_role = other.default_role;
        }
        if other.ordinal_width.is_some() {
            self.ordinal_width = other.ordinal_width;
        }
        self.layout.merge(other.layout);
        self.pairing.merge(other.pairing);
        self
    }

    /// Validate every table and setting and build the immutable registry:
    /// - codes are lowercase and well-formed, sites listed once
    /// - every tier has a finite level and a lane within [LANE_MIN, LANE_MAX]
    /// - numeric settings are finite and in range
    pub fn validate_and_build(&self) -> Result<Registry, RegistryError> {
        // 1) Sites.
        if self.sites.is_empty() {
            return Err(RegistryError::EmptyTable("sites"));
        }
        let mut sites = BTreeSet::new();
        for site in &self.sites {
            if !is_code(site, true) {
                return Err(RegistryError::InvalidCode {
                    kind: "site",
                    code: site.clone(),
                    expected: SITE_TIER_CODE,
                });
            }
            if !sites.insert(site.clone()) {
                return Err(RegistryError::DuplicateSite(site.clone()));
            }
        }

        // 2) Tiers.
        if self.tiers.is_empty() {
            return Err(RegistryError::EmptyTable("tiers"));
        }
        let mut tiers = BTreeMap::new();
        for (code, spec) in &self.tiers {
            if !is_code(code, true) {
                return Err(RegistryError::InvalidCode {
                    kind: "tier",
                    code: code.clone(),
                    expected: SITE_TIER_CODE,
                });
            }
            let level = spec
                .level
                .ok_or_else(|| RegistryError::MissingLevel(code.clone()))?;
            if !level.is_finite() {
                return Err(RegistryError::NonFiniteLevel {
                    tier: code.clone(),
                    level,
                });
            }
            let lane = spec
                .lane
                .ok_or_else(|| RegistryError::MissingLane(code.clone()))?;
            if lane < i64::from(LANE_MIN) || lane > i64::from(LANE_MAX) {
                return Err(RegistryError::LaneOutOfRange {
                    tier: code.clone(),
                    lane,
                    min: LANE_MIN,
                    max: LANE_MAX,
                });
            }
            tiers.insert(
                code.clone(),
                TierInfo {
                    level,
                    // In range, checked above.
                    lane: lane as i32,
                    name: spec.name.clone(),
                },
            );
        }

        // 3) Roles.
        for code in self.roles.keys() {
            if !is_code(code, false) {
                return Err(RegistryError::InvalidCode {
                    kind: "role",
                    code: code.clone(),
                    expected: ROLE_CODE,
                });
            }
        }
        let default_role = self
            .default_role
            .clone()
            .unwrap_or_else(|| RoleDescriptor::new("circle", 8, "#AAAAAA", "Unknown Device"));

        // 4) Settings.
        let ordinal_width = self.ordinal_width.unwrap_or(DEFAULT_ORDINAL_WIDTH);
        if ordinal_width == 0 {
            return Err(RegistryError::InvalidSetting {
                setting: "ordinal_width",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }

        let lowest_level = tiers
            .values()
            .map(|t| t.level)
            .fold(f64::INFINITY, f64::min);

        let layout = LayoutSettings {
            lane_width: positive("layout.lane_width", self.layout.lane_width, 2.0)?,
            spread_scale: positive("layout.spread_scale", self.layout.spread_scale, 3.0)?,
            spring_k: positive("layout.spring_k", self.layout.spring_k, 2.0)?,
            spring_iterations: {
                let n = self.layout.spring_iterations.unwrap_or(100);
                if n > MAX_SPRING_ITERATIONS {
                    return Err(RegistryError::InvalidSetting {
                        setting: "layout.spring_iterations",
                        value: n.to_string(),
                        reason: "exceeds MAX_SPRING_ITERATIONS",
                    });
                }
                n
            },
            min_separation: non_negative("layout.min_separation", self.layout.min_separation, 0.5)?,
            invalid_nodes: self.layout.invalid_nodes.unwrap_or_default(),
            sentinel_level: match self.layout.sentinel_level {
                Some(level) if !level.is_finite() => {
                    return Err(RegistryError::InvalidSetting {
                        setting: "layout.sentinel_level",
                        value: level.to_string(),
                        reason: "must be finite",
                    });
                }
                Some(level) => level,
                None => lowest_level,
            },
        };

        let pairing = PairingSettings {
            enabled: self.pairing.enabled.unwrap_or(true),
            offset: non_negative("pairing.offset", self.pairing.offset, 0.3)?,
            mode: self.pairing.mode.unwrap_or_default(),
        };

        // Longest code first so prefix matching is greedy; ties broken
        // alphabetically so matching never depends on declaration order.
        let mut sites_longest_first: Vec<String> = sites.iter().cloned().collect();
        sites_longest_first.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let mut tiers_longest_first: Vec<String> = tiers.keys().cloned().collect();
        tiers_longest_first.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let tail = Regex::new(&format!(r"^([a-z]+)([0-9]{{{}}})$", ordinal_width)).map_err(
            |_| RegistryError::InvalidSetting {
                setting: "ordinal_width",
                value: ordinal_width.to_string(),
                reason: "too large",
            },
        )?;

        Ok(Registry {
            sites,
            sites_longest_first,
            tiers,
            tiers_longest_first,
            roles: self.roles.clone(),
            default_role,
            ordinal_width,
            tail,
            layout,
            pairing,
        })
    }
}

fn is_code(code: &str, allow_digits: bool) -> bool {
    !code.is_empty()
        && code
            .bytes()
            .all(|b| b.is_ascii_lowercase() || (allow_digits && b.is_ascii_digit()))
}

fn positive(setting: &'static str, value: Option<f64>, default: f64) -> Result<f64, RegistryError> {
    let v = value.unwrap_or(default);
    if !v.is_finite() || v <= 0.0 {
        return Err(RegistryError::InvalidSetting {
            setting,
            value: v.to_string(),
            reason: "must be finite and greater than zero",
        });
    }
    Ok(v)
}

fn non_negative(
    setting: &'static str,
    value: Option<f64>,
    default: f64,
) -> Result<f64, RegistryError> {
    let v = value.unwrap_or(default);
    if !v.is_finite() || v < 0.0 {
        return Err(RegistryError::InvalidSetting {
            setting,
            value: v.to_string(),
            reason: "must be finite and not negative",
        });
    }
    Ok(v)
}

// =============================================================================
// VALIDATED REGISTRY
// =============================================================================

/// Placement facts for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierInfo {
    pub level: f64,
    pub lane: i32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSettings {
    pub lane_width: f64,
    pub spread_scale: f64,
    pub spring_k: f64,
    pub spring_iterations: usize,
    pub min_separation: f64,
    pub invalid_nodes: InvalidNodePolicy,
    pub sentinel_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairingSettings {
    pub enabled: bool,
    pub offset: f64,
    pub mode: PairMode,
}

/// Validated naming scheme plus layout and pairing settings. Read-only once
/// built; share it by reference.
#[derive(Debug, Clone)]
pub struct Registry {
    sites: BTreeSet<String>,
    sites_longest_first: Vec<String>,
    tiers: BTreeMap<String, TierInfo>,
    tiers_longest_first: Vec<String>,
    roles: BTreeMap<String, RoleDescriptor>,
    default_role: RoleDescriptor,
    ordinal_width: usize,
    tail: Regex,
    layout: LayoutSettings,
    pairing: PairingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrySummary {
    pub sites: usize,
    pub tiers: usize,
    pub distinct_levels: usize,
    pub roles: usize,
    pub level_range: (f64, f64),
    pub lane_range: (i32, i32),
}

impl Registry {
    /// The builtin scheme, validated.
    pub fn builtin() -> Result<Self, RegistryError> {
        RegistrySpec::builtin().validate_and_build()
    }

    pub fn tier_info(&self, code: &str) -> Option<&TierInfo> {
        self.tiers.get(code)
    }

    /// Never fails: unknown roles get the default descriptor.
    pub fn role_info(&self, code: &str) -> &RoleDescriptor {
        self.roles.get(code).unwrap_or(&self.default_role)
    }

    pub fn is_known_site(&self, code: &str) -> bool {
        self.sites.contains(code)
    }

    pub fn is_known_role(&self, code: &str) -> bool {
        self.roles.contains_key(code)
    }

    pub fn default_role(&self) -> &RoleDescriptor {
        &self.default_role
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(String::as_str)
    }

    pub fn tiers(&self) -> impl Iterator<Item = (&str, &TierInfo)> {
        self.tiers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn sites_longest_first(&self) -> &[String] {
        &self.sites_longest_first
    }

    pub(crate) fn tiers_longest_first(&self) -> &[String] {
        &self.tiers_longest_first
    }

    /// `^(role letters)(ordinal digits)$`, sized to `ordinal_width`.
    pub(crate) fn tail_pattern(&self) -> &Regex {
        &self.tail
    }

    pub fn ordinal_width(&self) -> usize {
        self.ordinal_width
    }

    pub fn layout(&self) -> &LayoutSettings {
        &self.layout
    }

    pub fn pairing(&self) -> &PairingSettings {
        &self.pairing
    }

    /// Human-readable tier name, falling back to the upper-cased code.
    pub fn tier_display_name(&self, code: &str) -> String {
        self.tiers
            .get(code)
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| code.to_uppercase())
    }

    /// Lane number to lane-axis coordinate.
    pub fn lane_x(&self, lane: i32) -> f64 {
        f64::from(lane) * self.layout.lane_width
    }

    pub fn summary(&self) -> RegistrySummary {
        let levels: BTreeSet<u64> = self.tiers.values().map(|t| t.level.to_bits()).collect();
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut lane_lo, mut lane_hi) = (LANE_MAX, LANE_MIN);
        for t in self.tiers.values() {
            lo = lo.min(t.level);
            hi = hi.max(t.level);
            lane_lo = lane_lo.min(t.lane);
            lane_hi = lane_hi.max(t.lane);
        }
        RegistrySummary {
            sites: self.sites.len(),
            tiers: self.tiers.len(),
            distinct_levels: levels.len(),
            roles: self.roles.len(),
            level_range: (lo, hi),
            lane_range: (lane_lo, lane_hi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal() -> RegistrySpec {
        RegistrySpec {
            sites: vec!["ab".into()],
            tiers: [("co".to_string(), TierSpec::new(3.5, 0, "Core"))].into(),
            ..Default::default()
        }
    }

    #[test]
    fn builtin_validates() {
        let reg = Registry::builtin().unwrap();
        let summary = reg.summary();
        assert_eq!(summary.sites, 10);
        assert_eq!(summary.tiers, 10);
        assert_eq!(summary.roles, 4);
        assert_eq!(summary.level_range, (0.0, 5.0));
        assert_eq!(summary.lane_range, (-5, 8));
        assert_eq!(reg.layout().sentinel_level, 0.0);
    }

    #[test]
    fn lookups() {
        let reg = Registry::builtin().unwrap();
        let co = reg.tier_info("co").unwrap();
        assert_eq!((co.level, co.lane), (3.5, 0));
        assert!(reg.tier_info("zz").is_none());
        assert!(reg.is_known_site("ukrc"));
        assert!(!reg.is_known_site("zz"));
        assert_eq!(reg.role_info("fw").shape, "diamond-open");
        assert_eq!(reg.role_info("qq"), reg.default_role());
        assert_eq!(reg.tier_display_name("acc"), "Access");
        assert_eq!(reg.lane_x(-3), -6.0);
    }

    #[test]
    fn sites_are_matched_longest_first() {
        let spec = RegistrySpec {
            sites: vec!["ab".into(), "abc".into(), "b".into()],
            ..minimal()
        };
        let reg = spec.validate_and_build().unwrap();
        assert_eq!(reg.sites_longest_first(), &["abc", "ab", "b"]);
    }

    #[test]
    fn rejects_lane_out_of_range() {
        let mut spec = minimal();
        spec.tiers.insert("far".into(), TierSpec::new(1.0, 11, "Far"));
        assert_eq!(
            spec.validate_and_build().unwrap_err(),
            RegistryError::LaneOutOfRange {
                tier: "far".into(),
                lane: 11,
                min: LANE_MIN,
                max: LANE_MAX,
            }
        );
    }

    #[test]
    fn rejects_tier_without_level() {
        let mut spec = minimal();
        spec.tiers.insert(
            "di".into(),
            TierSpec {
                level: None,
                lane: Some(0),
                name: None,
            },
        );
        assert_eq!(
            spec.validate_and_build().unwrap_err(),
            RegistryError::MissingLevel("di".into())
        );
    }

    #[test]
    fn rejects_bad_codes_and_duplicates() {
        let spec = RegistrySpec {
            sites: vec!["AB".into()],
            ..minimal()
        };
        assert!(matches!(
            spec.validate_and_build(),
            Err(RegistryError::InvalidCode { kind: "site", .. })
        ));

        let spec = RegistrySpec {
            sites: vec!["ab".into(), "ab".into()],
            ..minimal()
        };
        assert_eq!(
            spec.validate_and_build().unwrap_err(),
            RegistryError::DuplicateSite("ab".into())
        );

        let mut spec = minimal();
        spec.roles
            .insert("s1".into(), RoleDescriptor::new("circle", 1, "#000", "x"));
        assert!(matches!(
            spec.validate_and_build(),
            Err(RegistryError::InvalidCode { kind: "role", .. })
        ));
    }

    #[test]
    fn rejects_bad_settings() {
        let mut spec = minimal();
        spec.layout.spring_iterations = Some(MAX_SPRING_ITERATIONS + 1);
        assert!(matches!(
            spec.validate_and_build(),
            Err(RegistryError::InvalidSetting {
                setting: "layout.spring_iterations",
                ..
            })
        ));

        let mut spec = minimal();
        spec.layout.lane_width = Some(0.0);
        assert!(spec.validate_and_build().is_err());

        let mut spec = minimal();
        spec.pairing.offset = Some(-1.0);
        assert!(spec.validate_and_build().is_err());

        let mut spec = minimal();
        spec.ordinal_width = Some(0);
        assert!(spec.validate_and_build().is_err());
    }

    #[test]
    fn overlay_appends_and_overrides() {
        let overlay: RegistrySpec = serde_json::from_str(
            r##"{
                "sites": ["zz", "npc"],
                "tiers": {
                    "co": { "lane": 1 },
                    "edge": { "level": 6.0, "lane": -1 }
                },
                "roles": { "rt": { "shape": "cross", "size": 9, "color": "#123456" } },
                "pairing": { "mode": "adjacent" }
            }"##,
        )
        .unwrap();

        let reg = RegistrySpec::builtin()
            .overlay(overlay)
            .validate_and_build()
            .unwrap();

        assert!(reg.is_known_site("zz"));
        assert_eq!(reg.sites().filter(|s| *s == "npc").count(), 1);
        let co = reg.tier_info("co").unwrap();
        assert_eq!((co.level, co.lane), (3.5, 1));
        assert_eq!(co.name.as_deref(), Some("Core"));
        assert_eq!(reg.tier_info("edge").unwrap().level, 6.0);
        assert!(reg.is_known_role("rt"));
        assert_eq!(reg.pairing().mode, PairMode::Adjacent);
        assert_eq!(reg.pairing().offset, 0.3);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let parsed = serde_json::from_str::<RegistrySpec>(r#"{ "datacenters": [] }"#);
        assert!(parsed.is_err());
    }
}
