//! Naming scheme: the registry of known codes and the hostname decoder.

pub mod decode;
pub mod registry;

pub use decode::{DecodeFailure, NamingFact, decode};
pub use registry::{
    InvalidNodePolicy, LANE_MAX, LANE_MIN, LayoutSettings, LayoutSpec, PairMode, PairingSettings,
    PairingSpec, Registry, RegistryError, RegistrySpec, RegistrySummary, RoleDescriptor, TierInfo,
    TierSpec,
};

use crate::Result;
use anyhow::Context;
use std::fs;

/// Load the registry for a run.
///
/// Starts from the builtin scheme and lays the JSON document at `path` over
/// it; with `replace` the document stands alone instead. Validation errors
/// are fatal.
pub fn load_registry(path: Option<&str>, replace: bool) -> Result<Registry> {
    let spec = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read registry file {}", path))?;
            let doc: RegistrySpec = serde_json::from_str(&text)
                .with_context(|| format!("parse registry file {}", path))?;
            if replace {
                doc
            } else {
                RegistrySpec::builtin().overlay(doc)
            }
        }
        None => RegistrySpec::builtin(),
    };

    let registry = spec
        .validate_and_build()
        .with_context(|| format!("invalid registry {}", path.unwrap_or("<builtin>")))?;

    let summary = registry.summary();
    tracing::info!(
        sites = summary.sites,
        tiers = summary.tiers,
        roles = summary.roles,
        "registry loaded"
    );
    Ok(registry)
}
