//! Device profile files.
//!
//! A device profile describes one engine: its topology, the link the
//! management firmware reported, and every hardware function with its
//! resource budget. Profiles are YAML (`.yaml`, `.yml`) or JSON (`.json`).

use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use qede_types::{validate_percent, ChipTopology, FunctionProfile, LinkState, ResourceBudget};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a device profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported profile format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}

impl ProfileError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Minimum rate requested for one vport at start of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VportRate {
    /// Vport index relative to the function.
    pub vport: u16,
    /// Minimum rate in Mbps.
    pub rate: u32,
}

/// One hardware function of the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    #[serde(default)]
    pub profile: FunctionProfile,

    pub budget: ResourceBudget,

    /// Vport minimum rates applied after the link comes up.
    #[serde(default)]
    pub vport_min_rates: Vec<VportRate>,
}

impl FunctionEntry {
    fn pq_range(&self) -> Range<u32> {
        let grant = self.budget.pqs;
        u32::from(grant.start)..u32::from(grant.start) + u32::from(grant.count)
    }

    fn vport_range(&self) -> Range<u32> {
        let grant = self.budget.vports;
        u32::from(grant.start)..u32::from(grant.start) + u32::from(grant.count)
    }
}

/// One engine and the functions running on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    #[serde(default)]
    pub engine_id: u8,

    #[serde(default)]
    pub topology: ChipTopology,

    #[serde(default)]
    pub link: LinkState,

    pub functions: Vec<FunctionEntry>,
}

impl DeviceProfile {
    /// Loads and validates a profile, picking the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let profile = match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => return Err(ProfileError::UnsupportedFormat(path.to_path_buf())),
        }
        .map_err(|message| ProfileError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        profile.validate()?;
        Ok(profile)
    }

    fn from_yaml_str(content: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    fn from_json_str(content: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Returns the entry of a PF.
    pub fn function(&self, pf_id: u8) -> Option<&FunctionEntry> {
        self.functions.iter().find(|f| f.profile.pf_id == pf_id)
    }

    /// Checks what the planner cannot see on its own: the functions share
    /// one engine, so their PF ids must be unique and their PQ and vport
    /// ranges disjoint.
    pub fn validate(&self) -> Result<()> {
        if self.functions.is_empty() {
            return Err(ProfileError::invalid("profile lists no functions"));
        }

        validate_percent(self.link.bandwidth_max)
            .map_err(|e| ProfileError::invalid(format!("link.bandwidth_max: {}", e)))?;
        if self.link.bandwidth_min != 0 {
            validate_percent(self.link.bandwidth_min)
                .map_err(|e| ProfileError::invalid(format!("link.bandwidth_min: {}", e)))?;
        }

        let mut pf_ids = HashSet::new();
        for entry in &self.functions {
            let pf_id = entry.profile.pf_id;
            if !pf_ids.insert(pf_id) {
                return Err(ProfileError::invalid(format!("duplicate pf_id {}", pf_id)));
            }
            if entry.budget.pqs.count == 0 {
                return Err(ProfileError::invalid(format!("pf {} has no PQs", pf_id)));
            }
            if entry.budget.vports.count == 0 {
                return Err(ProfileError::invalid(format!("pf {} has no vports", pf_id)));
            }
            for rate in &entry.vport_min_rates {
                if rate.vport >= entry.budget.vports.count {
                    return Err(ProfileError::invalid(format!(
                        "pf {} vport {} outside its {} vports",
                        pf_id, rate.vport, entry.budget.vports.count
                    )));
                }
            }
        }

        for (i, a) in self.functions.iter().enumerate() {
            for b in &self.functions[i + 1..] {
                if overlaps(&a.pq_range(), &b.pq_range()) {
                    return Err(ProfileError::invalid(format!(
                        "pf {} and pf {} share PQs",
                        a.profile.pf_id, b.profile.pf_id
                    )));
                }
                if overlaps(&a.vport_range(), &b.vport_range()) {
                    return Err(ProfileError::invalid(format!(
                        "pf {} and pf {} share vports",
                        a.profile.pf_id, b.profile.pf_id
                    )));
                }
            }
        }

        Ok(())
    }
}

fn overlaps(a: &Range<u32>, b: &Range<u32>) -> bool {
    a.start < b.end && b.start < a.end
}
