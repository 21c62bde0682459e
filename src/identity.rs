//! Identity resolution for devices and test parameters.
//!
//! Each namespace is a bijective name <-> id table seeded from a baseline of
//! previously persisted mappings. Unseen names get the next id from a
//! monotonic counter; the table remembers which names came from the
//! baseline so that only ids minted during this run are reported back.

use crate::constants::IDENTITY_START;
use crate::error::{Result, StdfError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// A `(name, id)` pair as stored in a baseline
pub type Mapping = (String, u32);

/// Previously persisted mappings for both namespaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub devices: Vec<Mapping>,
    #[serde(default)]
    pub parameters: Vec<Mapping>,
}

impl Baseline {
    pub fn new(devices: Vec<Mapping>, parameters: Vec<Mapping>) -> Self {
        Self {
            devices,
            parameters,
        }
    }

    /// Load a baseline from a JSON file, or an empty one if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No baseline at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let baseline: Baseline = serde_json::from_str(&content)?;
        info!(
            "Loaded baseline from {}: {} devices, {} parameters",
            path.display(),
            baseline.devices.len(),
            baseline.parameters.len()
        );
        Ok(baseline)
    }

    /// Write the baseline as JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Append newly minted mappings
    pub fn extend(&mut self, new_devices: &[Mapping], new_parameters: &[Mapping]) {
        self.devices.extend_from_slice(new_devices);
        self.parameters.extend_from_slice(new_parameters);
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.parameters.is_empty()
    }
}

/// One identity namespace
#[derive(Debug, Clone)]
pub struct IdentityTable {
    namespace: &'static str,
    ids: HashMap<String, u32>,
    existing: HashSet<String>,
    next_id: u32,
}

impl IdentityTable {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            ids: HashMap::new(),
            existing: HashSet::new(),
            next_id: IDENTITY_START,
        }
    }

    /// Seed the table from baseline pairs
    ///
    /// Only valid while the table is empty. A name listed twice must carry
    /// the same id both times, and no id may be shared by two names.
    fn load(&mut self, pairs: &[Mapping]) -> Result<()> {
        if !self.ids.is_empty() {
            return Err(StdfError::baseline(format!(
                "{} namespace already holds {} mappings",
                self.namespace,
                self.ids.len()
            )));
        }

        let mut owners: HashMap<u32, &str> = HashMap::with_capacity(pairs.len());
        let mut max_id: Option<u32> = None;

        for (name, id) in pairs {
            if let Some(previous) = self.ids.get(name) {
                if previous != id {
                    return Err(StdfError::baseline(format!(
                        "{} '{}' listed with ids {} and {}",
                        self.namespace, name, previous, id
                    )));
                }
                continue;
            }
            if let Some(owner) = owners.insert(*id, name) {
                return Err(StdfError::baseline(format!(
                    "{} id {} shared by '{}' and '{}'",
                    self.namespace, id, owner, name
                )));
            }
            self.ids.insert(name.clone(), *id);
            self.existing.insert(name.clone());
            max_id = Some(max_id.map_or(*id, |max| max.max(*id)));
        }

        self.next_id = match max_id {
            Some(max) => max.checked_add(1).ok_or(StdfError::IdentityExhausted {
                namespace: self.namespace,
            })?,
            None => IDENTITY_START,
        };
        Ok(())
    }

    /// Return the id for `name`, allocating the next one if unseen
    pub fn resolve(&mut self, name: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(name) {
            return Ok(id);
        }

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(StdfError::IdentityExhausted {
            namespace: self.namespace,
        })?;
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up without allocating
    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Mappings minted since the baseline load, ordered by id
    pub fn new_mappings(&self) -> Vec<Mapping> {
        let mut minted: Vec<Mapping> = self
            .ids
            .iter()
            .filter(|(name, _)| !self.existing.contains(*name))
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        minted.sort_by_key(|(_, id)| *id);
        minted
    }

    pub fn is_preexisting(&self, name: &str) -> bool {
        self.existing.contains(name)
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Device and parameter identity namespaces for one run or session
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    devices: IdentityTable,
    parameters: IdentityTable,
    baseline_loaded: bool,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver {
    /// Create a resolver with empty namespaces
    pub fn new() -> Self {
        Self {
            devices: IdentityTable::new("device"),
            parameters: IdentityTable::new("parameter"),
            baseline_loaded: false,
        }
    }

    /// Create a resolver seeded from a baseline
    pub fn from_baseline(baseline: &Baseline) -> Result<Self> {
        let mut resolver = Self::new();
        resolver.load_baseline(&baseline.devices, &baseline.parameters)?;
        Ok(resolver)
    }

    /// Seed both namespaces; allowed once, before any resolution
    ///
    /// Either both namespaces are seeded or neither is.
    pub fn load_baseline(
        &mut self,
        device_pairs: &[Mapping],
        parameter_pairs: &[Mapping],
    ) -> Result<()> {
        if self.baseline_loaded {
            return Err(StdfError::baseline("baseline already loaded"));
        }
        if !self.devices.is_empty() || !self.parameters.is_empty() {
            return Err(StdfError::baseline(
                "baseline must be loaded before any identifier is resolved",
            ));
        }

        let mut devices = IdentityTable::new(self.devices.namespace);
        devices.load(device_pairs)?;
        let mut parameters = IdentityTable::new(self.parameters.namespace);
        parameters.load(parameter_pairs)?;

        self.devices = devices;
        self.parameters = parameters;
        self.baseline_loaded = true;

        debug!(
            "Loaded {} device and {} parameter mappings; next ids: device={}, parameter={}",
            self.devices.len(),
            self.parameters.len(),
            self.devices.next_id(),
            self.parameters.next_id()
        );
        Ok(())
    }

    pub fn resolve_device(&mut self, name: &str) -> Result<u32> {
        self.devices.resolve(name)
    }

    pub fn resolve_parameter(&mut self, name: &str) -> Result<u32> {
        self.parameters.resolve(name)
    }

    pub fn new_device_mappings(&self) -> Vec<Mapping> {
        self.devices.new_mappings()
    }

    pub fn new_parameter_mappings(&self) -> Vec<Mapping> {
        self.parameters.new_mappings()
    }

    pub fn devices(&self) -> &IdentityTable {
        &self.devices
    }

    pub fn parameters(&self) -> &IdentityTable {
        &self.parameters
    }
}
