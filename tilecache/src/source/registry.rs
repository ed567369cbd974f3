//! Source registry
//!
//! Owns every [`Source`] of the session. Presets are materialized the first
//! time they are looked up and then stay cached by id.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::presets::{preset, PresetId};
use super::types::{Source, SourceDescriptor, SourceError, SourceId, USER_DEFINED_ID_BASE};

/// Session-wide table of tile sources.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceId, Arc<Source>>,
    next_user_id: u32,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            next_user_id: USER_DEFINED_ID_BASE,
        }
    }

    /// Looks up a source by id, materializing a preset on first use.
    pub fn get_by_id(&mut self, id: SourceId) -> Result<Arc<Source>, SourceError> {
        if let Some(source) = self.sources.get(&id) {
            return Ok(Arc::clone(source));
        }

        let preset_id = PresetId::from_id(id).ok_or(SourceError::UnknownId(id))?;
        let preset = preset(preset_id);
        let source = Arc::new(Source::new(id, preset.descriptor));
        source.set_active(preset.active);

        debug!(id = %id, name = source.name(), "Materialized preset source");
        self.sources.insert(id, Arc::clone(&source));
        Ok(source)
    }

    /// Looks up a source by its friendly name.
    ///
    /// Already known sources are searched first, then the preset table.
    pub fn get_by_name(&mut self, name: &str) -> Result<Arc<Source>, SourceError> {
        if let Some(source) = self.sources.values().find(|s| s.name() == name) {
            return Ok(Arc::clone(source));
        }

        let preset_id = PresetId::ALL
            .into_iter()
            .find(|p| preset(*p).descriptor.name == name)
            .ok_or_else(|| SourceError::UnknownName(name.to_string()))?;
        self.get_by_id(preset_id.id())
    }

    /// Registers a user-defined source under a fresh id.
    pub fn add(&mut self, descriptor: SourceDescriptor) -> Result<Arc<Source>, SourceError> {
        descriptor.validate()?;

        let id = SourceId(self.next_user_id);
        self.next_user_id += 1;

        let source = Arc::new(Source::new(id, descriptor));
        info!(id = %id, name = source.name(), "Added user source");
        self.sources.insert(id, Arc::clone(&source));
        Ok(source)
    }

    /// Registers every descriptor of a JSON array as a user source.
    ///
    /// Nothing is added unless every descriptor is valid.
    pub fn add_from_json(&mut self, json: &str) -> Result<Vec<Arc<Source>>, SourceError> {
        let descriptors: Vec<SourceDescriptor> =
            serde_json::from_str(json).map_err(|e| SourceError::UserFile {
                path: "<inline>".to_string(),
                reason: e.to_string(),
            })?;
        for descriptor in &descriptors {
            descriptor.validate()?;
        }
        descriptors.into_iter().map(|d| self.add(d)).collect()
    }

    /// Loads user sources from a JSON file.
    pub fn load_user_file(&mut self, path: &Path) -> Result<Vec<Arc<Source>>, SourceError> {
        let json = std::fs::read_to_string(path).map_err(|e| SourceError::UserFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.add_from_json(&json).map_err(|e| match e {
            SourceError::UserFile { reason, .. } => SourceError::UserFile {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Forgets a source. Returns `false` if it was not registered.
    ///
    /// A removed preset is materialized again on its next lookup.
    pub fn remove(&mut self, source: &Source) -> bool {
        let removed = self.sources.remove(&source.id()).is_some();
        if removed {
            debug!(id = %source.id(), name = source.name(), "Removed source");
        }
        removed
    }

    /// Number of materialized sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Materialized sources in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.values()
    }

    /// Materializes every preset and returns all sources in id order.
    pub fn all(&mut self) -> Vec<Arc<Source>> {
        for preset_id in PresetId::ALL {
            if let Err(e) = self.get_by_id(preset_id.id()) {
                warn!(id = %preset_id.id(), error = %e, "Preset could not be materialized");
            }
        }
        self.sources.values().cloned().collect()
    }
}
