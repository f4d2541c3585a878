//! The on-disk descriptor directory and its in-memory snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

use super::endpoint::{Endpoint, Site};

/// Error type for registry loading.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("read mirror directory {path}: {source}")]
    ReadDir {
        path: String,
        source: std::io::Error,
    },
}

/// One parsed descriptor file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteFile {
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Default)]
struct Snapshot {
    abbr_map: HashMap<String, Arc<Vec<Endpoint>>>,
    label_map: HashMap<String, String>,
}

/// The endpoint registry.
///
/// Readers always observe a complete snapshot; `load` publishes a fully
/// built replacement in one atomic swap.
pub struct MirrorDb {
    snapshot: ArcSwap<Snapshot>,
}

impl Default for MirrorDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorDb {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Scan `dir` for `*.json` descriptors and replace the registry.
    ///
    /// Per-file errors are logged and the file skipped; an unreadable
    /// directory keeps the previous snapshot.
    pub fn load(&self, dir: &Path) -> Result<(), RegistryError> {
        let entries = fs::read_dir(dir).map_err(|source| RegistryError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?;

        let mut abbr_map = HashMap::new();
        let mut label_map = HashMap::new();
        let mut loaded = 0usize;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "read descriptor failed");
                    continue;
                }
            };
            let file: SiteFile = match serde_json::from_str(&content) {
                Ok(f) => f,
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "parse descriptor failed");
                    continue;
                }
            };
            for e in &file.endpoints {
                label_map.insert(e.label.clone(), e.resolve.clone());
            }
            abbr_map.insert(file.site.abbr.clone(), Arc::new(file.endpoints));
            loaded += 1;
        }

        tracing::info!(dir = %dir.display(), sites = loaded, "mirror registry loaded");
        self.snapshot.store(Arc::new(Snapshot { abbr_map, label_map }));
        Ok(())
    }

    /// Endpoints of a site, from the current snapshot.
    pub fn lookup(&self, abbr: &str) -> Option<Arc<Vec<Endpoint>>> {
        self.snapshot.load().abbr_map.get(abbr).cloned()
    }

    /// Resolve a label to its endpoint hostname.
    pub fn resolve_label(&self, label: &str) -> Option<String> {
        self.snapshot.load().label_map.get(label).cloned()
    }
}
