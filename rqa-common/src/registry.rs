//! Code scheme registry
//!
//! Built once at startup and passed by reference to every stage that needs
//! scheme lookups. Schemes are keyed by a short name: for schemes loaded from
//! a directory this is the file stem (`code_schemes/gender.json` → `gender`).

use crate::code_scheme::CodeScheme;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct CodeSchemeRegistry {
    schemes: BTreeMap<String, Arc<CodeScheme>>,
}

impl CodeSchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir` as a code scheme
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| Error::Config(format!("Invalid scheme file name: {}", path.display())))?
                .to_string();

            let content = std::fs::read_to_string(&path)?;
            let scheme = CodeScheme::from_json_str(&content).map_err(|e| {
                Error::Config(format!("Failed to load scheme {}: {}", path.display(), e))
            })?;
            debug!(key = %key, scheme_id = scheme.scheme_id(), codes = scheme.codes().len(), "Loaded code scheme");
            registry.insert(key, scheme)?;
        }

        info!("Loaded {} code schemes from {}", registry.len(), dir.display());
        Ok(registry)
    }

    /// Register a scheme under `key`; keys must be unique
    pub fn insert(&mut self, key: impl Into<String>, scheme: CodeScheme) -> Result<Arc<CodeScheme>> {
        let key = key.into();
        if self.schemes.contains_key(&key) {
            return Err(Error::Config(format!("Code scheme '{}' registered twice", key)));
        }
        let scheme = Arc::new(scheme);
        self.schemes.insert(key, Arc::clone(&scheme));
        Ok(scheme)
    }

    pub fn get(&self, key: &str) -> Result<Arc<CodeScheme>> {
        self.schemes
            .get(key)
            .cloned()
            .ok_or_else(|| Error::UnknownScheme(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }
}
