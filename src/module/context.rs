//! Per-invocation result object populated by a processing module

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Results, extracted files and IOCs collected while a module processes one target
#[derive(Debug, Default, Clone, Serialize)]
pub struct ModuleContext {
    pub results: Map<String, Value>,
    pub extracted_files: Vec<PathBuf>,
    pub iocs: Vec<String>,
    pub review_skipped: bool,
}

impl ModuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field of the module's result object
    pub fn set_result(&mut self, key: impl Into<String>, value: Value) {
        self.results.insert(key.into(), value);
    }

    pub fn result(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    /// Marks a file as a new analysis target for the host
    pub fn add_extracted_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "Registering extracted file");
        self.extracted_files.push(path);
    }

    /// Records an indicator of compromise; duplicates are ignored
    pub fn add_ioc(&mut self, ioc: impl Into<String>) {
        let ioc = ioc.into();
        if !self.iocs.contains(&ioc) {
            debug!(ioc = %ioc, "Adding IOC");
            self.iocs.push(ioc);
        }
    }

    pub fn skip_review(&mut self) {
        self.review_skipped = true;
    }
}
