//! Host-facing contract for processing modules
//!
//! A processing module receives one target file at a time, writes its findings
//! into a [`ModuleContext`], and may register extracted files or IOCs for the
//! host to act on. Scheduling, persistence and the module registry belong to
//! the host and are not modeled here.

mod context;
mod error;

pub use context::ModuleContext;
pub use error::ModuleError;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Static metadata describing a processing module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// File types the module accepts
    pub acts_on: &'static [&'static str],
    /// Module whose output triggers this one, if any
    pub triggered_by: Option<&'static str>,
}

impl ModuleInfo {
    pub fn accepts(&self, file_type: &str) -> bool {
        self.acts_on
            .iter()
            .any(|t| t.eq_ignore_ascii_case(file_type))
    }
}

#[async_trait]
pub trait ProcessingModule: Send + Sync {
    fn info(&self) -> &ModuleInfo;

    /// Processes one target; returns whether the module produced results
    async fn each(&self, target: &Path, ctx: &mut ModuleContext) -> Result<bool, ModuleError>;

    fn name(&self) -> &str {
        self.info().name
    }
}
