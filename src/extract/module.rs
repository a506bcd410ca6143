use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::report::{parse_report, ExtractionResult};
use super::staging::StagingDir;
use super::worker::{ExtractionWorker, WorkerInvocation};
use crate::capability::Capability;
use crate::config::ExtractConfig;
use crate::module::{ModuleContext, ModuleError, ModuleInfo, ProcessingModule};

/// Result key holding the staging directory of the last run
pub const STAGING_DIR_KEY: &str = "staging_dir";

pub const EXTRACT_INFO: ModuleInfo = ModuleInfo {
    name: "extract",
    description: "Extract most compressed archives (zip, rar, 7z...)",
    acts_on: &["zip", "rar", "7z", "iso"],
    triggered_by: None,
};

pub const ZIP_INFO: ModuleInfo = ModuleInfo {
    name: "zip",
    description: "Extract zip archive content",
    acts_on: &["zip"],
    triggered_by: None,
};

/// Outcome of [`Extractor::run`]: the result plus where it was staged
#[derive(Debug)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub staging: StagingDir,
}

/// Stages a target, runs the worker and translates its report
pub struct Extractor {
    config: ExtractConfig,
    worker: Arc<dyn ExtractionWorker>,
}

impl Extractor {
    pub fn new(config: ExtractConfig, worker: Arc<dyn ExtractionWorker>) -> Self {
        Self { config, worker }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Runs one extraction, registering qualifying files on `ctx`
    ///
    /// The staging directory is left in place for the caller to consume and
    /// remove, including when the worker fails. Its path is recorded under
    /// [`STAGING_DIR_KEY`] as soon as it exists.
    pub async fn run(&self, target: &Path, ctx: &mut ModuleContext) -> Result<Extraction, ModuleError> {
        let staging = StagingDir::allocate(self.config.staging_root.as_deref())?;
        ctx.set_result(STAGING_DIR_KEY, json!(staging.root().display().to_string()));
        staging.write_passwords(&self.config.password_candidates)?;
        let container_target = staging.stage_target(target)?;

        let invocation = WorkerInvocation {
            image: self.config.worker_image.clone(),
            staging_dir: staging.root().to_path_buf(),
            target: container_target,
            max_extracted_files: self.config.maximum_extracted_files,
            max_automatic_analyses: self.config.maximum_automatic_analyses,
            timeout: self.config.worker_timeout(),
        };

        let raw = self.worker.run(&invocation).await.map_err(|e| {
            warn!(
                worker = self.worker.name(),
                staging = %staging.root().display(),
                error = %e,
                "Extraction worker failed"
            );
            ModuleError::Execution(e.to_string())
        })?;
        let output = String::from_utf8_lossy(&raw);

        let parsed = parse_report(&output, &staging.output_dir());
        for path in &parsed.extracted {
            ctx.add_extracted_file(path);
        }

        info!(
            target = %target.display(),
            warnings = parsed.result.warnings.len(),
            files = parsed.result.files.len(),
            registered = parsed.extracted.len(),
            "Extraction finished"
        );

        Ok(Extraction {
            result: parsed.result,
            staging,
        })
    }
}

/// Archive extraction processing module
pub struct ExtractModule {
    info: &'static ModuleInfo,
    extractor: Extractor,
}

impl ExtractModule {
    /// Builds the `extract` module; fails if the container backend is missing
    pub fn initialize(
        config: ExtractConfig,
        backend: Capability<Arc<dyn ExtractionWorker>>,
    ) -> Result<Self, ModuleError> {
        Self::with_info(&EXTRACT_INFO, config, backend)
    }

    /// Builds the zip-only variant
    pub fn zip(
        config: ExtractConfig,
        backend: Capability<Arc<dyn ExtractionWorker>>,
    ) -> Result<Self, ModuleError> {
        Self::with_info(&ZIP_INFO, config, backend)
    }

    fn with_info(
        info: &'static ModuleInfo,
        config: ExtractConfig,
        backend: Capability<Arc<dyn ExtractionWorker>>,
    ) -> Result<Self, ModuleError> {
        let worker = match backend {
            Capability::Available(worker) => worker,
            Capability::Missing { dependency, hint } => {
                warn!(module = info.name, dependency, hint = %hint, "Module unavailable");
                return Err(ModuleError::initialization(
                    info.name,
                    format!("Missing dependency: {}", dependency),
                ));
            }
        };
        config
            .validate()
            .map_err(|e| ModuleError::initialization(info.name, e.to_string()))?;

        Ok(Self {
            info,
            extractor: Extractor::new(config, worker),
        })
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }
}

#[async_trait]
impl ProcessingModule for ExtractModule {
    fn info(&self) -> &ModuleInfo {
        self.info
    }

    async fn each(&self, target: &Path, ctx: &mut ModuleContext) -> Result<bool, ModuleError> {
        let extraction = self.extractor.run(target, ctx).await?;
        ctx.set_result("warnings", json!(extraction.result.warnings));
        ctx.set_result("files", json!(extraction.result.files));
        Ok(true)
    }
}
