//! Subcommand handlers; each returns the process exit code

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::commands::{ExtractArgs, HealthArgs, QrArgs};
use super::output::{HealthStatus, ModuleReport, OutputFormat, OutputFormatter};
use crate::capability::{Capability, SystemProbe};
use crate::config::{ExtractConfig, QrConfig};
use crate::extract::{DockerWorker, ExtractModule, ExtractionWorker, STAGING_DIR_KEY};
use crate::module::{ModuleContext, ModuleError, ProcessingModule};
use crate::qr::QrModule;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_UNAVAILABLE: i32 = 2;

/// Which extraction module variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractVariant {
    Extract,
    Zip,
}

pub async fn handle_extract(args: &ExtractArgs, variant: ExtractVariant) -> i32 {
    let format: OutputFormat = args.format.into();
    finish(run_extract(args, variant).await, format)
}

pub async fn handle_qr(args: &QrArgs) -> i32 {
    let format: OutputFormat = args.format.into();
    finish(run_qr(args).await, format)
}

pub async fn handle_health(args: &HealthArgs) -> i32 {
    let mut health = BTreeMap::new();
    let docker = SystemProbe::docker().await;
    health.insert("docker".to_string(), status(&docker));
    let zbar = SystemProbe::binary("zbarimg");
    health.insert("zbarimg".to_string(), status(&zbar));
    health.insert(
        "rqrr".to_string(),
        HealthStatus {
            available: true,
            detail: "built in".to_string(),
        },
    );

    match OutputFormatter::new(args.format.into()).format_health(&health) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            error!("{:#}", e);
            return EXIT_FAILURE;
        }
    }

    if docker.is_available() {
        EXIT_OK
    } else {
        EXIT_UNAVAILABLE
    }
}

fn status<T>(capability: &Capability<T>) -> HealthStatus {
    HealthStatus {
        available: capability.is_available(),
        detail: capability.describe(),
    }
}

fn finish(result: Result<ModuleReport>, format: OutputFormat) -> i32 {
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return exit_code(&e);
        }
    };

    match OutputFormatter::new(format).format_report(&report) {
        Ok(output) => {
            print!("{}", output);
            EXIT_OK
        }
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ModuleError>() {
        Some(e) if e.is_initialization() => EXIT_UNAVAILABLE,
        _ => EXIT_FAILURE,
    }
}

/// Applies CLI overrides on top of the environment configuration
pub fn extract_config(args: &ExtractArgs) -> Result<ExtractConfig> {
    let mut config = ExtractConfig::from_env()?;

    if !args.passwords.is_empty() {
        config.password_candidates = args.passwords.join("\n");
    } else if let Some(path) = &args.passwords_file {
        config.password_candidates = fs::read_to_string(path)
            .with_context(|| format!("Failed to read password file {}", path.display()))?;
    }
    if let Some(n) = args.max_extracted_files {
        config.maximum_extracted_files = n;
    }
    if let Some(n) = args.max_automatic_analyses {
        config.maximum_automatic_analyses = n;
    }
    if let Some(image) = &args.image {
        config.worker_image = image.clone();
    }
    if let Some(secs) = args.timeout {
        config.worker_timeout_secs = secs;
    }
    if let Some(dir) = &args.staging_dir {
        config.staging_root = Some(dir.clone());
    }

    config.validate()?;
    debug!(config = ?config.to_display_map(), "Extraction configuration");
    Ok(config)
}

fn ensure_file(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).with_context(|| format!("Cannot access {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    Ok(())
}

async fn run_extract(args: &ExtractArgs, variant: ExtractVariant) -> Result<ModuleReport> {
    let config = extract_config(args)?;
    ensure_file(&args.target)?;

    let backend = SystemProbe::docker()
        .await
        .map(|docker| Arc::new(DockerWorker::new(docker)) as Arc<dyn ExtractionWorker>);
    let module = match variant {
        ExtractVariant::Extract => ExtractModule::initialize(config, backend)?,
        ExtractVariant::Zip => ExtractModule::zip(config, backend)?,
    };

    extract_with(&module, &args.target, args.keep_staging).await
}

/// Runs the module and releases its staging directory, whatever the outcome
async fn extract_with(module: &ExtractModule, target: &Path, keep_staging: bool) -> Result<ModuleReport> {
    let mut ctx = ModuleContext::new();
    let outcome = module.each(target, &mut ctx).await;
    release_staging(&mut ctx, keep_staging);
    outcome?;

    Ok(ModuleReport::new(module.name(), target, ctx))
}

fn release_staging(ctx: &mut ModuleContext, keep: bool) {
    let Some(staging) = ctx
        .result(STAGING_DIR_KEY)
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return;
    };

    if keep {
        info!(path = %staging.display(), "Keeping staging directory");
        return;
    }
    if let Err(e) = fs::remove_dir_all(&staging) {
        warn!(path = %staging.display(), "Failed to remove staging directory: {}", e);
    }
    ctx.results.remove(STAGING_DIR_KEY);
    ctx.extracted_files.clear();
}

async fn run_qr(args: &QrArgs) -> Result<ModuleReport> {
    ensure_file(&args.image)?;

    let mut config = QrConfig::from_env()?;
    config.skip_safe_file_review |= args.skip_safe_file_review;

    let module = QrModule::initialize(config, SystemProbe::binary("zbarimg"))?;
    let mut ctx = ModuleContext::new();
    module.each(&args.image, &mut ctx).await?;

    Ok(ModuleReport::new(module.name(), &args.image, ctx))
}
