//! crackbox - sandboxed archive extraction and QR code scanning
//!
//! Two processing modules for malware-analysis pipelines:
//!
//! - **extract** / **zip**: copy a suspicious archive into a private staging
//!   directory, let an isolated worker container unpack it (trying a list of
//!   candidate passwords), and translate the worker's line-oriented report into
//!   warnings, extracted file names and follow-up analysis targets.
//! - **qr_extractor**: decode QR codes in a rendered preview with two
//!   independent decoders and report any URLs as IOCs.
//!
//! Both implement [`ProcessingModule`]; the host supplies a [`ModuleContext`]
//! per target and reads results, extracted files and IOCs back from it.
//!
//! # Example
//!
//! ```no_run
//! use crackbox::{Capability, DockerWorker, ExtractConfig, ExtractModule, ExtractionWorker};
//! use crackbox::{ModuleContext, ProcessingModule, SystemProbe};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SystemProbe::docker()
//!     .await
//!     .map(|docker| Arc::new(DockerWorker::new(docker)) as Arc<dyn ExtractionWorker>);
//! let module = ExtractModule::initialize(ExtractConfig::default(), backend)?;
//!
//! let mut ctx = ModuleContext::new();
//! module.each(Path::new("sample.zip"), &mut ctx).await?;
//! println!("{:?}", ctx.result("files"));
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod cli;
pub mod config;
pub mod extract;
pub mod module;
pub mod qr;
pub mod util;

pub use capability::{Capability, SystemProbe};
pub use config::{ConfigError, ExtractConfig, QrConfig};
pub use extract::{
    DockerWorker, ExtractModule, ExtractionResult, ExtractionWorker, Extractor, ReportLine,
    StagingDir, WorkerError, WorkerInvocation,
};
pub use module::{ModuleContext, ModuleError, ModuleInfo, ProcessingModule};
pub use qr::{DecodeError, QrDecoder, QrModule};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
