//! Sandboxed archive extraction
//!
//! The orchestrator stages a target in a private directory, hands it to an
//! isolated worker container that does the unpacking and password cracking,
//! and turns the worker's line-oriented report into an [`ExtractionResult`].

mod module;
pub mod report;
pub mod staging;
pub mod worker;

pub use module::{Extraction, ExtractModule, Extractor, EXTRACT_INFO, STAGING_DIR_KEY, ZIP_INFO};
pub use report::{parse_report, ExtractionResult, ParsedReport, ReportLine};
pub use staging::StagingDir;
pub use worker::{DockerWorker, ExtractionWorker, WorkerError, WorkerInvocation};
