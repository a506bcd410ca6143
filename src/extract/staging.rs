//! Per-invocation staging directory shared with the extraction worker

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::report::CONTAINER_MOUNT;

pub const PASSWORDS_FILE: &str = "passwords_candidates.txt";
pub const OUTPUT_DIR: &str = "output";

const STAGING_PREFIX: &str = "crackbox-";
const RESERVED_NAME_PREFIX: &str = "target_";

/// A uniquely named directory bind-mounted into the worker
///
/// The directory outlives this value; removing it is the host's job once the
/// results have been consumed (see [`StagingDir::remove`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    /// Allocates a fresh directory under `parent` (system temp dir when `None`)
    pub fn allocate(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        // Not kept yet: an error here drops and deletes the directory.
        fs::create_dir(dir.path().join(OUTPUT_DIR))?;
        let root = dir.keep();
        debug!(path = %root.display(), "Allocated staging directory");

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn passwords_file(&self) -> PathBuf {
        self.root.join(PASSWORDS_FILE)
    }

    /// Writes the password list exactly as configured
    pub fn write_passwords(&self, candidates: &str) -> io::Result<()> {
        fs::write(self.passwords_file(), candidates)
    }

    /// Copies the target under its base name; returns the in-container path
    ///
    /// A base name that collides with the password list or the output
    /// directory is staged as `target_<name>` instead.
    pub fn stage_target(&self, target: &Path) -> io::Result<String> {
        let name = target
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("target has no file name: {}", target.display()),
                )
            })?
            .to_string_lossy()
            .into_owned();
        let name = if name == PASSWORDS_FILE || name == OUTPUT_DIR {
            warn!(name = %name, "Target name is reserved in staging, renaming");
            format!("{}{}", RESERVED_NAME_PREFIX, name)
        } else {
            name
        };

        let dest = self.root.join(&name);
        let bytes = fs::copy(target, &dest)?;
        debug!(target = %target.display(), bytes, "Copied target into staging");

        Ok(format!("{}/{}", CONTAINER_MOUNT, name))
    }

    /// Deletes the directory and everything the worker left in it
    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.root)
    }
}
