//! ZBar decoder via the `zbarimg` command-line tool
//!
//! `zbarimg --xml` wraps every symbol's payload in its own `<data>` element,
//! so payloads spanning several lines (vCard, MECARD) come back whole.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

use super::decoder::{DecodeError, QrDecoder};

/// `zbarimg` exit status when the image holds no symbol
const ZBAR_NO_SYMBOLS: i32 = 4;

pub struct ZbarDecoder {
    binary: PathBuf,
}

impl ZbarDecoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn interpret(output: &Output) -> Result<Vec<String>, DecodeError> {
        if output.status.success() {
            let values = Self::parse_xml(&output.stdout)?;
            return if values.is_empty() {
                Err(DecodeError::NotFound)
            } else {
                Ok(values)
            };
        }
        if output.status.code() == Some(ZBAR_NO_SYMBOLS) {
            return Err(DecodeError::NotFound);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DecodeError::Failed(format!(
            "zbarimg failed ({}): {}",
            output.status,
            stderr.trim()
        )))
    }

    /// One value per `<symbol><data>` element, payload kept verbatim
    fn parse_xml(stdout: &[u8]) -> Result<Vec<String>, DecodeError> {
        let text = String::from_utf8_lossy(stdout);
        let doc = roxmltree::Document::parse(&text)
            .map_err(|e| DecodeError::Failed(format!("unreadable zbarimg XML: {}", e)))?;

        let values = doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "data")
            .filter(|n| n.parent().is_some_and(|p| p.tag_name().name() == "symbol"))
            .map(|n| {
                if n.attribute("format") == Some("base64") {
                    debug!("zbarimg returned a binary payload, keeping base64 text");
                }
                n.text().unwrap_or_default().to_string()
            })
            .collect();
        Ok(values)
    }
}

impl QrDecoder for ZbarDecoder {
    fn name(&self) -> &'static str {
        "zbar"
    }

    fn decode(&self, image: &Path) -> Result<Vec<String>, DecodeError> {
        let output = Command::new(&self.binary)
            .args(["--quiet", "--xml", "-Sdisable", "-Sqrcode.enable"])
            .arg(image)
            .output();

        match output {
            Ok(output) => Self::interpret(&output),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(DecodeError::Unavailable(
                "zbarimg not found (install zbar-tools)".to_string(),
            )),
            Err(e) => Err(DecodeError::Failed(e.to_string())),
        }
    }
}
