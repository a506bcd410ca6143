//! Extraction worker report protocol
//!
//! The worker writes one directive per line:
//!
//! ```text
//! warning: <free text>
//! should_analyze: /data/output/<relative path>
//! <anything else>
//! ```
//!
//! Classification is by literal prefix, `warning:` before `should_analyze:`,
//! and every line falls into exactly one [`ReportLine`] variant.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

pub const WARNING_PREFIX: &str = "warning:";
pub const SHOULD_ANALYZE_PREFIX: &str = "should_analyze:";

/// In-container mount point of the staging directory
pub const CONTAINER_MOUNT: &str = "/data";
/// In-container prefix of the worker's output directory
pub const CONTAINER_OUTPUT_PREFIX: &str = "/data/output/";

/// One classified line of worker output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLine<'a> {
    Warning(&'a str),
    /// Path as the worker wrote it, still in container terms
    ShouldAnalyze(&'a str),
    Debug(&'a str),
}

impl<'a> ReportLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        if let Some(rest) = line.strip_prefix(WARNING_PREFIX) {
            ReportLine::Warning(strip_separator(rest))
        } else if let Some(rest) = line.strip_prefix(SHOULD_ANALYZE_PREFIX) {
            ReportLine::ShouldAnalyze(strip_separator(rest))
        } else {
            ReportLine::Debug(line)
        }
    }
}

// A directive is "<prefix> <payload>"; exactly one space separates them.
fn strip_separator(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Structured outcome of one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub warnings: Vec<String>,
    /// Output paths relative to the worker's output directory, in report order
    pub files: Vec<String>,
}

/// Parsed report plus the host paths of files that qualify for registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReport {
    pub result: ExtractionResult,
    pub extracted: Vec<PathBuf>,
}

/// Parses worker output against the staging `output/` directory
///
/// Every `should_analyze` line adds a `files` entry. Only entries that resolve
/// to a regular file inside `output_dir` (no `..`, no absolute paths, no
/// symlinks) end up in `extracted`.
pub fn parse_report(output: &str, output_dir: &Path) -> ParsedReport {
    let mut parsed = ParsedReport::default();

    for line in output.lines() {
        match ReportLine::parse(line) {
            ReportLine::Warning(text) => parsed.result.warnings.push(text.to_string()),
            ReportLine::ShouldAnalyze(container_path) => {
                let Some(relative) = container_path.strip_prefix(CONTAINER_OUTPUT_PREFIX) else {
                    warn!(path = container_path, "should_analyze path outside worker output directory");
                    parsed.result.files.push(container_path.to_string());
                    continue;
                };
                parsed.result.files.push(relative.to_string());

                match resolve_output_file(output_dir, relative) {
                    Some(host_path) => parsed.extracted.push(host_path),
                    None => debug!(path = relative, "should_analyze file not present in staging"),
                }
            }
            ReportLine::Debug(text) => debug!(target: "crackbox::extract::report", "{}", text),
        }
    }

    parsed
}

fn resolve_output_file(output_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        warn!(path = %relative.display(), "Rejecting should_analyze path escaping output directory");
        return None;
    }

    let candidate = output_dir.join(relative);
    // Every component must be a real directory or file, never a symlink.
    let mut walked = output_dir.to_path_buf();
    for component in relative.components() {
        walked.push(component);
        let meta = std::fs::symlink_metadata(&walked).ok()?;
        if meta.file_type().is_symlink() {
            warn!(path = %walked.display(), "Refusing to follow symlink in worker output");
            return None;
        }
    }

    std::fs::symlink_metadata(&candidate)
        .ok()
        .filter(|m| m.is_file())
        .map(|_| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use yare::parameterized;

    #[parameterized(
        warning = { "warning: corrupt entry", ReportLine::Warning("corrupt entry") },
        warning_no_space = { "warning:corrupt", ReportLine::Warning("corrupt") },
        warning_keeps_extra_space = { "warning:  two", ReportLine::Warning(" two") },
        warning_keeps_prefix_chars = { "warning: warn again", ReportLine::Warning("warn again") },
        warning_empty = { "warning:", ReportLine::Warning("") },
        should_analyze = { "should_analyze: /data/output/a.exe", ReportLine::ShouldAnalyze("/data/output/a.exe") },
        debug_plain = { "extracting a.exe", ReportLine::Debug("extracting a.exe") },
        debug_indented_warning = { " warning: nope", ReportLine::Debug(" warning: nope") },
        debug_uppercase = { "WARNING: loud", ReportLine::Debug("WARNING: loud") },
        debug_empty = { "", ReportLine::Debug("") },
    )]
    fn test_parse_line(line: &str, expected: ReportLine) {
        assert_eq!(ReportLine::parse(line), expected);
    }

    #[test]
    fn test_warning_takes_priority() {
        let line = "warning: should_analyze: /data/output/x";
        assert_eq!(
            ReportLine::parse(line),
            ReportLine::Warning("should_analyze: /data/output/x")
        );
    }

    fn staging() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output");
        fs::create_dir(&output).unwrap();
        (dir, output)
    }

    #[test]
    fn test_debug_only_output() {
        let (_dir, output) = staging();
        let parsed = parse_report("Trying password virus\nDone\n\n", &output);
        assert!(parsed.result.warnings.is_empty());
        assert!(parsed.result.files.is_empty());
        assert!(parsed.extracted.is_empty());
    }

    #[test]
    fn test_concrete_report() {
        let (_dir, output) = staging();
        fs::write(output.join("doc.pdf"), b"%PDF").unwrap();

        let parsed = parse_report(
            "warning: corrupt entry\nshould_analyze: /data/output/doc.pdf\ndebug line ignored\n",
            &output,
        );

        assert_eq!(parsed.result.warnings, vec!["corrupt entry"]);
        assert_eq!(parsed.result.files, vec!["doc.pdf"]);
        assert_eq!(parsed.extracted, vec![output.join("doc.pdf")]);
    }

    #[test]
    fn test_counts_with_missing_files() {
        let (_dir, output) = staging();
        fs::create_dir(output.join("nested")).unwrap();
        fs::write(output.join("nested/b.js"), b"x").unwrap();
        fs::write(output.join("c.doc"), b"x").unwrap();

        let report = "\
warning: first
log
should_analyze: /data/output/a.exe
warning: second
should_analyze: /data/output/nested/b.js
should_analyze: /data/output/c.doc
more log
warning: third
";
        let parsed = parse_report(report, &output);

        assert_eq!(parsed.result.warnings, vec!["first", "second", "third"]);
        assert_eq!(parsed.result.files, vec!["a.exe", "nested/b.js", "c.doc"]);
        assert_eq!(
            parsed.extracted,
            vec![output.join("nested/b.js"), output.join("c.doc")]
        );
    }

    #[test]
    fn test_directory_is_not_registered() {
        let (_dir, output) = staging();
        fs::create_dir(output.join("folder")).unwrap();

        let parsed = parse_report("should_analyze: /data/output/folder", &output);
        assert_eq!(parsed.result.files, vec!["folder"]);
        assert!(parsed.extracted.is_empty());
    }

    #[test]
    fn test_traversal_is_listed_but_not_registered() {
        let (dir, output) = staging();
        fs::write(dir.path().join("secret"), b"x").unwrap();

        let parsed = parse_report("should_analyze: /data/output/../secret", &output);
        assert_eq!(parsed.result.files, vec!["../secret"]);
        assert!(parsed.extracted.is_empty());
    }

    #[test]
    fn test_path_outside_output_prefix() {
        let (dir, output) = staging();
        fs::write(dir.path().join("sample.zip"), b"x").unwrap();

        let parsed = parse_report("should_analyze: /data/sample.zip", &output);
        assert_eq!(parsed.result.files, vec!["/data/sample.zip"]);
        assert!(parsed.extracted.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_not_registered() {
        let (dir, output) = staging();
        let outside = dir.path().join("outside.txt");
        fs::write(&outside, b"x").unwrap();
        std::os::unix::fs::symlink(&outside, output.join("link.txt")).unwrap();

        let parsed = parse_report("should_analyze: /data/output/link.txt", &output);
        assert_eq!(parsed.result.files, vec!["link.txt"]);
        assert!(parsed.extracted.is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let (_dir, output) = staging();
        let parsed = parse_report("warning: a\r\nwarning: b\r\n", &output);
        assert_eq!(parsed.result.warnings, vec!["a", "b"]);
    }
}
