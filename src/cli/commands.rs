use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sandboxed archive extraction and QR code scanning for malware analysis
#[derive(Parser, Debug)]
#[command(
    name = "crackbox",
    about = "Sandboxed archive extraction and QR code scanning for malware analysis",
    version,
    long_about = "crackbox runs processing modules against one suspicious file. Archives are \
                  unpacked by an isolated worker container that tries a list of candidate \
                  passwords; document previews are scanned for QR codes with two decoders."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Extract an archive (zip, rar, 7z, iso) in an isolated worker",
        long_about = "Stages the archive in a private directory, runs the extraction worker \
                      container over it and reports warnings, extracted files and files \
                      queued for follow-up analysis.\n\n\
                      Examples:\n  \
                      crackbox extract sample.7z\n  \
                      crackbox extract sample.zip --password infected --password 1234\n  \
                      crackbox extract sample.rar --max-extracted-files 20 --format json"
    )]
    Extract(ExtractArgs),

    #[command(about = "Extract a zip archive in an isolated worker")]
    Zip(ExtractArgs),

    #[command(
        about = "Decode QR codes in a rendered preview image",
        long_about = "Runs both QR decoders over an image and reports decoded values and \
                      URL indicators.\n\n\
                      Examples:\n  \
                      crackbox qr preview.png\n  \
                      crackbox qr preview.png --format yaml"
    )]
    Qr(QrArgs),

    #[command(about = "Check availability of the container runtime and QR decoders")]
    Health(HealthArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "FILE", help = "Archive to extract")]
    pub target: PathBuf,

    #[arg(
        short = 'p',
        long = "password",
        value_name = "PASSWORD",
        help = "Password candidate (repeatable, replaces the configured list)"
    )]
    pub passwords: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "passwords",
        help = "Read password candidates from a file, one per line"
    )]
    pub passwords_file: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Do not extract archives holding more files than this")]
    pub max_extracted_files: Option<u32>,

    #[arg(
        long,
        value_name = "N",
        help = "Do not queue follow-up analyses for archives holding more files than this"
    )]
    pub max_automatic_analyses: Option<u32>,

    #[arg(long, value_name = "IMAGE", help = "Extraction worker container image")]
    pub image: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Worker timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "DIR", help = "Parent directory for staging directories")]
    pub staging_dir: Option<PathBuf>,

    #[arg(long, help = "Keep the staging directory after reporting")]
    pub keep_staging: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct QrArgs {
    #[arg(value_name = "IMAGE", help = "Rendered preview image to scan")]
    pub image: PathBuf,

    #[arg(long, help = "Mark the file as not needing review when no code is found")]
    pub skip_safe_file_review: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_extract_args() {
        let args = CliArgs::parse_from(["crackbox", "extract", "sample.zip"]);
        match args.command {
            Commands::Extract(extract) => {
                assert_eq!(extract.target, PathBuf::from("sample.zip"));
                assert!(extract.passwords.is_empty());
                assert!(extract.max_extracted_files.is_none());
                assert!(extract.max_automatic_analyses.is_none());
                assert!(!extract.keep_staging);
                assert_eq!(extract.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_overrides() {
        let args = CliArgs::parse_from([
            "crackbox",
            "extract",
            "sample.7z",
            "-p",
            "infected",
            "--password",
            "1234",
            "--max-extracted-files",
            "20",
            "--max-automatic-analyses",
            "0",
            "--timeout",
            "60",
            "-f",
            "json",
        ]);
        match args.command {
            Commands::Extract(extract) => {
                assert_eq!(extract.passwords, vec!["infected", "1234"]);
                assert_eq!(extract.max_extracted_files, Some(20));
                assert_eq!(extract.max_automatic_analyses, Some(0));
                assert_eq!(extract.timeout, Some(60));
                assert_eq!(extract.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_password_and_file_conflict() {
        let result = CliArgs::try_parse_from([
            "crackbox",
            "extract",
            "a.zip",
            "-p",
            "x",
            "--passwords-file",
            "list.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zip_command() {
        let args = CliArgs::parse_from(["crackbox", "zip", "a.zip", "--keep-staging"]);
        match args.command {
            Commands::Zip(extract) => assert!(extract.keep_staging),
            _ => panic!("Expected Zip command"),
        }
    }

    #[test]
    fn test_qr_command() {
        let args = CliArgs::parse_from(["crackbox", "qr", "preview.png", "--skip-safe-file-review"]);
        match args.command {
            Commands::Qr(qr) => {
                assert_eq!(qr.image, PathBuf::from("preview.png"));
                assert!(qr.skip_safe_file_review);
            }
            _ => panic!("Expected Qr command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["crackbox", "health", "-v"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let result = CliArgs::try_parse_from(["crackbox", "health", "-v", "-q"]);
        assert!(result.is_err());
    }
}
