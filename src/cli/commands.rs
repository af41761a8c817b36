use crate::config::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "_scan_result";

/// Detects build platforms in a project and generates a CI pipeline definition
#[derive(Parser, Debug)]
#[command(
    name = "stepinit",
    about = "Detects build platforms in a project and generates a CI pipeline definition",
    version,
    long_about = "stepinit scans a source tree for Cordova, Expo, iOS, macOS and Android \
                  projects, walks the options each platform offers and renders the \
                  selected pipeline definition."
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
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        help = "Never prompt: pick the first candidate of every option"
    )]
    pub ci: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Scan a project and write the resolved pipeline definition",
        long_about = "Scans the project, resolves one platform's options (interactively, or \
                      unattended with --ci) and writes the rendered pipeline definition \
                      together with the scan result.\n\n\
                      Examples:\n  \
                      stepinit config\n  \
                      stepinit config --dir ./my-app --ci\n  \
                      stepinit config --format json --output-dir out"
    )]
    Config(ConfigArgs),

    #[command(
        about = "Scan a project and write the scan result",
        long_about = "Writes the options, configs, warnings and errors of every detected \
                      platform without resolving them.\n\n\
                      Examples:\n  \
                      stepinit scan\n  \
                      stepinit scan --dir ./my-app --format json"
    )]
    Scan(ScanArgs),

    #[command(
        about = "Write the default configs of every supported platform",
        long_about = "Writes a scan result holding each platform's default options and \
                      configs, for projects no detector recognises.\n\n\
                      Examples:\n  \
                      stepinit manual-config\n  \
                      stepinit manual-config --output-dir out"
    )]
    ManualConfig(ManualConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'd',
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Directory to scan"
    )]
    pub dir: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory the documents are written to"
    )]
    pub output_dir: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        help = "Output format (defaults to STEPINIT_OUTPUT_FORMAT, then yaml)"
    )]
    pub format: Option<OutputFormatArg>,
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(
        short = 'd',
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Directory to scan"
    )]
    pub dir: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory the scan result is written to"
    )]
    pub output_dir: PathBuf,

    #[arg(short = 'f', long, value_enum, help = "Output format")]
    pub format: Option<OutputFormatArg>,
}

#[derive(Parser, Debug, Clone)]
pub struct ManualConfigArgs {
    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory the scan result is written to"
    )]
    pub output_dir: PathBuf,

    #[arg(short = 'f', long, value_enum, help = "Output format")]
    pub format: Option<OutputFormatArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Yaml,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}
