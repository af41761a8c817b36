pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, ManualConfigArgs, OutputFormatArg, ScanArgs};
pub use output::OutputFormatter;
