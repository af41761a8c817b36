use stepinit::cli::commands::{CliArgs, Commands, ConfigArgs, ManualConfigArgs, ScanArgs};
use stepinit::cli::output::{OutputFormatter, PIPELINE_STEM, RESULT_STEM};
use stepinit::config::OutputFormat;
use stepinit::options::{AutoChooser, InteractiveChooser, ValueChooser};
use stepinit::util::logging::{self, LoggingConfig};
use stepinit::{ConfigService, InitError, StepinitConfig, VERSION};

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

fn main() {
    let args = CliArgs::parse();

    let mut config = StepinitConfig::default();
    if args.ci {
        config.ci = true;
    }
    logging::init_logging(LoggingConfig::from_flags(
        &config,
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("stepinit v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your STEPINIT_* environment variables.");
        std::process::exit(1);
    }

    let exit_code = match &args.command {
        Commands::Config(config_args) => handle_config(config_args, &config),
        Commands::Scan(scan_args) => handle_scan(scan_args, &config),
        Commands::ManualConfig(manual_args) => handle_manual_config(manual_args, &config),
    };

    std::process::exit(exit_code);
}

fn chooser(config: &StepinitConfig) -> Box<dyn ValueChooser> {
    if config.ci {
        debug!("CI mode: picking the first candidate of every option");
        Box::new(AutoChooser::new())
    } else {
        Box::new(InteractiveChooser::new())
    }
}

fn formatter(format: Option<OutputFormat>, config: &StepinitConfig) -> OutputFormatter {
    OutputFormatter::new(format.unwrap_or(config.output_format))
}

fn report(e: &InitError) {
    error!("{}", e);
    eprintln!("Error: {}", e);
    if let Some(help) = e.help_message() {
        eprintln!("\n{}", help);
    }
}

fn fail(e: &anyhow::Error) -> i32 {
    error!("{:#}", e);
    eprintln!("Error: {:#}", e);
    1
}

/// Writes each `(stem, content)` document and returns the paths written
fn write_documents(
    formatter: &OutputFormatter,
    output_dir: &Path,
    documents: &[(&str, &str)],
) -> anyhow::Result<Vec<PathBuf>> {
    documents
        .iter()
        .map(|(stem, content)| formatter.write(output_dir, stem, content))
        .collect()
}

fn print_paths(written: anyhow::Result<Vec<PathBuf>>) -> i32 {
    match written {
        Ok(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
            0
        }
        Err(e) => fail(&e),
    }
}

fn handle_config(args: &ConfigArgs, config: &StepinitConfig) -> i32 {
    info!("Generating pipeline definition");
    let service = ConfigService::new(config);
    let formatter = formatter(args.format.map(Into::into), config);
    let mut chooser = chooser(config);

    let generated = match service.generate(&args.dir, chooser.as_mut()) {
        Ok(generated) => generated,
        Err(e) => {
            report(&e);
            return 1;
        }
    };
    info!(
        platform = %generated.platform,
        config = %generated.resolution.config_id,
        "Pipeline definition generated"
    );

    let documents = formatter
        .format_definition(&generated.definition)
        .and_then(|pipeline| {
            let scan = formatter.format_scan_result(&generated.scan)?;
            Ok((pipeline, scan))
        });
    let (pipeline, scan) = match documents {
        Ok(documents) => documents,
        Err(e) => return fail(&e),
    };

    print_paths(write_documents(
        &formatter,
        &args.output_dir,
        &[(PIPELINE_STEM, pipeline.as_str()), (RESULT_STEM, scan.as_str())],
    ))
}

fn handle_scan(args: &ScanArgs, config: &StepinitConfig) -> i32 {
    info!("Scanning project");
    let service = ConfigService::new(config);
    let formatter = formatter(args.format.map(Into::into), config);

    let result = match service.scan(&args.dir) {
        Ok(result) => result,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    let document = match formatter.format_scan_result(&result) {
        Ok(document) => document,
        Err(e) => return fail(&e),
    };

    print_paths(write_documents(
        &formatter,
        &args.output_dir,
        &[(RESULT_STEM, document.as_str())],
    ))
}

fn handle_manual_config(args: &ManualConfigArgs, config: &StepinitConfig) -> i32 {
    info!("Generating default configs for every platform");
    let service = ConfigService::new(config);
    let formatter = formatter(args.format.map(Into::into), config);

    let result = match service.manual_config() {
        Ok(result) => result,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    let document = match formatter.format_scan_result(&result) {
        Ok(document) => document,
        Err(e) => return fail(&e),
    };

    print_paths(write_documents(
        &formatter,
        &args.output_dir,
        &[(RESULT_STEM, document.as_str())],
    ))
}
