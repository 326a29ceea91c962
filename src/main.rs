//! CIMap Command-Line Interface
//!
//! Entry point of the `cimap` program: loads the settings, sets up logging
//! and dispatches to the requested command.
//!
//! # Usage
//!
//! 1. **Comparison** (`cimap geo1=<target.log> geo2=<reference.log> [thres=0.2]`):
//!    Writes a report and a heatmap for every root
//!
//! 2. **Settings Template** (`cimap ci cimap_config.cfg`):
//!    Creates a commented settings file in the current directory
//!
//! # Examples
//!
//! ```bash
//! # Compare the non-planar (target) and planar (reference) geometries
//! cimap geo1=ndp.log geo2=pndp.log
//!
//! # Lower threshold, custom names, separate output directory
//! cimap geo1=ndp.log geo2=pndp.log thres=0.1 name1=twisted name2=planar outdir=results
//!
//! # Create settings template
//! cimap ci cimap_config.cfg
//! ```

use cimap::cli::{parse_args, CliArgs, Command};
use cimap::help::print_topic_help;
use cimap::settings::{Settings, SettingsManager, SETTINGS_FILE_NAME};
use cimap::workflow::{ComparisonJob, JobSummary};
use log::{info, warn};
use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("cimap");

    let (settings, settings_status) = match SettingsManager::load() {
        Ok(manager) => {
            let source = manager.config_source().to_string();
            (manager.into_settings(), Ok(source))
        }
        Err(e) => (Settings::default(), Err(e)),
    };

    env_logger::Builder::from_default_env()
        .filter_level(settings.logging.level_filter())
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();

    match settings_status {
        Ok(source) => info!("Settings: {}", source),
        Err(e) => warn!("Failed to load settings, using defaults: {}", e),
    }

    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    let command = match parse_args(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    match command {
        Command::Help(topic) => print_topic_help(topic.as_deref()),
        Command::CreateSettings(path) => match run_create_settings_template(&path) {
            Ok(()) => {
                println!("✓ Settings template created successfully!");
                println!("  Output file: {}", path.display());
                println!("\nNext steps:");
                println!("  1. Review and edit the {} file", path.display());
                println!("  2. The settings will be automatically loaded by CIMap");
            }
            Err(e) => {
                eprintln!("Error creating settings template: {}", e);
                process::exit(1);
            }
        },
        Command::Compare(cli) => match run_comparison(&cli, settings) {
            Ok(summary) if summary.failed() == 0 => {
                println!("\nProcessing complete!");
            }
            Ok(summary) => {
                println!(
                    "\nProcessing complete with {} failed root(s).",
                    summary.failed()
                );
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
    }
}

fn print_usage(program_name: &str) {
    eprintln!("CIMap - CI configuration weight comparison");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  {} geo1=<target.log> geo2=<reference.log> [thres=0.2] [name1=..] [name2=..] [outdir=..]",
        program_name
    );
    eprintln!("                    Compare CI configuration weights root by root");
    eprintln!();
    eprintln!("  {} ci {}", program_name, SETTINGS_FILE_NAME);
    eprintln!("                    Create a settings template file for configuration");
    eprintln!();
    eprintln!("For more information, run: {} --help", program_name);
}

fn run_create_settings_template(path: &Path) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different location.",
            path.display()
        )
        .into());
    }

    SettingsManager::create_template(path)?;
    Ok(())
}

fn run_comparison(cli: &CliArgs, mut settings: Settings) -> Result<JobSummary, Box<dyn Error>> {
    cli.apply_to(&mut settings);

    let job = ComparisonJob::from_settings(&cli.reference, &cli.target, &settings)?;
    let summary = job.run()?;
    Ok(summary)
}
