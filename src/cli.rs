//! Command-line argument parsing.
//!
//! Comparison runs take `key=value` arguments:
//!
//! ```text
//! cimap geo1=<target.log> geo2=<reference.log> [thres=0.2] [name1=NDP] [name2=p-NDP] [outdir=.]
//! ```
//!
//! `geo1`/`name1` describe the target geometry and `geo2`/`name2` the
//! reference geometry, whose column is written first.

use crate::settings::{Settings, SETTINGS_FILE_NAME};
use log::warn;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for command-line parsing.
#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    /// A required argument is absent
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),
    /// An argument value cannot be interpreted
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Argument key
        key: String,
        /// Offending value
        value: String,
    },
    /// The `ci` command was given an unsupported file
    #[error("Unsupported template file: {0} (expected cimap_config.cfg)")]
    UnsupportedTemplate(String),
    /// A bare word that is neither a command nor `key=value`
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Arguments of a comparison run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliArgs {
    /// Target geometry log (`geo1`)
    pub target: PathBuf,
    /// Reference geometry log (`geo2`)
    pub reference: PathBuf,
    /// Coefficient threshold override (`thres`)
    pub threshold: Option<f64>,
    /// Target display name override (`name1`)
    pub target_name: Option<String>,
    /// Reference display name override (`name2`)
    pub reference_name: Option<String>,
    /// Output directory override (`outdir`)
    pub output_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Applies the command-line overrides on top of loaded settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(threshold) = self.threshold {
            settings.parser.threshold = threshold;
        }
        if let Some(name) = &self.target_name {
            settings.geometry.target_name = name.clone();
        }
        if let Some(name) = &self.reference_name {
            settings.geometry.reference_name = name.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.output.directory = dir.clone();
        }
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print help, optionally for a topic
    Help(Option<String>),
    /// Write a settings template to the given file
    CreateSettings(PathBuf),
    /// Compare two geometries
    Compare(CliArgs),
}

/// Parses the arguments that follow the program name.
pub fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let first = match args.first() {
        Some(first) => first.as_str(),
        None => return Ok(Command::Help(None)),
    };

    match first {
        "-h" | "--help" => return Ok(Command::Help(args.get(1).cloned())),
        "ci" => {
            return match args.get(1) {
                Some(file) if file == SETTINGS_FILE_NAME => {
                    Ok(Command::CreateSettings(PathBuf::from(file)))
                }
                Some(file) if file == "-h" || file == "--help" => {
                    Ok(Command::Help(Some("ci".to_string())))
                }
                Some(file) => Err(CliError::UnsupportedTemplate(file.clone())),
                None => Err(CliError::MissingArgument("ci <file>")),
            };
        }
        _ => {}
    }

    let mut target = None;
    let mut reference = None;
    let mut parsed = CliArgs::default();

    for arg in args {
        let (key, value) = match arg.split_once('=') {
            Some(pair) => pair,
            None => return Err(CliError::UnknownCommand(arg.clone())),
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "geo1" => target = Some(PathBuf::from(value)),
            "geo2" => reference = Some(PathBuf::from(value)),
            "thres" => {
                let threshold = value.parse::<f64>().map_err(|_| CliError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                parsed.threshold = Some(threshold);
            }
            "name1" => parsed.target_name = Some(value.to_string()),
            "name2" => parsed.reference_name = Some(value.to_string()),
            "outdir" => parsed.output_dir = Some(PathBuf::from(value)),
            _ => warn!("Ignoring unknown argument: {}", arg),
        }
    }

    parsed.target = target.ok_or(CliError::MissingArgument("geo1"))?;
    parsed.reference = reference.ok_or(CliError::MissingArgument("geo2"))?;
    Ok(Command::Compare(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compare_arguments() {
        let command = parse_args(&args(&[
            "geo1=ndp.log",
            "geo2=pndp.log",
            "thres=0.15",
            "name2=planar",
        ]))
        .unwrap();

        let Command::Compare(cli) = command else {
            panic!("expected compare command");
        };
        assert_eq!(cli.target, PathBuf::from("ndp.log"));
        assert_eq!(cli.reference, PathBuf::from("pndp.log"));
        assert_eq!(cli.threshold, Some(0.15));
        assert_eq!(cli.reference_name.as_deref(), Some("planar"));
        assert_eq!(cli.target_name, None);
    }

    #[test]
    fn test_missing_geometry_is_error() {
        assert_eq!(
            parse_args(&args(&["geo1=a.log"])),
            Err(CliError::MissingArgument("geo2"))
        );
        assert_eq!(
            parse_args(&args(&["geo2=a.log", "thres=0.3"])),
            Err(CliError::MissingArgument("geo1"))
        );
    }

    #[test]
    fn test_invalid_threshold_is_error() {
        let result = parse_args(&args(&["geo1=a", "geo2=b", "thres=abc"]));
        assert!(matches!(result, Err(CliError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let command = parse_args(&args(&["geo1=a", "geo2=b", "colour=red"])).unwrap();
        assert!(matches!(command, Command::Compare(_)));
    }

    #[test]
    fn test_help_and_ci_commands() {
        assert_eq!(parse_args(&[]), Ok(Command::Help(None)));
        assert_eq!(
            parse_args(&args(&["--help", "keywords"])),
            Ok(Command::Help(Some("keywords".to_string())))
        );
        assert_eq!(
            parse_args(&args(&["ci", "cimap_config.cfg"])),
            Ok(Command::CreateSettings(PathBuf::from("cimap_config.cfg")))
        );
        assert!(matches!(
            parse_args(&args(&["ci", "other.cfg"])),
            Err(CliError::UnsupportedTemplate(_))
        ));
        assert!(matches!(
            parse_args(&args(&["compare"])),
            Err(CliError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let cli = CliArgs {
            threshold: Some(0.3),
            target_name: Some("twisted".to_string()),
            output_dir: Some(PathBuf::from("out")),
            ..CliArgs::default()
        };
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);

        assert_eq!(settings.parser.threshold, 0.3);
        assert_eq!(settings.geometry.target_name, "twisted");
        assert_eq!(settings.geometry.reference_name, "p-NDP");
        assert_eq!(settings.output.directory, PathBuf::from("out"));
    }
}
