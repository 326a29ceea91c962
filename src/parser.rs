//! OpenMolcas log parsing for CI coefficient printouts.
//!
//! This module extracts, for every electronic state ("root") of a multi-root
//! RASSCF/CASSCF calculation, the root energy and the weights of the leading
//! configurations from the `printout of CI-coefficients` blocks of an
//! OpenMolcas log file.
//!
//! # Log Layout
//!
//! The parser expects blocks of the following shape:
//!
//! ```text
//!       printout of CI-coefficients larger than  0.05 for root  1
//!       energy=    -1234.567890
//!       conf/sym  11111111111111     Coeff  Weight
//!              1  22222220u00000   -0.950  0.902
//!              2  2222222u000000    0.210  0.044
//! ```
//!
//! The number of roots is read from the echoed `ciroot` keyword of the input
//! section (`ciroot = 7 7 1`). When it cannot be found, a default of
//! [`DEFAULT_NUM_ROOTS`] is used and a warning is emitted.
//!
//! # Section Boundaries
//!
//! A coefficient block starts at the root marker line and ends at the first
//! line that does not look like a configuration line and contains either
//! `Natural orbitals and occupation numbers` or a run of `----` / `====`.
//! A configuration line always wins over the end markers, so a genuine
//! configuration line containing dashes would not close the block.
//!
//! # Examples
//!
//! ```
//! use cimap::parser::{parse_ci_weights, ParseOptions};
//!
//! let log = "\
//!   ciroot = 1 1 1
//!   printout of CI-coefficients larger than  0.05 for root  1
//!   energy=   -100.0
//!          1  22222220u00000   -0.950  0.902
//! ";
//! let options = ParseOptions::new(0.2).unwrap();
//! let roots = parse_ci_weights(log, &options);
//! let root1 = roots.get(1).unwrap();
//! assert_eq!(root1.energy, Some(-100.0));
//! assert!((root1.configs["22222220u00000"] - 90.2).abs() < 1e-9);
//! ```

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Number of roots assumed when the `ciroot` line is missing or malformed.
pub const DEFAULT_NUM_ROOTS: usize = 7;

/// Default coefficient threshold `|c|` for retaining a configuration.
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Default distance (in lines) between a root marker and its energy line.
pub const DEFAULT_ENERGY_LINE_OFFSET: usize = 1;

/// Length of a valid configuration (occupation) string.
pub const CONFIG_STRING_LEN: usize = 14;

const ROOT_COUNT_KEYWORD: &str = "ciroot";
const ROOT_START_MARKER: &str = "printout of CI-coefficients larger than";
const ENERGY_MARKER: &str = "energy=";
const NATURAL_ORBITALS_MARKER: &str = "Natural orbitals and occupation numbers";

lazy_static! {
    // Configuration line: "  1  22222220u00000  -0.950  0.902"
    static ref CONFIG_LINE_RE: Regex =
        Regex::new(r"^\s*(\d+)\s+([\dud*]+)\s+([-\d.]+)\s+([\d.]+)").unwrap();
}

/// Error type for log parsing operations.
///
/// Malformed content inside a log file is never an error: it is logged and
/// skipped. Only unreadable files and invalid options are reported here.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading the log file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Threshold is negative or not a finite number
    #[error("Invalid coefficient threshold: {0} (must be a finite number >= 0)")]
    InvalidThreshold(f64),
    /// Energy line offset of zero would point at the root marker itself
    #[error("Invalid energy line offset: {0} (must be >= 1)")]
    InvalidEnergyOffset(usize),
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

/// Options controlling a parse pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    threshold: f64,
    energy_line_offset: usize,
    default_num_roots: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            energy_line_offset: DEFAULT_ENERGY_LINE_OFFSET,
            default_num_roots: DEFAULT_NUM_ROOTS,
        }
    }
}

impl ParseOptions {
    /// Creates options with the given coefficient threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidThreshold`] if `threshold` is negative,
    /// infinite or NaN.
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ParseError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    /// Sets how many lines after the root marker the energy line is expected.
    pub fn with_energy_line_offset(mut self, offset: usize) -> Result<Self> {
        if offset == 0 {
            return Err(ParseError::InvalidEnergyOffset(offset));
        }
        self.energy_line_offset = offset;
        Ok(self)
    }

    /// Sets the root count used when the `ciroot` line cannot be read.
    pub fn with_default_num_roots(mut self, num_roots: usize) -> Self {
        self.default_num_roots = num_roots.max(1);
        self
    }

    /// Coefficient threshold `|c|`.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Distance between the root marker and the energy line.
    pub fn energy_line_offset(&self) -> usize {
        self.energy_line_offset
    }

    /// Fallback root count.
    pub fn default_num_roots(&self) -> usize {
        self.default_num_roots
    }
}

/// Energy and retained configuration weights of one root.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RootRecord {
    /// Root energy in Hartree, if an energy line was found
    pub energy: Option<f64>,
    /// Configuration string → weight in percent
    pub configs: BTreeMap<String, f64>,
}

/// All roots parsed from one log file, keyed by 1-based root index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RootRecords {
    roots: BTreeMap<usize, RootRecord>,
}

impl RootRecords {
    /// Creates empty records for roots `1..=num_roots`.
    pub fn with_roots(num_roots: usize) -> Self {
        let roots = (1..=num_roots)
            .map(|root| (root, RootRecord::default()))
            .collect();
        Self { roots }
    }

    /// Returns the record of `root`, if present.
    pub fn get(&self, root: usize) -> Option<&RootRecord> {
        self.roots.get(&root)
    }

    /// Highest root index present (0 when empty).
    pub fn max_root(&self) -> usize {
        self.roots.keys().next_back().copied().unwrap_or(0)
    }

    /// Number of root records.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if there are no root records.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterates over `(root, record)` pairs in ascending root order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RootRecord)> {
        self.roots.iter().map(|(root, record)| (*root, record))
    }

    fn entry(&mut self, root: usize) -> &mut RootRecord {
        self.roots.entry(root).or_default()
    }
}

/// Why the root count fell back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootCountFallback {
    /// No line contains `ciroot`
    MissingLine,
    /// The `ciroot` line has no positive integer at token index 2
    Malformed,
}

/// Result of root-count detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootCount {
    /// Number of roots used to size the records
    pub count: usize,
    /// Set when `count` is the fallback value rather than read from the log
    pub fallback: Option<RootCountFallback>,
}

/// Detects the number of roots using [`DEFAULT_NUM_ROOTS`] as fallback.
///
/// ```
/// use cimap::parser::detect_num_roots;
///
/// let detected = detect_num_roots("  ciroot = 7 7 1\n");
/// assert_eq!(detected.count, 7);
/// assert!(detected.fallback.is_none());
/// ```
pub fn detect_num_roots(content: &str) -> RootCount {
    detect_num_roots_with_default(content, DEFAULT_NUM_ROOTS)
}

/// Detects the number of roots from the first line mentioning `ciroot`.
///
/// Only the first matching line is considered. The root count is the third
/// whitespace-separated token (`ciroot = 7 7 1` → 7).
pub fn detect_num_roots_with_default(content: &str, default: usize) -> RootCount {
    let Some(line) = content
        .lines()
        .find(|line| line.to_lowercase().contains(ROOT_COUNT_KEYWORD))
    else {
        warn!("No ciroot found in log file, defaulting to {} roots", default);
        return RootCount {
            count: default,
            fallback: Some(RootCountFallback::MissingLine),
        };
    };

    match line
        .split_whitespace()
        .nth(2)
        .and_then(|token| token.parse::<usize>().ok())
        .filter(|count| *count > 0)
    {
        Some(count) => {
            info!("Detected {} roots", count);
            RootCount {
                count,
                fallback: None,
            }
        }
        None => {
            warn!(
                "Could not parse ciroot line '{}', defaulting to {} roots",
                line.trim(),
                default
            );
            RootCount {
                count: default,
                fallback: Some(RootCountFallback::Malformed),
            }
        }
    }
}

/// Reads and parses a log file.
///
/// # Errors
///
/// Returns [`ParseError::Io`] if the file cannot be read. Content problems
/// are logged and never fail the parse.
pub fn parse_log_file(path: &Path, options: &ParseOptions) -> Result<RootRecords> {
    info!("Parsing CI coefficients from {}", path.display());
    let content = fs::read_to_string(path)?;
    Ok(parse_ci_weights(&content, options))
}

/// Parses configuration weights and energies for all roots of a log text.
///
/// The result always contains roots `1..=num_roots` as detected by
/// [`detect_num_roots_with_default`]; roots found beyond that count are added
/// on the fly. Parsing is a pure function of `content` and `options`.
pub fn parse_ci_weights(content: &str, options: &ParseOptions) -> RootRecords {
    let root_count = detect_num_roots_with_default(content, options.default_num_roots);
    let mut records = RootRecords::with_roots(root_count.count);

    let mut current_root = 0usize;
    let mut in_config_section = false;
    let mut config_count = 0usize;
    // Lines left until the energy line of the current root
    let mut energy_countdown: Option<usize> = None;

    for line in content.lines() {
        if line.contains(ROOT_START_MARKER) {
            match parse_root_index(line) {
                Some(root) => {
                    current_root = root;
                    in_config_section = true;
                    config_count = 0;
                    energy_countdown = Some(options.energy_line_offset);
                    records.entry(root);
                    info!("Found coefficients for root {}", root);
                }
                None => {
                    warn!("Could not parse root index from line '{}'", line.trim());
                    current_root = 0;
                    in_config_section = false;
                    energy_countdown = None;
                }
            }
            continue;
        }

        if let Some(remaining) = energy_countdown {
            if remaining <= 1 {
                energy_countdown = None;
                capture_energy(line, current_root, &mut records);
                continue;
            }
            energy_countdown = Some(remaining - 1);
        }

        if !in_config_section || current_root == 0 {
            continue;
        }

        if let Some(caps) = CONFIG_LINE_RE.captures(line.trim()) {
            let Some(entry) = parse_config_entry(&caps) else {
                continue;
            };
            if entry.coefficient.abs() >= options.threshold {
                config_count += 1;
                info!(
                    "  Config {}: {} = {:.3} (weight={:.1}%)",
                    config_count, entry.config, entry.coefficient, entry.weight
                );
                records
                    .entry(current_root)
                    .configs
                    .insert(entry.config, entry.weight);
            }
        } else if line.contains(NATURAL_ORBITALS_MARKER)
            || line.contains("----")
            || line.contains("====")
        {
            debug!("End of coefficient block for root {}", current_root);
            in_config_section = false;
        }
    }

    records
}

/// One configuration line that passed validation.
struct ConfigEntry {
    config: String,
    coefficient: f64,
    weight: f64,
}

fn parse_root_index(line: &str) -> Option<usize> {
    line.split_whitespace()
        .last()
        .and_then(|token| token.parse::<usize>().ok())
        .filter(|root| *root > 0)
}

fn capture_energy(line: &str, root: usize, records: &mut RootRecords) {
    if !line.contains(ENERGY_MARKER) {
        debug!("No energy line found for root {}", root);
        return;
    }

    match line
        .split_whitespace()
        .nth(1)
        .map(|token| token.parse::<f64>())
    {
        Some(Ok(energy)) => {
            let record = records.entry(root);
            if record.energy.is_none() {
                record.energy = Some(energy);
            }
        }
        _ => warn!("  Could not parse energy for root {}", root),
    }
}

fn parse_config_entry(caps: &Captures) -> Option<ConfigEntry> {
    let config = &caps[2];
    if config.chars().count() != CONFIG_STRING_LEN {
        debug!("Skipping configuration '{}' with unexpected length", config);
        return None;
    }

    let coefficient = caps[3].parse::<f64>().ok()?;
    let weight = caps[4].parse::<f64>().ok()? * 100.0;

    Some(ConfigEntry {
        config: config.to_string(),
        coefficient,
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LOG: &str = "\
  &RASSCF
  ciroot = 3 3 1
  ...
      printout of CI-coefficients larger than  0.05 for root  1
      energy=   -100.123456
      conf/sym  11111111111111     Coeff  Weight
             1  22222220u00000   -0.950  0.902
             2  2222222u000000    0.210  0.044
             3  222222200u0000    0.120  0.014
      printout of CI-coefficients larger than  0.05 for root  2
      energy=   -100.010000
      conf/sym  11111111111111     Coeff  Weight
             1  2222222u000000    0.800  0.640
             2  22222220u00000    0.300  0.090
  --------------------------------------------------------
             9  222222200000u0    0.900  0.810
      Natural orbitals and occupation numbers for root  1
";

    fn options(threshold: f64) -> ParseOptions {
        ParseOptions::new(threshold).unwrap()
    }

    #[test]
    fn test_detect_num_roots_from_ciroot_line() {
        let detected = detect_num_roots("ciroot = 7 7 1\n");
        assert_eq!(detected.count, 7);
        assert_eq!(detected.fallback, None);
    }

    #[test]
    fn test_detect_num_roots_is_case_insensitive() {
        let detected = detect_num_roots("  CIROOT = 4 4 1\n");
        assert_eq!(detected.count, 4);
        assert_eq!(detected.fallback, None);
    }

    #[test]
    fn test_detect_num_roots_uses_first_line_only() {
        let detected = detect_num_roots("ciroot = 3 3 1\nciroot = 9 9 1\n");
        assert_eq!(detected.count, 3);
    }

    #[test]
    fn test_detect_num_roots_missing_line_defaults() {
        let detected = detect_num_roots("no keyword here\n");
        assert_eq!(detected.count, DEFAULT_NUM_ROOTS);
        assert_eq!(detected.fallback, Some(RootCountFallback::MissingLine));
    }

    #[test]
    fn test_detect_num_roots_malformed_line_defaults() {
        let detected = detect_num_roots("ciroot = x\n");
        assert_eq!(detected.count, DEFAULT_NUM_ROOTS);
        assert_eq!(detected.fallback, Some(RootCountFallback::Malformed));

        let detected = detect_num_roots("ciroot\n");
        assert_eq!(detected.fallback, Some(RootCountFallback::Malformed));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(ParseOptions::new(-0.1).is_err());
        assert!(ParseOptions::new(f64::NAN).is_err());
        assert!(ParseOptions::new(f64::INFINITY).is_err());
        assert!(ParseOptions::new(0.0).is_ok());
    }

    #[test]
    fn test_zero_energy_offset_rejected() {
        assert!(ParseOptions::default().with_energy_line_offset(0).is_err());
    }

    #[test]
    fn test_parse_sample_log() {
        let roots = parse_ci_weights(SAMPLE_LOG, &options(0.2));
        assert_eq!(roots.len(), 3);

        let root1 = roots.get(1).unwrap();
        assert_eq!(root1.energy, Some(-100.123456));
        assert_eq!(root1.configs.len(), 2);
        assert!((root1.configs["22222220u00000"] - 90.2).abs() < 1e-9);
        assert!((root1.configs["2222222u000000"] - 4.4).abs() < 1e-9);

        let root2 = roots.get(2).unwrap();
        assert_eq!(root2.energy, Some(-100.01));
        assert_eq!(root2.configs.len(), 2);
        // The configuration after the dashed separator is outside the block
        assert!(!root2.configs.contains_key("222222200000u0"));

        let root3 = roots.get(3).unwrap();
        assert_eq!(root3.energy, None);
        assert!(root3.configs.is_empty());
    }

    #[test]
    fn test_wrong_length_configurations_skipped() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
   1  2222222u00000   -0.950  0.902
   2  2222222u0000000 -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.0));
        assert!(roots.get(1).unwrap().configs.is_empty());
    }

    #[test]
    fn test_malformed_numbers_skipped() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
   1  22222220u00000   -.-    0.902
   2  2222222u000000   0.5    ..
   3  222222200u0000   0.5    0.25
";
        let roots = parse_ci_weights(log, &options(0.0));
        let configs = &roots.get(1).unwrap().configs;
        assert_eq!(configs.len(), 1);
        assert!((configs["222222200u0000"] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_energy_line_leaves_energy_unset() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
   conf/sym  11111111111111     Coeff  Weight
   1  22222220u00000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        let root1 = roots.get(1).unwrap();
        assert_eq!(root1.energy, None);
        assert_eq!(root1.configs.len(), 1);
    }

    #[test]
    fn test_unparsable_energy_leaves_energy_unset() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= abc
   1  22222220u00000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        assert_eq!(roots.get(1).unwrap().energy, None);
    }

    #[test]
    fn test_energy_only_probed_at_offset() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
   some header
   energy= -5.0
   1  22222220u00000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        assert_eq!(roots.get(1).unwrap().energy, None);

        let shifted = options(0.2).with_energy_line_offset(2).unwrap();
        let roots = parse_ci_weights(log, &shifted);
        assert_eq!(roots.get(1).unwrap().energy, Some(-5.0));
        assert_eq!(roots.get(1).unwrap().configs.len(), 1);
    }

    #[test]
    fn test_first_energy_wins() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
printout of CI-coefficients larger than 0.05 for root 1
energy= -2.0
";
        let roots = parse_ci_weights(log, &options(0.2));
        assert_eq!(roots.get(1).unwrap().energy, Some(-1.0));
    }

    #[test]
    fn test_roots_beyond_detected_count_created_lazily() {
        let log = "\
ciroot = 1 1 1
printout of CI-coefficients larger than 0.05 for root 3
energy= -3.0
   1  22222220u00000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        assert_eq!(roots.max_root(), 3);
        assert!(roots.get(1).unwrap().configs.is_empty());
        assert_eq!(roots.get(3).unwrap().energy, Some(-3.0));
        assert!(roots.get(2).is_none());
    }

    #[test]
    fn test_malformed_root_marker_detaches_following_lines() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
   1  22222220u00000   -0.950  0.902
printout of CI-coefficients larger than 0.05 for root x
   1  2222222u000000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        let configs = &roots.get(1).unwrap().configs;
        assert_eq!(configs.len(), 1);
        assert!(configs.contains_key("22222220u00000"));
    }

    #[test]
    fn test_configuration_lines_outside_block_ignored() {
        let log = "\
   1  22222220u00000   -0.950  0.902
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
====
   1  2222222u000000   -0.950  0.902
";
        let roots = parse_ci_weights(log, &options(0.2));
        assert!(roots.get(1).unwrap().configs.is_empty());
    }

    #[test]
    fn test_matching_line_with_dashes_stays_in_block() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
   1  22222220u00000   -0.950  0.902 ----
   2  2222222u000000    0.400  0.160
";
        let roots = parse_ci_weights(log, &options(0.2));
        let configs = &roots.get(1).unwrap().configs;
        assert!(configs.contains_key("22222220u00000"));
        assert!(configs.contains_key("2222222u000000"));
    }

    #[test]
    fn test_natural_orbitals_line_ends_block() {
        let log = "\
printout of CI-coefficients larger than 0.05 for root 1
energy= -1.0
   1  22222220u00000   -0.950  0.902
      Natural orbitals and occupation numbers for root  1
   2  2222222u000000    0.400  0.160
";
        let roots = parse_ci_weights(log, &options(0.2));
        let configs = &roots.get(1).unwrap().configs;
        assert_eq!(configs.len(), 1);
        assert!(configs.contains_key("22222220u00000"));
    }

    #[test]
    fn test_accepted_configs_satisfy_length_and_threshold() {
        let threshold = 0.25;
        let content = SAMPLE_LOG;
        let roots = parse_ci_weights(content, &options(threshold));
        for (_, record) in roots.iter() {
            for config in record.configs.keys() {
                assert_eq!(config.len(), CONFIG_STRING_LEN);
                let coefficient = content
                    .lines()
                    .filter_map(|line| CONFIG_LINE_RE.captures(line.trim()))
                    .filter(|caps| &caps[2] == config.as_str())
                    .map(|caps| caps[3].parse::<f64>().unwrap().abs())
                    .fold(0.0, f64::max);
                assert!(coefficient >= threshold);
            }
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_ci_weights(SAMPLE_LOG, &options(0.1));
        let second = parse_ci_weights(SAMPLE_LOG, &options(0.1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_raising_threshold_only_removes_configs() {
        let thresholds = [0.0, 0.1, 0.2, 0.5, 0.9, 1.0];
        for pair in thresholds.windows(2) {
            let low = parse_ci_weights(SAMPLE_LOG, &options(pair[0]));
            let high = parse_ci_weights(SAMPLE_LOG, &options(pair[1]));
            for (root, record) in high.iter() {
                let low_record = low.get(root).unwrap();
                for (config, weight) in &record.configs {
                    assert_eq!(low_record.configs.get(config), Some(weight));
                }
            }
        }
    }
}
