#![deny(missing_docs)]

//! CIMap - CI Configuration Weight Comparison Between Two Geometries
//!
//! CIMap reads the configuration-interaction (CI) output of two OpenMolcas
//! calculations of the same molecule at different geometries and compares,
//! root by root, how much each electronic configuration contributes to the
//! state.
//!
//! # Overview
//!
//! For every root the CI expansion lists configurations with their
//! coefficients. A configuration's weight is the squared coefficient in
//! percent:
//!
//! ```text
//! weight = c² × 100
//! ```
//!
//! Configurations with `|c|` below a threshold (default 0.2) are discarded.
//! For every root with at least one remaining configuration CIMap writes
//!
//! 1. a tab-delimited report with both root energies, the energy gap in eV
//!    and one row per configuration, and
//! 2. a heatmap image with one row per configuration and one column per
//!    geometry on a fixed 0-100 % color scale.
//!
//! # Quick Start
//!
//! ```no_run
//! use cimap::parser::{parse_log_file, ParseOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ParseOptions::new(0.2)?;
//!     let records = parse_log_file(Path::new("planar.log"), &options)?;
//!
//!     for (root, record) in records.iter() {
//!         println!("root {}: {} configurations", root, record.configs.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Geometry Roles
//!
//! The *reference* geometry (`geo2`, planar in the usual workflow) is written
//! in the first column; the *target* geometry (`geo1`) in the second. The
//! energy gap is `target - reference`, converted with 1 Hartree = 27.2114 eV.
//!
//! # Modules
//!
//! - [`parser`](parser/index.html) - Root-count detection and CI log parsing
//! - [`labels`](labels/index.html) - Configuration string to display label mapping
//! - [`comparison`](comparison/index.html) - Per-root union of both geometries
//! - [`report`](report/index.html) - Text report
//! - [`heatmap`](heatmap/index.html) - Heatmap rendering
//! - [`naming`](naming/index.html) - Output file names
//! - [`workflow`](workflow/index.html) - Complete comparison run
//! - [`settings`](settings/index.html) - `cimap_config.cfg` settings
//! - [`cli`](cli/index.html) - Command-line parsing
//! - [`help`](help/index.html) - Built-in help system

/// Command-line parsing
pub mod cli;
pub mod comparison;
pub mod heatmap;
/// Built-in help system
pub mod help;
pub mod labels;
/// Output file naming
pub mod naming;
pub mod parser;
pub mod report;
/// Configuration management system
pub mod settings;
pub mod workflow;

pub use comparison::RootComparison;
pub use parser::{ParseOptions, RootRecord, RootRecords};
pub use workflow::{ComparisonJob, GeometryInput, JobSummary};
