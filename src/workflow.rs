//! Comparison run over a reference and a target geometry.
//!
//! A [`ComparisonJob`] parses both log files, then walks the roots in order
//! and writes one report and one heatmap per root that has at least one
//! configuration above the threshold. Failures while emitting a root are
//! logged and recorded in the [`JobSummary`]; the remaining roots are still
//! processed.

use crate::comparison::{roots_to_process, RootComparison};
use crate::heatmap::{render_heatmap, write_heatmap, HeatmapStyle};
use crate::labels::LabelMapper;
use crate::naming::OutputNaming;
use crate::parser::{parse_log_file, ParseError, ParseOptions};
use crate::report::{format_float, format_report, write_report, GeometryNames, ReportError};
use crate::settings::Settings;
use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal errors of a comparison run.
#[derive(Error, Debug)]
pub enum JobError {
    /// An input log file does not exist
    #[error("File not found - {0}")]
    MissingInput(PathBuf),
    /// An input log file could not be read, or the options are invalid
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDirectory {
        /// Requested output directory
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// One input geometry: display name and log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryInput {
    /// Display name used in reports and heatmaps
    pub name: String,
    /// Path of the OpenMolcas log file
    pub path: PathBuf,
}

impl GeometryInput {
    /// Creates a geometry input.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What happened to one root.
#[derive(Debug, Clone, PartialEq)]
pub enum RootStatus {
    /// Report (and heatmap, if enabled) written
    Written {
        /// Path of the text report
        report: PathBuf,
        /// Path of the heatmap image
        heatmap: Option<PathBuf>,
    },
    /// No configuration above the threshold in either geometry
    Skipped,
    /// Emitting the root failed
    Failed(String),
}

/// Outcome of one root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOutcome {
    /// 1-based root index
    pub root: usize,
    /// Result for this root
    pub status: RootStatus,
}

/// Per-root outcomes of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSummary {
    /// Outcomes in root order
    pub outcomes: Vec<RootOutcome>,
}

impl JobSummary {
    /// Number of roots whose outputs were written.
    pub fn written(&self) -> usize {
        self.count(|status| matches!(status, RootStatus::Written { .. }))
    }

    /// Number of roots without configurations.
    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, RootStatus::Skipped))
    }

    /// Number of roots that failed.
    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, RootStatus::Failed(_)))
    }

    /// Outcome of `root`, if it was processed.
    pub fn outcome(&self, root: usize) -> Option<&RootOutcome> {
        self.outcomes.iter().find(|outcome| outcome.root == root)
    }

    fn count(&self, predicate: impl Fn(&RootStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

/// Compares the CI weights of two geometries root by root.
#[derive(Debug, Clone)]
pub struct ComparisonJob {
    reference: GeometryInput,
    target: GeometryInput,
    options: ParseOptions,
    labels: LabelMapper,
    style: HeatmapStyle,
    output_dir: PathBuf,
    write_heatmaps: bool,
}

impl ComparisonJob {
    /// Creates a job with default labels, style and the current directory as output.
    pub fn new(reference: GeometryInput, target: GeometryInput, options: ParseOptions) -> Self {
        Self {
            reference,
            target,
            options,
            labels: LabelMapper::new(),
            style: HeatmapStyle::default(),
            output_dir: PathBuf::from("."),
            write_heatmaps: true,
        }
    }

    /// Creates a job configured from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the parser settings are out of range.
    pub fn from_settings(
        reference_path: &Path,
        target_path: &Path,
        settings: &Settings,
    ) -> Result<Self, ParseError> {
        let options = ParseOptions::new(settings.parser.threshold)?
            .with_energy_line_offset(settings.parser.energy_line_offset)?
            .with_default_num_roots(settings.parser.default_roots);

        Ok(Self::new(
            GeometryInput::new(settings.geometry.reference_name.clone(), reference_path),
            GeometryInput::new(settings.geometry.target_name.clone(), target_path),
            options,
        )
        .with_labels(LabelMapper::with_overrides(settings.labels.clone()))
        .with_style(settings.plot.to_style())
        .with_output_dir(&settings.output.directory)
        .with_heatmaps(settings.output.write_heatmap))
    }

    /// Sets the label mapper.
    pub fn with_labels(mut self, labels: LabelMapper) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the heatmap style.
    pub fn with_style(mut self, style: HeatmapStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, output_dir: &Path) -> Self {
        self.output_dir = output_dir.to_path_buf();
        self
    }

    /// Enables or disables heatmap rendering.
    pub fn with_heatmaps(mut self, enabled: bool) -> Self {
        self.write_heatmaps = enabled;
        self
    }

    /// Display names of both geometries.
    pub fn names(&self) -> GeometryNames {
        GeometryNames::new(self.reference.name.clone(), self.target.name.clone())
    }

    /// Parse options used for both files.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Runs the comparison.
    ///
    /// # Errors
    ///
    /// Missing or unreadable inputs and an uncreatable output directory are
    /// fatal and reported before any output is written. Failures of single
    /// roots are not errors; see [`JobSummary`].
    pub fn run(&self) -> Result<JobSummary, JobError> {
        for input in [&self.reference, &self.target] {
            if !input.path.exists() {
                return Err(JobError::MissingInput(input.path.clone()));
            }
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| JobError::OutputDirectory {
            path: self.output_dir.clone(),
            source,
        })?;

        info!("Using coefficient threshold: {}", format_float(self.options.threshold()));
        info!("=== PARSING LOG FILES ===");
        let reference_roots = parse_log_file(&self.reference.path, &self.options)?;
        let target_roots = parse_log_file(&self.target.path, &self.options)?;

        let num_roots = roots_to_process(&reference_roots, &target_roots);
        info!("Processing {} roots", num_roots);

        let naming = OutputNaming::new(&self.output_dir, self.options.threshold());
        let names = self.names();
        let mut summary = JobSummary::default();

        for root in 1..=num_roots {
            info!("=== PROCESSING ROOT {} ===", root);
            let comparison =
                RootComparison::build(root, &reference_roots, &target_roots, &self.labels);

            let status = if comparison.is_empty() {
                info!(
                    "No configurations found for root {} with |coefficient| >= {}",
                    root,
                    format_float(self.options.threshold())
                );
                RootStatus::Skipped
            } else {
                match self.emit_root(&comparison, &names, &naming) {
                    Ok(status) => status,
                    Err(e) => {
                        error!("ERROR processing root {}: {}", root, e);
                        RootStatus::Failed(e.to_string())
                    }
                }
            };

            summary.outcomes.push(RootOutcome { root, status });
        }

        info!(
            "Finished: {} written, {} skipped, {} failed",
            summary.written(),
            summary.skipped(),
            summary.failed()
        );
        Ok(summary)
    }

    fn emit_root(
        &self,
        comparison: &RootComparison,
        names: &GeometryNames,
        naming: &OutputNaming,
    ) -> Result<RootStatus, ReportError> {
        let root = comparison.root;
        debug!("Sample data for root {}: {:?}", root, &comparison.rows[..comparison.rows.len().min(3)]);

        let threshold = self.options.threshold();
        let report = format_report(comparison, threshold, names);
        let report_path = naming.report_path(root);
        write_report(&report_path, &report)?;
        info!("Saved parsed data to: {}", report_path.display());

        let heatmap = if self.write_heatmaps {
            let image = render_heatmap(comparison, threshold, names, &self.style)?;
            let heatmap_path = naming.heatmap_path(root);
            write_heatmap(&heatmap_path, &image)?;
            info!("Saved heatmap to: {}", heatmap_path.display());
            Some(heatmap_path)
        } else {
            None
        };

        Ok(RootStatus::Written {
            report: report_path,
            heatmap,
        })
    }
}
