//! Tab-delimited text report of a root comparison.
//!
//! # Report Format
//!
//! ```text
//! Coefficient threshold: |c| >= 0.2
//! p-NDP Energy (Hartree): -100.0
//! NDP Energy (Hartree): -100.0
//! Energy Difference (eV): 0.0000
//!
//! Configuration	p-NDP (%)	NDP (%)
//! $\pi_2^*$	90.2	90.2
//! ```
//!
//! The energy difference line is only written when both energies are known.
//! Missing energies are written as `N/A`.

use crate::comparison::RootComparison;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for report and heatmap output.
#[derive(Error, Debug)]
pub enum ReportError {
    /// I/O error when writing an output file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Drawing the heatmap failed
    #[error("Plot error: {0}")]
    Plot(String),
    /// Encoding the heatmap image failed
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// Display names of the two geometries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryNames {
    /// Name of the reference geometry (first column)
    pub reference: String,
    /// Name of the target geometry (second column)
    pub target: String,
}

impl GeometryNames {
    /// Creates a pair of display names.
    pub fn new(reference: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
        }
    }

    /// Column header of the reference geometry.
    pub fn reference_column(&self) -> String {
        format!("{} (%)", self.reference)
    }

    /// Column header of the target geometry.
    pub fn target_column(&self) -> String {
        format!("{} (%)", self.target)
    }
}

impl Default for GeometryNames {
    fn default() -> Self {
        Self::new("p-NDP", "NDP")
    }
}

/// Formats a float the way Python's `str()` prints it.
///
/// The shortest representation that round-trips is used. Integral values
/// keep a trailing `.0`, and magnitudes below `1e-4` or from `1e16` up use
/// exponent notation with a signed two-digit exponent.
///
/// ```
/// use cimap::report::format_float;
///
/// assert_eq!(format_float(0.2), "0.2");
/// assert_eq!(format_float(1.0), "1.0");
/// assert_eq!(format_float(-100.123456), "-100.123456");
/// assert_eq!(format_float(1e-5), "1e-05");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{:e}", value);
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
            }
        }
        return scientific;
    }

    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn format_energy(energy: Option<f64>) -> String {
    energy.map(format_float).unwrap_or_else(|| "N/A".to_string())
}

/// Renders the full report text for one root.
pub fn format_report(comparison: &RootComparison, threshold: f64, names: &GeometryNames) -> String {
    let mut content = String::new();

    content.push_str(&format!(
        "Coefficient threshold: |c| >= {}\n",
        format_float(threshold)
    ));
    content.push_str(&format!(
        "{} Energy (Hartree): {}\n",
        names.reference,
        format_energy(comparison.reference_energy)
    ));
    content.push_str(&format!(
        "{} Energy (Hartree): {}\n",
        names.target,
        format_energy(comparison.target_energy)
    ));
    if let Some(energy_diff) = comparison.energy_difference_ev() {
        content.push_str(&format!("Energy Difference (eV): {:.4}\n", energy_diff));
    }
    content.push('\n');

    content.push_str(&format!(
        "Configuration\t{}\t{}\n",
        names.reference_column(),
        names.target_column()
    ));
    for row in &comparison.rows {
        content.push_str(&format!(
            "{}\t{:.1}\t{:.1}\n",
            row.label, row.reference, row.target
        ));
    }

    content
}

/// Writes a fully rendered report in one step.
pub fn write_report(path: &Path, content: &str) -> Result<(), ReportError> {
    fs::write(path, content)?;
    Ok(())
}
