//! Output file naming for per-root artifacts.
//!
//! Every processed root produces a report and a heatmap whose names carry the
//! root index and the coefficient threshold, so runs with different
//! thresholds can share an output directory.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use cimap::naming::OutputNaming;
//!
//! let naming = OutputNaming::new(Path::new("results"), 0.2);
//! assert_eq!(naming.report_name(3), "config_weights_root3_thres0.2.txt");
//! assert_eq!(naming.heatmap_name(3), "configuration_heatmap_root3_thres0.2.png");
//! assert_eq!(naming.report_path(3), Path::new("results/config_weights_root3_thres0.2.txt"));
//! ```

use crate::report::format_float;
use std::path::{Path, PathBuf};

/// Generates output file names inside an output directory.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    directory: PathBuf,
    threshold_tag: String,
}

impl OutputNaming {
    /// Creates a naming scheme for `directory` and `threshold`.
    pub fn new(directory: &Path, threshold: f64) -> Self {
        Self {
            directory: directory.to_path_buf(),
            threshold_tag: format_float(threshold),
        }
    }

    /// Returns the output directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Format: `config_weights_root{root}_thres{threshold}.txt`
    pub fn report_name(&self, root: usize) -> String {
        format!("config_weights_root{}_thres{}.txt", root, self.threshold_tag)
    }

    /// Format: `configuration_heatmap_root{root}_thres{threshold}.png`
    pub fn heatmap_name(&self, root: usize) -> String {
        format!(
            "configuration_heatmap_root{}_thres{}.png",
            root, self.threshold_tag
        )
    }

    /// Full path of the report of `root`.
    pub fn report_path(&self, root: usize) -> PathBuf {
        self.directory.join(self.report_name(root))
    }

    /// Full path of the heatmap of `root`.
    pub fn heatmap_path(&self, root: usize) -> PathBuf {
        self.directory.join(self.heatmap_name(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_tag_keeps_decimal_point() {
        let naming = OutputNaming::new(Path::new("."), 1.0);
        assert_eq!(naming.report_name(1), "config_weights_root1_thres1.0.txt");

        let naming = OutputNaming::new(Path::new("."), 0.05);
        assert_eq!(
            naming.heatmap_name(7),
            "configuration_heatmap_root7_thres0.05.png"
        );
    }

    #[test]
    fn test_tiny_threshold_uses_exponent_tag() {
        let naming = OutputNaming::new(Path::new("."), 1e-5);
        assert_eq!(naming.report_name(1), "config_weights_root1_thres1e-05.txt");
    }

    #[test]
    fn test_paths_are_inside_directory() {
        let naming = OutputNaming::new(Path::new("/tmp/out"), 0.2);
        assert_eq!(
            naming.heatmap_path(2),
            PathBuf::from("/tmp/out/configuration_heatmap_root2_thres0.2.png")
        );
        assert_eq!(naming.directory(), Path::new("/tmp/out"));
    }
}
