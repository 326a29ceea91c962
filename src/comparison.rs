//! Per-root comparison table between two geometries.
//!
//! The table joins both geometries' configurations of one root on the exact
//! configuration string. Absent configurations contribute a weight of 0.0.

use crate::labels::LabelMapper;
use crate::parser::{RootRecord, RootRecords};
use std::collections::BTreeSet;

/// Hartree → electronvolt conversion factor.
pub const HARTREE_TO_EV: f64 = 27.2114;

/// Energy gap `target - reference` converted to eV.
///
/// ```
/// use cimap::comparison::energy_difference_ev;
///
/// let de = energy_difference_ev(-100.123456, -100.119000);
/// assert!((de - 0.1212).abs() < 1e-4);
/// ```
pub fn energy_difference_ev(reference: f64, target: f64) -> f64 {
    (target - reference) * HARTREE_TO_EV
}

/// One configuration row of a [`RootComparison`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Raw configuration string
    pub config: String,
    /// Display label (mapped or the raw string)
    pub label: String,
    /// Weight in the reference geometry (percent)
    pub reference: f64,
    /// Weight in the target geometry (percent)
    pub target: f64,
}

/// Weights and energies of one root in both geometries.
#[derive(Debug, Clone, PartialEq)]
pub struct RootComparison {
    /// 1-based root index
    pub root: usize,
    /// Reference geometry energy (Hartree)
    pub reference_energy: Option<f64>,
    /// Target geometry energy (Hartree)
    pub target_energy: Option<f64>,
    /// Union of configurations, ordered by configuration string
    pub rows: Vec<ComparisonRow>,
}

impl RootComparison {
    /// Builds the comparison of `root`.
    ///
    /// A root missing from either collection behaves like an empty record
    /// with no energy.
    pub fn build(
        root: usize,
        reference: &RootRecords,
        target: &RootRecords,
        labels: &LabelMapper,
    ) -> Self {
        let reference_record = reference.get(root);
        let target_record = target.get(root);

        let configs: BTreeSet<&str> = reference_record
            .into_iter()
            .chain(target_record)
            .flat_map(|record| record.configs.keys().map(String::as_str))
            .collect();

        let weight_of = |record: Option<&RootRecord>, config: &str| {
            record
                .and_then(|r| r.configs.get(config))
                .copied()
                .unwrap_or(0.0)
        };

        let rows = configs
            .into_iter()
            .map(|config| ComparisonRow {
                config: config.to_string(),
                label: labels.label(config).to_string(),
                reference: weight_of(reference_record, config),
                target: weight_of(target_record, config),
            })
            .collect();

        Self {
            root,
            reference_energy: reference_record.and_then(|r| r.energy),
            target_energy: target_record.and_then(|r| r.energy),
            rows,
        }
    }

    /// Returns `true` if neither geometry has a configuration for this root.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Energy gap in eV, available only when both energies are known.
    pub fn energy_difference_ev(&self) -> Option<f64> {
        match (self.reference_energy, self.target_energy) {
            (Some(reference), Some(target)) => Some(energy_difference_ev(reference, target)),
            _ => None,
        }
    }
}

/// Number of roots to process: the highest root index of either geometry.
pub fn roots_to_process(reference: &RootRecords, target: &RootRecords) -> usize {
    reference.max_root().max(target.max_root())
}
