//! Metrics and report export
//!
//! Serializes a finished run to JSON for external consumption.

use escrow_contracts::engine::ReconcileReport;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::metrics::SimMetrics;
use crate::runner::{Simulation, Violation};
use crate::workload::SimConfig;

/// Combined export containing all simulation outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationExport {
    pub version: String,
    pub config: SimConfig,
    pub metrics: SimMetrics,
    /// Final reconciliation of every escrow that reconciled cleanly
    pub escrows: Vec<ReconcileReport>,
    pub violations: Vec<Violation>,
}

/// Build an export from a simulation, typically after [`Simulation::run`].
pub fn build_export(sim: &Simulation) -> SimulationExport {
    SimulationExport {
        version: crate::VERSION.to_string(),
        config: sim.config().clone(),
        metrics: sim.metrics().clone(),
        escrows: sim.reconcile_all().into_iter().flatten().collect(),
        violations: sim.violations().to_vec(),
    }
}

/// Export complete simulation data as pretty-printed JSON.
pub fn export_json(export: &SimulationExport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(export)
}

/// Write export to a file path.
pub fn write_to_file(export: &SimulationExport, path: &Path) -> std::io::Result<()> {
    let json = export_json(export)?;
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(seed: u64) -> Simulation {
        let mut sim = Simulation::new(SimConfig {
            seed,
            steps: 100,
            ..SimConfig::default()
        })
        .unwrap();
        sim.run();
        sim
    }

    #[test]
    fn test_build_export() {
        let sim = finished(5);
        let export = build_export(&sim);
        assert_eq!(export.version, crate::VERSION);
        assert_eq!(export.escrows.len(), sim.config().owners);
        assert!(export.violations.is_empty());
    }

    #[test]
    fn test_export_json_roundtrip() {
        let export = build_export(&finished(6));
        let json = export_json(&export).unwrap();
        let parsed: SimulationExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, export);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        let export = build_export(&finished(7));

        write_to_file(&export, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"metrics\""));
        assert!(written.contains("\"seed\": 7"));
    }
}
