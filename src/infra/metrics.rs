// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to <checkpoint dir>/metrics.csv
//
//   epoch,train_loss,test_loss,learning_rate,improved
//   1,3.124500,3.089200,4.750000,true
//   2,2.890100,2.954300,4.512500,false
//
// Rows are appended, so a resumed run continues the same file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,

    /// Mean cross-entropy over training batches
    pub train_loss: f64,

    /// Mean cross-entropy over held-out batches (the loss checkpoints are chosen on)
    pub test_loss: f64,

    /// Learning rate after this epoch's decay step
    pub learning_rate: f64,

    /// Whether this epoch produced a new checkpoint
    pub improved: bool,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,test_loss,learning_rate,improved")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.test_loss,
            m.learning_rate,
            m.improved,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let row = EpochMetrics {
            epoch: 1, train_loss: 2.5, test_loss: 2.25, learning_rate: 4.75, improved: true,
        };

        MetricsLogger::new(dir.path()).unwrap().log(&row).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics { epoch: 2, improved: false, ..row }).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,test_loss,learning_rate,improved");
        assert_eq!(lines[1], "1,2.500000,2.250000,4.750000,true");
        assert!(lines[2].starts_with("2,") && lines[2].ends_with("false"));
    }
}
