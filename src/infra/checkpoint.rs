// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to resume training or
// to generate text.
//
// Checkpoint directory layout:
//   checkpoints/
//     model-e0004.mpk.gz      ← model weights
//     optimizer-e0004.mpk.gz  ← optimizer state (momentum, moments)
//     checkpoint.json         ← names the record set above, plus
//                               epoch, best loss, learning rate,
//                               optimizer kind, model config,
//                               vocabulary {c2i, i2c}
//     metrics.csv             ← written by MetricsLogger
//
// Weights use NamedMpkGzFileRecorder with full precision so a
// save → load cycle restores them bit-for-bit.
//
// A save writes a fresh record set under names no committed
// checkpoint uses, then renames checkpoint.json.tmp over
// checkpoint.json. That rename is the only switch point: until
// it happens the old metadata still names the old records.
// Record sets the metadata no longer names are removed after.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::{error::PoemError, vocabulary::Vocabulary};
use crate::ml::{
    model::{PoemModel, PoemModelConfig},
    state::OptimizerKind,
};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const RECORD_EXTENSION: &str = "mpk.gz";
const MODEL_STEM:       &str = "model";
const OPTIMIZER_STEM:   &str = "optimizer";
const META_FILE:        &str = "checkpoint.json";
const META_TMP:         &str = "checkpoint.json.tmp";

/// Everything in a checkpoint except the tensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epochs completed when this checkpoint was taken
    pub epoch:         usize,
    pub best_loss:     f64,
    /// Learning rate to continue with
    pub learning_rate: f64,
    pub optimizer:     OptimizerKind,
    pub model:         PoemModelConfig,
    pub vocabulary:    Vocabulary,
}

/// checkpoint.json on disk: the metadata plus the record set it belongs to.
#[derive(Serialize, Deserialize)]
struct MetaFile {
    records: String,
    #[serde(flatten)]
    meta:    CheckpointMeta,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point at an existing (or not yet existing) checkpoint directory.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Point at `dir`, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PoemError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PoemError::persistence(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A checkpoint counts as present once its metadata is.
    pub fn exists(&self) -> bool {
        self.dir.join(META_FILE).is_file()
    }

    pub fn save<B, O>(
        &self,
        model: &PoemModel<B>,
        optim: &O,
        meta:  &CheckpointMeta,
    ) -> Result<(), PoemError>
    where
        B: AutodiffBackend,
        O: Optimizer<PoemModel<B>, B>,
    {
        let recorder = CheckpointRecorder::new();
        let records  = self.free_record_set(meta.epoch);

        let model_path = self.record_stem(MODEL_STEM, &records);
        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .map_err(|e| PoemError::persistence(record_file(&model_path), format!("{e:?}")))?;

        let optim_path = self.record_stem(OPTIMIZER_STEM, &records);
        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .map_err(|e| PoemError::persistence(record_file(&optim_path), format!("{e:?}")))?;

        let file = MetaFile { records: records.clone(), meta: meta.clone() };
        let meta_tmp = self.dir.join(META_TMP);
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| PoemError::persistence(&meta_tmp, e))?;
        fs::write(&meta_tmp, json).map_err(|e| PoemError::persistence(&meta_tmp, e))?;

        let meta_path = self.dir.join(META_FILE);
        fs::rename(&meta_tmp, &meta_path).map_err(|e| PoemError::persistence(&meta_path, e))?;

        self.prune_records(&records);

        tracing::debug!(
            "Saved checkpoint at epoch {} (best loss {:.4}) to '{}'",
            meta.epoch,
            meta.best_loss,
            self.dir.display()
        );
        Ok(())
    }

    pub fn load_meta(&self) -> Result<CheckpointMeta, PoemError> {
        Ok(self.read_meta_file()?.meta)
    }

    pub fn load_model<B: Backend>(
        &self,
        model:  PoemModel<B>,
        device: &B::Device,
    ) -> Result<PoemModel<B>, PoemError> {
        let records = self.read_meta_file()?.records;
        let path    = self.record_stem(MODEL_STEM, &records);
        let record: <PoemModel<B> as Module<B>>::Record =
            Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .map_err(|e| PoemError::persistence(record_file(&path), format!("{e:?}")))?;
        Ok(model.load_record(record))
    }

    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O, PoemError>
    where
        B: AutodiffBackend,
        O: Optimizer<PoemModel<B>, B>,
    {
        let records = self.read_meta_file()?.records;
        let path    = self.record_stem(OPTIMIZER_STEM, &records);
        let record: O::Record =
            Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .map_err(|e| PoemError::persistence(record_file(&path), format!("{e:?}")))?;
        Ok(optim.load_record(record))
    }

    fn read_meta_file(&self) -> Result<MetaFile, PoemError> {
        let path = self.dir.join(META_FILE);
        let json = fs::read_to_string(&path).map_err(|e| PoemError::persistence(&path, e))?;
        serde_json::from_str(&json).map_err(|e| PoemError::persistence(&path, e))
    }

    /// Recorder path (without extension) of one record in a set.
    fn record_stem(&self, kind: &str, records: &str) -> PathBuf {
        self.dir.join(format!("{kind}-{records}"))
    }

    /// First record set name for `epoch` with no file on disk yet, so a
    /// save never writes over the records checkpoint.json points at.
    fn free_record_set(&self, epoch: usize) -> String {
        let taken = |name: &str| {
            [MODEL_STEM, OPTIMIZER_STEM]
                .iter()
                .any(|kind| record_file(&self.record_stem(kind, name)).exists())
        };
        let base     = format!("e{epoch:04}");
        let mut name = base.clone();
        let mut n    = 0;
        while taken(&name) {
            n += 1;
            name = format!("{base}-{n}");
        }
        name
    }

    /// Remove record files of every set except `keep`. Failures only warn:
    /// the committed checkpoint is already consistent.
    fn prune_records(&self, keep: &str) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list '{}' for cleanup: {e}", self.dir.display());
                return;
            }
        };
        let kept: Vec<PathBuf> = [MODEL_STEM, OPTIMIZER_STEM]
            .iter()
            .map(|kind| record_file(&self.record_stem(kind, keep)))
            .collect();

        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            if is_record_file(&path) && !kept.contains(&path) {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!("Could not remove stale record '{}': {e}", path.display());
                }
            }
        }
    }
}

/// The file a recorder actually writes for a given stem.
fn record_file(stem: &Path) -> PathBuf {
    stem.with_extension(RECORD_EXTENSION)
}

fn is_record_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.is_file()
        && name.ends_with(&format!(".{RECORD_EXTENSION}"))
        && [MODEL_STEM, OPTIMIZER_STEM]
            .iter()
            .any(|kind| name.starts_with(&format!("{kind}-")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{ComputeBackend, CpuBackend};
    use burn::optim::SgdConfig;

    type B = <CpuBackend as ComputeBackend>::Train;

    fn config() -> PoemModelConfig {
        PoemModelConfig::new(5)
            .with_embedding_dim(4)
            .with_num_heads(2)
            .with_hidden_dim(8)
            .with_num_layers(1)
            .with_max_len(8)
    }

    fn meta(epoch: usize, best_loss: f64) -> CheckpointMeta {
        CheckpointMeta {
            epoch,
            best_loss,
            learning_rate: 4.5,
            optimizer:     OptimizerKind::Sgd,
            model:         config(),
            vocabulary:    Vocabulary::from_text("abcd"),
        }
    }

    fn weights(model: &PoemModel<B>) -> Vec<f32> {
        model.decoder.weight.val().into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_round_trip_restores_state_and_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let device = CpuBackend::device();
        let ckpt   = CheckpointManager::create(dir.path().join("run")).unwrap();
        let model  = config().init::<B>(&device);
        let optim  = SgdConfig::new().init::<B, PoemModel<B>>();

        assert!(!ckpt.exists());
        ckpt.save(&model, &optim, &meta(3, 1.25)).unwrap();
        assert!(ckpt.exists());

        let back = ckpt.load_meta().unwrap();
        assert_eq!(back.epoch, 3);
        assert_eq!(back.best_loss, 1.25);
        assert_eq!(back.vocabulary, Vocabulary::from_text("abcd"));

        let fresh    = config().init::<B>(&device);
        assert_ne!(weights(&fresh), weights(&model));
        let restored = ckpt.load_model(fresh, &device).unwrap();
        assert_eq!(weights(&restored), weights(&model));

        let optim = ckpt.load_optimizer(SgdConfig::new().init::<B, PoemModel<B>>(), &device);
        assert!(optim.is_ok());
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_overwrite_keeps_only_the_committed_records() {
        let dir    = tempfile::tempdir().unwrap();
        let device = CpuBackend::device();
        let ckpt   = CheckpointManager::create(dir.path()).unwrap();
        let model  = config().init::<B>(&device);
        let optim  = SgdConfig::new().init::<B, PoemModel<B>>();

        ckpt.save(&model, &optim, &meta(1, 2.0)).unwrap();
        ckpt.save(&model, &optim, &meta(2, 1.5)).unwrap();
        assert_eq!(ckpt.load_meta().unwrap().epoch, 2);
        assert_eq!(
            file_names(dir.path()),
            ["checkpoint.json", "model-e0002.mpk.gz", "optimizer-e0002.mpk.gz"]
        );

        // same epoch again must not write over the committed set
        ckpt.save(&model, &optim, &meta(2, 1.25)).unwrap();
        assert_eq!(ckpt.load_meta().unwrap().best_loss, 1.25);
        assert_eq!(
            file_names(dir.path()),
            ["checkpoint.json", "model-e0002-1.mpk.gz", "optimizer-e0002-1.mpk.gz"]
        );
        assert!(ckpt.load_model(config().init::<B>(&device), &device).is_ok());
    }

    #[test]
    fn test_failed_save_keeps_the_previous_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let device = CpuBackend::device();
        let ckpt   = CheckpointManager::create(dir.path()).unwrap();
        let optim  = SgdConfig::new().init::<B, PoemModel<B>>();

        let first  = config().init::<B>(&device);
        let second = config().init::<B>(&device);
        assert_ne!(weights(&first), weights(&second));
        ckpt.save(&first, &optim, &meta(1, 2.0)).unwrap();

        // a directory where the metadata temp file goes makes the save
        // fail after the new records are already on disk
        let blocker = dir.path().join(META_TMP);
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();
        assert!(matches!(
            ckpt.save(&second, &optim, &meta(2, 1.0)),
            Err(PoemError::Persistence { .. })
        ));

        assert_eq!(ckpt.load_meta().unwrap().epoch, 1);
        let restored = ckpt.load_model(config().init::<B>(&device), &device).unwrap();
        assert_eq!(weights(&restored), weights(&first));
        assert!(ckpt.load_optimizer(SgdConfig::new().init::<B, PoemModel<B>>(), &device).is_ok());

        // once the obstacle is gone the next save commits and clears the orphans
        fs::remove_dir_all(&blocker).unwrap();
        ckpt.save(&second, &optim, &meta(2, 1.0)).unwrap();
        let restored = ckpt.load_model(config().init::<B>(&device), &device).unwrap();
        assert_eq!(weights(&restored), weights(&second));
        assert_eq!(file_names(dir.path()).len(), 3);
    }

    #[test]
    fn test_missing_checkpoint_is_a_persistence_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::open(dir.path().join("nothing"));
        assert!(matches!(ckpt.load_meta(), Err(PoemError::Persistence { .. })));
        let model = config().init::<B>(&CpuBackend::device());
        assert!(matches!(
            ckpt.load_model(model, &CpuBackend::device()),
            Err(PoemError::Persistence { .. })
        ));
    }
}
