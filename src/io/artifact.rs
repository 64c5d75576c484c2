use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::ProgramConfiguration;
use crate::scoring::ScoreRecord;

/// Root directory for artifacts when none is configured
pub const DEFAULT_ARTIFACT_ROOT: &str = "artifacts";
/// Feature directory for meeting extraction artifacts
pub const DEFAULT_FEATURE: &str = "meeting";
/// File name of the persisted program inside a feature directory
pub const ARTIFACT_FILE_NAME: &str = "optimized_program.json";

/// Provenance recorded next to a persisted program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Optimization run that produced the artifact
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Aggregate score of the program at save time
    pub aggregate_score: ScoreRecord,
    /// Number of examples the run loaded
    pub dataset_size: usize,
    /// Examples available as exemplars
    #[serde(default)]
    pub train_size: usize,
    /// Examples the score was computed over
    #[serde(default)]
    pub validation_size: usize,
    /// Model identifier used during optimization
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub iterations_completed: usize,
}

/// A persisted best-known program plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub program: ProgramConfiguration,
    pub metadata: ArtifactMetadata,
}

/// File-backed store for one feature's artifact
///
/// Absence is a normal state. Loads never fail; saves replace the file
/// atomically so readers see either the old artifact or the new one.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    /// Store at `<root>/<feature>/optimized_program.json`
    pub fn new(root: impl AsRef<Path>, feature: &str) -> Self {
        Self {
            path: root.as_ref().join(feature).join(ARTIFACT_FILE_NAME),
        }
    }

    /// Store at an explicit file path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(DEFAULT_ARTIFACT_ROOT, DEFAULT_FEATURE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the artifact, treating missing, unreadable or invalid content as absent
    pub fn load(&self) -> Option<Artifact> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No artifact at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("Artifact {:?} is unreadable: {}", self.path, e);
                return None;
            }
        };

        let artifact: Artifact = match serde_json::from_str(&content) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Artifact {:?} is not valid JSON for this schema: {}", self.path, e);
                return None;
            }
        };

        let validation = artifact.program.validate();
        if !validation.is_valid {
            warn!(
                "Artifact {:?} failed validation: {:?}",
                self.path, validation.errors
            );
            return None;
        }

        Some(artifact)
    }

    /// Write the artifact to a temp file in the target directory, then rename it into place
    pub fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create artifact directory: {:?}", dir))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        serde_json::to_writer_pretty(&mut tmp, artifact).context("Failed to write artifact JSON")?;
        tmp.flush().context("Failed to flush artifact")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to sync artifact to disk")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move artifact into place: {:?}", self.path))?;

        info!("Saved artifact to {:?}", self.path);
        Ok(self.path.clone())
    }
}

#[derive(Debug)]
enum CacheSlot {
    Unloaded,
    Loaded(Option<Arc<Artifact>>),
}

/// Process-wide view of the artifact, shared by clones
///
/// Populated on the first [`get`](Self::get) and replaced only by an explicit
/// [`reload`](Self::reload). Build one per process (or per test) and hand
/// clones to whoever needs it.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    store: ArtifactStore,
    slot: Arc<RwLock<CacheSlot>>,
}

impl ArtifactCache {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            slot: Arc::new(RwLock::new(CacheSlot::Unloaded)),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Current artifact, loading it on first use
    pub fn get(&self) -> Option<Arc<Artifact>> {
        {
            let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
            if let CacheSlot::Loaded(artifact) = &*slot {
                return artifact.clone();
            }
        }

        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        match &*slot {
            CacheSlot::Loaded(artifact) => artifact.clone(),
            CacheSlot::Unloaded => {
                let artifact = self.store.load().map(Arc::new);
                *slot = CacheSlot::Loaded(artifact.clone());
                artifact
            }
        }
    }

    /// Re-read the artifact from disk, replacing whatever was cached
    pub fn reload(&self) -> Option<Arc<Artifact>> {
        let artifact = self.store.load().map(Arc::new);
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = CacheSlot::Loaded(artifact.clone());
        info!(
            "Artifact cache reloaded from {:?} (present: {})",
            self.store.path(),
            artifact.is_some()
        );
        artifact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exemplar, ExtractionResult};

    fn sample_artifact() -> Artifact {
        let mut program = ProgramConfiguration::default();
        program.exemplars.push(Exemplar {
            transcript: "Alice will send the deck.".to_string(),
            output: ExtractionResult::new("Deck.", ["Alice: send the deck"], Vec::<String>::new()),
        });
        program.hyperparameters.temperature = 0.3;

        Artifact {
            program,
            metadata: ArtifactMetadata {
                run_id: "run-1".to_string(),
                created_at: Utc::now(),
                aggregate_score: ScoreRecord {
                    overlap_score: 0.4,
                    precision: 0.5,
                    recall: 0.6,
                    f1: 0.55,
                },
                dataset_size: 3,
                train_size: 2,
                validation_size: 1,
                model: Some("test-model".to_string()),
                iterations_completed: 2,
            },
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);
        let artifact = sample_artifact();

        let path = store.save(&artifact).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(path, dir.path().join("meeting").join(ARTIFACT_FILE_NAME));
        assert_eq!(loaded.program, artifact.program);
        assert_eq!(loaded.metadata, artifact.metadata);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);
        let mut artifact = sample_artifact();
        store.save(&artifact).unwrap();

        artifact.program.instructions = "Second run instructions.".to_string();
        store.save(&artifact).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("meeting")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.load().unwrap().program.instructions, "Second run instructions.");
    }

    #[test]
    fn test_load_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_corrupt_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARTIFACT_FILE_NAME);
        std::fs::write(&path, "{\"program\": tru").unwrap();
        assert!(ArtifactStore::at_path(&path).load().is_none());
    }

    #[test]
    fn test_load_invalid_program_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::at_path(dir.path().join(ARTIFACT_FILE_NAME));
        let mut artifact = sample_artifact();
        artifact.program.version = 7;
        store.save(&artifact).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let store = ArtifactStore::new(&blocker, DEFAULT_FEATURE);

        assert!(store.save(&sample_artifact()).is_err());
    }

    #[test]
    fn test_cache_loads_once_until_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);
        let cache = ArtifactCache::new(store.clone());

        assert!(cache.get().is_none());

        store.save(&sample_artifact()).unwrap();
        // Still cached as absent until an explicit reload
        assert!(cache.get().is_none());

        let shared = cache.clone();
        assert!(cache.reload().is_some());
        assert!(shared.get().is_some());
    }
}
