//! Historical step durations and their persistence.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::catalog::StepCatalog;
use crate::constants::{DEFAULT_HISTORY_ALPHA, HISTORY_KEY};
use crate::errors::TrackError;

const CONFIG_DIR_NAME: &str = "phasetrack";

/// Exponentially blended average duration (seconds) per step id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalAverages {
    averages: BTreeMap<String, f64>,
}

impl HistoricalAverages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored average for a step.
    #[must_use]
    pub fn get(&self, step_id: &str) -> Option<f64> {
        self.averages.get(step_id).copied()
    }

    /// Blend an observation with the default weight (0.3 new, 0.7 prior).
    pub fn blend(&mut self, step_id: &str, observed_secs: f64) -> f64 {
        self.blend_with(step_id, observed_secs, DEFAULT_HISTORY_ALPHA)
    }

    /// Blend an observation; the first observation seeds the average.
    pub fn blend_with(&mut self, step_id: &str, observed_secs: f64, alpha: f64) -> f64 {
        let updated = match self.averages.get(step_id) {
            Some(prior) => prior * (1.0 - alpha) + observed_secs * alpha,
            None => observed_secs,
        };
        self.averages.insert(step_id.to_string(), updated);
        updated
    }

    /// Sum of stored averages for steps `from_index..`, scaled down for the
    /// unfinished share of the step at `from_index`.
    ///
    /// `None` if any remaining step has no history.
    #[must_use]
    pub fn prior_remaining_secs(
        &self,
        catalog: &StepCatalog,
        from_index: usize,
        current_fraction_done: f64,
    ) -> Option<f64> {
        let mut total = 0.0;
        for (i, step) in catalog.steps().iter().enumerate().skip(from_index) {
            let avg = self.get(&step.id)?;
            if i == from_index {
                total += avg * (1.0 - current_fraction_done.clamp(0.0, 1.0));
            } else {
                total += avg;
            }
        }
        Some(total)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.averages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }

    /// Load from a store. Missing or corrupt data yields an empty map.
    #[must_use]
    pub fn load(store: &dyn TimingStore) -> Self {
        match store.get(HISTORY_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring corrupt step timing history");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Step timing history unavailable");
                Self::default()
            }
        }
    }

    /// Persist to a store under the well-known key.
    pub fn save(&self, store: &dyn TimingStore) -> Result<(), TrackError> {
        let json = serde_json::to_string(self)?;
        store.set(HISTORY_KEY, &json)
    }
}

/// Key-value store holding JSON strings.
pub trait TimingStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TrackError>;
    fn set(&self, key: &str, value: &str) -> Result<(), TrackError>;
}

/// In-memory store; counts writes so callers can observe persistence.
#[derive(Debug, Default)]
pub struct MemoryTimingStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryTimingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl TimingStore for MemoryTimingStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrackError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TrackError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Store writing one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileTimingStore {
    dir: PathBuf,
}

impl JsonFileTimingStore {
    /// Store rooted at `dir`; the directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the XDG config directory, falling back to the working directory.
    #[must_use]
    pub fn in_default_location() -> Self {
        Self::new(default_store_dir())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl TimingStore for JsonFileTimingStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrackError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TrackError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// XDG config directory for the store, or `./.phasetrack` if none is known.
fn default_store_dir() -> PathBuf {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                let mut p = PathBuf::from(home);
                p.push(".config");
                p
            })
        });

    match config_dir {
        Some(dir) => dir.join(CONFIG_DIR_NAME),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(format!(".{CONFIG_DIR_NAME}")),
    }
}
