//! Disk-backed caches for fitted models and recommendation features.
//!
//! Both stores follow the same discipline: a keyed entry guarded by a lock so
//! concurrent readers never observe a torn write, an explicit invalidation
//! operation, and I/O failures that degrade to a cache miss instead of
//! failing the request.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::LinearRegression;
use crate::recommend::features::{FeatureSet, ScaleParams};

/// Hash of a sorted active tour-ID set, the feature cache's validity key.
pub fn catalog_hash(tour_ids: &[i64]) -> u64 {
    let mut sorted = tour_ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = DefaultHasher::new();
    sorted.hash(&mut hasher);
    hasher.finish()
}

/// One persisted model file: the destination key plus its fitted regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredModel {
    destination: String,
    model: LinearRegression,
}

/// Per-destination store of fitted single-regressor models.
///
/// Entries are written on first fit and reused across calls; new booking data
/// does not invalidate them (the blended ensemble is retrained every call
/// instead). [`ModelStore::clear`] is the manual reset for operators.
#[derive(Debug)]
pub struct ModelStore {
    dir: PathBuf,
    entries: RwLock<HashMap<String, LinearRegression>>,
}

impl ModelStore {
    /// Open the store, creating the directory and eagerly loading every
    /// model file in it. Unreadable files are logged and skipped.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut entries = HashMap::new();

        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), %err, "could not create model cache directory");
        } else {
            match fs::read_dir(&dir) {
                Ok(listing) => {
                    for entry in listing.flatten() {
                        let path = entry.path();
                        if path.extension().map_or(true, |ext| ext != "json") {
                            continue;
                        }
                        match load_stored_model(&path) {
                            Ok(stored) => {
                                entries.insert(stored.destination, stored.model);
                            }
                            Err(err) => {
                                warn!(file = %path.display(), %err, "skipping unreadable model file");
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "could not list model cache directory");
                }
            }
        }

        debug!(dir = %dir.display(), loaded = entries.len(), "model store opened");
        Self {
            dir,
            entries: RwLock::new(entries),
        }
    }

    /// Fetch the cached model for a destination.
    pub fn get(&self, destination: &str) -> Option<LinearRegression> {
        self.entries
            .read()
            .ok()
            .and_then(|map| map.get(destination).cloned())
    }

    /// Insert a model for a destination, persisting it to disk. A disk
    /// failure keeps the in-memory entry and logs a warning.
    pub fn insert(&self, destination: &str, model: LinearRegression) {
        if let Ok(mut map) = self.entries.write() {
            map.insert(destination.to_string(), model.clone());
        }

        let stored = StoredModel {
            destination: destination.to_string(),
            model,
        };
        let path = self.model_path(destination);
        if let Err(err) = write_json(&path, &stored) {
            warn!(file = %path.display(), %err, "could not persist model; keeping in-memory copy");
        }
    }

    /// Number of cached destinations.
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether the store holds no models.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries, in memory and on disk.
    pub fn clear(&self) {
        if let Ok(mut map) = self.entries.write() {
            map.clear();
        }
        if let Ok(listing) = fs::read_dir(&self.dir) {
            for entry in listing.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Err(err) = fs::remove_file(&path) {
                        warn!(file = %path.display(), %err, "could not remove model file");
                    }
                }
            }
        }
    }

    fn model_path(&self, destination: &str) -> PathBuf {
        // File-system-safe name; a short hash keeps distinct destinations
        // that sanitize identically from colliding.
        let sanitized: String = destination
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let mut hasher = DefaultHasher::new();
        destination.hash(&mut hasher);
        self.dir
            .join(format!("{sanitized}-{:08x}.json", hasher.finish() as u32))
    }
}

fn load_stored_model(path: &Path) -> crate::error::Result<StoredModel> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> crate::error::Result<()> {
    let raw = serde_json::to_string(value)?;
    fs::write(path, raw)?;
    Ok(())
}

const SCALER_FILE: &str = "scaler.json";
const MATRIX_FILE: &str = "matrix.json";
const HASH_FILE: &str = "catalog.hash";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredScaler {
    price: ScaleParams,
    duration: ScaleParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMatrix {
    tour_ids: Vec<i64>,
    destinations: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

/// Cache of the recommendation feature matrix and its fitted scaler.
///
/// Validity is tied to the hash of the sorted active tour-ID set: any change
/// in catalog composition makes the cached matrix unusable. The catalog owner
/// must call [`FeatureStore::invalidate`] after tour mutations.
#[derive(Debug)]
pub struct FeatureStore {
    dir: PathBuf,
    snapshot: RwLock<Option<FeatureSet>>,
}

impl FeatureStore {
    /// Open the store and load any persisted snapshot from disk.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), %err, "could not create feature cache directory");
        }

        let snapshot = match load_snapshot(&dir) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "ignoring unreadable feature cache");
                None
            }
        };

        Self {
            dir,
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Return the cached feature set if it matches `hash`, else `None`.
    pub fn get_valid(&self, hash: u64) -> Option<FeatureSet> {
        let guard = self.snapshot.read().ok()?;
        match guard.as_ref() {
            Some(set) if set.catalog_hash == hash => {
                debug!(hash, "feature cache hit");
                Some(set.clone())
            }
            Some(set) => {
                debug!(cached = set.catalog_hash, requested = hash, "feature cache stale");
                None
            }
            None => None,
        }
    }

    /// Store a freshly built feature set, replacing memory and disk state.
    pub fn store(&self, set: FeatureSet) {
        if let Err(err) = self.persist(&set) {
            warn!(dir = %self.dir.display(), %err, "could not persist feature cache");
        }
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = Some(set);
        }
    }

    /// Clear both the in-memory and on-disk caches.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = None;
        }
        for file in [SCALER_FILE, MATRIX_FILE, HASH_FILE] {
            let path = self.dir.join(file);
            if path.exists() {
                if let Err(err) = fs::remove_file(&path) {
                    warn!(file = %path.display(), %err, "could not remove feature cache file");
                }
            }
        }
        debug!("feature cache invalidated");
    }

    fn persist(&self, set: &FeatureSet) -> crate::error::Result<()> {
        write_json(
            &self.dir.join(SCALER_FILE),
            &StoredScaler {
                price: set.price_scale,
                duration: set.duration_scale,
            },
        )?;
        write_json(
            &self.dir.join(MATRIX_FILE),
            &StoredMatrix {
                tour_ids: set.tour_ids.clone(),
                destinations: set.destinations.clone(),
                matrix: set.matrix.clone(),
            },
        )?;
        fs::write(self.dir.join(HASH_FILE), set.catalog_hash.to_string())?;
        Ok(())
    }
}

fn load_snapshot(dir: &Path) -> crate::error::Result<Option<FeatureSet>> {
    let hash_path = dir.join(HASH_FILE);
    if !hash_path.exists() {
        return Ok(None);
    }

    let hash_raw = fs::read_to_string(&hash_path)?;
    let catalog_hash: u64 = hash_raw.trim().parse().map_err(|_| {
        crate::error::AnalyticsError::CacheIo(format!("malformed hash file: {hash_raw:?}"))
    })?;

    let scaler: StoredScaler =
        serde_json::from_str(&fs::read_to_string(dir.join(SCALER_FILE))?)?;
    let stored: StoredMatrix =
        serde_json::from_str(&fs::read_to_string(dir.join(MATRIX_FILE))?)?;

    Ok(Some(FeatureSet {
        catalog_hash,
        tour_ids: stored.tour_ids,
        destinations: stored.destinations,
        price_scale: scaler.price,
        duration_scale: scaler.duration,
        matrix: stored.matrix,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::data::Tour;

    fn tour(id: i64, price: f64, duration: u32, dest: &str) -> Tour {
        Tour {
            id,
            name: format!("Tour {id}"),
            price,
            duration_days: duration,
            destination: dest.to_string(),
            active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn catalog_hash_ignores_order_and_duplicates() {
        let a = catalog_hash(&[3, 1, 2]);
        let b = catalog_hash(&[1, 2, 3]);
        let c = catalog_hash(&[1, 1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, catalog_hash(&[1, 2, 3, 4]));
    }

    #[test]
    fn model_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let model = LinearRegression {
            slope: 1.5,
            intercept: 2.0,
        };

        {
            let store = ModelStore::open(dir.path());
            assert!(store.is_empty());
            store.insert("Paris", model.clone());
            assert_eq!(store.len(), 1);
        }

        // A fresh store over the same directory loads the entry eagerly.
        let reopened = ModelStore::open(dir.path());
        assert_eq!(reopened.get("Paris"), Some(model));
        assert_eq!(reopened.get("Rome"), None);
    }

    #[test]
    fn model_store_clear_removes_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path());
        store.insert(
            "Rome",
            LinearRegression {
                slope: 0.1,
                intercept: 4.0,
            },
        );
        store.clear();
        assert!(store.is_empty());

        let reopened = ModelStore::open(dir.path());
        assert!(reopened.is_empty());
    }

    #[test]
    fn model_store_distinguishes_destinations_with_same_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path());
        store.insert(
            "São Paulo",
            LinearRegression {
                slope: 1.0,
                intercept: 0.0,
            },
        );
        store.insert(
            "Sao-Paulo",
            LinearRegression {
                slope: 2.0,
                intercept: 0.0,
            },
        );

        let reopened = ModelStore::open(dir.path());
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("São Paulo").unwrap().slope, 1.0);
        assert_eq!(reopened.get("Sao-Paulo").unwrap().slope, 2.0);
    }

    #[test]
    fn feature_store_hash_gating() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeatureStore::open(dir.path());

        let tours = vec![tour(1, 50_000.0, 7, "Paris"), tour(2, 90_000.0, 10, "Rome")];
        let hash = catalog_hash(&[1, 2]);
        let set = FeatureSet::build(&tours, hash);
        store.store(set.clone());

        assert_eq!(store.get_valid(hash), Some(set));
        // A different catalog composition misses.
        assert_eq!(store.get_valid(catalog_hash(&[1, 2, 3])), None);
    }

    #[test]
    fn feature_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let tours = vec![tour(1, 50_000.0, 7, "Paris")];
        let hash = catalog_hash(&[1]);

        {
            let store = FeatureStore::open(dir.path());
            store.store(FeatureSet::build(&tours, hash));
        }

        let reopened = FeatureStore::open(dir.path());
        let set = reopened.get_valid(hash).expect("persisted snapshot");
        assert_eq!(set.tour_ids, vec![1]);
    }

    #[test]
    fn invalidate_clears_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeatureStore::open(dir.path());
        let hash = catalog_hash(&[1]);
        store.store(FeatureSet::build(&[tour(1, 50_000.0, 7, "Paris")], hash));

        store.invalidate();
        assert_eq!(store.get_valid(hash), None);

        let reopened = FeatureStore::open(dir.path());
        assert_eq!(reopened.get_valid(hash), None);
    }

    #[test]
    fn corrupt_hash_file_degrades_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(HASH_FILE), "not-a-number").unwrap();

        let store = FeatureStore::open(dir.path());
        assert_eq!(store.get_valid(42), None);
    }
}
