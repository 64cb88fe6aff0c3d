use anyhow::{anyhow, Context, Result};
use fd_lock::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::partition::Partition;

type Records = BTreeMap<String, Value>;

/// File-backed key-value store, one JSON document per partition
///
/// Every write rewrites the whole partition document through a temporary file
/// and a rename, so a crash mid-write leaves the previous document intact.
/// Read-modify-write cycles hold an exclusive lock on `<partition>.lock`, so
/// a long-running `watch` and one-off commands never drop each other's
/// records.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (or create) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create store directory: {}", root.display()))?;
        log::debug!("Local store opened at {}", root.display());
        Ok(Self { root })
    }

    /// Open the store in the configuration directory
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::ConfigManager::ensure_store_dir()?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.file_name())
    }

    /// Run `f` while holding the partition's exclusive file lock
    fn with_partition_lock<R>(&self, partition: Partition, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let lock_path = self.partition_path(partition).with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        let mut lock = RwLock::new(file);
        let _guard = lock
            .write()
            .with_context(|| format!("Failed to lock partition {partition}"))?;
        f()
    }

    fn read_partition(&self, partition: Partition) -> Result<Records> {
        let path = self.partition_path(partition);
        if !path.exists() {
            return Ok(Records::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read partition {partition}"))?;
        if content.trim().is_empty() {
            return Ok(Records::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse partition {partition}"))
    }

    fn write_partition(&self, partition: Partition, records: &Records) -> Result<()> {
        let path = self.partition_path(partition);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(records)
            .with_context(|| format!("Failed to serialize partition {partition}"))?;

        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write partition {partition}"))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace partition {partition}"))?;

        Ok(())
    }

    /// Insert or replace the record stored under `key`
    ///
    /// Object records get an `id` field equal to `key` unless they already
    /// carry one.
    pub fn save_local<T: Serialize>(&self, partition: Partition, key: &str, record: &T) -> Result<()> {
        let mut value = serde_json::to_value(record)
            .with_context(|| format!("Failed to serialize record {key} for {partition}"))?;

        if let Value::Object(map) = &mut value {
            let id = map.entry("id").or_insert(Value::Null);
            if id.is_null() {
                *id = Value::String(key.to_string());
            }
        }

        self.with_partition_lock(partition, || {
            let mut records = self.read_partition(partition)?;
            records.insert(key.to_string(), value);
            self.write_partition(partition, &records)
        })
    }

    /// Fetch a single record
    pub fn get_local<T: DeserializeOwned>(&self, partition: Partition, key: &str) -> Result<Option<T>> {
        let mut records = self.read_partition(partition)?;

        records
            .remove(key)
            .map(|value| {
                serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode record {key} in {partition}"))
            })
            .transpose()
    }

    /// Fetch every record in a partition, ordered by key
    pub fn get_all_local<T: DeserializeOwned>(&self, partition: Partition) -> Result<Vec<T>> {
        Ok(self
            .entries::<T>(partition)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Fetch every `(key, record)` pair in a partition, ordered by key
    pub fn entries<T: DeserializeOwned>(&self, partition: Partition) -> Result<Vec<(String, T)>> {
        self.read_partition(partition)?
            .into_iter()
            .map(|(key, value)| {
                let record = serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode record {key} in {partition}"))?;
                Ok((key, record))
            })
            .collect()
    }

    /// Delete a record; returns whether it existed
    pub fn delete_local(&self, partition: Partition, key: &str) -> Result<bool> {
        self.with_partition_lock(partition, || {
            let mut records = self.read_partition(partition)?;
            if records.remove(key).is_none() {
                return Ok(false);
            }
            self.write_partition(partition, &records)?;
            Ok(true)
        })
    }

    /// Number of records in a partition
    pub fn count(&self, partition: Partition) -> Result<usize> {
        Ok(self.read_partition(partition)?.len())
    }

    /// Remove every record from a partition
    pub fn clear_partition(&self, partition: Partition) -> Result<()> {
        let path = self.partition_path(partition);
        if !path.exists() {
            return Ok(());
        }
        self.with_partition_lock(partition, || {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to clear partition {partition}"))
        })
    }

    /// Clear every partition
    ///
    /// A failure on one partition is logged and the remaining partitions are
    /// still cleared; the error lists every partition that could not be cleared.
    pub fn clear_all(&self) -> Result<()> {
        let mut failed = Vec::new();

        for partition in Partition::ALL {
            if let Err(e) = self.clear_partition(partition) {
                log::error!("Failed to clear store {partition}: {e:#}");
                failed.push(partition.as_str());
            }
        }

        if !failed.is_empty() {
            return Err(anyhow!("Failed to clear partitions: {}", failed.join(", ")));
        }

        log::info!("All local data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: Option<String>,
        name: String,
        calories: u32,
    }

    fn record(name: &str, calories: u32) -> Record {
        Record {
            id: None,
            name: name.to_string(),
            calories,
        }
    }

    fn open_temp() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("store")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_get_injects_id() {
        let (_dir, store) = open_temp();
        store
            .save_local(Partition::Meals, "meal-1", &record("Oats", 300))
            .unwrap();

        let loaded: Record = store.get_local(Partition::Meals, "meal-1").unwrap().unwrap();
        assert_eq!(loaded.id.as_deref(), Some("meal-1"));
        assert_eq!(loaded.name, "Oats");
    }

    #[test]
    fn test_existing_id_is_kept() {
        let (_dir, store) = open_temp();
        let mut meal = record("Salad", 250);
        meal.id = Some("remote-7".to_string());
        store.save_local(Partition::Meals, "meal-2", &meal).unwrap();

        let loaded: Record = store.get_local(Partition::Meals, "meal-2").unwrap().unwrap();
        assert_eq!(loaded.id.as_deref(), Some("remote-7"));
    }

    #[test]
    fn test_missing_key_and_partition() {
        let (_dir, store) = open_temp();
        let loaded: Option<Record> = store.get_local(Partition::Workouts, "nope").unwrap();
        assert!(loaded.is_none());
        let all: Vec<Record> = store.get_all_local(Partition::Workouts).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn test_upsert_replaces_record() {
        let (_dir, store) = open_temp();
        store
            .save_local(Partition::Meals, "m", &record("Rice", 200))
            .unwrap();
        store
            .save_local(Partition::Meals, "m", &record("Rice", 260))
            .unwrap();

        let all: Vec<Record> = store.get_all_local(Partition::Meals).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].calories, 260);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let (_dir, store) = open_temp();
        store
            .save_local(Partition::Meals, "x", &record("Egg", 80))
            .unwrap();

        let other: Option<Record> = store.get_local(Partition::Workouts, "x").unwrap();
        assert!(other.is_none());
        assert_eq!(store.count(Partition::Meals).unwrap(), 1);
    }

    #[test]
    fn test_delete_local() {
        let (_dir, store) = open_temp();
        store
            .save_local(Partition::Hydration, "h1", &record("water", 0))
            .unwrap();

        assert!(store.delete_local(Partition::Hydration, "h1").unwrap());
        assert!(!store.delete_local(Partition::Hydration, "h1").unwrap());
        assert_eq!(store.count(Partition::Hydration).unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalStore::open(dir.path()).unwrap();
            store
                .save_local(Partition::UserStats, "today", &record("stats", 1200))
                .unwrap();
        }

        let store = LocalStore::open(dir.path()).unwrap();
        let loaded: Record = store
            .get_local(Partition::UserStats, "today")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.calories, 1200);
    }

    #[test]
    fn test_clear_all() {
        let (_dir, store) = open_temp();
        for partition in Partition::ALL {
            store.save_local(partition, "k", &record("x", 1)).unwrap();
        }

        store.clear_all().unwrap();

        for partition in Partition::ALL {
            assert_eq!(store.count(partition).unwrap(), 0);
        }
    }

    #[test]
    fn test_concurrent_writers_keep_every_record() {
        let (_dir, store) = open_temp();

        let writers: Vec<_> = (0..8)
            .map(|writer| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .save_local(Partition::SyncQueue, &format!("op-{writer}-{i}"), &record("op", i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(store.count(Partition::SyncQueue).unwrap(), 200);
        assert!(store.delete_local(Partition::SyncQueue, "op-3-7").unwrap());
        assert_eq!(store.count(Partition::SyncQueue).unwrap(), 199);
    }

    #[test]
    fn test_entries_keep_keys() {
        let (_dir, store) = open_temp();
        store.save_local(Partition::Cache, "b", &1u32).unwrap();
        store.save_local(Partition::Cache, "a", &2u32).unwrap();

        let entries: Vec<(String, u32)> = store.entries(Partition::Cache).unwrap();
        assert_eq!(entries, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }
}
