//! The lazy definition cache.
//!
//! Sits between the resolver and the backend. Lookups are served from a
//! reader-shared table; misses fall through to the backend and the answer
//! is memoised. Positive entries live until `reinitialise` flushes the
//! table; negative entries are only kept when a TTL is configured, since
//! an unknown MAC may be provisioned at any moment. With a persistent
//! path the table doubles as a degraded data source while the backend is
//! down.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use eui48::MacAddress;
use serde_json;

use backend::{Backend, BackendError, Definition};
use config::CacheConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    definitions: Vec<Definition>,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(definitions: Vec<Definition>) -> Self {
        CacheEntry {
            definitions,
            cached_at: Utc::now(),
        }
    }

    fn age_seconds(&self) -> u64 {
        let age = Utc::now().signed_duration_since(self.cached_at);
        if age.num_seconds() < 0 {
            0
        } else {
            age.num_seconds() as u64
        }
    }
}

/// The JSON-backed table used for `on_disk` and persistent caching.
struct DiskTable {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl DiskTable {
    fn open(path: PathBuf, load: bool) -> Self {
        let entries = if load {
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(entries) => entries,
                    Err(error) => {
                        warn!(
                            "Ignoring unreadable cache file {}: {}",
                            path.display(),
                            error
                        );
                        HashMap::new()
                    }
                },
                Err(_) => HashMap::new(),
            }
        } else {
            HashMap::new()
        };
        DiskTable { path, entries }
    }

    fn store(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
        self.flush();
    }

    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.flush();
    }

    fn flush(&self) {
        match serde_json::to_string(&self.entries) {
            Ok(contents) => {
                if let Err(error) = fs::write(&self.path, contents) {
                    error!("Unable to write cache file {}: {}", self.path.display(), error);
                }
            }
            Err(error) => error!("Unable to serialise the cache: {}", error),
        }
    }
}

const DEFAULT_DISK_PATH: &'static str = "definition-cache.json";

/// The caching wrapper every lookup goes through; with caching disabled it
/// degrades to a plain pass-through.
pub struct DefinitionCache {
    backend: Arc<dyn Backend>,
    config: CacheConfig,
    memory: RwLock<HashMap<String, CacheEntry>>,
    disk: Option<Mutex<DiskTable>>,
}

impl DefinitionCache {
    /// Wraps a backend, loading the persistent table when configured.
    pub fn new(backend: Arc<dyn Backend>, config: CacheConfig) -> Self {
        let disk = if config.enabled && (config.on_disk || config.persistent_path.is_some()) {
            let persistent = config.persistent_path.is_some();
            let path = config
                .persistent_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DISK_PATH));
            Some(Mutex::new(DiskTable::open(path, persistent)))
        } else {
            None
        };

        DefinitionCache {
            backend,
            config,
            memory: RwLock::new(HashMap::new()),
            disk,
        }
    }

    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        if !self.config.on_disk {
            if let Some(entry) = self
                .memory
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(key)
            {
                return Some(entry.to_owned());
            }
        }
        if let Some(ref disk) = self.disk {
            return disk
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .fetch(key);
        }
        None
    }

    fn store(&self, key: &str, entry: CacheEntry) {
        if !self.config.on_disk {
            self.memory
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(key.to_owned(), entry.to_owned());
        }
        if let Some(ref disk) = self.disk {
            disk.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .store(key.to_owned(), entry);
        }
    }

    /// Resolves a MAC through the cache into the backend.
    ///
    /// A backend failure is answered from the persistent table when one
    /// exists, so a store outage degrades service instead of stopping it.
    pub fn lookup(&self, mac: &MacAddress) -> Result<Vec<Definition>, BackendError> {
        let key = mac.to_hex_string();

        if self.config.enabled {
            if let Some(entry) = self.fetch(&key) {
                if !entry.definitions.is_empty() {
                    trace!("Cache hit for {}", key);
                    return Ok(entry.definitions);
                }
                if let Some(ttl) = self.config.negative_ttl {
                    if entry.age_seconds() < ttl {
                        trace!("Negative cache hit for {}", key);
                        return Ok(Vec::new());
                    }
                }
            }
        }

        match self.backend.lookup(mac) {
            Ok(definitions) => {
                if self.config.enabled
                    && (!definitions.is_empty() || self.config.negative_ttl.is_some())
                {
                    self.store(&key, CacheEntry::new(definitions.to_owned()));
                }
                Ok(definitions)
            }
            Err(error) => {
                if self.config.persistent_path.is_some() {
                    if let Some(entry) = self.fetch(&key) {
                        if !entry.definitions.is_empty() {
                            warn!(
                                "Backend failed ({}); serving {} from the persistent cache",
                                error, key
                            );
                            return Ok(entry.definitions);
                        }
                    }
                }
                Err(error)
            }
        }
    }

    /// Flushes the whole table and reinitialises the backend. New lookups
    /// block behind the write lock until the flush completes.
    pub fn reinitialise(&self) -> Result<(), BackendError> {
        let mut memory = self
            .memory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        memory.clear();
        if let Some(ref disk) = self.disk {
            disk.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clear();
        }
        self.backend.reinitialise()
    }
}
