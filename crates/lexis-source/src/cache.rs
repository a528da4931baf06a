//! In-memory article cache with atomic generation swaps.
//!
//! The cache holds at most one [`CacheGeneration`]. Readers clone its `Arc`
//! under a briefly held lock and never wait on the network; a load fetches
//! and builds the new table with no lock held and then swaps it in. A failed
//! load leaves the previous generation in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lexis_core::config::LexisConfig;
use lexis_core::error::{LexisError, Result};
use lexis_core::types::{ArticleTable, SourceRef};

use crate::fetcher::TableFetcher;

/// One successfully loaded table.
#[derive(Debug)]
pub struct CacheGeneration {
    pub table: Arc<ArticleTable>,
    pub loaded_at: DateTime<Utc>,
    /// Starts at 1 and increases with every successful load.
    pub number: u64,
    loaded_instant: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Arc<CacheGeneration>>,
    /// Set by `invalidate`; the generation is kept only as a fallback.
    stale: bool,
}

/// Snapshot of the cache for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Absent,
    Fresh,
    Stale,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub state: CacheState,
    pub generation: Option<u64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub entries: usize,
}

/// Authoritative key→text table shared by every chat session.
pub struct ContentCache {
    fetcher: Arc<dyn TableFetcher>,
    source: SourceRef,
    reserved_keys: Vec<String>,
    ttl: Option<Duration>,
    slot: RwLock<Slot>,
    /// Serializes loads so concurrent cold reads trigger one fetch.
    load_gate: Mutex<()>,
    generations: AtomicU64,
}

impl ContentCache {
    pub fn new(fetcher: Arc<dyn TableFetcher>, source: SourceRef) -> Self {
        Self {
            fetcher,
            source,
            reserved_keys: Vec::new(),
            ttl: None,
            slot: RwLock::new(Slot::default()),
            load_gate: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// Build a cache from the `[source]` and `[pagination]` sections.
    pub fn from_config(fetcher: Arc<dyn TableFetcher>, config: &LexisConfig) -> Result<Self> {
        let mut cache = Self::new(fetcher, config.source.source_ref()?);
        if config.source.reject_reserved_keys {
            cache = cache.with_reserved_keys(config.pagination.reserved_tokens());
        }
        if let Some(ttl) = config.source.ttl() {
            cache = cache.with_ttl(ttl);
        }
        Ok(cache)
    }

    /// Keys that a loaded table must not contain.
    pub fn with_reserved_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_keys = keys
            .into_iter()
            .map(|k| k.into().trim().to_string())
            .collect();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Return the cached table, loading it first if absent or invalidated.
    ///
    /// A load failure is returned to the caller. A table that merely outlived
    /// its TTL is different: one caller reloads it while every other caller
    /// keeps getting the old table without waiting, and if the reload fails
    /// the old table is served and the failure is logged.
    pub async fn get(&self) -> Result<Arc<ArticleTable>> {
        if let Some(generation) = self.usable() {
            return Ok(Arc::clone(&generation.table));
        }

        if let Some(old) = self.expired() {
            let _gate = match self.load_gate.try_lock() {
                Ok(gate) => gate,
                // A load is already in flight.
                Err(_) => return Ok(Arc::clone(&old.table)),
            };
            if let Some(generation) = self.usable() {
                return Ok(Arc::clone(&generation.table));
            }
            return Ok(self.reload_expired(old).await);
        }

        let _gate = self.load_gate.lock().await;
        // Another caller may have finished a load while we waited.
        if let Some(generation) = self.usable() {
            return Ok(Arc::clone(&generation.table));
        }

        match self.expired() {
            Some(old) => Ok(self.reload_expired(old).await),
            None => self.load_unguarded().await,
        }
    }

    /// Fetch and install a new generation.
    ///
    /// Fails with `SourceUnavailable`, `MalformedSource` or `EmptyResult`; on
    /// failure the previous generation, if any, becomes current again.
    pub async fn load(&self) -> Result<Arc<ArticleTable>> {
        let _gate = self.load_gate.lock().await;
        self.load_unguarded().await
    }

    /// Reload without hiding the current table from readers first.
    pub async fn refresh(&self) -> Result<Arc<ArticleTable>> {
        info!(url = %self.source.url, "Refreshing table");
        self.load().await
    }

    /// Mark the current table stale so the next `get` reloads it.
    pub fn invalidate(&self) {
        let mut slot = self.write_slot();
        if let Some(ref generation) = slot.current {
            info!(generation = generation.number, "Cache invalidated");
        }
        slot.stale = true;
    }

    /// Current generation without triggering a load.
    pub fn peek(&self) -> Option<Arc<CacheGeneration>> {
        self.read_slot().current.clone()
    }

    pub fn status(&self) -> CacheStatus {
        let slot = self.read_slot();
        match slot.current {
            None => CacheStatus {
                state: CacheState::Absent,
                generation: None,
                loaded_at: None,
                entries: 0,
            },
            Some(ref generation) => CacheStatus {
                state: if slot.stale {
                    CacheState::Stale
                } else if self.is_expired(generation) {
                    CacheState::Expired
                } else {
                    CacheState::Fresh
                },
                generation: Some(generation.number),
                loaded_at: Some(generation.loaded_at),
                entries: generation.table.len(),
            },
        }
    }

    // -- Private helpers --

    /// Reload an aged table, falling back to it on failure. Gate held.
    async fn reload_expired(&self, old: Arc<CacheGeneration>) -> Arc<ArticleTable> {
        match self.load_unguarded().await {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    error = %e,
                    generation = old.number,
                    "Reload of expired table failed; serving previous generation"
                );
                Arc::clone(&old.table)
            }
        }
    }

    async fn load_unguarded(&self) -> Result<Arc<ArticleTable>> {
        let started = Instant::now();
        match self.fetch_table().await {
            Ok(table) => {
                let number = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                let generation = Arc::new(CacheGeneration {
                    table: Arc::clone(&table),
                    loaded_at: Utc::now(),
                    number,
                    loaded_instant: Instant::now(),
                });
                {
                    let mut slot = self.write_slot();
                    slot.current = Some(generation);
                    slot.stale = false;
                }
                info!(
                    generation = number,
                    entries = table.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Table loaded"
                );
                Ok(table)
            }
            Err(e) => {
                let mut slot = self.write_slot();
                slot.stale = false;
                warn!(
                    error = %e,
                    retained = slot.current.as_ref().map(|g| g.number),
                    "Table load failed"
                );
                Err(e)
            }
        }
    }

    async fn fetch_table(&self) -> Result<Arc<ArticleTable>> {
        let rows = self.fetcher.fetch(&self.source).await?;
        let fetched = rows.len();
        let build = ArticleTable::build(rows);
        debug!(
            fetched,
            dropped = build.dropped,
            duplicates = build.duplicates,
            "Rows normalized"
        );

        if build.table.is_empty() {
            return Err(LexisError::EmptyResult);
        }

        if let Some(key) = self
            .reserved_keys
            .iter()
            .find(|k| build.table.contains_key(k.as_str()))
        {
            return Err(LexisError::MalformedSource(format!(
                "key '{}' collides with a navigation command",
                key
            )));
        }

        Ok(Arc::new(build.table))
    }

    /// The current generation if it can be served without reloading.
    fn usable(&self) -> Option<Arc<CacheGeneration>> {
        let slot = self.read_slot();
        match slot.current {
            Some(ref generation) if !slot.stale && !self.is_expired(generation) => {
                Some(Arc::clone(generation))
            }
            _ => None,
        }
    }

    /// The current generation if its only problem is age.
    fn expired(&self) -> Option<Arc<CacheGeneration>> {
        let slot = self.read_slot();
        match slot.current {
            Some(ref generation) if !slot.stale && self.is_expired(generation) => {
                Some(Arc::clone(generation))
            }
            _ => None,
        }
    }

    fn is_expired(&self, generation: &CacheGeneration) -> bool {
        self.ttl
            .is_some_and(|ttl| generation.loaded_instant.elapsed() >= ttl)
    }

    // The slot is only ever replaced whole, so a poisoned lock still holds
    // a consistent value.
    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
