//! Shared in-memory cache of resolved card records.
//!
//! One mutex guards both the record map and the map of names currently being
//! resolved. The lock is only held for map reads and inserts, never across a
//! table scan or a network request.

use crate::models::{normalize_name, CardRecord};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct CacheState {
    records: HashMap<String, Arc<CardRecord>>,
    in_flight: HashMap<String, InFlight>,
    next_claim: u64,
}

#[derive(Debug)]
struct InFlight {
    claim: u64,
    done: watch::Receiver<bool>,
}

/// Normalised name -> record, first insert wins
#[derive(Debug, Default)]
pub struct RecordCache {
    state: Mutex<CacheState>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the maps consistent, so a poisoned
        // lock is still safe to use
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a record by card name (any case)
    pub fn get(&self, name: &str) -> Option<Arc<CardRecord>> {
        self.lock().records.get(&normalize_name(name)).cloned()
    }

    /// Insert a record under its normalised name.
    ///
    /// Returns the cached record, which is the existing one if the name was
    /// already present.
    pub fn put(&self, record: CardRecord) -> Arc<CardRecord> {
        let key = record.key();
        self.lock()
            .records
            .entry(key)
            .or_insert_with(|| Arc::new(record))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Sort normalised `names` into cache hits, names another caller is
    /// already resolving, and names this caller must resolve itself.
    pub fn plan<I>(&self, names: I) -> LookupPlan<'_>
    where
        I: IntoIterator<Item = String>,
    {
        let mut hits = Vec::new();
        let mut waiting = Vec::new();
        let mut claimed = HashSet::new();

        let mut state = self.lock();
        let claim = state.next_claim;
        let (done_tx, done_rx) = watch::channel(false);

        for name in names {
            if let Some(record) = state.records.get(&name) {
                hits.push(record.clone());
                continue;
            }
            if claimed.contains(&name) {
                continue;
            }
            if let Some(in_flight) = state.in_flight.get(&name) {
                let done = in_flight.done.clone();
                waiting.push(PendingLookup { name, done });
                continue;
            }
            state.in_flight.insert(
                name.clone(),
                InFlight {
                    claim,
                    done: done_rx.clone(),
                },
            );
            claimed.insert(name);
        }

        let claim = if claimed.is_empty() {
            None
        } else {
            state.next_claim += 1;
            Some(ScanClaim {
                cache: self,
                id: claim,
                names: claimed,
                done: done_tx,
            })
        };
        drop(state);

        log::debug!(
            "Cache plan: {} hit(s), {} waiting, {} to resolve",
            hits.len(),
            waiting.len(),
            claim.as_ref().map_or(0, |c| c.names.len())
        );
        LookupPlan {
            hits,
            waiting,
            claim,
        }
    }

    fn release(&self, claim: u64, names: &HashSet<String>) {
        let mut state = self.lock();
        for name in names {
            if state.in_flight.get(name).is_some_and(|f| f.claim == claim) {
                state.in_flight.remove(name);
            }
        }
    }
}

/// Result of [`RecordCache::plan`]
#[derive(Debug)]
pub struct LookupPlan<'a> {
    pub hits: Vec<Arc<CardRecord>>,
    pub waiting: Vec<PendingLookup>,
    pub claim: Option<ScanClaim<'a>>,
}

/// Exclusive right to resolve a set of names.
///
/// Dropping a claim without calling [`ScanClaim::complete`] abandons it and
/// wakes every waiter so they can retry.
#[derive(Debug)]
pub struct ScanClaim<'a> {
    cache: &'a RecordCache,
    id: u64,
    names: HashSet<String>,
    done: watch::Sender<bool>,
}

impl ScanClaim<'_> {
    /// Names this claim is responsible for
    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    /// Publish resolved records.
    ///
    /// `finished` marks the scan as complete, so waiters treat names with no
    /// record as unknown cards. An unfinished (cancelled) claim still caches
    /// its records but abandons the rest.
    pub fn complete(self, records: Vec<CardRecord>, finished: bool) -> Vec<Arc<CardRecord>> {
        let stored = {
            let mut state = self.cache.lock();
            let stored: Vec<Arc<CardRecord>> = records
                .into_iter()
                .map(|record| {
                    state
                        .records
                        .entry(record.key())
                        .or_insert_with(|| Arc::new(record))
                        .clone()
                })
                .collect();
            for name in &self.names {
                if state.in_flight.get(name).is_some_and(|f| f.claim == self.id) {
                    state.in_flight.remove(name);
                }
            }
            stored
        };

        if finished {
            // No receivers left is fine
            let _ = self.done.send(true);
        }
        stored
    }
}

impl Drop for ScanClaim<'_> {
    fn drop(&mut self) {
        self.cache.release(self.id, &self.names);
    }
}

/// How a wait on another caller's claim ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The claim finished; the cache now has the answer
    Finished,
    /// The claim was dropped or cancelled; look the name up again
    Abandoned,
    /// Our own caller cancelled
    Cancelled,
}

/// A name another caller is resolving
#[derive(Debug)]
pub struct PendingLookup {
    name: String,
    done: watch::Receiver<bool>,
}

impl PendingLookup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn wait(mut self, cancel: &CancellationToken) -> WaitOutcome {
        tokio::select! {
            _ = cancel.cancelled() => WaitOutcome::Cancelled,
            result = self.done.wait_for(|done| *done) => match result {
                Ok(_) => WaitOutcome::Finished,
                Err(_) => WaitOutcome::Abandoned,
            },
        }
    }
}
