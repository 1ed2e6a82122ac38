//! Tempo cache
//!
//! Stretched buffers for the current track, keyed by tempo percentage.
//! Lookups never promote an entry, so the least-recently-*inserted* entry
//! is the one evicted at capacity.

use crate::audio::types::Track;
use crate::error::{Error, Result};
use crate::tempo::backend::{ratio_for_percent, StretchBackend};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

pub struct TempoCache {
    entries: LruCache<u16, Arc<Vec<f32>>>,
    /// Samples of the track the entries were computed from
    bound: Weak<Vec<f32>>,
}

impl TempoCache {
    /// Create an empty cache; a capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            bound: Weak::new(),
        }
    }

    /// Stretched samples of `track` at `percent`, computing them on a miss.
    ///
    /// 100% returns the original samples and is never stored. Entries for a
    /// previous track are dropped before anything else happens. Failed
    /// stretches are not cached.
    pub fn get_or_compute(
        &mut self,
        track: &Track,
        percent: u16,
        backend: &dyn StretchBackend,
    ) -> Result<Arc<Vec<f32>>> {
        self.bind(track);

        if percent == 100 {
            return Ok(Arc::clone(track.samples()));
        }
        if let Some(hit) = self.entries.peek(&percent) {
            debug!("Tempo cache hit for {}%", percent);
            return Ok(Arc::clone(hit));
        }

        let ratio = ratio_for_percent(percent);
        info!(
            "Stretching {} to {}% (ratio {:.3}) with {}",
            track.name(),
            percent,
            ratio,
            backend.name()
        );
        let stretched = backend.stretch(track.samples(), track.sample_rate(), track.channels(), ratio)?;
        if stretched.is_empty() {
            return Err(Error::StretchFailure(format!(
                "{} returned no audio for {}%",
                backend.name(),
                percent
            )));
        }

        let stretched = Arc::new(stretched);
        if let Some((evicted, _)) = self.entries.push(percent, Arc::clone(&stretched)) {
            if evicted != percent {
                debug!("Tempo cache evicted {}%", evicted);
            }
        }
        Ok(stretched)
    }

    /// True if `percent` is cached for `track`.
    pub fn contains(&self, track: &Track, percent: u16) -> bool {
        percent == 100 || (self.is_bound_to(track) && self.entries.contains(&percent))
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("Clearing {} cached tempos", self.entries.len());
        }
        self.entries.clear();
        self.bound = Weak::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Cached percentages, oldest first.
    pub fn cached_percents(&self) -> Vec<u16> {
        self.entries.iter().rev().map(|(percent, _)| *percent).collect()
    }

    fn is_bound_to(&self, track: &Track) -> bool {
        self.bound
            .upgrade()
            .is_some_and(|samples| Arc::ptr_eq(&samples, track.samples()))
    }

    fn bind(&mut self, track: &Track) {
        if !self.is_bound_to(track) {
            self.clear();
            self.bound = Arc::downgrade(track.samples());
        }
    }
}
