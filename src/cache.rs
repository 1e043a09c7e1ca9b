//! Per-location reading cache with idempotent, non-destructive merge.
//!
//! A [`LocationCache`] is an immutable snapshot. [`LocationCache::merge`]
//! returns a new snapshot sharing unchanged sequences with the old one, so a
//! reader holding the previous snapshot is never disturbed by a merge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::Reading;

// ---

pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug, Clone)]
pub struct LocationCache {
    entries: HashMap<String, Arc<[Reading]>>,
    capacity: usize,
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LocationCache {
    /// Empty cache keeping at most `capacity` readings per location.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached readings for `location`, newest-first. Empty if never merged.
    pub fn get(&self, location: &str) -> &[Reading] {
        self.entries.get(location).map_or(&[][..], |seq| &seq[..])
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge a freshly fetched batch for `location`.
    ///
    /// Readings whose `id` is already cached (or repeated earlier in the same
    /// batch) are dropped; the rest are placed ahead of the existing sequence
    /// in arrival order. Arrival order is trusted, nothing is re-sorted. The
    /// sequence is then cut to `capacity`, evicting the oldest tail.
    ///
    /// Only the newest `capacity` readings of a batch are considered, so a
    /// batch larger than the cache still merges idempotently.
    pub fn merge(&self, location: &str, batch: &[Reading]) -> LocationCache {
        // ---
        let existing = self.get(location);
        let mut seen: HashSet<i64> = existing.iter().map(|r| r.id).collect();

        let fresh: Vec<&Reading> = batch
            .iter()
            .take(self.capacity)
            .filter(|r| seen.insert(r.id))
            .collect();

        if fresh.is_empty() && self.entries.contains_key(location) {
            return self.clone();
        }

        let merged: Arc<[Reading]> = fresh
            .into_iter()
            .chain(existing)
            .take(self.capacity)
            .cloned()
            .collect();

        tracing::trace!(
            location,
            batch = batch.len(),
            cached = merged.len(),
            "merged batch"
        );

        let mut entries = self.entries.clone();
        entries.insert(location.to_string(), merged);

        LocationCache {
            entries,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Measurements;
    use chrono::{TimeZone, Utc};

    fn reading(id: i64) -> Reading {
        // ---
        Reading {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(id),
            location: Some("USTP-CDO".to_string()),
            values: Measurements {
                pm25: Some(id as f64),
                ..Default::default()
            },
        }
    }

    fn ids(readings: &[Reading]) -> Vec<i64> {
        readings.iter().map(|r| r.id).collect()
    }

    fn batch(ids: &[i64]) -> Vec<Reading> {
        ids.iter().copied().map(reading).collect()
    }

    #[test]
    fn test_first_merge_creates_entry() {
        // ---
        let cache = LocationCache::default();
        assert!(cache.get("USTP-CDO").is_empty());

        let cache = cache.merge("USTP-CDO", &batch(&[3, 2, 1]));
        assert_eq!(ids(cache.get("USTP-CDO")), vec![3, 2, 1]);
        assert!(cache.get("Elsewhere").is_empty());
    }

    #[test]
    fn test_new_readings_are_prepended() {
        // ---
        let cache = LocationCache::default()
            .merge("A", &batch(&[3, 2, 1]))
            .merge("A", &batch(&[5, 4, 3, 2]));

        assert_eq!(ids(cache.get("A")), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        // ---
        let base = LocationCache::default().merge("A", &batch(&[2, 1]));
        let incoming = batch(&[4, 3, 2]);

        let once = base.merge("A", &incoming);
        let twice = once.merge("A", &incoming);

        assert_eq!(once.get("A"), twice.get("A"));
    }

    #[test]
    fn test_merge_keeps_every_new_id() {
        // ---
        let base = LocationCache::default().merge("A", &batch(&[5, 3, 1]));
        let incoming = batch(&[6, 5, 4, 3, 2]);

        let before = base.get("A").len();
        let new_ids = incoming
            .iter()
            .filter(|r| !base.get("A").iter().any(|c| c.id == r.id))
            .count();

        let merged = base.merge("A", &incoming);
        assert_eq!(merged.get("A").len(), before + new_ids);
        assert_eq!(ids(merged.get("A")), vec![6, 4, 2, 5, 3, 1]);
    }

    #[test]
    fn test_duplicate_ids_inside_a_batch_keep_the_first() {
        // ---
        let mut incoming = batch(&[2, 1]);
        let mut dup = reading(2);
        dup.values.pm25 = Some(999.0);
        incoming.push(dup);

        let cache = LocationCache::default().merge("A", &incoming);

        assert_eq!(ids(cache.get("A")), vec![2, 1]);
        assert_eq!(cache.get("A")[0].value(crate::models::Kind::Pm25), Some(2.0));
    }

    #[test]
    fn test_previous_snapshot_is_untouched() {
        // ---
        let before = LocationCache::default().merge("A", &batch(&[1]));
        let after = before.merge("A", &batch(&[2])).merge("B", &batch(&[9]));

        assert_eq!(ids(before.get("A")), vec![1]);
        assert!(before.get("B").is_empty());
        assert_eq!(ids(after.get("A")), vec![2, 1]);
        assert_eq!(ids(after.get("B")), vec![9]);
    }

    #[test]
    fn test_locations_are_independent() {
        // ---
        let cache = LocationCache::default()
            .merge("A", &batch(&[1, 2]))
            .merge("B", &batch(&[1, 2]));

        assert_eq!(cache.get("A").len(), 2);
        assert_eq!(cache.get("B").len(), 2);

        let mut names: Vec<&str> = cache.locations().collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        // ---
        let cache = LocationCache::with_capacity(4)
            .merge("A", &batch(&[3, 2, 1]))
            .merge("A", &batch(&[6, 5, 4]));

        assert_eq!(ids(cache.get("A")), vec![6, 5, 4, 3]);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_batch_larger_than_capacity_merges_idempotently() {
        // ---
        let incoming = batch(&[6, 5, 4, 3, 2, 1]);

        let once = LocationCache::with_capacity(2).merge("A", &incoming);
        let twice = once.merge("A", &incoming);

        assert_eq!(ids(once.get("A")), vec![6, 5]);
        assert_eq!(ids(twice.get("A")), vec![6, 5]);

        let later = twice.merge("A", &batch(&[8, 7, 6, 5]));
        assert_eq!(ids(later.get("A")), vec![8, 7]);
    }

    #[test]
    fn test_empty_batch_registers_location() {
        // ---
        let cache = LocationCache::default().merge("A", &[]);
        assert!(cache.get("A").is_empty());
        assert_eq!(cache.locations().count(), 1);
    }
}
