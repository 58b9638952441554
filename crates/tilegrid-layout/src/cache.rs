//! Derived layout cache for memoizing band detection.
//!
//! This module provides [`DerivedLayoutCache`], which stores the result of
//! [`derive_mobile_layout`](crate::bands::derive_mobile_layout) keyed by a
//! fingerprint of the desktop geometry. The engine re-derives the linked
//! mobile arrangement after every desktop edit and on every view
//! projection; most of those calls see geometry that has not changed.
//!
//! # Key
//!
//! The fingerprint covers exactly what band detection reads: each widget's
//! id, type and desktop rectangle, in input order. Config is not part of
//! the key. A hit rebuilds its output from the *current* widgets, so config
//! edits are always visible even when the geometry is served from cache.
//!
//! # Invalidation
//!
//! Call [`DerivedLayoutCache::invalidate_all()`] when something outside the
//! key changes derivation, i.e. when the widget-type registry is replaced
//! (zero-height widgets take their registry default height).
//!
//! # Eviction
//!
//! At capacity the least-used entry (lowest access count) is evicted.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::bands::stacked_mobile_rects;
use crate::registry::WidgetRegistry;
use crate::widget::{GridRect, Widget};

/// Default number of cached arrangements.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Cache key: a fingerprint of the desktop geometry plus the widget count.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DerivedLayoutKey {
    pub geometry_hash: u64,
    pub len: usize,
}

impl DerivedLayoutKey {
    #[must_use]
    pub fn new(widgets: &[Widget]) -> Self {
        let mut hasher = FxHasher::default();
        for widget in widgets {
            widget.id.hash(&mut hasher);
            widget.widget_type.hash(&mut hasher);
            widget.layout.hash(&mut hasher);
        }
        Self {
            geometry_hash: hasher.finish(),
            len: widgets.len(),
        }
    }
}

#[derive(Clone, Debug)]
struct CachedDerivation {
    /// Input indices in reading order, each with its mobile rectangle.
    placements: Vec<(usize, GridRect)>,
    generation: u64,
    access_count: u32,
}

/// Statistics about derived-layout cache performance.
#[derive(Debug, Clone, Default)]
pub struct DerivedLayoutCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Scoped, capacity-bounded memo of band-detection results.
///
/// Owned by one engine; there is no shared or global cache.
#[derive(Debug)]
pub struct DerivedLayoutCache {
    entries: FxHashMap<DerivedLayoutKey, CachedDerivation>,
    generation: u64,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl DerivedLayoutCache {
    /// Create a cache holding at most `max_entries` arrangements.
    ///
    /// A capacity of zero disables caching: every call derives.
    #[inline]
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(max_entries, Default::default()),
            generation: 0,
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    /// Derived mobile arrangement for `widgets`, computing it on a miss.
    ///
    /// Output matches [`derive_mobile_layout`](crate::bands::derive_mobile_layout):
    /// the same widgets in reading order with `mobile_layout` populated.
    pub fn get_or_derive<R: WidgetRegistry + ?Sized>(
        &mut self,
        widgets: &[Widget],
        registry: &R,
    ) -> Vec<Widget> {
        let key = DerivedLayoutKey::new(widgets);

        if let Some(entry) = self.entries.get_mut(&key)
            && entry.generation == self.generation
        {
            self.hits += 1;
            entry.access_count = entry.access_count.saturating_add(1);
            return materialize(widgets, &entry.placements);
        }

        self.misses += 1;
        let placements = placements(widgets, registry);
        let derived = materialize(widgets, &placements);

        if self.max_entries == 0 {
            return derived;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_least_used();
        }
        self.entries.insert(
            key,
            CachedDerivation {
                placements,
                generation: self.generation,
                access_count: 1,
            },
        );
        derived
    }

    /// Invalidate all entries by bumping the generation. O(1).
    #[inline]
    pub fn invalidate_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> DerivedLayoutCacheStats {
        let total = self.hits + self.misses;
        DerivedLayoutCacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    #[inline]
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Drop every entry immediately.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    fn evict_least_used(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.generation == self.generation, e.access_count))
            .map(|(k, _)| *k)
        {
            self.entries.remove(&key);
        }
    }
}

impl Default for DerivedLayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn placements<R: WidgetRegistry + ?Sized>(widgets: &[Widget], registry: &R) -> Vec<(usize, GridRect)> {
    let rects = stacked_mobile_rects(widgets, registry);
    let mut order: Vec<(usize, GridRect)> = rects.into_iter().enumerate().collect();
    // Stacked rows are strictly increasing in reading order because every
    // height is positive.
    order.sort_by_key(|(idx, rect)| (rect.y, *idx));
    order
}

fn materialize(widgets: &[Widget], placements: &[(usize, GridRect)]) -> Vec<Widget> {
    placements
        .iter()
        .filter_map(|(idx, rect)| {
            widgets.get(*idx).map(|w| {
                let mut derived = w.clone();
                derived.mobile_layout = Some(*rect);
                derived
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::derive_mobile_layout;
    use crate::registry::StaticRegistry;
    use serde_json::json;

    fn w(id: &str, x: u32, y: u32) -> Widget {
        Widget::new(id, "card", GridRect::new(x, y, 4, 2))
    }

    fn sample() -> Vec<Widget> {
        vec![w("c", 8, 0), w("a", 0, 0), w("b", 4, 0), w("d", 0, 2)]
    }

    #[test]
    fn output_matches_direct_derivation() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(8);
        let widgets = sample();
        let cached = cache.get_or_derive(&widgets, &registry);
        assert_eq!(cached, derive_mobile_layout(&widgets, &registry));
        let again = cache.get_or_derive(&widgets, &registry);
        assert_eq!(again, cached);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn geometry_change_is_a_miss() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(8);
        let mut widgets = sample();
        cache.get_or_derive(&widgets, &registry);
        widgets[0].layout.y = 10;
        let derived = cache.get_or_derive(&widgets, &registry);
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(derived.last().map(|w| w.id.as_str()), Some("c"));
    }

    #[test]
    fn config_change_hits_but_reflects_new_config() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(8);
        let mut widgets = sample();
        cache.get_or_derive(&widgets, &registry);
        widgets[1] = widgets[1].clone().with_config("title", json!("x"));
        let derived = cache.get_or_derive(&widgets, &registry);
        assert_eq!(cache.stats().hits, 1);
        let a = derived.iter().find(|w| w.id == "a").unwrap();
        assert_eq!(a.config.get("title"), Some(&json!("x")));
    }

    #[test]
    fn invalidation_forces_recompute() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(8);
        let widgets = sample();
        cache.get_or_derive(&widgets, &registry);
        cache.invalidate_all();
        cache.get_or_derive(&widgets, &registry);
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn least_used_entry_is_evicted() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(2);
        let one = vec![w("a", 0, 0)];
        let two = vec![w("a", 0, 1)];
        let three = vec![w("a", 0, 2)];

        cache.get_or_derive(&one, &registry);
        cache.get_or_derive(&two, &registry);
        cache.get_or_derive(&one, &registry);
        cache.get_or_derive(&three, &registry);
        assert_eq!(cache.len(), 2);

        cache.reset_stats();
        cache.get_or_derive(&one, &registry);
        assert_eq!(cache.stats().hits, 1);
        cache.get_or_derive(&two, &registry);
        assert_eq!(cache.stats().misses, 1, "two should have been evicted");
    }

    #[test]
    fn zero_capacity_never_stores() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::new(0);
        let widgets = sample();
        let derived = cache.get_or_derive(&widgets, &registry);
        assert_eq!(derived.len(), 4);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_removes_all_entries() {
        let registry = StaticRegistry::new();
        let mut cache = DerivedLayoutCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
        cache.get_or_derive(&sample(), &registry);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn generation_wraps_around() {
        let mut cache = DerivedLayoutCache::new(4);
        cache.generation = u64::MAX;
        cache.invalidate_all();
        assert_eq!(cache.generation, 0);
    }

    #[test]
    fn key_depends_on_order_and_geometry() {
        let a = vec![w("a", 0, 0), w("b", 4, 0)];
        let b = vec![w("b", 4, 0), w("a", 0, 0)];
        assert_eq!(DerivedLayoutKey::new(&a), DerivedLayoutKey::new(&a.clone()));
        assert_ne!(DerivedLayoutKey::new(&a), DerivedLayoutKey::new(&b));
    }
}
