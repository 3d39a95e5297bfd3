//! The two-level incremental tree cache.
//!
//! One [`ClassCache`] per ancestor list survives across runs. Inside it, a
//! [`DesugaredClassCache`] holds one-shot slots for the class-level pieces
//! and is replaced whenever the class version changes, while per-method
//! [`MethodCache`]s are versioned individually. Anything not used during a
//! run is dropped by `clean_after_run`.

use rustc_hash::FxHashMap;

use crate::emitter::RunStats;
use crate::errors::EmitterError;
use crate::js::Tree;

/// A slot filled at most once per owning cache lifetime.
#[derive(Debug)]
pub(crate) struct OneTimeCache<T> {
    value: Option<T>,
}

impl<T> Default for OneTimeCache<T> {
    fn default() -> Self {
        OneTimeCache { value: None }
    }
}

impl<T> OneTimeCache<T> {
    pub(crate) fn get_or_else_update(
        &mut self,
        produce: impl FnOnce() -> Result<T, EmitterError>,
    ) -> Result<&T, EmitterError> {
        if self.value.is_none() {
            self.value = Some(produce()?);
        }
        match &self.value {
            Some(value) => Ok(value),
            None => unreachable!("one-time slot filled above"),
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.value = None;
    }
}

/// One-shot slots for the class-level pieces of a single class.
#[derive(Debug, Default)]
pub(crate) struct DesugaredClassCache {
    pub constructor: OneTimeCache<Vec<Tree>>,
    pub exported_members: OneTimeCache<Vec<Tree>>,
    pub instance_tests: OneTimeCache<Vec<Tree>>,
    pub type_data: OneTimeCache<Vec<Tree>>,
    pub set_type_data: OneTimeCache<Vec<Tree>>,
    pub module_accessor: OneTimeCache<Vec<Tree>>,
    pub class_exports: OneTimeCache<Vec<Tree>>,
}

/// Versioned memo for one method tree.
#[derive(Debug, Default)]
pub(crate) struct MethodCache {
    tree: Option<Tree>,
    version: Option<String>,
    cache_used: bool,
}

impl MethodCache {
    pub(crate) fn start_run(&mut self) {
        self.cache_used = false;
    }

    pub(crate) fn invalidate(&mut self) {
        self.tree = None;
        self.version = None;
    }

    /// Returns the stored tree iff the stored version equals the requested
    /// one (`None` never matches); otherwise runs the producer and stores
    /// both.
    pub(crate) fn get_or_else_update(
        &mut self,
        version: Option<&str>,
        stats: &mut RunStats,
        produce: impl FnOnce() -> Result<Tree, EmitterError>,
    ) -> Result<&Tree, EmitterError> {
        self.cache_used = true;
        let can_reuse =
            version.is_some() && self.version.as_deref() == version && self.tree.is_some();
        if can_reuse {
            stats.methods_reused += 1;
        } else {
            stats.methods_invalidated += 1;
            self.version = version.map(str::to_owned);
            self.tree = Some(produce()?);
        }
        match &self.tree {
            Some(tree) => Ok(tree),
            None => unreachable!("method slot filled above"),
        }
    }

    pub(crate) fn clean_after_run(&mut self) -> bool {
        self.cache_used
    }
}

/// Cross-run cache for one class, keyed by its ancestor list.
#[derive(Debug, Default)]
pub(crate) struct ClassCache {
    cache: Option<DesugaredClassCache>,
    version: Option<String>,
    cache_used: bool,
    method_caches: FxHashMap<String, MethodCache>,
    static_caches: FxHashMap<String, MethodCache>,
}

impl ClassCache {
    pub(crate) fn start_run(&mut self) {
        self.cache_used = false;
        for cache in self.method_caches.values_mut() {
            cache.start_run();
        }
        for cache in self.static_caches.values_mut() {
            cache.start_run();
        }
    }

    /// Fetches the class-level cache for this run, replacing it when the
    /// version does not match (an absent version never matches). Statistics
    /// count once per class per run.
    pub(crate) fn get_cache(
        &mut self,
        version: Option<&str>,
        stats: &mut RunStats,
    ) -> &mut DesugaredClassCache {
        if !self.cache_used {
            self.cache_used = true;
            let matches =
                version.is_some() && self.version.as_deref() == version && self.cache.is_some();
            if matches {
                stats.classes_reused += 1;
            } else {
                stats.classes_invalidated += 1;
                self.cache = Some(DesugaredClassCache::default());
                self.version = version.map(str::to_owned);
            }
        }
        match &mut self.cache {
            Some(cache) => cache,
            None => unreachable!("class cache allocated on first use in the run"),
        }
    }

    pub(crate) fn method_cache(&mut self, name: &str) -> &mut MethodCache {
        self.method_caches.entry(name.to_owned()).or_default()
    }

    pub(crate) fn static_method_cache(&mut self, name: &str) -> &mut MethodCache {
        self.static_caches.entry(name.to_owned()).or_default()
    }

    /// Invalidation entry point for the ctor-opt tracker.
    pub(crate) fn invalidate_method(&mut self, name: &str, is_static: bool) {
        let caches = if is_static {
            &mut self.static_caches
        } else {
            &mut self.method_caches
        };
        if let Some(cache) = caches.get_mut(name) {
            cache.invalidate();
        }
    }

    pub(crate) fn invalidate_constructor(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.constructor.invalidate();
        }
    }

    pub(crate) fn invalidate_exported_members(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.exported_members.invalidate();
        }
    }

    pub(crate) fn invalidate_class_exports(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.class_exports.invalidate();
        }
    }

    pub(crate) fn invalidate_module_accessor(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.module_accessor.invalidate();
        }
    }

    /// Retains sub-caches used this run; the class cache itself survives iff
    /// it or any sub-cache was used.
    pub(crate) fn clean_after_run(&mut self) -> bool {
        self.method_caches.retain(|_, cache| cache.clean_after_run());
        self.static_caches.retain(|_, cache| cache.clean_after_run());
        self.cache_used || !self.method_caches.is_empty() || !self.static_caches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree {
        Tree::Int(42)
    }

    #[test]
    fn method_cache_reuses_on_version_match() {
        let mut cache = MethodCache::default();
        let mut stats = RunStats::default();
        cache
            .get_or_else_update(Some("1"), &mut stats, || Ok(tree()))
            .unwrap();
        assert_eq!(stats.methods_invalidated, 1);

        cache.start_run();
        let mut calls = 0;
        cache
            .get_or_else_update(Some("1"), &mut stats, || {
                calls += 1;
                Ok(tree())
            })
            .unwrap();
        assert_eq!(calls, 0, "matching version must not rerun the producer");
        assert_eq!(stats.methods_reused, 1);
    }

    #[test]
    fn method_cache_none_version_never_matches() {
        let mut cache = MethodCache::default();
        let mut stats = RunStats::default();
        cache
            .get_or_else_update(None, &mut stats, || Ok(tree()))
            .unwrap();
        cache
            .get_or_else_update(None, &mut stats, || Ok(tree()))
            .unwrap();
        assert_eq!(stats.methods_invalidated, 2);
        assert_eq!(stats.methods_reused, 0);
    }

    #[test]
    fn method_cache_invalidate_forces_rebuild() {
        let mut cache = MethodCache::default();
        let mut stats = RunStats::default();
        cache
            .get_or_else_update(Some("1"), &mut stats, || Ok(tree()))
            .unwrap();
        cache.invalidate();
        cache.start_run();
        let mut calls = 0;
        cache
            .get_or_else_update(Some("1"), &mut stats, || {
                calls += 1;
                Ok(tree())
            })
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn clean_after_run_reports_use() {
        let mut cache = MethodCache::default();
        let mut stats = RunStats::default();
        cache
            .get_or_else_update(Some("1"), &mut stats, || Ok(tree()))
            .unwrap();
        assert!(cache.clean_after_run());
        cache.start_run();
        assert!(!cache.clean_after_run());
    }

    #[test]
    fn one_time_cache_fills_once() {
        let mut slot: OneTimeCache<Tree> = OneTimeCache::default();
        let mut calls = 0;
        slot.get_or_else_update(|| {
            calls += 1;
            Ok(tree())
        })
        .unwrap();
        slot.get_or_else_update(|| {
            calls += 1;
            Ok(tree())
        })
        .unwrap();
        assert_eq!(calls, 1);
        slot.invalidate();
        slot.get_or_else_update(|| {
            calls += 1;
            Ok(tree())
        })
        .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn one_time_cache_error_leaves_slot_empty() {
        let mut slot: OneTimeCache<Tree> = OneTimeCache::default();
        let err = slot.get_or_else_update(|| Err(EmitterError::DialectMismatch));
        assert!(err.is_err());
        let mut calls = 0;
        slot.get_or_else_update(|| {
            calls += 1;
            Ok(tree())
        })
        .unwrap();
        assert_eq!(calls, 1, "a failed producer must not poison the slot");
    }

    #[test]
    fn class_cache_version_protocol() {
        let mut cache = ClassCache::default();
        let mut stats = RunStats::default();

        cache.get_cache(Some("1"), &mut stats);
        assert_eq!((stats.classes_invalidated, stats.classes_reused), (1, 0));

        cache.start_run();
        cache.get_cache(Some("1"), &mut stats);
        // Second fetch in the same run does not count again.
        cache.get_cache(Some("1"), &mut stats);
        assert_eq!((stats.classes_invalidated, stats.classes_reused), (1, 1));

        cache.start_run();
        cache.get_cache(Some("2"), &mut stats);
        assert_eq!((stats.classes_invalidated, stats.classes_reused), (2, 1));

        cache.start_run();
        cache.get_cache(None, &mut stats);
        assert_eq!((stats.classes_invalidated, stats.classes_reused), (3, 1));
    }

    #[test]
    fn class_cache_version_change_drops_slots() {
        let mut cache = ClassCache::default();
        let mut stats = RunStats::default();
        let mut calls = 0;
        cache
            .get_cache(Some("1"), &mut stats)
            .constructor
            .get_or_else_update(|| {
                calls += 1;
                Ok(vec![tree()])
            })
            .unwrap();

        cache.start_run();
        cache
            .get_cache(Some("2"), &mut stats)
            .constructor
            .get_or_else_update(|| {
                calls += 1;
                Ok(vec![tree()])
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn class_cache_retention() {
        let mut cache = ClassCache::default();
        let mut stats = RunStats::default();
        cache
            .method_cache("m")
            .get_or_else_update(Some("1"), &mut stats, || Ok(tree()))
            .unwrap();
        cache.start_run();
        // Nothing touched this run: dropped.
        assert!(!cache.clean_after_run());

        let mut cache = ClassCache::default();
        cache.get_cache(Some("1"), &mut stats);
        assert!(cache.clean_after_run());
    }
}
