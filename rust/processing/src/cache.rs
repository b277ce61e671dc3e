// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared mesh cache keyed by job source.
//!
//! Entries are bucketed by source hash and matched by source equality, so
//! a hash collision never serves one job another job's mesh. Identical
//! meshes produced by different sources (a box and its packed round trip,
//! say) are stored once.

use crate::job::MeshSource;
use prim_lite_geometry::Mesh;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct Entries {
    by_key: FxHashMap<u64, Vec<(MeshSource, Arc<Mesh>)>>,
    by_content: FxHashMap<u64, Vec<Arc<Mesh>>>,
    len: usize,
    unique: usize,
}

impl Entries {
    fn lookup(&self, key: u64, source: &MeshSource) -> Option<&Arc<Mesh>> {
        self.by_key
            .get(&key)?
            .iter()
            .find(|(stored, _)| stored == source)
            .map(|(_, mesh)| mesh)
    }

    fn shared(&self, content: u64, mesh: &Mesh) -> Option<Arc<Mesh>> {
        self.by_content
            .get(&content)?
            .iter()
            .find(|&existing| **existing == *mesh)
            .map(Arc::clone)
    }
}

/// Thread-safe mesh cache with a fixed entry budget
///
/// Once full, new meshes are returned to the caller but not stored.
pub struct MeshCache {
    capacity: usize,
    entries: RwLock<Entries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl MeshCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(Entries::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    // A panic while holding the lock leaves the maps themselves intact
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up the mesh built from `source`
    pub fn get(&self, source: &MeshSource) -> Option<Arc<Mesh>> {
        self.get_keyed(source.cache_key(), source)
    }

    pub(crate) fn get_keyed(&self, key: u64, source: &MeshSource) -> Option<Arc<Mesh>> {
        let found = self.read().lookup(key, source).map(Arc::clone);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store the mesh built from `source`, returning the shared copy
    ///
    /// When an identical mesh is already cached for another source, that
    /// allocation is reused.
    pub fn insert(&self, source: &MeshSource, mesh: Mesh) -> Arc<Mesh> {
        let content = mesh.content_hash();
        self.insert_keyed(source.cache_key(), content, source, mesh)
    }

    pub(crate) fn insert_keyed(
        &self,
        key: u64,
        content: u64,
        source: &MeshSource,
        mesh: Mesh,
    ) -> Arc<Mesh> {
        let mut entries = self.write();

        if let Some(existing) = entries.lookup(key, source) {
            return Arc::clone(existing);
        }

        let reused = entries.shared(content, &mesh);
        let is_new = reused.is_none();
        let shared = reused.unwrap_or_else(|| Arc::new(mesh));

        if entries.len >= self.capacity {
            debug!(capacity = self.capacity, "mesh cache full, not storing");
            return shared;
        }

        if is_new {
            entries
                .by_content
                .entry(content)
                .or_default()
                .push(Arc::clone(&shared));
            entries.unique += 1;
        }
        entries
            .by_key
            .entry(key)
            .or_default()
            .push((source.clone(), Arc::clone(&shared)));
        entries.len += 1;
        shared
    }

    /// Number of cached sources
    pub fn len(&self) -> usize {
        self.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct mesh allocations held
    pub fn unique_meshes(&self) -> usize {
        self.read().unique
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        *self.write() = Entries::default();
    }
}

impl std::fmt::Debug for MeshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prim_lite_geometry::{generate_mesh, ShapeFamily, ShapeParameters};

    fn mesh(family: ShapeFamily) -> Mesh {
        generate_mesh(&ShapeParameters::new(family)).unwrap()
    }

    fn source(family: ShapeFamily) -> MeshSource {
        MeshSource::Primitive {
            shape: ShapeParameters::new(family),
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = MeshCache::new(8);
        let boxed = source(ShapeFamily::Box);
        assert!(cache.get(&boxed).is_none());
        cache.insert(&boxed, mesh(ShapeFamily::Box));
        assert!(cache.get(&boxed).is_some());
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn test_identical_meshes_share_allocation() {
        let cache = MeshCache::new(8);
        let a = cache.insert(&source(ShapeFamily::Box), mesh(ShapeFamily::Box));
        let b = cache.insert(&source(ShapeFamily::Tube), mesh(ShapeFamily::Box));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.unique_meshes(), 1);
    }

    #[test]
    fn test_colliding_keys_keep_sources_apart() {
        let cache = MeshCache::new(8);
        let cube = source(ShapeFamily::Box);
        let garbage = MeshSource::Asset {
            bytes: vec![0xde, 0xad, 0xbe, 0xef],
            segment: None,
        };
        let key = 0x18b9_b3b0_b091_6898;

        cache.insert_keyed(key, 1, &cube, mesh(ShapeFamily::Box));
        assert!(cache.get_keyed(key, &garbage).is_none());
        assert!(cache.get_keyed(key, &cube).is_some());

        let prism = source(ShapeFamily::Prism);
        let stored = cache.insert_keyed(key, 2, &prism, mesh(ShapeFamily::Prism));
        assert_eq!(stored.triangle_count(), mesh(ShapeFamily::Prism).triangle_count());
        let cube_mesh = cache.get_keyed(key, &cube).unwrap();
        assert_eq!(*cube_mesh, mesh(ShapeFamily::Box));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_colliding_content_hashes_stay_distinct() {
        let cache = MeshCache::new(8);
        let a = cache.insert_keyed(1, 7, &source(ShapeFamily::Box), mesh(ShapeFamily::Box));
        let b = cache.insert_keyed(2, 7, &source(ShapeFamily::Prism), mesh(ShapeFamily::Prism));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(*a, *b);
        assert_eq!(cache.unique_meshes(), 2);
    }

    #[test]
    fn test_capacity_is_respected() {
        let cache = MeshCache::new(1);
        cache.insert(&source(ShapeFamily::Box), mesh(ShapeFamily::Box));
        let prism = cache.insert(&source(ShapeFamily::Prism), mesh(ShapeFamily::Prism));
        assert_eq!(prism.triangle_count(), mesh(ShapeFamily::Prism).triangle_count());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&source(ShapeFamily::Prism)).is_none());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.unique_meshes(), 0);
    }
}
