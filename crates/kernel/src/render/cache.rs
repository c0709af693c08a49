use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use super::raycast::PreparedMesh;
use crate::scene::shape::{AssetKey, Shape};

/// Tessellated shapes keyed by asset identity. Entries are immutable once
/// inserted and shared by every render holding the cache.
#[derive(Debug, Default)]
pub struct GeometryCache {
    meshes: RwLock<HashMap<AssetKey, Arc<PreparedMesh>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Hit/miss counters of a [`GeometryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_prepare(&self, shape: &Shape) -> Arc<PreparedMesh> {
        let key = shape.asset_key();
        if let Some(mesh) = self.meshes.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(mesh);
        }

        // Tessellate outside the lock; a racing request may insert first.
        let prepared = Arc::new(PreparedMesh::from_shape(shape));
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(?key, triangles = prepared.triangles.len(), "prepared shape");
        let mut meshes = self.meshes.write();
        Arc::clone(meshes.entry(key).or_insert(prepared))
    }

    pub fn len(&self) -> usize {
        self.meshes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.meshes.write().clear();
    }
}
