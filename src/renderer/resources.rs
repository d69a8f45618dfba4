//! Registry of GPU-side resources owned by scene entities
//!
//! Every geometry, material and texture the scene creates is recorded here with
//! its owning entity, so releasing an entity releases exactly what it created
//! and the live count can be checked at any time.

use std::collections::HashMap;
use std::fmt;

use crate::propagation::OrbitClass;

/// Kind of resource held by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
    Surface,
}

/// Entity that owns a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceOwner {
    Earth,
    Starfield,
    OrbitPath(OrbitClass),
    Marker(u32),
    Surface,
}

impl fmt::Display for ResourceOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earth => write!(f, "earth"),
            Self::Starfield => write!(f, "starfield"),
            Self::OrbitPath(class) => write!(f, "orbit path {}", class),
            Self::Marker(id) => write!(f, "marker {}", id),
            Self::Surface => write!(f, "surface"),
        }
    }
}

/// Opaque handle to a registered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

#[derive(Debug)]
struct ResourceEntry {
    kind: ResourceKind,
    owner: ResourceOwner,
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    next_id: u64,
    live: HashMap<ResourceHandle, ResourceEntry>,
    released_total: u64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, kind: ResourceKind, owner: ResourceOwner) -> ResourceHandle {
        self.next_id += 1;
        let handle = ResourceHandle(self.next_id);
        self.live.insert(handle, ResourceEntry { kind, owner });
        handle
    }

    /// Returns false if the handle was already released
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        let released = self.live.remove(&handle).is_some();
        if released {
            self.released_total += 1;
        }
        released
    }

    /// Release everything an entity owns; returns the number released
    pub fn release_owner(&mut self, owner: &ResourceOwner) -> usize {
        let before = self.live.len();
        self.live.retain(|_, entry| &entry.owner != owner);
        let released = before - self.live.len();
        self.released_total += released as u64;
        released
    }

    pub fn release_all(&mut self) -> usize {
        let released = self.live.len();
        self.live.clear();
        self.released_total += released as u64;
        released
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|e| e.kind == kind).count()
    }

    pub fn live_count_for(&self, owner: &ResourceOwner) -> usize {
        self.live.values().filter(|e| &e.owner == owner).count()
    }

    /// Number of marker entities currently holding resources
    pub fn live_marker_owners(&self) -> usize {
        let mut ids: Vec<u32> = self
            .live
            .values()
            .filter_map(|e| match e.owner {
                ResourceOwner::Marker(id) => Some(id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release() {
        let mut registry = ResourceRegistry::new();
        let geometry = registry.allocate(ResourceKind::Geometry, ResourceOwner::Earth);
        let material = registry.allocate(ResourceKind::Material, ResourceOwner::Earth);
        assert_ne!(geometry, material);
        assert_eq!(registry.live_count(), 2);

        assert!(registry.release(geometry));
        assert!(!registry.release(geometry));
        assert!(!registry.is_live(geometry));
        assert!(registry.is_live(material));
        assert_eq!(registry.released_total(), 1);
    }

    #[test]
    fn test_release_owner_only_touches_owner() {
        let mut registry = ResourceRegistry::new();
        for id in [1, 2] {
            registry.allocate(ResourceKind::Geometry, ResourceOwner::Marker(id));
            registry.allocate(ResourceKind::Material, ResourceOwner::Marker(id));
        }
        registry.allocate(ResourceKind::Geometry, ResourceOwner::OrbitPath(OrbitClass::Leo));

        assert_eq!(registry.live_marker_owners(), 2);
        assert_eq!(registry.release_owner(&ResourceOwner::Marker(1)), 2);
        assert_eq!(registry.live_count_for(&ResourceOwner::Marker(2)), 2);
        assert_eq!(registry.live_count_of(ResourceKind::Geometry), 2);
        assert_eq!(registry.live_marker_owners(), 1);

        assert_eq!(registry.release_all(), 3);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_total(), 5);
    }
}
