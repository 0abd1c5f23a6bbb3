use std::collections::BTreeSet;

pub type ResourceId = u32;

/// Tracks which client ids of one namespace are in use. Id 0 is never handed out.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    used: BTreeSet<ResourceId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the lowest unused id.
    pub fn allocate_id(&mut self) -> ResourceId {
        self.allocate_id_at_or_above(1)
    }

    /// Allocates the lowest unused id that is `>= desired`. Returns 0 when the namespace is
    /// exhausted above `desired`.
    pub fn allocate_id_at_or_above(&mut self, desired: ResourceId) -> ResourceId {
        let mut candidate = desired.max(1);
        for &id in self.used.range(candidate..) {
            if id != candidate {
                break;
            }
            candidate = match candidate.checked_add(1) {
                Some(next) => next,
                None => return 0,
            };
        }
        self.used.insert(candidate);
        candidate
    }

    /// Marks `id` as used. Returns false if it already was, or if `id` is 0.
    pub fn mark_as_used(&mut self, id: ResourceId) -> bool {
        id != 0 && self.used.insert(id)
    }

    pub fn free_id(&mut self, id: ResourceId) {
        self.used.remove(&id);
    }

    pub fn in_use(&self, id: ResourceId) -> bool {
        self.used.contains(&id)
    }
}
