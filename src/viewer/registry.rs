//! In-flight load registry
//!
//! Shared by every viewer of one engine so the same reference is never
//! fetched and decoded by two sessions at once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Slot {
    owner: u64,
    token: u64,
}

#[derive(Default)]
struct Slots {
    active: HashMap<String, Slot>,
    next_token: u64,
}

/// Reference keys currently being fetched or decoded
#[derive(Clone, Default)]
pub struct LoadRegistry {
    inner: Arc<Mutex<Slots>>,
}

impl LoadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `owner`.
    ///
    /// Fails when another owner is loading the same key. The same owner may
    /// take over its own slot, which invalidates the older guard.
    pub fn try_acquire(&self, key: &str, owner: u64) -> Option<LoadGuard> {
        let mut slots = self.inner.lock();
        if let Some(slot) = slots.active.get(key) {
            if slot.owner != owner {
                return None;
            }
        }

        slots.next_token += 1;
        let token = slots.next_token;
        slots.active.insert(key.to_string(), Slot { owner, token });

        Some(LoadGuard {
            registry: self.inner.clone(),
            key: key.to_string(),
            token,
        })
    }

    /// Drop every slot held by `owner`, e.g. when its viewer closes
    pub fn release_owner(&self, owner: u64) {
        self.inner.lock().active.retain(|_, slot| slot.owner != owner);
    }

    /// Drop the slots `owner` holds other than the one behind `keep`.
    ///
    /// A viewer that switches documents abandons its earlier load, which must
    /// not keep that reference blocked for other viewers.
    pub fn release_owner_except(&self, owner: u64, keep: &LoadGuard) {
        self.inner
            .lock()
            .active
            .retain(|_, slot| slot.owner != owner || slot.token == keep.token);
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.inner.lock().active.contains_key(key)
    }
}

/// Releases its slot on drop, unless it was taken over in the meantime
pub struct LoadGuard {
    registry: Arc<Mutex<Slots>>,
    key: String,
    token: u64,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        let mut slots = self.registry.lock();
        if slots.active.get(&self.key).map(|s| s.token) == Some(self.token) {
            slots.active.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_owner_is_rejected_until_release() {
        let registry = LoadRegistry::new();
        let guard = registry.try_acquire("url:a", 1).unwrap();
        assert!(registry.try_acquire("url:a", 2).is_none());
        assert!(registry.try_acquire("url:b", 2).is_some());

        drop(guard);
        assert!(!registry.is_loading("url:a"));
        assert!(registry.try_acquire("url:a", 2).is_some());
    }

    #[test]
    fn test_same_owner_takes_over() {
        let registry = LoadRegistry::new();
        let old = registry.try_acquire("url:a", 1).unwrap();
        let new = registry.try_acquire("url:a", 1).unwrap();

        // Dropping the superseded guard keeps the new claim
        drop(old);
        assert!(registry.is_loading("url:a"));
        drop(new);
        assert!(!registry.is_loading("url:a"));
    }

    #[test]
    fn test_release_owner_except_keeps_current_claim() {
        let registry = LoadRegistry::new();
        let old = registry.try_acquire("url:a", 1).unwrap();
        let current = registry.try_acquire("url:b", 1).unwrap();
        let foreign = registry.try_acquire("url:c", 2).unwrap();

        registry.release_owner_except(1, &current);
        assert!(!registry.is_loading("url:a"));
        assert!(registry.is_loading("url:b"));
        assert!(registry.is_loading("url:c"));

        // Another owner claims the released key; the stale guard leaves it be
        let claimed = registry.try_acquire("url:a", 2).unwrap();
        drop(old);
        assert!(registry.is_loading("url:a"));
        drop((claimed, current, foreign));
    }

    #[test]
    fn test_release_owner() {
        let registry = LoadRegistry::new();
        let guard = registry.try_acquire("url:a", 1).unwrap();
        registry.release_owner(1);
        assert!(registry.try_acquire("url:a", 2).is_some());
        drop(guard);
    }
}
