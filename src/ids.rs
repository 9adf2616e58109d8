//! Process-unique buffer identifiers.
//!
//! Mirrors the original engine's global name→id registry (a process-wide
//! map behind a mutex, per the design notes): a [`BufferId`] obtained by
//! name is stable for the life of the process, while steps that don't need
//! a stable name can just mint a fresh one at construction time.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// An opaque, process-unique, equality-comparable token that tags a buffer
/// in a [`crate::BufferCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, BufferId>,
    next: u64,
}

impl Registry {
    fn fresh(&mut self) -> BufferId {
        let id = BufferId(self.next);
        self.next += 1;
        id
    }
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::default()))
}

impl BufferId {
    /// Mint a new id, unique for the lifetime of the process. Pipeline steps
    /// call this once in their constructor and publish the result as a
    /// public field; downstream steps hold the value, not the name.
    pub fn fresh() -> Self {
        registry().lock().unwrap().fresh()
    }

    /// Look up (or mint, on first use) the id registered under `name`.
    /// Calling this twice with the same name returns the same id, which is
    /// how well-known root-collection buffers (`FEATURE_VALUES`,
    /// `CLASS_LABELS`, `SAMPLE_WEIGHTS`) are addressed without threading an
    /// id value through every call site.
    pub fn named(name: &str) -> Self {
        let mut reg = registry().lock().unwrap();
        if let Some(id) = reg.by_name.get(name) {
            return *id;
        }
        let id = reg.fresh();
        reg.by_name.insert(name.to_string(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_ids_are_stable() {
        let a = BufferId::named("FEATURE_VALUES");
        let b = BufferId::named("FEATURE_VALUES");
        assert_eq!(a, b);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        let a = BufferId::fresh();
        let b = BufferId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn different_names_yield_different_ids() {
        let a = BufferId::named("alpha");
        let b = BufferId::named("beta");
        assert_ne!(a, b);
    }
}
