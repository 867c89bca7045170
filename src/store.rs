//! Backing structures for the faction registry.
//!
//! Both strategies implement [`StoreStrategy`] and must answer every lookup
//! identically; they differ only in lookup cost and per-entry overhead. The
//! registry picks one at load time through [`for_mode`] and never branches on
//! the mode again.

use crate::faction::{stub_of, Faction};
use crate::types::{FactionId, OptimizationMode};
use std::collections::HashMap;

pub trait StoreStrategy: Send + Sync {
    fn mode(&self) -> OptimizationMode;

    /// Add a faction. The caller guarantees its id and stub are unused.
    fn insert(&mut self, faction: Faction);

    fn remove(&mut self, id: FactionId) -> Option<Faction>;

    fn by_id(&self, id: FactionId) -> Option<&Faction>;

    fn by_id_mut(&mut self, id: FactionId) -> Option<&mut Faction>;

    /// Lookup by lowercase name.
    fn by_stub(&self, stub: &str) -> Option<&Faction>;

    /// Re-key a faction after its name changed from `old_stub`.
    fn rekey(&mut self, id: FactionId, old_stub: &str);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every faction, in no particular order.
    fn iter(&self) -> Box<dyn Iterator<Item = &Faction> + '_>;
}

/// Build the strategy selected by `mode`, sized for `capacity` factions.
pub fn for_mode(mode: OptimizationMode, capacity: usize) -> Box<dyn StoreStrategy> {
    match mode {
        OptimizationMode::Memory => Box::new(ListStore::with_capacity(capacity)),
        OptimizationMode::Process => Box::new(MapStore::with_capacity(capacity)),
    }
}

// ---------------------------------------------------------------------------
// Map-backed
// ---------------------------------------------------------------------------

/// `stub → Faction` plus an `id → stub` side index.
#[derive(Debug, Default)]
pub struct MapStore {
    by_stub: HashMap<String, Faction>,
    stubs: HashMap<FactionId, String>,
}

impl MapStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_stub: HashMap::with_capacity(capacity),
            stubs: HashMap::with_capacity(capacity),
        }
    }
}

impl StoreStrategy for MapStore {
    fn mode(&self) -> OptimizationMode {
        OptimizationMode::Process
    }

    fn insert(&mut self, faction: Faction) {
        let stub = faction.stub();
        self.stubs.insert(faction.id(), stub.clone());
        self.by_stub.insert(stub, faction);
    }

    fn remove(&mut self, id: FactionId) -> Option<Faction> {
        let stub = self.stubs.remove(&id)?;
        self.by_stub.remove(&stub)
    }

    fn by_id(&self, id: FactionId) -> Option<&Faction> {
        self.stubs.get(&id).and_then(|s| self.by_stub.get(s))
    }

    fn by_id_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        let stub = self.stubs.get(&id)?;
        self.by_stub.get_mut(stub)
    }

    fn by_stub(&self, stub: &str) -> Option<&Faction> {
        self.by_stub.get(stub)
    }

    fn rekey(&mut self, id: FactionId, old_stub: &str) {
        if let Some(faction) = self.by_stub.remove(old_stub) {
            debug_assert_eq!(faction.id(), id, "stub index out of sync");
            self.insert(faction);
        }
    }

    fn len(&self) -> usize {
        self.by_stub.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Faction> + '_> {
        Box::new(self.by_stub.values())
    }
}

// ---------------------------------------------------------------------------
// List-backed
// ---------------------------------------------------------------------------

/// Flat list scanned linearly for every lookup.
#[derive(Debug, Default)]
pub struct ListStore {
    factions: Vec<Faction>,
}

impl ListStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            factions: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, id: FactionId) -> Option<usize> {
        self.factions.iter().position(|f| f.id() == id)
    }
}

impl StoreStrategy for ListStore {
    fn mode(&self) -> OptimizationMode {
        OptimizationMode::Memory
    }

    fn insert(&mut self, faction: Faction) {
        self.factions.push(faction);
    }

    fn remove(&mut self, id: FactionId) -> Option<Faction> {
        let pos = self.position(id)?;
        Some(self.factions.swap_remove(pos))
    }

    fn by_id(&self, id: FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id() == id)
    }

    fn by_id_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        self.factions.iter_mut().find(|f| f.id() == id)
    }

    fn by_stub(&self, stub: &str) -> Option<&Faction> {
        self.factions.iter().find(|f| stub_of(f.name()) == stub)
    }

    fn rekey(&mut self, _id: FactionId, _old_stub: &str) {
        // Stubs are derived on every scan.
    }

    fn len(&self) -> usize {
        self.factions.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Faction> + '_> {
        Box::new(self.factions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faction::FactionType;
    use crate::types::UserId;

    fn both() -> [Box<dyn StoreStrategy>; 2] {
        [
            for_mode(OptimizationMode::Memory, 4),
            for_mode(OptimizationMode::Process, 4),
        ]
    }

    #[test]
    fn strategies_agree_on_lookups() {
        for mut store in both() {
            store.insert(Faction::new(
                FactionId(0),
                "Alpha",
                UserId::new("a"),
                FactionType::Normal,
            ));
            assert_eq!(store.by_stub("alpha").map(|f| f.id()), Some(FactionId(0)));
            assert!(store.by_stub("Alpha").is_none(), "{}", store.mode());
            assert_eq!(store.by_id(FactionId(0)).map(|f| f.name()), Some("Alpha"));
            assert!(store.by_id(FactionId(1)).is_none());
            assert_eq!(store.len(), 1);
        }
    }

    #[test]
    fn rekey_follows_renames() {
        for mut store in both() {
            store.insert(Faction::new(
                FactionId(3),
                "Old",
                UserId::new("a"),
                FactionType::Normal,
            ));
            store
                .by_id_mut(FactionId(3))
                .unwrap()
                .set_name("New".into());
            store.rekey(FactionId(3), "old");
            assert!(store.by_stub("old").is_none());
            assert_eq!(store.by_stub("new").map(|f| f.id()), Some(FactionId(3)));
            assert!(store.remove(FactionId(3)).is_some());
            assert!(store.is_empty());
        }
    }
}
