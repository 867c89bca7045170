//! `SharedRegistry` – a cloneable handle that lets many readers query the
//! registry concurrently while mutations are serialised behind one writer.

use crate::error::Result;
use crate::faction::Faction;
use crate::persistence::Persistence;
use crate::registry::FactionRegistry;
use crate::types::{BoundedArea, Column, RegistryConfig, RegistryStats};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<FactionRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: FactionRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn load(config: RegistryConfig, persistence: Arc<dyn Persistence>) -> Result<Self> {
        FactionRegistry::load(config, persistence).map(Self::new)
    }

    /// Consistent snapshot for any number of queries.
    pub fn read(&self) -> RwLockReadGuard<'_, FactionRegistry> {
        self.inner.read()
    }

    /// Exclusive access for mutations. Only one writer runs at a time, so
    /// overlapping claims can never race each other into the index.
    pub fn write(&self) -> RwLockWriteGuard<'_, FactionRegistry> {
        self.inner.write()
    }

    /// Owned copy of the faction controlling `column`.
    pub fn owner_of(&self, column: &Column) -> Faction {
        self.read().by_column(column).clone()
    }

    /// Owned copies of the factions with claims in `area`.
    pub fn factions_in(&self, area: &BoundedArea) -> Vec<Faction> {
        self.read().by_area(area).into_iter().cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        self.read().stats()
    }
}
