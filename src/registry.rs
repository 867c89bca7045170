//! `FactionRegistry` – the in-memory catalogue of factions and claims, and
//! ownership resolution for every column.
//!
//! Resolution is two-step: column → claim id (through the geometry index) →
//! faction (through the store). Columns no claim covers resolve to the
//! Wilderness, which always exists and never holds an explicit footprint.
//!
//! Every mutation is applied in memory first, then handed to the persistence
//! collaborator. A persistence failure is returned to the caller, but the
//! in-memory change stays applied; nothing is retried.

use crate::claim::Claim;
use crate::error::{ClaimError, Result};
use crate::faction::{stub_of, Faction, FactionType, Role};
use crate::geometry::{Footprint, GeometryIndex};
use crate::persistence::Persistence;
use crate::store::{self, StoreStrategy};
use crate::types::{
    BoundedArea, ClaimId, Column, FactionId, Location, OptimizationMode, RegistryConfig,
    RegistryStats, UserId,
};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Results & views
// ---------------------------------------------------------------------------

/// Outcome of [`FactionRegistry::create_faction`].
///
/// `cost` is charged by the economy collaborator, not here.
#[derive(Debug, Clone)]
pub struct CreationResult {
    pub faction: Faction,
    pub creator: UserId,
    pub cost: f64,
}

/// Read-only view over every faction, ordered by id.
#[derive(Debug, Clone)]
pub struct FactionsView<'a> {
    factions: Vec<&'a Faction>,
}

impl<'a> FactionsView<'a> {
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Faction> + '_ {
        self.factions.iter().copied()
    }

    pub fn contains(&self, id: FactionId) -> bool {
        self.factions.iter().any(|f| f.id() == id)
    }
}

impl<'a> IntoIterator for FactionsView<'a> {
    type Item = &'a Faction;
    type IntoIter = std::vec::IntoIter<&'a Faction>;

    fn into_iter(self) -> Self::IntoIter {
        self.factions.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct FactionRegistry {
    config: RegistryConfig,
    store: Box<dyn StoreStrategy>,
    wilderness: Faction,
    geometry: GeometryIndex,
    claims: HashMap<ClaimId, Claim>,
    next_id: i64,
    next_claim_id: u64,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for FactionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactionRegistry")
            .field("optimization", &self.store.mode())
            .field("factions", &(self.store.len() + 1))
            .field("claims", &self.claims.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl FactionRegistry {
    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Populate a registry from `persistence`.
    ///
    /// The store strategy is fixed here from `config.optimization`. The
    /// Wilderness is synthesised and persisted if absent. Persisted records
    /// that would break an invariant (duplicate ids or names, overlapping or
    /// orphaned claims) are skipped with a warning.
    pub fn load(config: RegistryConfig, persistence: Arc<dyn Persistence>) -> Result<Self> {
        if config.cell_size < 1 {
            return Err(ClaimError::Validation(format!(
                "cell_size must be at least 1, got {}",
                config.cell_size
            )));
        }

        let mut records = persistence.load_all_factions()?;
        records.sort_by_key(Faction::id);

        let mut store = store::for_mode(config.optimization, records.len() + 5);
        let mut wilderness: Option<Faction> = None;
        let mut max_id: Option<i64> = None;
        let mut members: HashSet<UserId> = HashSet::new();
        let mut skipped = 0usize;

        for mut faction in records {
            let id = faction.id();
            if id.0 == i64::MAX {
                warn!("Skipping faction {}: id leaves no room for another", id);
                skipped += 1;
                continue;
            }
            max_id = max_id.max(Some(id.0));

            if id.is_wilderness() {
                if faction.is_wilderness() {
                    wilderness = Some(faction);
                } else {
                    warn!("Faction {} uses the Wilderness id; replacing it", id);
                }
                continue;
            }
            if faction.is_wilderness() {
                warn!(
                    "Skipping faction {}: only {} may be the Wilderness",
                    id,
                    FactionId::WILDERNESS
                );
                skipped += 1;
                continue;
            }
            let stub = faction.stub();
            if store.by_id(id).is_some() || store.by_stub(&stub).is_some() || stub == "wilderness" {
                warn!(
                    "Skipping faction {} '{}': id or name already loaded",
                    id,
                    faction.name()
                );
                skipped += 1;
                continue;
            }
            if members.contains(faction.leader()) {
                warn!(
                    "Skipping faction {} '{}': leader {} already belongs to another faction",
                    id,
                    faction.name(),
                    faction.leader()
                );
                skipped += 1;
                continue;
            }
            // Users belong to at most one faction; the lowest id keeps them.
            let taken: Vec<UserId> = faction
                .members()
                .filter(|u| members.contains(*u))
                .cloned()
                .collect();
            for user in taken {
                warn!(
                    "Dropping {} from faction {}: already a member elsewhere",
                    user, id
                );
                faction.remove_member(&user);
            }
            members.extend(faction.members().cloned());
            store.insert(faction);
        }

        let wilderness = match wilderness {
            Some(w) => w,
            None => {
                let w = Faction::wilderness();
                info!("No Wilderness found; creating it");
                persistence.save_faction(&w)?;
                w
            }
        };

        let persisted_next = persistence.load_next_id()?;
        let next_id = max_id
            .map_or(0, |m| m + 1)
            .max(persisted_next.unwrap_or(0))
            .max(0);

        let mut registry = Self {
            geometry: GeometryIndex::with_cell_size(config.cell_size),
            config,
            store,
            wilderness,
            claims: HashMap::new(),
            next_id,
            next_claim_id: 0,
            persistence,
        };
        skipped += registry.load_claims()?;

        info!(
            "Loaded {} factions and {} claims ({} mode, {} records skipped, next id {})",
            registry.store.len() + 1,
            registry.claims.len(),
            registry.store.mode(),
            skipped,
            registry.next_id
        );
        Ok(registry)
    }

    fn load_claims(&mut self) -> Result<usize> {
        let mut claims = self.persistence.load_all_claims()?;
        claims.sort_by_key(|c| c.id);

        let mut skipped = 0;
        for mut claim in claims {
            let Some(after) = claim.id.0.checked_add(1) else {
                warn!("Skipping {}: id leaves no room for another", claim.id);
                skipped += 1;
                continue;
            };
            self.next_claim_id = self.next_claim_id.max(after);

            if claim.faction.is_wilderness() || self.store.by_id(claim.faction).is_none() {
                warn!(
                    "Skipping {}: owner {} is not a claiming faction",
                    claim.id, claim.faction
                );
                skipped += 1;
                continue;
            }
            claim.owners = match (self.config.claim_owners, claim.owners.take()) {
                (true, owners) => Some(owners.unwrap_or_default()),
                (false, _) => None,
            };
            if let Err(e) = self.geometry.insert(claim.id, &claim.footprint) {
                warn!("Skipping {}: {}", claim.id, e);
                skipped += 1;
                continue;
            }
            self.claims.insert(claim.id, claim);
        }
        Ok(skipped)
    }

    // -----------------------------------------------------------------------
    // Faction lookups
    // -----------------------------------------------------------------------

    pub fn by_id(&self, id: FactionId) -> Option<&Faction> {
        if id.is_wilderness() {
            return Some(&self.wilderness);
        }
        self.store.by_id(id)
    }

    /// Case-insensitive name lookup.
    pub fn by_name(&self, name: &str) -> Option<&Faction> {
        let stub = stub_of(name);
        if stub == self.wilderness.stub() {
            return Some(&self.wilderness);
        }
        self.store.by_stub(&stub)
    }

    /// Exact-case name lookup.
    pub fn by_cased_name(&self, name: &str) -> Option<&Faction> {
        self.by_name(name).filter(|f| f.name() == name)
    }

    /// Owner of `column`; the Wilderness when unclaimed.
    pub fn by_column(&self, column: &Column) -> &Faction {
        self.claim_at(column)
            .and_then(|c| self.by_id(c.faction))
            .unwrap_or(&self.wilderness)
    }

    /// Owner of the column holding `location`. Non-finite coordinates name
    /// no column and resolve to the Wilderness.
    pub fn by_location(&self, location: &Location) -> &Faction {
        match location.column() {
            Some(column) => self.by_column(&column),
            None => &self.wilderness,
        }
    }

    /// Distinct factions with claims overlapping `area`, ordered by id. Never
    /// contains the Wilderness.
    pub fn by_area(&self, area: &BoundedArea) -> Vec<&Faction> {
        let ids: BTreeSet<FactionId> = self
            .geometry
            .range_query(area)
            .filter_map(|id| self.claims.get(&id))
            .map(|c| c.faction)
            .collect();
        ids.into_iter().filter_map(|id| self.store.by_id(id)).collect()
    }

    /// Faction `user` belongs to; the Wilderness if none.
    pub fn by_member(&self, user: &UserId) -> &Faction {
        self.member_faction(user).unwrap_or(&self.wilderness)
    }

    pub fn wilderness(&self) -> &Faction {
        &self.wilderness
    }

    /// Every faction, Wilderness included, ordered by id.
    pub fn all(&self) -> FactionsView<'_> {
        let mut factions: Vec<&Faction> = self.store.iter().collect();
        factions.push(&self.wilderness);
        factions.sort_by_key(|f| f.id());
        FactionsView { factions }
    }

    /// Lowest-id faction listing `user`, so both store strategies agree.
    fn member_faction(&self, user: &UserId) -> Option<&Faction> {
        self.store
            .iter()
            .filter(|f| f.is_member(user))
            .min_by_key(|f| f.id())
    }

    fn faction_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        if id.is_wilderness() {
            return Some(&mut self.wilderness);
        }
        self.store.by_id_mut(id)
    }

    /// A faction that may hold claims and members.
    fn claiming_faction(&self, id: FactionId) -> Result<&Faction> {
        if id.is_wilderness() {
            return Err(ClaimError::Validation(
                "the Wilderness cannot hold claims or members".into(),
            ));
        }
        self.store.by_id(id).ok_or(ClaimError::UnknownFaction(id))
    }

    // -----------------------------------------------------------------------
    // Claim lookups
    // -----------------------------------------------------------------------

    pub fn get_claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    pub fn claim_at(&self, column: &Column) -> Option<&Claim> {
        self.geometry
            .point_query(column)
            .and_then(|id| self.claims.get(&id))
    }

    /// Claims overlapping `area`, ordered by id.
    pub fn claims_in(&self, area: &BoundedArea) -> Vec<&Claim> {
        self.geometry
            .range_query(area)
            .filter_map(|id| self.claims.get(&id))
            .collect()
    }

    /// Claims held by `faction`, ordered by id.
    pub fn claims_of(&self, faction: FactionId) -> Vec<&Claim> {
        let mut claims: Vec<&Claim> = self
            .claims
            .values()
            .filter(|c| c.faction == faction)
            .collect();
        claims.sort_by_key(|c| c.id);
        claims
    }

    // -----------------------------------------------------------------------
    // Faction lifecycle
    // -----------------------------------------------------------------------

    /// Create and register a faction led by `creator`.
    ///
    /// A rejected creation consumes no id.
    pub fn create_faction(
        &mut self,
        creator: UserId,
        name: &str,
        kind: FactionType,
    ) -> Result<CreationResult> {
        validate_name(name)?;
        if kind == FactionType::Wilderness {
            return Err(ClaimError::Validation(
                "there is exactly one Wilderness".into(),
            ));
        }
        if self.by_name(name).is_some() {
            return Err(ClaimError::DuplicateName(name.to_string()));
        }
        if let Some(existing) = self.member_faction(&creator) {
            return Err(ClaimError::Validation(format!(
                "{} already belongs to '{}'",
                creator,
                existing.name()
            )));
        }

        let id = FactionId(self.next_id);
        self.next_id = bump(self.next_id)?;
        let faction = Faction::new(id, name, creator.clone(), kind);
        self.store.insert(faction.clone());
        debug!("Created faction {} '{}' led by {}", id, name, creator);

        self.persistence.save_faction(&faction)?;
        self.persistence.save_next_id(self.next_id)?;

        Ok(CreationResult {
            faction,
            creator,
            cost: self.config.creation_cost,
        })
    }

    /// Reserve an id without creating a faction.
    pub fn increment_next_id(&mut self) -> Result<()> {
        self.next_id = bump(self.next_id)?;
        self.persistence.save_next_id(self.next_id)?;
        Ok(())
    }

    /// Hand `faction` to the persistence collaborator unchanged.
    pub fn save(&self, faction: &Faction) -> Result<()> {
        self.persistence.save_faction(faction)?;
        Ok(())
    }

    pub fn rename_faction(&mut self, id: FactionId, name: &str) -> Result<()> {
        validate_name(name)?;
        if id.is_wilderness() {
            return Err(ClaimError::Validation("the Wilderness cannot be renamed".into()));
        }
        let old_stub = self.claiming_faction(id)?.stub();
        if let Some(other) = self.by_name(name) {
            if other.id() != id {
                return Err(ClaimError::DuplicateName(name.to_string()));
            }
        }

        let faction = self
            .store
            .by_id_mut(id)
            .ok_or(ClaimError::UnknownFaction(id))?;
        faction.set_name(name.to_string());
        self.store.rekey(id, &old_stub);
        debug!("Renamed faction {} to '{}'", id, name);
        self.persist_faction(id)
    }

    /// Edit descriptive state (description, motd, home, flags, invites,
    /// warps, roles) and persist the result.
    pub fn update_faction<F>(&mut self, id: FactionId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Faction),
    {
        let faction = self.faction_mut(id).ok_or(ClaimError::UnknownFaction(id))?;
        edit(faction);
        self.persist_faction(id)
    }

    /// Add `user` to a faction. Users belong to at most one faction.
    pub fn add_member(&mut self, id: FactionId, user: UserId, role: Role) -> Result<bool> {
        self.claiming_faction(id)?;
        if role == Role::Leader {
            return Err(ClaimError::Validation("a faction has one leader".into()));
        }
        if let Some(existing) = self.member_faction(&user) {
            if existing.id() == id {
                return Ok(false);
            }
            return Err(ClaimError::Validation(format!(
                "{} already belongs to '{}'",
                user,
                existing.name()
            )));
        }
        let faction = self.faction_mut(id).ok_or(ClaimError::UnknownFaction(id))?;
        faction.insert_member(user.clone(), role);
        debug!("{} joined faction {}", user, id);
        self.persist_faction(id)?;
        Ok(true)
    }

    /// Remove `user` from a faction and from ownership of its claims.
    pub fn remove_member(&mut self, id: FactionId, user: &UserId) -> Result<bool> {
        let faction = self.claiming_faction(id)?;
        if faction.leader() == user {
            return Err(ClaimError::Validation("the leader cannot leave".into()));
        }
        let faction = self.faction_mut(id).ok_or(ClaimError::UnknownFaction(id))?;
        if !faction.remove_member(user) {
            return Ok(false);
        }
        debug!("{} left faction {}", user, id);

        let mut touched = Vec::new();
        for claim in self.claims.values_mut().filter(|c| c.faction == id) {
            if claim.is_owner(user) {
                claim.remove_owner(user)?;
                touched.push(claim.id);
            }
        }
        self.persist_faction(id)?;
        for claim in touched {
            self.persist_claim(claim)?;
        }
        Ok(true)
    }

    /// Remove a faction and every claim it holds. Its columns revert to the
    /// Wilderness.
    pub fn disband_faction(&mut self, id: FactionId) -> Result<Faction> {
        self.claiming_faction(id)?;

        let claim_ids: Vec<ClaimId> = self.claims_of(id).iter().map(|c| c.id).collect();
        for claim in &claim_ids {
            self.geometry.remove(*claim);
            self.claims.remove(claim);
        }
        let faction = self.store.remove(id).ok_or(ClaimError::UnknownFaction(id))?;
        debug!(
            "Disbanded faction {} '{}' ({} claims released)",
            id,
            faction.name(),
            claim_ids.len()
        );

        for claim in claim_ids {
            self.persistence.delete_claim(claim)?;
        }
        self.persistence.delete_faction(id)?;
        Ok(faction)
    }

    // -----------------------------------------------------------------------
    // Claim lifecycle
    // -----------------------------------------------------------------------

    /// Claim unclaimed columns for `faction`.
    ///
    /// Fails with [`ClaimError::Overlap`] if any column is taken; the registry
    /// is unchanged in that case.
    pub fn claim(&mut self, faction: FactionId, footprint: Footprint) -> Result<ClaimId> {
        self.claiming_faction(faction)?;

        let id = ClaimId(self.next_claim_id);
        let after = self
            .next_claim_id
            .checked_add(1)
            .ok_or_else(|| ClaimError::Validation("claim ids are exhausted".into()))?;
        self.geometry.insert(id, &footprint)?;
        self.next_claim_id = after;

        let claim = Claim::new(id, faction, footprint, self.config.claim_owners);
        debug!(
            "Faction {} claimed {} ({} columns)",
            faction,
            id,
            claim.column_count()
        );
        self.claims.insert(id, claim);
        self.persist_claim(id)?;
        Ok(id)
    }

    /// Grow a claim by more columns of its world.
    pub fn extend_claim<I>(&mut self, id: ClaimId, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = Column>,
    {
        let claim = self.claims.get(&id).ok_or(ClaimError::UnknownClaim(id))?;
        let mut footprint = claim.footprint.clone();
        footprint.add_columns(columns)?;
        self.geometry.replace(id, &footprint)?;

        if let Some(claim) = self.claims.get_mut(&id) {
            claim.footprint = footprint;
        }
        debug!("Extended {}", id);
        self.persist_claim(id)
    }

    /// Release one column. Returns the claim that covered it, if any. A claim
    /// whose last column is released is destroyed.
    pub fn unclaim(&mut self, column: &Column) -> Result<Option<ClaimId>> {
        let Some(id) = self.geometry.point_query(column) else {
            return Ok(None);
        };
        let claim = self.claims.get(&id).ok_or(ClaimError::UnknownClaim(id))?;
        let mut footprint = claim.footprint.clone();
        footprint.remove_columns([column]);

        if footprint.is_empty() {
            self.remove_claim(id)?;
            return Ok(Some(id));
        }

        self.geometry.replace(id, &footprint)?;
        if let Some(claim) = self.claims.get_mut(&id) {
            claim.footprint = footprint;
        }
        debug!("Released {} from {}", column, id);
        self.persist_claim(id)?;
        Ok(Some(id))
    }

    /// Destroy a claim; its columns revert to the Wilderness.
    pub fn remove_claim(&mut self, id: ClaimId) -> Result<Claim> {
        let claim = self.claims.remove(&id).ok_or(ClaimError::UnknownClaim(id))?;
        self.geometry.remove(id);
        debug!("Removed {} of faction {}", id, claim.faction);
        self.persistence.delete_claim(id)?;
        Ok(claim)
    }

    /// Hand a claim to another faction without touching its geometry.
    /// Individual owners are cleared.
    pub fn reassign_claim(&mut self, id: ClaimId, faction: FactionId) -> Result<()> {
        self.claiming_faction(faction)?;
        let owners_enabled = self.config.claim_owners;
        let claim = self.claims.get_mut(&id).ok_or(ClaimError::UnknownClaim(id))?;
        claim.faction = faction;
        claim.owners = owners_enabled.then(BTreeSet::new);
        debug!("Reassigned {} to faction {}", id, faction);
        self.persist_claim(id)
    }

    pub fn add_claim_owner(&mut self, id: ClaimId, user: UserId) -> Result<bool> {
        let claim = self.claims.get_mut(&id).ok_or(ClaimError::UnknownClaim(id))?;
        let added = claim.add_owner(user)?;
        if added {
            self.persist_claim(id)?;
        }
        Ok(added)
    }

    pub fn remove_claim_owner(&mut self, id: ClaimId, user: &UserId) -> Result<bool> {
        let claim = self.claims.get_mut(&id).ok_or(ClaimError::UnknownClaim(id))?;
        let removed = claim.remove_owner(user)?;
        if removed {
            self.persist_claim(id)?;
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn optimization(&self) -> OptimizationMode {
        self.store.mode()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            factions: self.store.len() + 1,
            claims: self.claims.len(),
            indexed_columns: self.geometry.indexed_columns(),
            optimization: self.store.mode(),
            next_id: self.next_id,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence helpers
    // -----------------------------------------------------------------------

    fn persist_faction(&self, id: FactionId) -> Result<()> {
        if let Some(faction) = self.by_id(id) {
            self.persistence.save_faction(faction)?;
        }
        Ok(())
    }

    fn persist_claim(&self, id: ClaimId) -> Result<()> {
        if let Some(claim) = self.claims.get(&id) {
            self.persistence.save_claim(claim)?;
        }
        Ok(())
    }
}

fn bump(next_id: i64) -> Result<i64> {
    next_id
        .checked_add(1)
        .ok_or_else(|| ClaimError::Validation("faction ids are exhausted".into()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ClaimError::Validation("faction name cannot be empty".into()));
    }
    if name.trim() != name {
        return Err(ClaimError::Validation(
            "faction name cannot start or end with whitespace".into(),
        ));
    }
    Ok(())
}
