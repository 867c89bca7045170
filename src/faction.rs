//! Faction model: identity, membership, roles, flags, invites, home and warps.
//!
//! A `Faction` is always fully populated when it reaches callers; the
//! registry builds it from persisted records before exposing it.

use crate::types::{FactionId, Location, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionType {
    Normal,
    Safezone,
    Warzone,
    Wilderness,
}

/// Rank of a member inside a faction, highest first.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Leader,
    Admin,
    Moderator,
    Member,
    Trial,
}

impl Role {
    /// Whether `self` ranks below `other`.
    pub fn inferior(self, other: Role) -> bool {
        self > other
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionFlag {
    Peaceful,
    Temporary,
}

/// Lookup key for a name: its lowercase form.
pub fn stub_of(name: &str) -> String {
    name.to_lowercase()
}

// ---------------------------------------------------------------------------
// Warp
// ---------------------------------------------------------------------------

/// A named teleport point owned by a faction, optionally password-locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warp {
    pub name: String,
    pub location: Location,
    /// Lowercase hex MD5 of the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl Warp {
    pub fn new(name: impl Into<String>, location: Location, password: Option<&str>) -> Self {
        Self {
            name: name.into(),
            location,
            password_hash: password.map(hash_password),
        }
    }

    pub fn stub(&self) -> String {
        stub_of(&self.name)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn set_password(&mut self, password: Option<&str>) {
        self.password_hash = password.map(hash_password);
    }

    /// `false` for warps without a password.
    pub fn check_password(&self, candidate: &str) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|h| h == hash_password(candidate))
    }
}

fn hash_password(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

// ---------------------------------------------------------------------------
// Faction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    id: FactionId,
    name: String,
    #[serde(rename = "type")]
    kind: FactionType,
    leader: UserId,
    members: BTreeMap<UserId, Role>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub motd: Option<String>,
    #[serde(default)]
    pub home: Option<Location>,
    #[serde(default)]
    pub flags: BTreeSet<FactionFlag>,
    #[serde(default)]
    invites: BTreeSet<UserId>,
    /// Keyed by warp stub.
    #[serde(default)]
    warps: BTreeMap<String, Warp>,
}

impl Faction {
    /// A new faction whose leader is its only member.
    pub fn new(id: FactionId, name: impl Into<String>, leader: UserId, kind: FactionType) -> Self {
        let mut members = BTreeMap::new();
        members.insert(leader.clone(), Role::Leader);
        Self {
            id,
            name: name.into(),
            kind,
            leader,
            members,
            description: None,
            motd: None,
            home: None,
            flags: BTreeSet::new(),
            invites: BTreeSet::new(),
            warps: BTreeMap::new(),
        }
    }

    /// The fallback owner of every unclaimed column.
    pub fn wilderness() -> Self {
        Self::new(
            FactionId::WILDERNESS,
            "Wilderness",
            UserId::console(),
            FactionType::Wilderness,
        )
    }

    pub fn id(&self) -> FactionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stub(&self) -> String {
        stub_of(&self.name)
    }

    pub fn kind(&self) -> FactionType {
        self.kind
    }

    pub fn leader(&self) -> &UserId {
        &self.leader
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn is_normal(&self) -> bool {
        self.kind == FactionType::Normal
    }

    pub fn is_safezone(&self) -> bool {
        self.kind == FactionType::Safezone
    }

    pub fn is_warzone(&self) -> bool {
        self.kind == FactionType::Warzone
    }

    pub fn is_wilderness(&self) -> bool {
        self.kind == FactionType::Wilderness
    }

    pub fn is_peaceful(&self) -> bool {
        self.flags.contains(&FactionFlag::Peaceful)
    }

    pub fn is_permanent(&self) -> bool {
        !self.flags.contains(&FactionFlag::Temporary)
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    pub fn members(&self) -> impl Iterator<Item = &UserId> {
        self.members.keys()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains_key(user)
    }

    pub fn role_of(&self, user: &UserId) -> Option<Role> {
        self.members.get(user).copied()
    }

    pub fn members_with_role(&self, role: Role) -> BTreeSet<&UserId> {
        self.members
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(u, _)| u)
            .collect()
    }

    pub fn admins(&self) -> BTreeSet<&UserId> {
        self.members_with_role(Role::Admin)
    }

    pub fn moderators(&self) -> BTreeSet<&UserId> {
        self.members_with_role(Role::Moderator)
    }

    pub fn trial_members(&self) -> BTreeSet<&UserId> {
        self.members_with_role(Role::Trial)
    }

    /// Members ranked at or above `role`.
    pub fn members_at_least(&self, role: Role) -> BTreeSet<&UserId> {
        self.members
            .iter()
            .filter(|(_, r)| !r.inferior(role))
            .map(|(u, _)| u)
            .collect()
    }

    /// Returns `false` if the user was already a member.
    pub(crate) fn insert_member(&mut self, user: UserId, role: Role) -> bool {
        if self.members.contains_key(&user) {
            return false;
        }
        self.invites.remove(&user);
        self.members.insert(user, role);
        true
    }

    pub(crate) fn remove_member(&mut self, user: &UserId) -> bool {
        self.members.remove(user).is_some()
    }

    /// Change a member's role. The leader's role is fixed.
    pub fn set_role(&mut self, user: &UserId, role: Role) -> bool {
        if *user == self.leader || role == Role::Leader {
            return false;
        }
        match self.members.get_mut(user) {
            Some(r) => {
                *r = role;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Invites
    // -----------------------------------------------------------------------

    pub fn add_invite(&mut self, user: UserId) -> bool {
        self.invites.insert(user)
    }

    pub fn remove_invite(&mut self, user: &UserId) -> bool {
        self.invites.remove(user)
    }

    pub fn has_invite(&self, user: &UserId) -> bool {
        self.invites.contains(user)
    }

    pub fn invites(&self) -> impl Iterator<Item = &UserId> {
        self.invites.iter()
    }

    // -----------------------------------------------------------------------
    // Warps
    // -----------------------------------------------------------------------

    /// Create or overwrite a warp. Names are matched case-insensitively.
    pub fn set_warp(
        &mut self,
        name: impl Into<String>,
        location: Location,
        password: Option<&str>,
    ) -> &Warp {
        let warp = Warp::new(name, location, password);
        let stub = warp.stub();
        self.warps.insert(stub.clone(), warp);
        &self.warps[&stub]
    }

    pub fn warp(&self, name: &str) -> Option<&Warp> {
        self.warps.get(&stub_of(name))
    }

    pub fn is_warp(&self, name: &str) -> bool {
        self.warp(name).is_some()
    }

    pub fn remove_warp(&mut self, name: &str) -> Option<Warp> {
        self.warps.remove(&stub_of(name))
    }

    pub fn clear_warps(&mut self) {
        self.warps.clear();
    }

    pub fn warps(&self) -> impl Iterator<Item = &Warp> {
        self.warps.values()
    }
}
