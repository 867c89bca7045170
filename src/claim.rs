//! Claims: a footprint of columns owned by exactly one faction, with an
//! optional set of individual owners.

use crate::error::{ClaimError, Result};
use crate::geometry::{Footprint, Shape};
use crate::types::{ClaimId, Column, FactionId, Location, Rect, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An area claimed by a faction. Claims span the full height of the world.
///
/// `owners` is `None` when claim owners are disabled by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub faction: FactionId,
    pub footprint: Footprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<BTreeSet<UserId>>,
}

impl Claim {
    pub fn new(id: ClaimId, faction: FactionId, footprint: Footprint, owners_enabled: bool) -> Self {
        Self {
            id,
            faction,
            footprint,
            owners: owners_enabled.then(BTreeSet::new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.footprint.is_empty()
    }

    pub fn contains(&self, column: &Column) -> bool {
        self.footprint.contains(column)
    }

    /// Whether `location` falls inside the claim (height is irrelevant).
    pub fn is_within(&self, location: &Location) -> bool {
        location.column().is_some_and(|c| self.contains(&c))
    }

    pub fn column_count(&self) -> u64 {
        self.footprint.column_count()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.footprint.bounds()
    }

    /// Exact geometric centre of the covered columns. Usually fractional.
    ///
    /// Each column counts as the unit square `[x, x+1) × [z, z+1)`; `y` is 0.
    pub fn center(&self) -> Option<Location> {
        if self.is_empty() {
            return None;
        }
        let (sx, sz, n) = match &self.footprint.shape {
            Shape::Rect(r) => {
                let cx = (f64::from(r.min_x) + f64::from(r.max_x) + 1.0) / 2.0;
                let cz = (f64::from(r.min_z) + f64::from(r.max_z) + 1.0) / 2.0;
                (cx, cz, 1.0)
            }
            Shape::Columns(set) => set.iter().fold((0.0, 0.0, 0.0), |(sx, sz, n), &(x, z)| {
                (sx + f64::from(x) + 0.5, sz + f64::from(z) + 0.5, n + 1.0)
            }),
            Shape::Rects(rects) => rects.iter().fold((0.0, 0.0, 0.0), |(sx, sz, n), r| {
                let w = r.area() as f64;
                let cx = (f64::from(r.min_x) + f64::from(r.max_x) + 1.0) / 2.0;
                let cz = (f64::from(r.min_z) + f64::from(r.max_z) + 1.0) / 2.0;
                (sx + cx * w, sz + cz * w, n + w)
            }),
        };
        Some(Location {
            world: self.footprint.world.clone(),
            x: sx / n,
            y: 0.0,
            z: sz / n,
        })
    }

    // -----------------------------------------------------------------------
    // Owners
    // -----------------------------------------------------------------------

    pub fn owners(&self) -> Option<&BTreeSet<UserId>> {
        self.owners.as_ref()
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        self.owners.as_ref().is_some_and(|o| o.contains(user))
    }

    /// Returns `true` if the user was newly added.
    pub fn add_owner(&mut self, user: UserId) -> Result<bool> {
        let owners = self.owners.as_mut().ok_or(ClaimError::OwnersDisabled)?;
        Ok(owners.insert(user))
    }

    /// Returns `true` if the user was an owner.
    pub fn remove_owner(&mut self, user: &UserId) -> Result<bool> {
        let owners = self.owners.as_mut().ok_or(ClaimError::OwnersDisabled)?;
        Ok(owners.remove(user))
    }
}
