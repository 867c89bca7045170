//! Core claim types shared across all modules.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Name of a world. Worlds are opaque to the registry; two columns are only
/// comparable when they share a world.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Faction identifier. Assigned sequentially, never reused.
///
/// `-1` is reserved for the Wilderness.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub i64);

impl FactionId {
    pub const WILDERNESS: FactionId = FactionId(-1);

    pub fn is_wilderness(self) -> bool {
        self == Self::WILDERNESS
    }
}

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Claim identifier, unique within a registry.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub u64);

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claim-{}", self.0)
    }
}

/// Opaque user key handed to us by the identity collaborator.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The server console; leader of the Wilderness.
    pub fn console() -> Self {
        Self("console".into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Columns and areas
// ---------------------------------------------------------------------------

/// Every vertical block at `(world, x, z)`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Column {
    pub world: WorldId,
    pub x: i32,
    pub z: i32,
}

impl Column {
    pub fn new(world: impl Into<String>, x: i32, z: i32) -> Self {
        Self {
            world: WorldId::new(world),
            x,
            z,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::point(self.x, self.z)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{},{}]", self.world, self.x, self.z)
    }
}

/// Inclusive integer rectangle on the x/z plane.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl Rect {
    /// Build a rectangle from two corners in any order.
    pub fn new(x1: i32, z1: i32, x2: i32, z2: i32) -> Self {
        Self {
            min_x: x1.min(x2),
            min_z: z1.min(z2),
            max_x: x1.max(x2),
            max_z: z1.max(z2),
        }
    }

    pub fn point(x: i32, z: i32) -> Self {
        Self {
            min_x: x,
            min_z: z,
            max_x: x,
            max_z: z,
        }
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_z <= z && z <= self.max_z
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_z <= other.max_z
            && other.min_z <= self.max_z
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            min_x: self.min_x.max(other.min_x),
            min_z: self.min_z.max(other.min_z),
            max_x: self.max_x.min(other.max_x),
            max_z: self.max_z.min(other.max_z),
        })
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_z: self.min_z.min(other.min_z),
            max_x: self.max_x.max(other.max_x),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// Number of columns covered, saturating for full-range rectangles.
    pub fn area(&self) -> u64 {
        let w = (i64::from(self.max_x) - i64::from(self.min_x) + 1) as u64;
        let h = (i64::from(self.max_z) - i64::from(self.min_z) + 1) as u64;
        w.saturating_mul(h)
    }

    /// The rectangle minus the column `(x, z)`, as at most four disjoint
    /// pieces: the rows above and below it, then the runs left and right of
    /// it on its own row. A column outside the rectangle leaves it whole.
    pub fn without(&self, x: i32, z: i32) -> Vec<Rect> {
        if !self.contains(x, z) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(4);
        if z > self.min_z {
            pieces.push(Rect { max_z: z - 1, ..*self });
        }
        if z < self.max_z {
            pieces.push(Rect { min_z: z + 1, ..*self });
        }
        if x > self.min_x {
            pieces.push(Rect::new(self.min_x, z, x - 1, z));
        }
        if x < self.max_x {
            pieces.push(Rect::new(x + 1, z, self.max_x, z));
        }
        pieces
    }

    /// Every `(x, z)` inside the rectangle, row by row.
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_z..=self.max_z).flat_map(move |z| (min_x..=max_x).map(move |x| (x, z)))
    }
}

/// Axis-aligned query rectangle over one world. Bounds are inclusive.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundedArea {
    pub world: WorldId,
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl BoundedArea {
    /// Build an area from two corners in any order, so `min ≤ max` always holds.
    pub fn new(world: impl Into<String>, x1: i32, z1: i32, x2: i32, z2: i32) -> Self {
        let r = Rect::new(x1, z1, x2, z2);
        Self::from_rect(WorldId::new(world), r)
    }

    pub fn from_rect(world: WorldId, r: Rect) -> Self {
        Self {
            world,
            min_x: r.min_x,
            min_z: r.min_z,
            max_x: r.max_x,
            max_z: r.max_z,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_z, self.max_x, self.max_z)
    }

    pub fn contains(&self, column: &Column) -> bool {
        column.world == self.world && self.rect().contains(column.x, column.z)
    }
}

impl std::fmt::Display for BoundedArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{},{}..{},{}]",
            self.world, self.min_x, self.min_z, self.max_x, self.max_z
        )
    }
}

/// A precise position inside a world (homes, warps, claim centres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: WorldId::new(world),
            x,
            y,
            z,
        }
    }

    /// The column holding this location. Block coordinates floor toward -∞
    /// and clamp to the `i32` range; `None` if `x` or `z` is NaN or infinite.
    pub fn column(&self) -> Option<Column> {
        if !self.x.is_finite() || !self.z.is_finite() {
            return None;
        }
        Some(Column {
            world: self.world.clone(),
            x: self.x.floor() as i32,
            z: self.z.floor() as i32,
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:.2}, {:.2}, {:.2})", self.world, self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

/// Which backing structure the faction registry uses.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OptimizationMode {
    /// Flat list, linear scans, minimal per-entry overhead.
    Memory,
    /// Name-keyed map, constant-time lookups.
    Process,
}

impl FromStr for OptimizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "process" => Ok(Self::Process),
            other => Err(format!(
                "unknown optimization mode '{}' (expected memory or process)",
                other
            )),
        }
    }
}

impl TryFrom<String> for OptimizationMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Process => f.write_str("process"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Backing structure for faction lookups. Only read at load time.
    pub optimization: OptimizationMode,
    /// Cost attached to every creation record; charged elsewhere.
    pub creation_cost: f64,
    /// Whether claims track individual owners.
    pub claim_owners: bool,
    /// Side length of a geometry grid bucket, in columns.
    pub cell_size: i32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            optimization: OptimizationMode::Process,
            creation_cost: 0.0,
            claim_owners: true,
            cell_size: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub factions: usize,
    pub claims: usize,
    pub indexed_columns: u64,
    pub optimization: OptimizationMode,
    pub next_id: i64,
}
