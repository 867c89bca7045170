//! Faction Claims
//!
//! A spatial claim registry: partitions each world's (x, z) column plane
//! into faction-owned claims and answers "who owns this column".
//!
//! ## Architecture
//!
//! ```text
//! SharedRegistry  (shared.rs)        ← concurrent readers, one writer
//!   └── FactionRegistry  (registry.rs) ← lifecycle, resolution
//!         ├── StoreStrategy  (store.rs)     ← Memory (list) / Process (map)
//!         ├── GeometryIndex  (geometry.rs)  ← column → claim, range queries
//!         │     └── SpatialBackend: GridBackend | FlatBackend
//!         └── Persistence  (persistence.rs) ← memory / JSON files
//!               └── WriteBehind  (persistence/write_behind.rs)
//! ```
//!
//! Columns no claim covers belong to the Wilderness (`FactionId(-1)`), which
//! always exists and holds no footprint.

pub mod claim;
pub mod config;
pub mod error;
pub mod faction;
pub mod geometry;
pub mod persistence;
pub mod registry;
pub mod store;
pub mod types;

// Shared handle requires the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod shared;

// Convenience re-exports
pub use claim::Claim;
pub use error::{ClaimError, PersistenceError, Result};
pub use faction::{Faction, FactionFlag, FactionType, Role, Warp};
pub use geometry::{FlatBackend, Footprint, GeometryIndex, GridBackend, Shape, SpatialBackend};
pub use persistence::{JsonFilePersistence, MemoryPersistence, Persistence};
pub use registry::{CreationResult, FactionRegistry, FactionsView};
#[cfg(feature = "runtime")]
pub use shared::SharedRegistry;
pub use types::{
    BoundedArea, ClaimId, Column, FactionId, Location, OptimizationMode, Rect, RegistryConfig,
    RegistryStats, UserId, WorldId,
};
