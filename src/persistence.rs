//! Persistence collaborators.
//!
//! The registry only talks to [`Persistence`]; the storage format belongs to
//! the implementation. Two stores ship with the crate:
//!
//! - [`MemoryPersistence`]: thread-safe in-memory maps, with an injectable
//!   failure switch for tests.
//! - [`JsonFilePersistence`]: a directory holding `factions.json` and
//!   `claims.json`, rewritten whole (write-then-rename) on every change.
//!
//! With the `runtime` feature, [`write_behind::WriteBehind`] wraps any store
//! and applies writes on a background task.

use crate::claim::Claim;
use crate::error::PersistenceError;
use crate::faction::Faction;
use crate::types::{ClaimId, FactionId};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "runtime")]
pub mod write_behind;

/// Persisted form of a faction.
pub type FactionRecord = Faction;
/// Persisted form of a claim.
pub type ClaimRecord = Claim;

pub type PersistResult<T> = Result<T, PersistenceError>;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait Persistence: Send + Sync {
    fn load_all_factions(&self) -> PersistResult<Vec<FactionRecord>>;

    fn load_all_claims(&self) -> PersistResult<Vec<ClaimRecord>>;

    /// Last persisted id counter, if one was ever saved.
    fn load_next_id(&self) -> PersistResult<Option<i64>>;

    fn save_faction(&self, faction: &Faction) -> PersistResult<()>;

    fn save_claim(&self, claim: &Claim) -> PersistResult<()>;

    fn save_next_id(&self, next_id: i64) -> PersistResult<()>;

    fn delete_faction(&self, id: FactionId) -> PersistResult<()>;

    fn delete_claim(&self, id: ClaimId) -> PersistResult<()>;
}

// ---------------------------------------------------------------------------
// Shared state shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct FactionsFile {
    #[serde(default)]
    next_id: Option<i64>,
    #[serde(default)]
    factions: Vec<Faction>,
}

#[derive(Debug, Default)]
struct Records {
    factions: BTreeMap<FactionId, Faction>,
    claims: BTreeMap<ClaimId, Claim>,
    next_id: Option<i64>,
}

impl Records {
    fn factions_file(&self) -> FactionsFile {
        FactionsFile {
            next_id: self.next_id,
            factions: self.factions.values().cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: Mutex<Records>,
    failing: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with records, as if written by an earlier run.
    pub fn with_records(factions: Vec<Faction>, claims: Vec<Claim>) -> Self {
        let store = Self::new();
        {
            let mut r = store.records.lock();
            r.factions = factions.into_iter().map(|f| (f.id(), f)).collect();
            r.claims = claims.into_iter().map(|c| (c.id, c)).collect();
        }
        store
    }

    /// While set, every call fails with [`PersistenceError::Backend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn faction(&self, id: FactionId) -> Option<Faction> {
        self.records.lock().factions.get(&id).cloned()
    }

    pub fn claim(&self, id: ClaimId) -> Option<Claim> {
        self.records.lock().claims.get(&id).cloned()
    }

    pub fn faction_count(&self) -> usize {
        self.records.lock().factions.len()
    }

    pub fn claim_count(&self) -> usize {
        self.records.lock().claims.len()
    }

    pub fn next_id(&self) -> Option<i64> {
        self.records.lock().next_id
    }

    fn check(&self) -> PersistResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("injected failure".into()));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    fn load_all_factions(&self) -> PersistResult<Vec<FactionRecord>> {
        self.check()?;
        Ok(self.records.lock().factions.values().cloned().collect())
    }

    fn load_all_claims(&self) -> PersistResult<Vec<ClaimRecord>> {
        self.check()?;
        Ok(self.records.lock().claims.values().cloned().collect())
    }

    fn load_next_id(&self) -> PersistResult<Option<i64>> {
        self.check()?;
        Ok(self.records.lock().next_id)
    }

    fn save_faction(&self, faction: &Faction) -> PersistResult<()> {
        self.check()?;
        self.records
            .lock()
            .factions
            .insert(faction.id(), faction.clone());
        Ok(())
    }

    fn save_claim(&self, claim: &Claim) -> PersistResult<()> {
        self.check()?;
        self.records.lock().claims.insert(claim.id, claim.clone());
        Ok(())
    }

    fn save_next_id(&self, next_id: i64) -> PersistResult<()> {
        self.check()?;
        self.records.lock().next_id = Some(next_id);
        Ok(())
    }

    fn delete_faction(&self, id: FactionId) -> PersistResult<()> {
        self.check()?;
        self.records.lock().factions.remove(&id);
        Ok(())
    }

    fn delete_claim(&self, id: ClaimId) -> PersistResult<()> {
        self.check()?;
        self.records.lock().claims.remove(&id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON directory store
// ---------------------------------------------------------------------------

const FACTIONS_FILE: &str = "factions.json";
const CLAIMS_FILE: &str = "claims.json";

/// JSON files in a directory. Missing files read as empty.
#[derive(Debug)]
pub struct JsonFilePersistence {
    dir: PathBuf,
    records: Mutex<Records>,
}

impl JsonFilePersistence {
    /// Open (creating if needed) a data directory and read what it holds.
    pub fn open(dir: impl Into<PathBuf>) -> PersistResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let factions: FactionsFile = read_json(&dir.join(FACTIONS_FILE))?.unwrap_or_default();
        let claims: Vec<Claim> = read_json(&dir.join(CLAIMS_FILE))?.unwrap_or_default();

        let records = Records {
            factions: factions
                .factions
                .into_iter()
                .map(|f| (f.id(), f))
                .collect(),
            claims: claims.into_iter().map(|c| (c.id, c)).collect(),
            next_id: factions.next_id,
        };
        debug!(
            "Opened claim data in {} ({} factions, {} claims)",
            dir.display(),
            records.factions.len(),
            records.claims.len()
        );
        Ok(Self {
            dir,
            records: Mutex::new(records),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_factions(&self, records: &Records) -> PersistResult<()> {
        let data = serde_json::to_vec_pretty(&records.factions_file())?;
        atomic_write(&self.dir.join(FACTIONS_FILE), &data)?;
        Ok(())
    }

    fn write_claims(&self, records: &Records) -> PersistResult<()> {
        let claims: Vec<&Claim> = records.claims.values().collect();
        let data = serde_json::to_vec_pretty(&claims)?;
        atomic_write(&self.dir.join(CLAIMS_FILE), &data)?;
        Ok(())
    }
}

impl Persistence for JsonFilePersistence {
    fn load_all_factions(&self) -> PersistResult<Vec<FactionRecord>> {
        Ok(self.records.lock().factions.values().cloned().collect())
    }

    fn load_all_claims(&self) -> PersistResult<Vec<ClaimRecord>> {
        Ok(self.records.lock().claims.values().cloned().collect())
    }

    fn load_next_id(&self) -> PersistResult<Option<i64>> {
        Ok(self.records.lock().next_id)
    }

    fn save_faction(&self, faction: &Faction) -> PersistResult<()> {
        let mut records = self.records.lock();
        records.factions.insert(faction.id(), faction.clone());
        self.write_factions(&records)
    }

    fn save_claim(&self, claim: &Claim) -> PersistResult<()> {
        let mut records = self.records.lock();
        records.claims.insert(claim.id, claim.clone());
        self.write_claims(&records)
    }

    fn save_next_id(&self, next_id: i64) -> PersistResult<()> {
        let mut records = self.records.lock();
        records.next_id = Some(next_id);
        self.write_factions(&records)
    }

    fn delete_faction(&self, id: FactionId) -> PersistResult<()> {
        let mut records = self.records.lock();
        if records.factions.remove(&id).is_some() {
            self.write_factions(&records)?;
        }
        Ok(())
    }

    fn delete_claim(&self, id: ClaimId) -> PersistResult<()> {
        let mut records = self.records.lock();
        if records.claims.remove(&id).is_some() {
            self.write_claims(&records)?;
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PersistResult<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write to `{path}.tmp`, sync, then rename over `path`, so a crash mid-write
/// leaves the previous file intact.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}
