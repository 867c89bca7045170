//! Fire-and-forget persistence: writes are queued and applied on a blocking
//! worker so the registry never waits on storage.
//!
//! Loads are delegated synchronously to the wrapped store. Write failures on
//! the worker are logged and counted, never retried.

use super::{ClaimRecord, FactionRecord, PersistResult, Persistence};
use crate::claim::Claim;
use crate::error::PersistenceError;
use crate::faction::Faction;
use crate::types::{ClaimId, FactionId};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Op {
    SaveFaction(Box<Faction>),
    SaveClaim(Box<Claim>),
    SaveNextId(i64),
    DeleteFaction(FactionId),
    DeleteClaim(ClaimId),
    Flush(oneshot::Sender<()>),
}

pub struct WriteBehind {
    inner: Arc<dyn Persistence>,
    tx: mpsc::UnboundedSender<Op>,
    failures: Arc<AtomicU64>,
}

impl WriteBehind {
    /// Wrap `inner` and start the worker. Must be called inside a Tokio
    /// runtime; the worker exits once every handle is dropped.
    pub fn spawn(inner: Arc<dyn Persistence>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Op>();
        let failures = Arc::new(AtomicU64::new(0));

        let store = inner.clone();
        let counter = failures.clone();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(op) = rx.blocking_recv() {
                let (what, result) = match op {
                    Op::SaveFaction(f) => ("faction", store.save_faction(&f)),
                    Op::SaveClaim(c) => ("claim", store.save_claim(&c)),
                    Op::SaveNextId(n) => ("next id", store.save_next_id(n)),
                    Op::DeleteFaction(id) => ("faction delete", store.delete_faction(id)),
                    Op::DeleteClaim(id) => ("claim delete", store.delete_claim(id)),
                    Op::Flush(done) => {
                        let _ = done.send(());
                        continue;
                    }
                };
                if let Err(e) = result {
                    counter.fetch_add(1, Ordering::Relaxed);
                    warn!("Background {} write failed: {}", what, e);
                }
            }
            debug!("Write-behind worker stopped");
        });

        (
            Self {
                inner,
                tx,
                failures,
            },
            handle,
        )
    }

    /// Wait until every write queued before this call has been applied.
    pub async fn flush(&self) -> PersistResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(Op::Flush(done_tx))?;
        done_rx.await.map_err(|_| PersistenceError::Closed)
    }

    /// Writes the worker failed to apply so far.
    pub fn failed_writes(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn enqueue(&self, op: Op) -> PersistResult<()> {
        self.tx.send(op).map_err(|_| PersistenceError::Closed)
    }
}

impl Persistence for WriteBehind {
    fn load_all_factions(&self) -> PersistResult<Vec<FactionRecord>> {
        self.inner.load_all_factions()
    }

    fn load_all_claims(&self) -> PersistResult<Vec<ClaimRecord>> {
        self.inner.load_all_claims()
    }

    fn load_next_id(&self) -> PersistResult<Option<i64>> {
        self.inner.load_next_id()
    }

    fn save_faction(&self, faction: &Faction) -> PersistResult<()> {
        self.enqueue(Op::SaveFaction(Box::new(faction.clone())))
    }

    fn save_claim(&self, claim: &Claim) -> PersistResult<()> {
        self.enqueue(Op::SaveClaim(Box::new(claim.clone())))
    }

    fn save_next_id(&self, next_id: i64) -> PersistResult<()> {
        self.enqueue(Op::SaveNextId(next_id))
    }

    fn delete_faction(&self, id: FactionId) -> PersistResult<()> {
        self.enqueue(Op::DeleteFaction(id))
    }

    fn delete_claim(&self, id: ClaimId) -> PersistResult<()> {
        self.enqueue(Op::DeleteClaim(id))
    }
}
