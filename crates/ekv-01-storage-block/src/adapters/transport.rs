//! In-process block transport.
//!
//! Routes peer messages to managers living in the same process. Hosts are
//! held weakly so a manager that owns the transport can also be registered
//! with it. Faults can be injected per block and message kind, single
//! writes can be held back to reorder arrivals, and every replicated write
//! that reaches its target is logged in arrival order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{BlockName, SlotRange, WriteRecord};
use tracing::debug;

use crate::domain::{BlockError, ImportBatch, ImportReceipt, TransferId};
use crate::ports::inbound::ChainDataApi;
use crate::ports::outbound::{unreachable, BlockTransport};

/// Message kinds a fault can be injected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Replicate,
    Acknowledge,
    Import,
    Confirm,
}

/// `BlockTransport` delivering to in-process hosts.
#[derive(Default)]
pub struct InProcessTransport {
    routes: RwLock<HashMap<BlockName, Weak<dyn ChainDataApi>>>,
    faults: RwLock<HashMap<BlockName, HashSet<FaultPoint>>>,
    delays: RwLock<HashMap<(BlockName, u64), Duration>>,
    deliveries: Mutex<Vec<(BlockName, u64)>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages for `block_names` to `host`.
    pub fn register<H>(&self, block_names: impl IntoIterator<Item = BlockName>, host: &Arc<H>)
    where
        H: ChainDataApi + 'static,
    {
        let weak: Weak<dyn ChainDataApi> = Arc::downgrade(host) as Weak<dyn ChainDataApi>;
        let mut routes = self.routes.write();
        for name in block_names {
            routes.insert(name, weak.clone());
        }
    }

    /// Make messages of kind `point` to `block` fail as unreachable.
    pub fn inject_fault(&self, block: &str, point: FaultPoint) {
        self.faults
            .write()
            .entry(block.to_string())
            .or_default()
            .insert(point);
    }

    /// Make every message to `block` fail.
    pub fn isolate(&self, block: &str) {
        for point in [
            FaultPoint::Replicate,
            FaultPoint::Acknowledge,
            FaultPoint::Import,
            FaultPoint::Confirm,
        ] {
            self.inject_fault(block, point);
        }
    }

    /// Hold write `seq` back for `delay` before it reaches `block`.
    pub fn delay_replicate(&self, block: &str, seq: u64, delay: Duration) {
        self.delays.write().insert((block.to_string(), seq), delay);
    }

    pub fn clear_faults(&self) {
        self.faults.write().clear();
        self.delays.write().clear();
    }

    /// Sequence numbers replicated to `block`, in arrival order.
    pub fn deliveries(&self, block: &str) -> Vec<u64> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(target, _)| target == block)
            .map(|(_, seq)| *seq)
            .collect()
    }

    fn route(&self, target: &str, point: FaultPoint) -> Result<Arc<dyn ChainDataApi>, BlockError> {
        let faulted = self
            .faults
            .read()
            .get(target)
            .is_some_and(|points| points.contains(&point));
        if faulted {
            debug!("[ekv-01] Dropping {:?} to {} (injected fault)", point, target);
            return Err(unreachable(target));
        }

        self.routes
            .read()
            .get(target)
            .and_then(Weak::upgrade)
            .ok_or_else(|| unreachable(target))
    }
}

#[async_trait]
impl BlockTransport for InProcessTransport {
    async fn replicate(&self, target: &str, record: WriteRecord) -> Result<(), BlockError> {
        let host = self.route(target, FaultPoint::Replicate)?;
        let seq = record.seq;
        let delay = self.delays.read().get(&(target.to_string(), seq)).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.deliveries.lock().push((target.to_string(), seq));
        host.replicate(target, record).await
    }

    async fn acknowledge(&self, target: &str, seq: u64) -> Result<(), BlockError> {
        let host = self.route(target, FaultPoint::Acknowledge)?;
        host.acknowledge(target, seq).await
    }

    async fn import(&self, target: &str, batch: ImportBatch) -> Result<ImportReceipt, BlockError> {
        let host = self.route(target, FaultPoint::Import)?;
        host.receive_import(target, batch).await
    }

    async fn confirm_import(
        &self,
        target: &str,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<(), BlockError> {
        let host = self.route(target, FaultPoint::Confirm)?;
        host.confirm_import(target, transfer, range, expected).await
    }
}
