//! Statistics collectors attached directly to the components that produce events.
//!
//! A collector implements [`StatsCollector`] and is registered for one
//! [`TraceLayer`] on a [`TraceRegistry`]. Producers hold a reference to the
//! registry and call [`TraceRegistry::record`]; events for a layer without a
//! collector are dropped.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::bearer::TftDirection;
use crate::error::TraceError;

/// Producer layers that can be traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceLayer {
    /// Link decisions taken while building groups.
    Association,
    /// Sidelink bearer activations.
    Bearer,
}

impl fmt::Display for TraceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLayer::Association => write!(f, "Association"),
            TraceLayer::Bearer => write!(f, "Bearer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A candidate receiver was checked against a transmitter.
    LinkEvaluated { tx: u32, rx: u32, rsrp: f64, accepted: bool },
    /// A sidelink bearer was activated on one endpoint.
    BearerActivated {
        at: Duration,
        node_id: u32,
        group_l2_id: u32,
        direction: TftDirection,
    },
}

/// Narrow sink for trace events.
pub trait StatsCollector: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

/// Per-layer collector registrations.
#[derive(Default)]
pub struct TraceRegistry {
    collectors: HashMap<TraceLayer, Arc<dyn StatsCollector>>,
}

impl TraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `collector` to `layer`. Each layer can be enabled once.
    pub fn enable(&mut self, layer: TraceLayer, collector: Arc<dyn StatsCollector>) -> Result<(), TraceError> {
        if self.collectors.contains_key(&layer) {
            return Err(TraceError::AlreadyEnabled(layer));
        }
        log::debug!("Enabling {} traces", layer);
        self.collectors.insert(layer, collector);
        Ok(())
    }

    pub fn record(&self, layer: TraceLayer, event: TraceEvent) {
        if let Some(collector) = self.collectors.get(&layer) {
            collector.record(&event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Link statistics of one transmitter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransmitterStats {
    pub evaluated: usize,
    pub accepted: usize,
    /// Strongest accepted RSRP (dBm).
    pub strongest: Option<f64>,
    /// Weakest accepted RSRP (dBm).
    pub weakest: Option<f64>,
}

/// Collects association decisions per transmitter.
#[derive(Default)]
pub struct AssociationStats {
    per_transmitter: Mutex<BTreeMap<u32, TransmitterStats>>,
}

impl AssociationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transmitter(&self, node_id: u32) -> Option<TransmitterStats> {
        lock(&self.per_transmitter).get(&node_id).cloned()
    }

    /// Snapshot ordered by transmitter id.
    pub fn snapshot(&self) -> Vec<(u32, TransmitterStats)> {
        lock(&self.per_transmitter).iter().map(|(id, s)| (*id, s.clone())).collect()
    }
}

impl StatsCollector for AssociationStats {
    fn record(&self, event: &TraceEvent) {
        let TraceEvent::LinkEvaluated { tx, rsrp, accepted, .. } = event else {
            return;
        };
        let mut stats = lock(&self.per_transmitter);
        let entry = stats.entry(*tx).or_default();
        entry.evaluated += 1;
        if *accepted {
            entry.accepted += 1;
            entry.strongest = Some(entry.strongest.map_or(*rsrp, |s| s.max(*rsrp)));
            entry.weakest = Some(entry.weakest.map_or(*rsrp, |w| w.min(*rsrp)));
        }
    }
}

/// One activated bearer as seen by [`BearerActivationLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct BearerActivationRecord {
    pub at: Duration,
    pub node_id: u32,
    pub group_l2_id: u32,
    pub direction: TftDirection,
}

/// Keeps every bearer activation in the order it happened.
#[derive(Default)]
pub struct BearerActivationLog {
    records: Mutex<Vec<BearerActivationRecord>>,
}

impl BearerActivationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BearerActivationRecord> {
        lock(&self.records).clone()
    }
}

impl StatsCollector for BearerActivationLog {
    fn record(&self, event: &TraceEvent) {
        if let TraceEvent::BearerActivated {
            at,
            node_id,
            group_l2_id,
            direction,
        } = event
        {
            lock(&self.records).push(BearerActivationRecord {
                at: *at,
                node_id: *node_id,
                group_l2_id: *group_l2_id,
                direction: *direction,
            });
        }
    }
}
