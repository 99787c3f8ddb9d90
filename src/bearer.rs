//! Deferred activation of sidelink bearers.
//!
//! Activations are posted to a time-ordered queue owned by the
//! [`BearerScheduler`] and handed to the registered [`BearerActivator`] when
//! the queue is run up to their activation time. Entries with the same time
//! run in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::error::BearerError;
use crate::stats::{TraceEvent, TraceLayer, TraceRegistry};
use crate::types::{Endpoint, Group};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TftDirection {
    Transmit,
    Receive,
    Bidirectional,
}

/// Traffic flow template of a sidelink bearer: the group destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidelinkTft {
    pub direction: TftDirection,
    /// Multicast address of the group.
    pub remote_address: Ipv4Addr,
    /// Layer 2 group identifier.
    pub group_l2_id: u32,
}

/// Host side that actually sets up bearers.
pub trait BearerActivator {
    fn activate_sidelink_bearer(&self, ues: &[Endpoint], tft: &SidelinkTft);
}

struct PendingActivation {
    at: Duration,
    seq: u64,
    ues: Vec<Endpoint>,
    tft: SidelinkTft,
}

impl PartialEq for PendingActivation {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for PendingActivation {}

impl PartialOrd for PendingActivation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingActivation {
    // Reversed so the max-heap pops the earliest entry first
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered queue of bearer activations.
#[derive(Default)]
pub struct BearerScheduler {
    activator: Option<Arc<dyn BearerActivator>>,
    traces: Option<Arc<TraceRegistry>>,
    queue: BinaryHeap<PendingActivation>,
    now: Duration,
    next_seq: u64,
}

impl BearerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_activator(&mut self, activator: Arc<dyn BearerActivator>) {
        self.activator = Some(activator);
    }

    /// Report activations to the bearer layer of `traces`.
    pub fn set_traces(&mut self, traces: Arc<TraceRegistry>) {
        self.traces = Some(traces);
    }

    /// Current queue time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedule the activation of a sidelink bearer `delay` after the current time.
    ///
    /// Fails when no activator has been registered.
    pub fn activate_sidelink_bearer(&mut self, delay: Duration, ues: Vec<Endpoint>, tft: SidelinkTft) -> Result<(), BearerError> {
        if self.activator.is_none() {
            return Err(BearerError::ActivatorNotRegistered);
        }
        let at = self.now + delay;
        debug!("Scheduling bearer for group {} on {} UEs at {:?}", tft.group_l2_id, ues.len(), at);
        self.queue.push(PendingActivation {
            at,
            seq: self.next_seq,
            ues,
            tft,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Run every activation due at or before `until`. Returns how many ran.
    pub fn run_until(&mut self, until: Duration) -> usize {
        let mut ran = 0;
        while self.queue.peek().is_some_and(|next| next.at <= until) {
            if let Some(entry) = self.queue.pop() {
                self.now = entry.at;
                self.do_activate(&entry);
                ran += 1;
            }
        }
        self.now = self.now.max(until);
        ran
    }

    /// Run the whole queue. Returns how many activations ran.
    pub fn run(&mut self) -> usize {
        let mut ran = 0;
        while let Some(entry) = self.queue.pop() {
            self.now = entry.at;
            self.do_activate(&entry);
            ran += 1;
        }
        ran
    }

    fn do_activate(&self, entry: &PendingActivation) {
        let Some(activator) = &self.activator else {
            return;
        };
        info!("Activating sidelink bearer for group {} on {} UEs", entry.tft.group_l2_id, entry.ues.len());
        activator.activate_sidelink_bearer(&entry.ues, &entry.tft);
        if let Some(traces) = &self.traces {
            for ue in &entry.ues {
                traces.record(
                    TraceLayer::Bearer,
                    TraceEvent::BearerActivated {
                        at: entry.at,
                        node_id: ue.node_id,
                        group_l2_id: entry.tft.group_l2_id,
                        direction: entry.tft.direction,
                    },
                );
            }
        }
    }
}

/// Schedule transmit and receive bearers for every group.
///
/// Group `i` uses layer 2 id `i + 1` and multicast address `base + i`. The
/// transmitter gets a transmit bearer, its receivers a receive bearer.
/// Returns the number of scheduled activations.
pub fn schedule_group_bearers(scheduler: &mut BearerScheduler, groups: &[Group], delay: Duration, base: Ipv4Addr) -> Result<usize, BearerError> {
    let mut scheduled = 0;
    for (i, group) in groups.iter().enumerate() {
        let remote_address = Ipv4Addr::from(u32::from(base).wrapping_add(i as u32));
        let group_l2_id = i as u32 + 1;

        let tx_tft = SidelinkTft {
            direction: TftDirection::Transmit,
            remote_address,
            group_l2_id,
        };
        scheduler.activate_sidelink_bearer(delay, vec![group.transmitter.clone()], tx_tft)?;
        scheduled += 1;

        if group.has_receivers() {
            let rx_tft = SidelinkTft {
                direction: TftDirection::Receive,
                remote_address,
                group_l2_id,
            };
            scheduler.activate_sidelink_bearer(delay, group.receivers.clone(), rx_tft)?;
            scheduled += 1;
        }
    }
    Ok(scheduled)
}
