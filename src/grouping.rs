//! Association of UEs into sidelink broadcast groups.
//!
//! Two strategies share the same shape: the first `transmitters` endpoints of
//! the population become transmitters (simple prefix selection; shuffle the
//! population beforehand for a random pick), and every transmitter gets one
//! group holding its receivers.
//!
//! - [`GroupBuilder::associate_for_broadcast`] keeps a receiver when the
//!   oracle's RSRP reaches the threshold (inclusive).
//! - [`associate_for_v2x_broadcast`] makes every other endpoint a receiver.
//!
//! Both builders exclude a transmitter from its own group by `node_id`.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::GroupingError;
use crate::oracle::{RsrpOracle, SrsrpMethod};
use crate::stats::{TraceEvent, TraceLayer, TraceRegistry};
use crate::types::{Endpoint, Group, GroupCollection};

/// Radio and selection parameters of a threshold based association.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BroadcastParameters {
    /// Transmit power of the UEs (dBm).
    pub tx_power: f64,
    /// Uplink carrier, as EARFCN.
    pub ul_earfcn: u32,
    /// Uplink bandwidth in resource blocks.
    pub ul_bandwidth: u32,
    /// Minimum RSRP (dBm) for a receiver to join a transmitter's group.
    pub rsrp_threshold: f64,
    /// Number of groups to create.
    pub transmitters: usize,
    #[serde(default)]
    pub method: SrsrpMethod,
}

/// Builds threshold based groups from an injected RSRP oracle.
pub struct GroupBuilder<'a> {
    oracle: &'a dyn RsrpOracle,
    traces: Option<&'a TraceRegistry>,
}

impl<'a> GroupBuilder<'a> {
    pub fn new(oracle: &'a dyn RsrpOracle) -> Self {
        Self { oracle, traces: None }
    }

    /// Report every link decision to the association layer of `traces`.
    pub fn with_traces(mut self, traces: &'a TraceRegistry) -> Self {
        self.traces = Some(traces);
        self
    }

    fn rsrp(&self, params: &BroadcastParameters, tx: &Endpoint, rx: &Endpoint) -> Result<f64, GroupingError> {
        let rsrp = match params.method {
            SrsrpMethod::Standard => self.oracle.compute_standard(params.tx_power, params.ul_earfcn, params.ul_bandwidth, tx, rx)?,
            SrsrpMethod::Evaluation => self.oracle.compute_evaluation(params.tx_power, params.ul_bandwidth, tx, rx)?,
        };
        Ok(rsrp)
    }

    /// Associate UEs for broadcast using an RSRP threshold.
    ///
    /// Every endpoint of `ues`, other transmitters included, is a candidate
    /// receiver for every transmitter. A candidate joins when its RSRP is
    /// greater than or equal to `params.rsrp_threshold`.
    ///
    /// # Returns
    ///
    /// One group per transmitter, in selection order, transmitter first.
    /// An oracle failure aborts the whole association.
    pub fn associate_for_broadcast(&self, params: &BroadcastParameters, ues: &[Endpoint]) -> Result<GroupCollection, GroupingError> {
        let selected = select_transmitters(ues, params.transmitters)?;

        let mut groups = GroupCollection::with_capacity(selected.len());
        for tx in selected {
            let mut group = Group::new(tx.clone());
            for rx in ues {
                // No loopback link, UEs are half-duplex
                if rx.node_id == tx.node_id {
                    continue;
                }
                let rsrp = self.rsrp(params, tx, rx)?;
                let accepted = rsrp >= params.rsrp_threshold;
                debug!(
                    "Tx {} candidate Rx {} rsrp={:.2} required={:.2} accepted={}",
                    tx.node_id, rx.node_id, rsrp, params.rsrp_threshold, accepted
                );
                if let Some(traces) = self.traces {
                    traces.record(
                        TraceLayer::Association,
                        TraceEvent::LinkEvaluated {
                            tx: tx.node_id,
                            rx: rx.node_id,
                            rsrp,
                            accepted,
                        },
                    );
                }
                if accepted {
                    group.receivers.push(rx.clone());
                }
            }
            info!("Group of Tx {} has {} receivers", tx.node_id, group.receivers.len());
            groups.push(group);
        }
        Ok(groups)
    }
}

/// Associate UEs for V2X broadcast without any signal check.
///
/// Transmitter `i` receives a group with every endpoint except itself,
/// including the other transmitters.
pub fn associate_for_v2x_broadcast(ues: &[Endpoint], transmitters: usize) -> Result<GroupCollection, GroupingError> {
    let selected = select_transmitters(ues, transmitters)?;

    let groups: GroupCollection = selected
        .iter()
        .map(|tx| {
            let receivers = remove_endpoint(ues, tx);
            debug!("Tx {} broadcasting to {} receivers", tx.node_id, receivers.len());
            Group {
                transmitter: tx.clone(),
                receivers,
            }
        })
        .collect();
    Ok(groups)
}

/// Copy of `ues` without the endpoints sharing `item`'s node id.
pub fn remove_endpoint(ues: &[Endpoint], item: &Endpoint) -> Vec<Endpoint> {
    ues.iter().filter(|e| e.node_id != item.node_id).cloned().collect()
}

/// Copy of `ues` in a random order reproducible from `seed`.
///
/// Transmitter selection takes a prefix of the population, so shuffling first
/// turns it into a random pick.
pub fn shuffled(ues: &[Endpoint], seed: u64) -> Vec<Endpoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = ues.to_vec();
    out.shuffle(&mut rng);
    out
}

fn select_transmitters(ues: &[Endpoint], transmitters: usize) -> Result<&[Endpoint], GroupingError> {
    if transmitters > ues.len() {
        return Err(GroupingError::NotEnoughEndpoints {
            requested: transmitters,
            available: ues.len(),
        });
    }
    let selected = &ues[..transmitters];
    for tx in selected {
        debug!("Candidate Tx {}", tx.node_id);
    }
    Ok(selected)
}
