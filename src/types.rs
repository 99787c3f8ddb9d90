//! Type definitions shared by the grouping, reporting and scheduling code.
//!
//! Contains:
//! - `Endpoint`: one sidelink-capable UE
//! - `Group`: a transmitter with the receivers that can hear it
//! - `GroupCollection`: one group per selected transmitter

use serde::Deserialize;

/// A single UE taking part in sidelink broadcast.
///
/// Endpoints are half-duplex, so an endpoint never forms a link with itself.
/// Identity for grouping purposes is the `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub node_id: u32,
    /// Subscriber identity, only present on cellular devices.
    #[serde(default)]
    pub imsi: Option<u64>,
}

impl Endpoint {
    pub fn new(node_id: u32) -> Self {
        Self { node_id, imsi: None }
    }

    pub fn with_imsi(node_id: u32, imsi: u64) -> Self {
        Self { node_id, imsi: Some(imsi) }
    }
}

/// One broadcast group: a transmitter and its receivers.
///
/// Receivers keep the order in which they qualified. A receiver can be a
/// member of several groups at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub transmitter: Endpoint,
    pub receivers: Vec<Endpoint>,
}

impl Group {
    pub fn new(transmitter: Endpoint) -> Self {
        Self {
            transmitter,
            receivers: Vec::new(),
        }
    }

    /// Number of members including the transmitter.
    pub fn member_count(&self) -> usize {
        1 + self.receivers.len()
    }

    pub fn has_receivers(&self) -> bool {
        !self.receivers.is_empty()
    }

    pub fn contains_receiver(&self, node_id: u32) -> bool {
        self.receivers.iter().any(|rx| rx.node_id == node_id)
    }
}

/// Groups in transmitter selection order.
pub type GroupCollection = Vec<Group>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmitter_is_not_a_receiver() {
        let mut group = Group::new(Endpoint::new(7));
        assert!(!group.has_receivers());
        group.receivers.push(Endpoint::new(3));
        group.receivers.push(Endpoint::new(9));
        assert_eq!(group.member_count(), 3);
        assert!(group.contains_receiver(9));
        assert!(!group.contains_receiver(7));
    }

    #[test]
    fn endpoint_deserializes_without_imsi() {
        let e: Endpoint = serde_json::from_str(r#"{"node_id": 4}"#).unwrap();
        assert_eq!(e, Endpoint::new(4));
        let e: Endpoint = serde_json::from_str(r#"{"node_id": 4, "imsi": 1001}"#).unwrap();
        assert_eq!(e.imsi, Some(1001));
    }
}
