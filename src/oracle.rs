//! RSRP oracle interface and a measurement-table implementation.
//!
//! The grouping code never models the radio channel. It asks an
//! [`RsrpOracle`] for the sidelink RSRP between two endpoints, using one of
//! two computation methods:
//! - `Standard`: S-RSRP as defined in TS 36.214, on the configured carrier
//! - `Evaluation`: the simplified S-RSRP used in the TR 36.843 evaluations

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::OracleError;
use crate::signal_calculations::{carrier_path_loss_offset, is_valid_bandwidth, rsrp_per_resource_element, uplink_carrier_frequency_mhz};
use crate::types::Endpoint;

/// Carrier frequency the TR 36.843 evaluation assumptions are based on.
pub const DEFAULT_REFERENCE_FREQUENCY_MHZ: f64 = 2000.0;

/// Method used to compute the sidelink RSRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SrsrpMethod {
    /// Evaluation formula from TR 36.843.
    Evaluation,
    /// Standard S-RSRP from TS 36.214.
    #[default]
    Standard,
}

impl fmt::Display for SrsrpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SrsrpMethod::Evaluation => write!(f, "evaluation"),
            SrsrpMethod::Standard => write!(f, "standard"),
        }
    }
}

impl FromStr for SrsrpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evaluation" | "eval" => Ok(SrsrpMethod::Evaluation),
            "standard" | "std" => Ok(SrsrpMethod::Standard),
            other => Err(format!("unknown S-RSRP method '{}', expected 'standard' or 'evaluation'", other)),
        }
    }
}

/// Source of sidelink RSRP estimates.
///
/// Implementations must be deterministic for a given input; the grouping
/// result is only reproducible if the oracle is. Power values are in dBm,
/// bandwidth in resource blocks.
pub trait RsrpOracle {
    /// S-RSRP per TS 36.214 on the carrier selected by `ul_earfcn`.
    fn compute_standard(&self, tx_power: f64, ul_earfcn: u32, ul_bandwidth: u32, tx: &Endpoint, rx: &Endpoint) -> Result<f64, OracleError>;

    /// S-RSRP per the TR 36.843 evaluation methodology.
    fn compute_evaluation(&self, tx_power: f64, ul_bandwidth: u32, tx: &Endpoint, rx: &Endpoint) -> Result<f64, OracleError>;
}

/// Oracle backed by measured path loss per directed link.
///
/// Losses are recorded on a reference carrier. When `symmetric` is set, a
/// measurement for `a → b` also answers `b → a` if that direction has no
/// entry of its own.
#[derive(Debug, Clone)]
pub struct LinkBudgetTable {
    path_loss: HashMap<(u32, u32), f64>,
    reference_frequency_mhz: f64,
    symmetric: bool,
}

impl Default for LinkBudgetTable {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_FREQUENCY_MHZ)
    }
}

impl LinkBudgetTable {
    pub fn new(reference_frequency_mhz: f64) -> Self {
        Self {
            path_loss: HashMap::new(),
            reference_frequency_mhz,
            symmetric: false,
        }
    }

    pub fn symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Record the path loss (dB) from `tx` to `rx`, replacing any earlier value.
    pub fn insert(&mut self, tx: u32, rx: u32, path_loss_db: f64) {
        if self.path_loss.insert((tx, rx), path_loss_db).is_some() {
            log::warn!("Link {} -> {} measured twice, keeping the last value", tx, rx);
        }
    }

    pub fn len(&self) -> usize {
        self.path_loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_loss.is_empty()
    }

    /// Measured loss for the directed link, honouring symmetry.
    pub fn path_loss(&self, tx: u32, rx: u32) -> Result<f64, OracleError> {
        self.path_loss
            .get(&(tx, rx))
            .or_else(|| if self.symmetric { self.path_loss.get(&(rx, tx)) } else { None })
            .copied()
            .ok_or(OracleError::MissingLink { tx, rx })
    }
}

impl RsrpOracle for LinkBudgetTable {
    fn compute_standard(&self, tx_power: f64, ul_earfcn: u32, ul_bandwidth: u32, tx: &Endpoint, rx: &Endpoint) -> Result<f64, OracleError> {
        if !is_valid_bandwidth(ul_bandwidth) {
            return Err(OracleError::InvalidBandwidth(ul_bandwidth));
        }
        let frequency = uplink_carrier_frequency_mhz(ul_earfcn).ok_or(OracleError::UnknownEarfcn(ul_earfcn))?;
        let path_loss = self.path_loss(tx.node_id, rx.node_id)? + carrier_path_loss_offset(frequency, self.reference_frequency_mhz);
        Ok(rsrp_per_resource_element(tx_power, ul_bandwidth, path_loss))
    }

    fn compute_evaluation(&self, tx_power: f64, ul_bandwidth: u32, tx: &Endpoint, rx: &Endpoint) -> Result<f64, OracleError> {
        if !is_valid_bandwidth(ul_bandwidth) {
            return Err(OracleError::InvalidBandwidth(ul_bandwidth));
        }
        let path_loss = self.path_loss(tx.node_id, rx.node_id)?;
        Ok(rsrp_per_resource_element(tx_power, ul_bandwidth, path_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LinkBudgetTable {
        let mut table = LinkBudgetTable::new(2000.0);
        table.insert(1, 2, 100.0);
        table
    }

    #[test]
    fn evaluation_ignores_carrier() {
        let t = table();
        let a = Endpoint::new(1);
        let b = Endpoint::new(2);
        let eval = t.compute_evaluation(23.0, 50, &a, &b).unwrap();
        assert!((eval - rsrp_per_resource_element(23.0, 50, 100.0)).abs() < 1e-9);
    }

    #[test]
    fn standard_applies_carrier_offset() {
        let t = table();
        let a = Endpoint::new(1);
        let b = Endpoint::new(2);
        // EARFCN 54990 → 5900 MHz, well above the 2 GHz reference
        let std = t.compute_standard(23.0, 54990, 50, &a, &b).unwrap();
        let eval = t.compute_evaluation(23.0, 50, &a, &b).unwrap();
        let expected_offset = 20.0 * (5900.0_f64 / 2000.0).log10();
        assert!((eval - std - expected_offset).abs() < 1e-9);
    }

    #[test]
    fn missing_and_reverse_links() {
        let t = table();
        let a = Endpoint::new(1);
        let b = Endpoint::new(2);
        assert_eq!(t.compute_evaluation(23.0, 50, &b, &a), Err(OracleError::MissingLink { tx: 2, rx: 1 }));

        let t = table().symmetric(true);
        assert!(t.compute_evaluation(23.0, 50, &b, &a).is_ok());
    }

    #[test]
    fn invalid_inputs_are_reported() {
        let t = table();
        let a = Endpoint::new(1);
        let b = Endpoint::new(2);
        assert_eq!(t.compute_standard(23.0, 7, 50, &a, &b), Err(OracleError::UnknownEarfcn(7)));
        assert_eq!(t.compute_evaluation(23.0, 0, &a, &b), Err(OracleError::InvalidBandwidth(0)));
    }

    #[test]
    fn oversized_bandwidth_is_rejected_not_overflowed() {
        let t = table();
        let a = Endpoint::new(1);
        let b = Endpoint::new(2);
        assert_eq!(t.compute_evaluation(23.0, 400_000_000, &a, &b), Err(OracleError::InvalidBandwidth(400_000_000)));
        assert_eq!(t.compute_standard(23.0, 18100, u32::MAX, &a, &b), Err(OracleError::InvalidBandwidth(u32::MAX)));
        assert_eq!(t.compute_evaluation(23.0, 111, &a, &b), Err(OracleError::InvalidBandwidth(111)));
        assert!(t.compute_evaluation(23.0, 110, &a, &b).is_ok());
    }

    #[test]
    fn method_parses_from_cli_names() {
        assert_eq!("standard".parse::<SrsrpMethod>(), Ok(SrsrpMethod::Standard));
        assert_eq!("EVAL".parse::<SrsrpMethod>(), Ok(SrsrpMethod::Evaluation));
        assert!("fast".parse::<SrsrpMethod>().is_err());
    }
}
