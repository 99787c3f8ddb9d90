//! Sidelink broadcast grouping.
//!
//! Groups UEs into transmitter/receiver sets for sidelink broadcast, based on
//! the RSRP each receiver would see from each transmitter.
//!
//! ## Module Organization
//!
//! - `types`: Endpoints and groups
//! - `signal_calculations`: Power conversions and carrier helpers
//! - `oracle`: The RSRP oracle interface and a measurement-table oracle
//! - `grouping`: Threshold and full-mesh association
//! - `report`: Plain and tabular group output
//! - `stats`: Statistics collectors registered per trace layer
//! - `bearer`: Deferred sidelink bearer activation
//! - `scene`, `config`: Input loading and validation

pub mod bearer;
pub mod config;
pub mod error;
pub mod grouping;
pub mod oracle;
pub mod report;
pub mod scene;
pub mod signal_calculations;
pub mod stats;
pub mod types;

pub use error::{BearerError, GroupingError, OracleError, ReportError, TraceError};
pub use grouping::{BroadcastParameters, GroupBuilder, associate_for_v2x_broadcast};
pub use oracle::{LinkBudgetTable, RsrpOracle, SrsrpMethod};
pub use types::{Endpoint, Group, GroupCollection};
