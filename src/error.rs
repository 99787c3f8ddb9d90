//! Error types for grouping, reporting and bearer scheduling.

use thiserror::Error;

use crate::stats::TraceLayer;

/// Failures of an RSRP oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("no link measurement from node {tx} to node {rx}")]
    MissingLink { tx: u32, rx: u32 },
    #[error("EARFCN {0} is not in a known uplink band")]
    UnknownEarfcn(u32),
    #[error("bandwidth of {0} resource blocks is outside 1-110")]
    InvalidBandwidth(u32),
}

/// Failures while building broadcast groups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupingError {
    #[error("requested {requested} transmitters but only {available} endpoints are deployed")]
    NotEnoughEndpoints { requested: usize, available: usize },
    #[error("RSRP computation failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Failures while writing a group report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("node {0} has no IMSI")]
    MissingImsi(u32),
    #[error("failed to write group table: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while attaching statistics collectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("{0} traces are already enabled")]
    AlreadyEnabled(TraceLayer),
}

/// Failures of the sidelink bearer scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    #[error("sidelink activation requires a bearer activator to be registered")]
    ActivatorNotRegistered,
}
