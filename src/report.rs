//! Text output of broadcast groups.
//!
//! - Plain form: `Tx=<id> Rx=<id> <id> ...`, one line per group
//! - Table form: tab separated `TxNID RxNID TxIMSI RxIMSI`, one row per link

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::ReportError;
use crate::types::{Endpoint, Group};

/// Header of the group table.
pub const GROUP_TABLE_HEADER: &str = "TxNID\tRxNID\tTxIMSI\tRxIMSI";

/// Render groups in plain form.
pub fn format_groups(groups: &[Group]) -> String {
    let mut out = String::new();
    for group in groups {
        let receivers: Vec<String> = group.receivers.iter().map(|rx| rx.node_id.to_string()).collect();
        // Writing into a String cannot fail
        let _ = writeln!(out, "Tx={} Rx={}", group.transmitter.node_id, receivers.join(" "));
    }
    out
}

/// Print groups in plain form to stdout.
pub fn print_groups(groups: &[Group]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(format_groups(groups).as_bytes())?;
    stdout.flush()
}

fn imsi(endpoint: &Endpoint) -> Result<u64, ReportError> {
    endpoint.imsi.ok_or(ReportError::MissingImsi(endpoint.node_id))
}

/// Write groups as a table to `sink`.
///
/// A group without receivers produces a single `<tx>\t0` row without IMSIs.
/// Every other row needs both endpoints to carry an IMSI.
pub fn write_group_table<W: Write>(groups: &[Group], mut sink: W) -> Result<(), ReportError> {
    writeln!(sink, "{}", GROUP_TABLE_HEADER)?;
    for group in groups {
        let tx = &group.transmitter;
        if !group.has_receivers() {
            writeln!(sink, "{}\t0", tx.node_id)?;
            continue;
        }
        let tx_imsi = imsi(tx)?;
        for rx in &group.receivers {
            writeln!(sink, "{}\t{}\t{}\t{}", tx.node_id, rx.node_id, tx_imsi, imsi(rx)?)?;
        }
    }
    sink.flush()?;
    Ok(())
}

/// Write the group table to `path`.
///
/// The table is rendered in memory first, so a report error leaves no
/// file behind and an existing file untouched.
pub fn save_group_table(groups: &[Group], path: &Path) -> Result<(), ReportError> {
    let mut buf = Vec::new();
    write_group_table(groups, &mut buf)?;
    fs::write(path, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_groups() -> Vec<Group> {
        vec![
            Group {
                transmitter: Endpoint::with_imsi(0, 100),
                receivers: vec![Endpoint::with_imsi(2, 102), Endpoint::with_imsi(3, 103)],
            },
            Group::new(Endpoint::with_imsi(1, 101)),
        ]
    }

    #[test]
    fn plain_form_lists_transmitter_then_receivers() {
        let text = format_groups(&sample_groups());
        assert_eq!(text, "Tx=0 Rx=2 3\nTx=1 Rx=\n");
    }

    #[test]
    fn plain_form_is_repeatable() {
        let groups = sample_groups();
        let first = format_groups(&groups);
        let second = format_groups(&groups);
        assert_eq!(first, second);
        assert_eq!(groups, sample_groups());
    }

    #[test]
    fn table_form_with_sentinel_row() {
        let mut buf = Vec::new();
        write_group_table(&sample_groups(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "TxNID\tRxNID\tTxIMSI\tRxIMSI\n0\t2\t100\t102\n0\t3\t100\t103\n1\t0\n");
    }

    #[test]
    fn empty_group_does_not_need_imsi() {
        let mut buf = Vec::new();
        write_group_table(&[Group::new(Endpoint::new(5))], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "TxNID\tRxNID\tTxIMSI\tRxIMSI\n5\t0\n");
    }

    #[test]
    fn missing_imsi_is_reported() {
        let groups = vec![Group {
            transmitter: Endpoint::with_imsi(0, 100),
            receivers: vec![Endpoint::new(7)],
        }];
        let err = write_group_table(&groups, Vec::new()).unwrap_err();
        assert!(matches!(err, ReportError::MissingImsi(7)));
    }

    #[test]
    fn saved_table_matches_written_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.tsv");
        save_group_table(&sample_groups(), &path).unwrap();
        let mut buf = Vec::new();
        write_group_table(&sample_groups(), &mut buf).unwrap();
        assert_eq!(fs::read(&path).unwrap(), buf);
    }

    #[test]
    fn failed_save_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.tsv");
        let groups = vec![
            Group {
                transmitter: Endpoint::with_imsi(0, 100),
                receivers: vec![Endpoint::with_imsi(2, 102), Endpoint::new(7)],
            },
        ];
        let err = save_group_table(&groups, &path).unwrap_err();
        assert!(matches!(err, ReportError::MissingImsi(7)));
        assert!(!path.exists());

        fs::write(&path, "previous").unwrap();
        assert!(save_group_table(&groups, &path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }
}
