//! Radio signal calculations used by the RSRP oracle.
//!
//! Contains helpers for:
//! - dBm / mW conversion
//! - Spreading total transmit power over the resource elements of a carrier
//! - Mapping an uplink EARFCN to its carrier frequency
//! - Frequency correction of a path loss measured on another carrier
//!
//! Units:
//! - Power: dBm, mW (conversion provided)
//! - Frequency: MHz
//! - Bandwidth: resource blocks (RB), 12 subcarriers each

/// Subcarriers in one LTE resource block.
pub const SUBCARRIERS_PER_RESOURCE_BLOCK: u32 = 12;

/// Widest LTE carrier in resource blocks (20 MHz, 110 RB uplink maximum).
pub const MAX_BANDWIDTH_RB: u32 = 110;

/// Uplink operating band: `(band, F_UL_low in MHz, N_Offs-UL, first EARFCN, last EARFCN)`.
type UplinkBand = (u8, f64, u32, u32, u32);

/// Uplink EARFCN ranges (3GPP TS 36.101, table 5.7.3-1), including the
/// 5.9 GHz ITS band used for V2X sidelink.
const UPLINK_BANDS: [UplinkBand; 11] = [
    (1, 1920.0, 18000, 18000, 18599),
    (2, 1850.0, 18600, 18600, 19199),
    (3, 1710.0, 19200, 19200, 19949),
    (4, 1710.0, 19950, 19950, 20399),
    (5, 824.0, 20400, 20400, 20649),
    (7, 2500.0, 20750, 20750, 21449),
    (8, 880.0, 21450, 21450, 21799),
    (13, 777.0, 23180, 23180, 23279),
    (14, 788.0, 23280, 23280, 23379),
    (20, 832.0, 24150, 24150, 24449),
    (47, 5855.0, 54540, 54540, 55239),
];

/// Convert power from dBm (decibels relative to 1 milliwatt) to milliwatts.
///
/// # Formula
///
/// ```text
/// P(mW) = 10^(P(dBm) / 10)
/// ```
///
/// # Examples
///
/// ```text
/// 0 dBm   → 1 mW
/// 10 dBm  → 10 mW
/// -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert power from milliwatts to dBm.
///
/// # Formula
///
/// ```text
/// P(dBm) = 10 × log₁₀(P(mW))
/// ```
///
/// For `mw <= 0` the result is NaN or -∞; callers pass positive powers only.
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

/// Number of resource elements per OFDM symbol for a bandwidth given in RBs.
pub fn resource_element_count(bandwidth_rb: u32) -> u32 {
    bandwidth_rb * SUBCARRIERS_PER_RESOURCE_BLOCK
}

/// Whether a bandwidth (RB) fits an LTE carrier.
pub fn is_valid_bandwidth(bandwidth_rb: u32) -> bool {
    (1..=MAX_BANDWIDTH_RB).contains(&bandwidth_rb)
}

/// Received power of a single resource element.
///
/// The transmit power is spread evenly over every subcarrier of the carrier,
/// then reduced by the link's path loss:
///
/// ```text
/// RSRP(dBm) = P_tx(dBm) - 10 × log₁₀(12 × N_RB) - PL(dB)
/// ```
///
/// `bandwidth_rb` must satisfy [`is_valid_bandwidth`].
pub fn rsrp_per_resource_element(tx_power_dbm: f64, bandwidth_rb: u32, path_loss_db: f64) -> f64 {
    let per_re_dbm = mw_to_dbm(dbm_to_mw(tx_power_dbm) / resource_element_count(bandwidth_rb) as f64);
    per_re_dbm - path_loss_db
}

/// Map an uplink EARFCN to its carrier frequency in MHz.
///
/// ```text
/// F_UL = F_UL_low + 0.1 × (N_UL - N_Offs-UL)
/// ```
///
/// Returns `None` when the EARFCN is outside every known uplink band.
pub fn uplink_carrier_frequency_mhz(earfcn: u32) -> Option<f64> {
    UPLINK_BANDS
        .iter()
        .find(|(_, _, _, first, last)| (*first..=*last).contains(&earfcn))
        .map(|(_, f_low, n_offs, _, _)| f_low + 0.1 * (earfcn - n_offs) as f64)
}

/// Operating band of an uplink EARFCN, if known.
pub fn uplink_band(earfcn: u32) -> Option<u8> {
    UPLINK_BANDS
        .iter()
        .find(|(_, _, _, first, last)| (*first..=*last).contains(&earfcn))
        .map(|(band, ..)| *band)
}

// The frequency dependent part of free-space loss is 20·log10(f), so a loss
// measured at f_ref moves by 20·log10(f / f_ref) on another carrier. Only the
// carrier term changes; the distance dependent part of the measurement stays.
/// Path loss offset (dB) between a carrier and the measurement reference carrier.
pub fn carrier_path_loss_offset(frequency_mhz: f64, reference_frequency_mhz: f64) -> f64 {
    20.0 * (frequency_mhz / reference_frequency_mhz).log10()
}
