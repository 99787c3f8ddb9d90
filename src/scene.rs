//! Scene loading, parsing, and validation logic.
//!
//! A scene describes the deployed UEs, the measured path loss between them
//! and the radio parameters used to group them.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::grouping::BroadcastParameters;
use crate::oracle::{DEFAULT_REFERENCE_FREQUENCY_MHZ, LinkBudgetTable, SrsrpMethod};
use crate::signal_calculations::{MAX_BANDWIDTH_RB, is_valid_bandwidth, uplink_band};
use crate::types::Endpoint;

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Measured path loss of one directed link.
#[derive(Debug, Deserialize, Clone)]
pub struct LinkMeasurement {
    pub tx: u32,
    pub rx: u32,
    /// Path loss in dB, measured on the scene's reference carrier.
    pub path_loss: f64,
}

fn default_reference_frequency() -> f64 {
    DEFAULT_REFERENCE_FREQUENCY_MHZ
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// Grouping and radio parameters.
    pub radio: BroadcastParameters,
    /// Deployed UEs, in transmitter selection order.
    pub endpoints: Vec<Endpoint>,
    /// Path loss per directed link.
    #[serde(default)]
    pub links: Vec<LinkMeasurement>,
    /// Carrier (MHz) the link measurements were taken on.
    #[serde(default = "default_reference_frequency")]
    pub reference_frequency_mhz: f64,
    /// Use a measurement for both directions of a link.
    #[serde(default)]
    pub symmetric_links: bool,
}

impl Scene {
    /// Build the RSRP oracle described by the scene's link measurements.
    pub fn link_budget(&self) -> LinkBudgetTable {
        let mut table = LinkBudgetTable::new(self.reference_frequency_mhz).symmetric(self.symmetric_links);
        for link in &self.links {
            table.insert(link.tx, link.rx, link.path_loss);
        }
        table
    }

    /// Replace radio parameters with command line overrides and validate
    /// the result again.
    pub fn apply_overrides(&mut self, transmitters: Option<usize>, rsrp_threshold: Option<f64>, method: Option<SrsrpMethod>) -> Result<(), SceneLoadError> {
        if let Some(n) = transmitters {
            self.radio.transmitters = n;
        }
        if let Some(threshold) = rsrp_threshold {
            self.radio.rsrp_threshold = threshold;
        }
        if let Some(method) = method {
            self.radio.method = method;
        }
        validate_scene(self).map_err(SceneLoadError::ValidationError)
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    parse_scene(&data)
}

/// Parse and validate a scene from its JSON text.
pub fn parse_scene(data: &str) -> Result<Scene, SceneLoadError> {
    let scene: Scene = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    Ok(scene)
}

/// Validate scene configuration.
///
/// Checks for issues that would make grouping meaningless or fail later:
/// - Empty or oversized endpoint list, duplicate node IDs or IMSIs
/// - More transmitters than endpoints
/// - Unrealistic transmit power, bandwidth outside 1-110 RB, unknown EARFCN
/// - Links to unknown endpoints, self links, negative path loss
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_ENDPOINTS: usize = 10000;
    const MIN_TX_POWER: f64 = -50.0;
    const MAX_TX_POWER: f64 = 50.0;

    // Check endpoint count
    if scene.endpoints.is_empty() {
        return Err("Scene must contain at least one endpoint".to_string());
    }
    if scene.endpoints.len() > MAX_ENDPOINTS {
        return Err(format!("Endpoint count {} exceeds maximum of {}", scene.endpoints.len(), MAX_ENDPOINTS));
    }

    // Check for duplicate identities
    let mut node_ids = HashSet::new();
    let mut imsis = HashSet::new();
    for endpoint in &scene.endpoints {
        if !node_ids.insert(endpoint.node_id) {
            return Err(format!("Duplicate node_id found: {}", endpoint.node_id));
        }
        if let Some(imsi) = endpoint.imsi {
            if !imsis.insert(imsi) {
                return Err(format!("Duplicate imsi found: {}", imsi));
            }
        }
    }

    let radio = &scene.radio;
    if radio.transmitters > scene.endpoints.len() {
        return Err(format!(
            "Requested {} transmitters but the scene only has {} endpoints",
            radio.transmitters,
            scene.endpoints.len()
        ));
    }
    if radio.tx_power < MIN_TX_POWER || radio.tx_power > MAX_TX_POWER {
        return Err(format!(
            "tx_power {} dBm outside realistic range ({} to {} dBm)",
            radio.tx_power, MIN_TX_POWER, MAX_TX_POWER
        ));
    }
    if !radio.rsrp_threshold.is_finite() {
        return Err("rsrp_threshold must be a finite number".to_string());
    }
    if !is_valid_bandwidth(radio.ul_bandwidth) {
        return Err(format!(
            "Invalid ul_bandwidth {}, must be 1-{} resource blocks",
            radio.ul_bandwidth, MAX_BANDWIDTH_RB
        ));
    }
    if radio.method == SrsrpMethod::Standard && uplink_band(radio.ul_earfcn).is_none() {
        return Err(format!("ul_earfcn {} is not in a known uplink band", radio.ul_earfcn));
    }
    if scene.reference_frequency_mhz <= 0.0 {
        return Err("reference_frequency_mhz must be positive".to_string());
    }

    // Validate links
    for (idx, link) in scene.links.iter().enumerate() {
        if !node_ids.contains(&link.tx) || !node_ids.contains(&link.rx) {
            return Err(format!("Link {} ({} -> {}) references an unknown endpoint", idx, link.tx, link.rx));
        }
        if link.tx == link.rx {
            return Err(format!("Link {} is a self link on node {}", idx, link.tx));
        }
        if !link.path_loss.is_finite() || link.path_loss < 0.0 {
            return Err(format!("Link {} ({} -> {}) has invalid path_loss {}", idx, link.tx, link.rx, link.path_loss));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENE: &str = r#"{
        "radio": {
            "tx_power": 23.0,
            "ul_earfcn": 18100,
            "ul_bandwidth": 50,
            "rsrp_threshold": -112.0,
            "transmitters": 1,
            "method": "evaluation"
        },
        "endpoints": [
            {"node_id": 0, "imsi": 1},
            {"node_id": 1, "imsi": 2},
            {"node_id": 2}
        ],
        "links": [
            {"tx": 0, "rx": 1, "path_loss": 100.0},
            {"tx": 0, "rx": 2, "path_loss": 115.0}
        ],
        "symmetric_links": true
    }"#;

    fn with_radio(field: &str, value: &str) -> String {
        let pattern = format!("\"{}\": ", field);
        let start = SCENE.find(&pattern).unwrap() + pattern.len();
        let end = start + SCENE[start..].find([',', '\n']).unwrap();
        format!("{}{}{}", &SCENE[..start], value, &SCENE[end..])
    }

    #[test]
    fn parses_scene_with_defaults() {
        let scene = parse_scene(SCENE).unwrap();
        assert_eq!(scene.endpoints.len(), 3);
        assert_eq!(scene.radio.method, SrsrpMethod::Evaluation);
        assert_eq!(scene.reference_frequency_mhz, DEFAULT_REFERENCE_FREQUENCY_MHZ);
        let table = scene.link_budget();
        assert_eq!(table.len(), 2);
        assert_eq!(table.path_loss(2, 0), Ok(115.0));
    }

    #[test]
    fn scene_links_drive_grouping() {
        let scene = parse_scene(SCENE).unwrap();
        let oracle = scene.link_budget();
        let groups = crate::grouping::GroupBuilder::new(&oracle).associate_for_broadcast(&scene.radio, &scene.endpoints).unwrap();
        // 23 dBm over 600 REs is about -4.78 dBm per RE: node 1 sits at
        // -104.78 dBm, node 2 at -119.78 dBm against a -112 dBm threshold
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].receivers, vec![Endpoint::with_imsi(1, 2)]);
    }

    #[test]
    fn loads_scene_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();
        let scene = load_scene(file.path()).unwrap();
        assert_eq!(scene.radio.transmitters, 1);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_scene(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SceneLoadError::FileReadError(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_scene("{ nope"), Err(SceneLoadError::ParseError(_))));
    }

    #[test]
    fn rejects_invalid_scenes() {
        let too_many = with_radio("transmitters", "4");
        assert!(matches!(parse_scene(&too_many), Err(SceneLoadError::ValidationError(_))));

        let bad_bw = with_radio("ul_bandwidth", "0");
        assert!(matches!(parse_scene(&bad_bw), Err(SceneLoadError::ValidationError(_))));

        let huge_bw = with_radio("ul_bandwidth", "400000000");
        let err = parse_scene(&huge_bw).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid ul_bandwidth 400000000, must be 1-110 resource blocks");
        assert!(parse_scene(&with_radio("ul_bandwidth", "110")).is_ok());

        let loud = with_radio("tx_power", "80.0");
        assert!(matches!(parse_scene(&loud), Err(SceneLoadError::ValidationError(_))));

        let duplicate = SCENE.replace("{\"node_id\": 2}", "{\"node_id\": 1}");
        let err = parse_scene(&duplicate).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Duplicate node_id found: 1");

        let unknown_link = SCENE.replace("\"rx\": 2", "\"rx\": 9");
        assert!(matches!(parse_scene(&unknown_link), Err(SceneLoadError::ValidationError(_))));
    }

    #[test]
    fn unknown_earfcn_only_matters_for_standard_method() {
        let eval = with_radio("ul_earfcn", "7");
        assert!(parse_scene(&eval).is_ok());

        let standard = eval.replace("\"evaluation\"", "\"standard\"");
        let err = parse_scene(&standard).unwrap_err();
        assert!(err.to_string().contains("ul_earfcn 7"));
    }

    #[test]
    fn overrides_are_validated() {
        let mut scene = parse_scene(SCENE).unwrap();
        scene.apply_overrides(None, Some(-100.0), Some(SrsrpMethod::Standard)).unwrap();
        assert_eq!(scene.radio.rsrp_threshold, -100.0);
        assert_eq!(scene.radio.method, SrsrpMethod::Standard);

        let err = scene.apply_overrides(None, Some(f64::NAN), None).unwrap_err();
        assert!(matches!(err, SceneLoadError::ValidationError(_)));

        let mut scene = parse_scene(SCENE).unwrap();
        let err = scene.apply_overrides(Some(5), None, None).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Requested 5 transmitters but the scene only has 3 endpoints");
    }

    #[test]
    fn method_override_checks_earfcn() {
        let mut scene = parse_scene(&with_radio("ul_earfcn", "7")).unwrap();
        assert!(scene.apply_overrides(None, None, Some(SrsrpMethod::Standard)).is_err());
    }
}
