use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sidelink_grouping::bearer::{BearerActivator, BearerScheduler, SidelinkTft, schedule_group_bearers};
use sidelink_grouping::config::GroupingConfig;
use sidelink_grouping::grouping::{GroupBuilder, associate_for_v2x_broadcast, shuffled};
use sidelink_grouping::oracle::SrsrpMethod;
use sidelink_grouping::report::{print_groups, save_group_table};
use sidelink_grouping::scene::load_scene;
use sidelink_grouping::stats::{AssociationStats, BearerActivationLog, TraceLayer, TraceRegistry};
use sidelink_grouping::types::Endpoint;

#[derive(Parser)]
#[command(name = "sidelink-grouping")]
#[command(about = "Group sidelink UEs into broadcast transmitter/receiver sets", long_about = None)]
struct Cli {
    /// Scene JSON file
    scene: PathBuf,

    /// Run configuration (defaults to config.toml next to the scene)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the RSRP check and make every other UE a receiver
    #[arg(long)]
    full_mesh: bool,

    /// Number of transmitters, overrides the scene
    #[arg(short = 'n', long)]
    transmitters: Option<usize>,

    /// RSRP threshold in dBm, overrides the scene
    #[arg(short, long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// S-RSRP method (standard, evaluation), overrides the scene
    #[arg(short, long)]
    method: Option<SrsrpMethod>,

    /// Write the group table to this file
    #[arg(long)]
    table: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Stand-in for the host stack: reports activations through the log.
struct LoggingActivator;

impl BearerActivator for LoggingActivator {
    fn activate_sidelink_bearer(&self, ues: &[Endpoint], tft: &SidelinkTft) {
        let ids: Vec<String> = ues.iter().map(|e| e.node_id.to_string()).collect();
        info!(
            "Sidelink bearer {:?} group {} ({}) on UEs [{}]",
            tft.direction,
            tft.group_l2_id,
            tft.remote_address,
            ids.join(", ")
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("sidelink_grouping"), if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    info!("Starting up");

    let mut scene = load_scene(&cli.scene).with_context(|| format!("Could not load scene {}", cli.scene.display()))?;
    let config_path = cli.config.clone().unwrap_or_else(|| GroupingConfig::config_path_from_scene(&cli.scene));
    let config = GroupingConfig::load_or_default(&config_path).map_err(anyhow::Error::msg)?;

    scene
        .apply_overrides(cli.transmitters, cli.threshold, cli.method)
        .context("Invalid command line override")?;

    let ues = match config.shuffle_seed {
        Some(seed) => {
            info!("Shuffling {} endpoints with seed {}", scene.endpoints.len(), seed);
            shuffled(&scene.endpoints, seed)
        }
        None => scene.endpoints.clone(),
    };

    let association_stats = Arc::new(AssociationStats::new());
    let bearer_log = Arc::new(BearerActivationLog::new());
    let mut registry = TraceRegistry::new();
    registry.enable(TraceLayer::Association, association_stats.clone())?;
    registry.enable(TraceLayer::Bearer, bearer_log.clone())?;
    let registry = Arc::new(registry);

    let groups = if cli.full_mesh {
        info!("Building {} full-mesh groups over {} endpoints", scene.radio.transmitters, ues.len());
        associate_for_v2x_broadcast(&ues, scene.radio.transmitters)?
    } else {
        let oracle = scene.link_budget();
        info!(
            "Building {} groups over {} endpoints, threshold {} dBm, {} S-RSRP",
            scene.radio.transmitters,
            ues.len(),
            scene.radio.rsrp_threshold,
            scene.radio.method
        );
        GroupBuilder::new(&oracle)
            .with_traces(&registry)
            .associate_for_broadcast(&scene.radio, &ues)
            .context("Association failed")?
    };

    print_groups(&groups).context("Could not print groups")?;

    if let Some(path) = cli.table.as_ref().or(config.table_output.as_ref()) {
        save_group_table(&groups, path).with_context(|| format!("Could not write group table to {}", path.display()))?;
        info!("Group table written to {}", path.display());
    }

    for (tx, stats) in association_stats.snapshot() {
        match (stats.strongest, stats.weakest) {
            (Some(strongest), Some(weakest)) => info!(
                "Tx {}: {}/{} links accepted, RSRP {:.2} .. {:.2} dBm",
                tx, stats.accepted, stats.evaluated, weakest, strongest
            ),
            _ => warn!("Tx {}: none of {} candidate links reached the threshold", tx, stats.evaluated),
        }
    }

    let mut scheduler = BearerScheduler::new();
    scheduler.set_activator(Arc::new(LoggingActivator));
    scheduler.set_traces(registry.clone());
    let scheduled = schedule_group_bearers(&mut scheduler, &groups, Duration::from_millis(config.bearer_start_ms), config.multicast_base)?;
    let ran = scheduler.run();
    info!(
        "Activated {} of {} scheduled bearers ({} UE bearers) at {:?}",
        ran,
        scheduled,
        bearer_log.records().len(),
        scheduler.now()
    );

    Ok(())
}
