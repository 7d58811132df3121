//! # FCW Replay
//!
//! Replays a recorded detection log through the reference-point projector
//! and the collision guard, printing one JSON report per frame on stdout.
//!
//! Usage: `fcw-replay [detections.jsonl]` (stdin when no path is given).
//! Configuration comes from the file named by `FCW_CONFIG` and
//! `FCW__`-prefixed environment variables.

mod config;
mod frames;

use crate::config::ReplayConfig;
use crate::frames::{FrameReader, FrameReport};

use anyhow::Context;
use fcw_telemetry::MetricsCollector;
use fcw_tracker::CollisionGuard;
use fcw_vision::ReferencePointProjector;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = ReplayConfig::load()?;
    let input = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.input.clone());

    info!("Starting forward collision replay v{}", env!("CARGO_PKG_VERSION"));
    info!("   Safety radius: {}", config.guard.safety_radius);
    info!(
        "   Prediction: {}s every {}s",
        config.guard.prediction_length, config.guard.prediction_step
    );

    let camera = config.camera.build().context("Invalid camera calibration")?;
    let mut projector = ReferencePointProjector::new(camera, config.projector.clone())
        .context("Invalid projector configuration")?;
    let mut guard =
        CollisionGuard::new(config.guard.clone()).context("Invalid guard configuration")?;
    let metrics = if config.metrics {
        Some(MetricsCollector::new().context("Failed to create metrics collector")?)
    } else {
        None
    };

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => {
            info!("Reading detections from {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading detections from stdin");
            Box::new(io::stdin().lock())
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut frames = 0u64;
    let mut alerts = 0u64;

    for frame in FrameReader::new(reader) {
        let frame = frame?;
        let started = Instant::now();

        let rectified = frame.rectified.unwrap_or(config.rectified);
        let points = projector.project(&frame.detections, rectified);
        let changes = guard.update(&points);
        let dangerous = guard.dangerous_objects();
        let elapsed = started.elapsed().as_secs_f64();

        if let Some(metrics) = &metrics {
            metrics.record_frame(elapsed, frame.detections.len() as u64);
            metrics.sync_projection(projector.stats());
            metrics.record_changes(&changes, guard.len());
            metrics.sync_guard(guard.stats());
            metrics.set_dangerous(dangerous.len());
        }

        if !dangerous.is_empty() {
            alerts += 1;
            warn!(
                "Frame {}: dangerous objects {:?}",
                frame.frame,
                dangerous.keys().map(|id| id.value()).collect::<Vec<_>>()
            );
        }
        debug!("Frame {} processed in {:.3}ms", frame.frame, elapsed * 1000.0);

        let report = FrameReport::new(frame.frame, guard.len(), changes, dangerous);
        serde_json::to_writer(&mut out, &report).context("Failed to write report")?;
        writeln!(out).context("Failed to write report")?;
        frames += 1;
    }
    out.flush()?;

    let remaining = guard.clear();
    if !remaining.is_empty() {
        info!("{} tracks still active when the log ended", remaining.len());
    }

    let projection = projector.stats();
    info!(
        "Replay finished: {} frames, {} with alerts, {} of {} detections dropped",
        frames,
        alerts,
        projection.dropped(),
        projection.detections_received
    );

    if let Some(metrics) = &metrics {
        let export = metrics.export().context("Failed to export metrics")?;
        eprint!("{}", export);
    }

    Ok(())
}

/// Initialize logging on stderr, keeping stdout for reports
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fcw_tracker=debug,fcw_vision=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(filter)
        .init();
}
