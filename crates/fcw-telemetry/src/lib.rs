//! # FCW Telemetry - Metrics & Observability
//!
//! Prometheus metrics for the forward collision pipeline:
//! - Frame throughput and processing time
//! - Projection drops by reason
//! - Track lifecycle and danger alerts

use fcw_tracker::{GuardStats, TrackChanges};
use fcw_vision::ProjectionStats;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;

/// Metrics collector for the collision pipeline
pub struct MetricsCollector {
    registry: Registry,

    // Frame metrics
    frames_processed: IntCounter,
    detections_total: IntCounter,
    frame_processing_time: Histogram,

    // Projection metrics
    projections_dropped: IntCounterVec,

    // Track metrics
    tracks_active: IntGauge,
    tracks_started: IntCounter,
    tracks_lost: IntCounter,
    measurements_rejected: IntCounter,

    // Danger metrics
    dangerous_objects: IntGauge,
    danger_alerts: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        // Frame metrics
        let frames_processed = IntCounter::new(
            "fcw_frames_processed_total",
            "Total frames processed",
        )?;
        registry.register(Box::new(frames_processed.clone()))?;

        let detections_total = IntCounter::new(
            "fcw_detections_total",
            "Total detections received from the image tracker",
        )?;
        registry.register(Box::new(detections_total.clone()))?;

        let frame_processing_time = Histogram::with_opts(
            HistogramOpts::new(
                "fcw_frame_processing_seconds",
                "Projection and guard update time per frame",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]),
        )?;
        registry.register(Box::new(frame_processing_time.clone()))?;

        // Projection metrics
        let projections_dropped = IntCounterVec::new(
            Opts::new("fcw_projections_dropped_total", "Detections without a ground point"),
            &["reason"],
        )?;
        registry.register(Box::new(projections_dropped.clone()))?;

        // Track metrics
        let tracks_active = IntGauge::new("fcw_tracks_active", "Number of tracked objects")?;
        registry.register(Box::new(tracks_active.clone()))?;

        let tracks_started = IntCounter::new("fcw_tracks_started_total", "Tracks started")?;
        registry.register(Box::new(tracks_started.clone()))?;

        let tracks_lost = IntCounter::new("fcw_tracks_lost_total", "Tracks lost")?;
        registry.register(Box::new(tracks_lost.clone()))?;

        let measurements_rejected = IntCounter::new(
            "fcw_measurements_rejected_total",
            "Non-finite world points ignored by the guard",
        )?;
        registry.register(Box::new(measurements_rejected.clone()))?;

        // Danger metrics
        let dangerous_objects = IntGauge::new(
            "fcw_dangerous_objects",
            "Objects currently flagged as dangerous",
        )?;
        registry.register(Box::new(dangerous_objects.clone()))?;

        let danger_alerts = IntCounter::new(
            "fcw_danger_alerts_total",
            "Frames with at least one dangerous object",
        )?;
        registry.register(Box::new(danger_alerts.clone()))?;

        info!("Metrics collector initialized");

        Ok(Self {
            registry,
            frames_processed,
            detections_total,
            frame_processing_time,
            projections_dropped,
            tracks_active,
            tracks_started,
            tracks_lost,
            measurements_rejected,
            dangerous_objects,
            danger_alerts,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    // ========================================================================
    // FRAME METRICS
    // ========================================================================

    /// Record one processed frame
    pub fn record_frame(&self, processing_time_secs: f64, detections: u64) {
        self.frames_processed.inc();
        self.detections_total.inc_by(detections);
        self.frame_processing_time.observe(processing_time_secs);
    }

    // ========================================================================
    // PROJECTION METRICS
    // ========================================================================

    /// Bring the drop counters in line with cumulative projector stats
    ///
    /// Labels are the projector's drop reasons as recorded in the stats.
    pub fn sync_projection(&self, stats: &ProjectionStats) {
        for (reason, total) in stats.drops() {
            let counter = self.projections_dropped.with_label_values(&[reason]);
            let seen = counter.get();
            if total > seen {
                counter.inc_by(total - seen);
            }
        }
    }

    // ========================================================================
    // TRACK METRICS
    // ========================================================================

    /// Record the registry changes of one frame
    pub fn record_changes(&self, changes: &TrackChanges, active: usize) {
        self.tracks_started.inc_by(changes.started.len() as u64);
        self.tracks_lost.inc_by(changes.lost.len() as u64);
        self.tracks_active.set(active as i64);
    }

    /// Bring the rejection counter in line with cumulative guard stats
    pub fn sync_guard(&self, stats: &GuardStats) {
        let seen = self.measurements_rejected.get();
        if stats.measurements_rejected > seen {
            self.measurements_rejected
                .inc_by(stats.measurements_rejected - seen);
        }
    }

    // ========================================================================
    // DANGER METRICS
    // ========================================================================

    /// Record how many objects are dangerous this frame
    pub fn set_dangerous(&self, count: usize) {
        self.dangerous_objects.set(count as i64);
        if count > 0 {
            self.danger_alerts.inc();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
