//! Forward collision guard
//!
//! Keeps one filter per tracking identity in sync with the projected
//! detections of each frame and flags objects whose predicted path enters
//! the danger zone.
//!
//! Lifecycle per identity is `absent -> tracked -> (tracked | absent)`:
//! tracking starts the frame an identity first appears and ends the first
//! frame it is missing. There is no coasting.

use crate::{GuardConfig, TrackedObject, TrackerResult};
use fcw_core::{Point2, Point3, Polygon, Polyline, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, trace, warn};

/// Object whose predicted path threatens the danger zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerousObject {
    pub track_id: TrackId,
    pub location: Point2,
    pub velocity: Point2,
    pub relative_speed: f64,
    pub distance: f64,
    /// Predicted path touches the zone somewhere
    pub crosses_zone: bool,
    /// Predicted path ends inside the zone
    pub ends_in_zone: bool,
    pub future_path: Polyline,
}

/// Registry changes caused by one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackChanges {
    /// Identities that started tracking this frame
    pub started: Vec<TrackId>,
    /// Identities dropped because they were missing
    pub lost: Vec<TrackId>,
    /// Number of existing tracks that received a measurement
    pub updated: usize,
}

/// Guard statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GuardStats {
    pub frames_processed: u64,
    pub tracks_started: u64,
    pub tracks_lost: u64,
    pub measurements_rejected: u64,
}

/// Registry of tracked objects plus the danger evaluation
pub struct CollisionGuard {
    config: GuardConfig,
    danger_zone: Polygon,
    vehicle_zone: Polygon,
    /// Tracked objects indexed by tracking identity
    objects: HashMap<TrackId, TrackedObject>,
    stats: GuardStats,
}

impl CollisionGuard {
    /// Create a guard, validating the configuration and building zones
    pub fn new(config: GuardConfig) -> TrackerResult<Self> {
        config.validate()?;
        let danger_zone = config.danger_zone.to_polygon()?;
        let vehicle_zone = config.vehicle.footprint()?;

        info!(
            "Collision guard ready: safety radius {}, horizon {}s every {}s",
            config.safety_radius, config.prediction_length, config.prediction_step
        );

        Ok(Self {
            config,
            danger_zone,
            vehicle_zone,
            objects: HashMap::new(),
            stats: GuardStats::default(),
        })
    }

    /// Synchronize the registry with one frame of world points
    ///
    /// 1. Tracks whose identity is missing are evicted
    /// 2. New identities start a track seeded at their position
    /// 3. Known identities are predicted and corrected
    ///
    /// Non-finite points count as missing for this frame.
    pub fn update(&mut self, world_points: &HashMap<TrackId, Point3>) -> TrackChanges {
        self.stats.frames_processed += 1;
        let mut changes = TrackChanges::default();

        let measurements: HashMap<TrackId, Point2> = world_points
            .iter()
            .filter_map(|(id, point)| {
                if point.is_finite() {
                    Some((*id, point.xy()))
                } else {
                    warn!("Rejecting non-finite position for track {}", id);
                    self.stats.measurements_rejected += 1;
                    None
                }
            })
            .collect();

        let missing: Vec<TrackId> = self
            .objects
            .keys()
            .filter(|id| !measurements.contains_key(id))
            .copied()
            .collect();
        for id in missing {
            if self.evict(id).is_some() {
                changes.lost.push(id);
            }
        }

        for (id, position) in measurements {
            match self.objects.entry(id) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().update(position);
                    changes.updated += 1;
                }
                Entry::Vacant(entry) => {
                    info!("Tracking object {}", id);
                    entry.insert(TrackedObject::new(position, self.config.dt, &self.config.filter));
                    self.stats.tracks_started += 1;
                    changes.started.push(id);
                }
            }
        }

        changes.started.sort_unstable();
        changes.lost.sort_unstable();
        trace!(
            "Frame {}: {} tracked, {} started, {} lost",
            self.stats.frames_processed,
            self.objects.len(),
            changes.started.len(),
            changes.lost.len()
        );
        changes
    }

    /// Start tracking `id` at `position`, replacing any existing track
    pub fn insert(&mut self, id: TrackId, position: Point2) {
        info!("Tracking object {}", id);
        let object = TrackedObject::new(position, self.config.dt, &self.config.filter);
        self.objects.insert(id, object);
        self.stats.tracks_started += 1;
    }

    /// Stop tracking `id`
    pub fn evict(&mut self, id: TrackId) -> Option<TrackedObject> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            info!("Tracking of {} lost", id);
            self.stats.tracks_lost += 1;
        }
        removed
    }

    /// Objects inside the safety radius whose future path meets the danger
    /// zone
    pub fn dangerous_objects(&self) -> BTreeMap<TrackId, DangerousObject> {
        let dangerous: BTreeMap<TrackId, DangerousObject> = self
            .objects
            .iter()
            .filter_map(|(id, object)| self.assess(*id, object))
            .map(|danger| (danger.track_id, danger))
            .collect();

        for danger in dangerous.values() {
            debug!(
                "Dangerous object {} at {} ({:.1} away, {:.1}/s), crosses zone: {}, ends in zone: {}",
                danger.track_id,
                danger.location,
                danger.distance,
                danger.relative_speed,
                danger.crosses_zone,
                danger.ends_in_zone
            );
        }
        dangerous
    }

    /// Danger evaluation of a single object
    fn assess(&self, id: TrackId, object: &TrackedObject) -> Option<DangerousObject> {
        let distance = object.distance();
        if distance >= self.config.safety_radius {
            return None;
        }
        let location = object.location()?;

        let path = object.future_path(self.config.prediction_length, self.config.prediction_step);
        let crosses_zone = self.danger_zone.intersects(&path);
        let ends_in_zone = path.last().is_some_and(|p| self.danger_zone.contains(p));
        if !(crosses_zone || ends_in_zone) {
            return None;
        }

        Some(DangerousObject {
            track_id: id,
            location,
            velocity: object.velocity().unwrap_or_default(),
            relative_speed: object.relative_speed(),
            distance,
            crosses_zone,
            ends_in_zone,
            future_path: path,
        })
    }

    pub fn get(&self, id: TrackId) -> Option<&TrackedObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Tracked identities in ascending order
    pub fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn objects(&self) -> impl Iterator<Item = (&TrackId, &TrackedObject)> {
        self.objects.iter()
    }

    pub fn danger_zone(&self) -> &Polygon {
        &self.danger_zone
    }

    /// Buffered footprint of the own vehicle
    pub fn vehicle_zone(&self) -> &Polygon {
        &self.vehicle_zone
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn stats(&self) -> &GuardStats {
        &self.stats
    }

    /// Drop every track, counting each one as lost
    pub fn clear(&mut self) -> Vec<TrackId> {
        let lost = self.track_ids();
        self.objects.clear();
        self.stats.tracks_lost += lost.len() as u64;
        debug!("Cleared {} tracks", lost.len());
        lost
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame(points: &[(u32, f64, f64)]) -> HashMap<TrackId, Point3> {
        points
            .iter()
            .map(|&(id, x, y)| (TrackId(id), Point3::on_ground(x, y)))
            .collect()
    }

    fn guard() -> CollisionGuard {
        CollisionGuard::new(GuardConfig::default()).unwrap()
    }

    #[test]
    fn test_guard_creation() {
        let guard = guard();
        assert!(guard.is_empty());
        assert!(guard.dangerous_objects().is_empty());
        assert_eq!(guard.vehicle_zone().vertices().len(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GuardConfig {
            safety_radius: -1.0,
            ..Default::default()
        };
        assert!(CollisionGuard::new(config).is_err());

        // A vanishing step would make every future path unbounded
        let config = GuardConfig {
            prediction_step: 1e-320,
            ..Default::default()
        };
        assert!(CollisionGuard::new(config).is_err());
    }

    #[test]
    fn test_clear_counts_lost_tracks() {
        let mut guard = guard();
        guard.update(&frame(&[(4, 5.0, 0.0), (2, 6.0, 1.0)]));

        assert_eq!(guard.clear(), vec![TrackId(2), TrackId(4)]);
        assert!(guard.is_empty());
        assert_eq!(guard.stats().tracks_lost, 2);
        assert!(guard.clear().is_empty());
    }

    #[test]
    fn test_track_lifecycle() {
        let mut guard = guard();

        let changes = guard.update(&frame(&[(1, 10.0, 5.0)]));
        assert_eq!(changes.started, vec![TrackId(1)]);
        assert!(guard.contains(TrackId(1)));

        let changes = guard.update(&frame(&[(2, 8.0, -3.0)]));
        assert_eq!(changes.lost, vec![TrackId(1)]);
        assert_eq!(changes.started, vec![TrackId(2)]);
        assert!(!guard.contains(TrackId(1)));

        let p = guard.get(TrackId(2)).unwrap().position();
        assert_abs_diff_eq!(p.x, 8.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, -3.0, epsilon = 1e-9);

        let stats = guard.stats();
        assert_eq!(stats.frames_processed, 2);
        assert_eq!(stats.tracks_started, 2);
        assert_eq!(stats.tracks_lost, 1);
    }

    #[test]
    fn test_reappearing_object_is_updated() {
        let mut guard = guard();
        guard.update(&frame(&[(5, 12.0, 0.5)]));
        let changes = guard.update(&frame(&[(5, 11.0, 0.5)]));

        assert_eq!(changes.updated, 1);
        assert!(changes.started.is_empty());

        let object = guard.get(TrackId(5)).unwrap();
        assert_eq!(object.update_count(), 1);
        let loc = object.location().unwrap();
        assert!(loc.x < 12.0 && loc.x > 11.0);
    }

    #[test]
    fn test_empty_frame_clears_registry() {
        let mut guard = guard();
        guard.update(&frame(&[(1, 5.0, 0.0), (2, 6.0, 1.0)]));
        let changes = guard.update(&HashMap::new());

        assert_eq!(changes.lost, vec![TrackId(1), TrackId(2)]);
        assert!(guard.is_empty());
    }

    #[test]
    fn test_non_finite_point_counts_as_missing() {
        let mut guard = guard();
        guard.update(&frame(&[(1, 5.0, 0.0)]));
        let changes = guard.update(&frame(&[(1, f64::NAN, 0.0)]));

        assert_eq!(changes.lost, vec![TrackId(1)]);
        assert!(guard.is_empty());
        assert_eq!(guard.stats().measurements_rejected, 1);
    }

    #[test]
    fn test_new_object_is_not_dangerous() {
        // Sitting inside the zone, but no correction has happened yet
        let mut guard = guard();
        guard.update(&frame(&[(1, 5.0, 0.0)]));
        assert!(guard.dangerous_objects().is_empty());

        guard.update(&frame(&[(1, 5.0, 0.0)]));
        let dangerous = guard.dangerous_objects();
        let danger = &dangerous[&TrackId(1)];
        assert!(danger.crosses_zone);
        assert!(danger.ends_in_zone);
        assert_abs_diff_eq!(danger.distance, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insert_and_evict() {
        let mut guard = guard();
        guard.insert(TrackId(3), Point2::new(4.0, 0.0));
        assert_eq!(guard.track_ids(), vec![TrackId(3)]);

        assert!(guard.evict(TrackId(3)).is_some());
        assert!(guard.evict(TrackId(3)).is_none());
        assert_eq!(guard.stats().tracks_lost, 1);
    }

    #[test]
    fn test_dangerous_object_serializes() {
        let mut guard = guard();
        guard.update(&frame(&[(7, 3.0, 0.0)]));
        guard.update(&frame(&[(7, 3.0, 0.0)]));

        let dangerous = guard.dangerous_objects();
        let json = serde_json::to_value(&dangerous[&TrackId(7)]).unwrap();
        assert_eq!(json["track_id"], 7);
        assert_eq!(json["location"][0], 3.0);
        assert_eq!(json["future_path"].as_array().unwrap().len(), 11);
    }
}
