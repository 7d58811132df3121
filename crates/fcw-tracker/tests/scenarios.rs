//! End-to-end guard behavior over short frame sequences

use approx::assert_abs_diff_eq;
use fcw_core::{Point2, Point3, TrackId};
use fcw_tracker::{CollisionGuard, GuardConfig, ZoneConfig};
use std::collections::HashMap;

fn scenario_config(safety_radius: f64) -> GuardConfig {
    GuardConfig {
        safety_radius,
        prediction_length: 2.0,
        prediction_step: 0.1,
        danger_zone: ZoneConfig::Rectangle {
            min: Point2::new(0.0, -1.5),
            max: Point2::new(20.0, 1.5),
        },
        ..Default::default()
    }
}

fn single(id: u32, x: f64, y: f64) -> HashMap<TrackId, Point3> {
    HashMap::from([(TrackId(id), Point3::on_ground(x, y))])
}

/// Feed one object through `ys` at a fixed `x`
fn approach(guard: &mut CollisionGuard, id: u32, x: f64, ys: &[f64]) {
    for &y in ys {
        guard.update(&single(id, x, y));
    }
}

#[test]
fn test_approaching_object_is_dangerous() {
    let mut guard = CollisionGuard::new(scenario_config(25.0)).unwrap();
    approach(&mut guard, 1, 0.0, &[15.0, 10.0, 5.0]);

    let dangerous = guard.dangerous_objects();
    let danger = dangerous.get(&TrackId(1)).expect("object should be flagged");

    assert!(danger.crosses_zone);
    assert!(!danger.ends_in_zone);
    assert!(danger.velocity.y < 0.0);
    assert_abs_diff_eq!(danger.velocity.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(danger.distance, 6.8985, epsilon = 1e-3);
    assert_eq!(danger.future_path.len(), 21);

    let end = danger.future_path.last().unwrap();
    assert!(end.y < -1.5, "path should run past the zone, ended at {}", end);
}

#[test]
fn test_velocity_needs_a_few_frames() {
    let mut guard = CollisionGuard::new(scenario_config(25.0)).unwrap();
    approach(&mut guard, 1, 0.0, &[15.0, 10.0]);

    // Still too slow after one correction for the path to reach the zone
    assert!(guard.dangerous_objects().is_empty());
    assert!(guard.get(TrackId(1)).unwrap().velocity().unwrap().y < 0.0);
}

#[test]
fn test_safety_radius_excludes_far_objects() {
    let mut guard = CollisionGuard::new(scenario_config(10.0)).unwrap();
    approach(&mut guard, 2, 15.0, &[15.0, 10.0, 5.0]);

    let object = guard.get(TrackId(2)).unwrap();
    assert!(object.distance() > 10.0);
    assert!(guard.dangerous_objects().is_empty());

    // Same motion with a wider radius is flagged
    let mut guard = CollisionGuard::new(scenario_config(25.0)).unwrap();
    approach(&mut guard, 2, 15.0, &[15.0, 10.0, 5.0]);
    assert!(guard.dangerous_objects().contains_key(&TrackId(2)));
}

#[test]
fn test_path_outside_zone_is_excluded() {
    let mut guard = CollisionGuard::new(scenario_config(25.0)).unwrap();
    // Receding to the left, alongside the zone
    approach(&mut guard, 3, 10.0, &[8.0, 11.0, 14.0]);

    let object = guard.get(TrackId(3)).unwrap();
    assert!(object.distance() < 25.0);
    let path = object.future_path(2.0, 0.1);
    assert!(path.points().iter().all(|p| p.y > 1.5));
    assert!(guard.dangerous_objects().is_empty());
}

#[test]
fn test_mixed_frame_lifecycle() {
    let mut guard = CollisionGuard::new(scenario_config(25.0)).unwrap();

    let mut frame = single(1, 0.0, 15.0);
    frame.insert(TrackId(2), Point3::on_ground(10.0, 8.0));
    guard.update(&frame);

    let mut frame = single(1, 0.0, 10.0);
    frame.insert(TrackId(2), Point3::on_ground(10.0, 11.0));
    guard.update(&frame);

    // Object 2 drops out for a single frame and loses its history
    let changes = guard.update(&single(1, 0.0, 5.0));
    assert_eq!(changes.lost, vec![TrackId(2)]);
    assert_eq!(guard.track_ids(), vec![TrackId(1)]);

    let mut frame = single(1, 0.0, 0.0);
    frame.insert(TrackId(2), Point3::on_ground(10.0, 14.0));
    let changes = guard.update(&frame);
    assert_eq!(changes.started, vec![TrackId(2)]);
    assert_eq!(changes.updated, 1);
    assert_eq!(guard.get(TrackId(2)).unwrap().update_count(), 0);

    let dangerous = guard.dangerous_objects();
    assert!(dangerous.contains_key(&TrackId(1)));
    assert!(!dangerous.contains_key(&TrackId(2)));
}

#[test]
fn test_custom_polygon_zone() {
    let config = GuardConfig {
        danger_zone: ZoneConfig::Polygon {
            vertices: vec![
                Point2::new(0.0, -1.0),
                Point2::new(10.0, -3.0),
                Point2::new(10.0, 3.0),
                Point2::new(0.0, 1.0),
            ],
        },
        ..scenario_config(25.0)
    };
    let mut guard = CollisionGuard::new(config).unwrap();
    approach(&mut guard, 4, 8.0, &[2.0, 2.0]);

    let dangerous = guard.dangerous_objects();
    let danger = &dangerous[&TrackId(4)];
    assert!(danger.ends_in_zone);
    assert_abs_diff_eq!(danger.location.x, 8.0, epsilon = 1e-9);
}
