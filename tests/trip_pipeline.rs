use drivelog::{
    metrics::{self, TripSummary},
    route::RouteOverlay,
    Coordinate, DistanceUnit, DriveLogError, LatestFix, Recorder, SortOrder, SpeedUnit, TripStore,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tempfile::TempDir;

const ROUTE: [(f64, f64, f64); 4] = [
    (0.0, 0.0, 10.0),
    (0.0, 0.001, 20.0),
    (0.0, 0.002, 30.0),
    (0.0, 0.003, 20.0),
];

#[tokio::test(start_paused = true)]
async fn record_save_view_delete() {
    let dir = TempDir::new().unwrap();
    let store = TripStore::open(dir.path()).unwrap();

    let fix = LatestFix::new();
    let mut recorder = Recorder::new(fix.clone(), Duration::from_secs(3));
    recorder.start().unwrap();

    // Each fix lands between two ticks and is picked up by the next one
    tokio::time::sleep(Duration::from_secs(1)).await;
    for (lat, lon, speed) in ROUTE {
        fix.update(|state| {
            state.set_coordinate(Coordinate::new(lat, lon));
            state.set_speed(speed);
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    let key = recorder.stop_and_save(&store).await.unwrap().unwrap();
    assert_eq!(store.list(SortOrder::NewestFirst), vec![key.clone()]);

    let samples = store.load(&key).unwrap();
    let coordinates: Vec<Coordinate> = samples.iter().filter_map(|s| s.coordinate).collect();
    let expected: Vec<Coordinate> = ROUTE.iter().map(|&(lat, lon, _)| Coordinate::new(lat, lon)).collect();
    assert_eq!(coordinates, expected);

    assert_eq!(metrics::average_speed(&samples).unwrap(), 20.0);
    assert_eq!(metrics::top_speed(&samples).unwrap(), 30.0);

    // Three hops of 0.001 degrees along the equator
    let distance = metrics::total_distance(&samples);
    assert!((distance - 333.58).abs() < 0.5, "distance was {}", distance);

    let shown = TripSummary::from_samples(&samples).display(SpeedUnit::Kph, DistanceUnit::Kilometers);
    assert_eq!(shown.top_speed, "108 kph");
    assert_eq!(shown.average_speed, "72 kph");
    assert_eq!(shown.distance, "0 km");

    let route = RouteOverlay::from_samples(&samples).unwrap();
    assert_eq!(route.start, Coordinate::new(0.0, 0.0));
    assert_eq!(route.end, Coordinate::new(0.0, 0.003));

    assert!(store.delete(&key).unwrap());
    assert!(store.list(SortOrder::NewestFirst).is_empty());
    assert!(matches!(store.load(&key), Err(DriveLogError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn positioning_outage_does_not_stop_recording() {
    let dir = TempDir::new().unwrap();
    let store = TripStore::open(dir.path()).unwrap();

    let fix = LatestFix::new();
    let mut recorder = Recorder::new(fix.clone(), Duration::from_secs(3));
    recorder.start().unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    fix.update(|state| state.set_unavailable("location access denied"));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(recorder.is_recording());

    fix.update(|state| state.set_coordinate(Coordinate::new(51.5, -0.12)));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let key = recorder.stop_and_save(&store).await.unwrap().unwrap();
    let samples = store.load(&key).unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].coordinate, Some(Coordinate::new(51.5, -0.12)));
    assert_eq!(samples[0].speed, None);
}

#[tokio::test(start_paused = true)]
async fn nothing_captured_leaves_store_empty() {
    let dir = TempDir::new().unwrap();
    let store = TripStore::open(dir.path()).unwrap();

    let mut recorder = Recorder::new(LatestFix::new(), Duration::from_secs(3));
    recorder.start().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(recorder.stop_and_save(&store).await.unwrap(), None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
