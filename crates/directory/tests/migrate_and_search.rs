//! End-to-end: legacy documents in, migrated store, proximity search out.

use nearby_directory::prelude::*;
use nearby_directory::store::UserFilter;
use nearby_geo::{Coordinate, EARTH_RADIUS_KM};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const ORIGIN_LAT: f64 = 23.81;
const ORIGIN_LON: f64 = 90.41;

/// Latitude of a point `km` due north of the origin.
fn north_of_origin(km: f64) -> f64 {
    ORIGIN_LAT + km / EARTH_RADIUS_KM.to_radians()
}

fn user_at(id: &str, lat: f64, lon: f64) -> UserLocationRecord {
    UserLocationRecord::new(id, id, format!("{id}@example.com"))
        .with_location(LocationField::GeoPoint(Coordinate::new(lat, lon)))
}

fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_records(vec![
        user_at("me", ORIGIN_LAT, ORIGIN_LON),
        user_at("close", north_of_origin(0.5), ORIGIN_LON),
        user_at("edge", north_of_origin(9.9), ORIGIN_LON),
        user_at("outside", north_of_origin(15.0), ORIGIN_LON),
    ]))
}

#[test]
fn radius_search_from_a_user() {
    let engine = ProximityEngine::new(seeded_store());

    let results = engine
        .search(&SearchOrigin::User(UserId::new("me")), &SearchOptions::with_radius(10.0))
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["close", "edge"]);
    assert!((results[0].distance_km - 0.5).abs() < 1e-6);
    assert!((results[1].distance_km - 9.9).abs() < 1e-6);
}

#[test]
fn raw_radius_query_includes_the_origin_user() {
    let engine = ProximityEngine::new(seeded_store());
    let results = engine.find_within_radius(ORIGIN_LAT, ORIGIN_LON, 10.0).unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["me", "close", "edge"]);
    assert_eq!(results[0].distance_km, 0.0);
}

#[test]
fn bounds_and_sort_are_applied_before_self_exclusion() {
    let engine = ProximityEngine::new(seeded_store());
    let options = SearchOptions::with_radius(20.0)
        .bounds(DistanceBounds::parse(Some("1"), Some("")))
        .sort(SortMode::DistanceDesc);

    let results = engine.search(&SearchOrigin::User(UserId::new("me")), &options).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["outside", "edge"]);
}

#[test]
fn search_from_an_explicit_point() {
    let engine = ProximityEngine::new(seeded_store());
    let origin = SearchOrigin::Point {
        point: GeoPoint::new(ORIGIN_LAT, ORIGIN_LON).unwrap(),
        exclude: Some(UserId::new("close")),
    };

    let results = engine.search(&origin, &SearchOptions::with_radius(10.0)).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["me", "edge"]);
}

#[test]
fn self_is_never_returned() {
    let engine = ProximityEngine::new(seeded_store());
    for mode in SortMode::ALL {
        let options = SearchOptions::with_radius(50.0).sort(mode);
        let results = engine.search(&SearchOrigin::User(UserId::new("me")), &options).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.id().as_str() != "me"));
    }
}

#[test]
fn unmigrated_origin_fails_fast() {
    let store = Arc::new(MemoryStore::from_records(vec![
        UserLocationRecord::new("legacy", "legacy", "l@example.com")
            .with_location(LocationField::RawText("90.41,23.81".into())),
        user_at("other", ORIGIN_LAT, ORIGIN_LON),
    ]));
    let engine = ProximityEngine::new(Arc::clone(&store));
    let me = SearchOrigin::User(UserId::new("legacy"));

    let err = engine.search(&me, &SearchOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::NoUsableOrigin { problem: OriginProblem::NotNormalized, .. }
    ));

    LocationNormalizer::new(store.as_ref()).run().unwrap();
    let results = engine.search(&me, &SearchOptions::default()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].username(), "other");
}

#[test]
fn file_store_migration_is_idempotent_and_indexable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(
        &path,
        r#"[
            {"_id": "a", "username": "a", "email": "a@x", "location": "95,40"},
            {"_id": "b", "username": "b", "email": "b@x", "location": "200,300"},
            {"_id": "c", "username": "c", "email": "c@x", "location": "abc,12"},
            {"_id": "d", "username": "d", "email": "d@x", "location": {"type": "Point", "coordinates": [40.0, 95.0]}},
            {"_id": "e", "username": "e", "email": "e@x", "location": {"type": "Point", "coordinates": [90.41, 23.81]}},
            {"_id": "f", "username": "f", "email": "f@x"}
        ]"#,
    )
    .unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    let first = LocationNormalizer::new(&store).run().unwrap();
    assert_eq!((first.fixed, first.removed, first.already_ok), (2, 2, 1));

    let reopened = JsonFileStore::open(&path).unwrap();
    let a = reopened.find_one(&UserFilter::Id(UserId::new("a"))).unwrap().unwrap();
    assert_eq!(a.location.canonical(), Some(GeoPoint::new(40.0, 95.0).unwrap()));
    for id in ["b", "c"] {
        let record = reopened.find_one(&UserFilter::Id(UserId::new(id))).unwrap().unwrap();
        assert!(record.location.is_missing());
    }

    let before = reopened.snapshot().unwrap();
    let second = LocationNormalizer::new(&reopened).run().unwrap();
    assert_eq!((second.fixed, second.removed), (0, 0));
    assert_eq!(reopened.snapshot().unwrap(), before);

    let index = ensure_location_index(&reopened).unwrap();
    assert_eq!(index.stripped, 0);
    assert!(index.index_created);
}

#[test]
fn every_persisted_point_is_in_range() {
    let inputs = [
        "23.81,90.41", "90.41,23.81", "95,40", "-95,-40", "200,300", "abc,12", "", "1,2,",
        "90,180", "180,90", " -0.0 , 0.0 ", "1e3,1",
    ];
    let records = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            UserLocationRecord::new(format!("u{i}"), "u", "u@x")
                .with_location(LocationField::RawText((*text).to_string()))
        })
        .collect();
    let store = MemoryStore::from_records(records);

    LocationNormalizer::new(&store).run().unwrap();

    for record in store.snapshot().unwrap() {
        match record.location {
            LocationField::Missing => {}
            LocationField::GeoPoint(coord) => assert!(coord.is_valid(), "{coord:?}"),
            other => panic!("unexpected location after migration: {other:?}"),
        }
    }
}

#[tokio::test]
async fn live_refresh_runs_real_searches() {
    let engine = ProximityEngine::new(seeded_store());
    let me = SearchOrigin::User(UserId::new("me"));

    let (refresh, mut rx) = LiveRefresh::spawn(
        Duration::from_millis(20),
        SearchOptions::with_radius(1.0),
        move |options| engine.search(&me, options),
    );

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.sequence, 1);
    assert_eq!(first.result.unwrap().len(), 1);

    refresh.set_options(SearchOptions::with_radius(10.0));
    loop {
        let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if outcome.result.unwrap().len() == 2 {
            break;
        }
    }

    refresh.shutdown().await;
}
