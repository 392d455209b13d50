use chrono::{TimeZone, Utc};
use gpx_trackstats_wasm::converter::to_feature_collection;
use gpx_trackstats_wasm::options::ProcessOptions;
use gpx_trackstats_wasm::options::TimeStepMode;
use gpx_trackstats_wasm::{
    extract_points, parse, smooth, total_distance, total_elevation_change, total_elevation_gain,
    TrackError, TrackPoint, TrackProcessor,
};

fn fixture_path(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

fn load_points(path: &str) -> Vec<TrackPoint> {
    let doc = parse(fixture_path(path)).unwrap();
    extract_points(&doc)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---- basic/ ----

#[test]
fn test_01_minimal_track() {
    init_logging();
    let doc = parse(fixture_path("basic/01_minimal_track.gpx")).unwrap();
    assert!(doc.version.is_none());
    assert_eq!(doc.tracks.len(), 1);
    assert_eq!(doc.tracks[0].name.as_deref(), Some("Test Track"));

    let points = extract_points(&doc);
    let expected = [
        (52.5200, 13.4050, Utc.with_ymd_and_hms(2025, 1, 21, 12, 0, 0).unwrap()),
        (52.5201, 13.4051, Utc.with_ymd_and_hms(2025, 1, 21, 12, 1, 0).unwrap()),
    ];
    assert_eq!(points.len(), expected.len());
    for (point, (lat, lon, time)) in points.iter().zip(expected) {
        assert_eq!(
            point,
            &TrackPoint {
                lat,
                lon,
                elevation: None,
                time: Some(time),
                heart_rate: None,
                power: None,
                cadence: None,
            }
        );
    }
}

#[test]
fn test_01_minimal_track_has_no_elevation_gain() {
    let points = load_points("basic/01_minimal_track.gpx");
    assert!(total_distance(&points) > 0.0);
    assert!(matches!(
        total_elevation_gain(&points),
        Err(TrackError::MissingElevation { index: 0 })
    ));
}

// ---- vendor/ ----

#[test]
fn test_02_garmin_v2_extensions() {
    let doc = parse(fixture_path("vendor/02_garmin_v2_extensions.gpx")).unwrap();
    assert_eq!(doc.creator.as_deref(), Some("Garmin Connect"));
    assert_eq!(doc.tracks[0].activity_type.as_deref(), Some("cycling"));
    assert_eq!(doc.tracks[0].segments.len(), 2);

    let points = extract_points(&doc);
    assert_eq!(points.len(), 3);

    assert_eq!(points[0].heart_rate, Some(118));
    assert_eq!(points[0].cadence, Some(82));
    assert_eq!(points[0].power, Some(180));
    assert_eq!(
        points[0].time,
        Some(Utc.with_ymd_and_hms(2025, 3, 2, 8, 15, 0).unwrap())
    );

    assert_eq!(points[1].heart_rate, Some(119));
    assert!(points[1].cadence.is_none());
    assert!(points[1].power.is_none());

    assert_eq!(points[2].elevation, Some(409.9));
    assert!(points[2].heart_rate.is_none());
}

// ---- edge_cases/ ----

#[test]
fn test_03_no_root() {
    assert!(matches!(
        parse(fixture_path("edge_cases/03_no_root.gpx")),
        Err(TrackError::MalformedDocument(_))
    ));
}

#[test]
fn test_04_missing_lon() {
    match parse(fixture_path("edge_cases/04_missing_lon.gpx")) {
        Err(TrackError::MissingField { element, attribute }) => {
            assert_eq!(element, "trkpt");
            assert_eq!(attribute, "lon");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn test_05_bad_heart_rate() {
    assert!(matches!(
        parse(fixture_path("edge_cases/05_bad_heart_rate.gpx")),
        Err(TrackError::MalformedNumber { field: "hr", .. })
    ));
}

#[test]
fn test_invalid_path() {
    let err = parse("badfile.txt").unwrap_err();
    assert!(matches!(err, TrackError::NotFound { .. }));
    assert!(err.to_string().contains("badfile.txt"));
}

// ---- real/ ----

#[test]
fn test_real_first_points() {
    let points = load_points("real/morning_run.gpx");
    let expected = [
        (54.4463680, -1.0879010, (10, 37, 45), 146.4, 90, 0, 0),
        (54.4463680, -1.0879010, (10, 37, 46), 146.4, 91, 109, 0),
        (54.4463360, -1.0878880, (10, 37, 47), 146.4, 91, 110, 80),
    ];
    for (point, (lat, lon, (h, m, s), ele, hr, power, cad)) in points.iter().zip(expected) {
        assert_eq!(point.lat, lat);
        assert_eq!(point.lon, lon);
        assert_eq!(
            point.time,
            Some(Utc.with_ymd_and_hms(2025, 1, 19, h, m, s).unwrap())
        );
        assert_eq!(point.elevation, Some(ele));
        assert_eq!(point.heart_rate, Some(hr));
        assert_eq!(point.power, Some(power));
        assert_eq!(point.cadence, Some(cad));
    }
}

#[test]
fn test_real_activity_name_and_type() {
    let doc = parse(fixture_path("real/morning_run.gpx")).unwrap();
    assert_eq!(doc.tracks[0].name.as_deref(), Some("Morning Run"));
    assert_eq!(doc.tracks[0].activity_type.as_deref(), Some("running"));
    assert_eq!(doc.creator.as_deref(), Some("StravaGPX"));
}

/// The recorded route is ~8.3 km.
#[test]
fn test_real_distance_within_expected_range() {
    let points = load_points("real/morning_run.gpx");
    let distance = total_distance(&points);
    assert!(distance > 8000.0, "got {distance}");
    assert!(distance < 9500.0, "got {distance}");
}

/// Two climbs of ~150 m each.
#[test]
fn test_real_elevation_within_expected_range() {
    init_logging();
    let points = load_points("real/morning_run.gpx");
    let gain = total_elevation_gain(&points).unwrap();
    assert!(gain > 250.0, "got {gain}");
    assert!(gain < 350.0, "got {gain}");

    let change = total_elevation_change(&points).unwrap();
    assert_eq!(change.gain, gain);
    assert!(change.loss > 250.0 && change.loss < 350.0, "got {}", change.loss);
}

#[test]
fn test_real_smoothing_is_one_to_one() {
    let points = load_points("real/morning_run.gpx");
    let smoothed = smooth(&points).unwrap();
    assert_eq!(smoothed.len(), points.len());
    assert!(smoothed.iter().all(|p| p.heart_rate.is_none() && p.time.is_none()));
}

#[test]
fn test_real_timestamp_steps_stay_in_range() {
    let points = load_points("real/morning_run.gpx");
    let processor = TrackProcessor::new(ProcessOptions {
        time_step: TimeStepMode::FromTimestamps,
        ..Default::default()
    });
    let gain = processor.total_elevation_gain(&points).unwrap();
    assert!(gain > 250.0 && gain < 350.0, "got {gain}");
}

#[test]
fn test_real_overlay() {
    let doc = parse(fixture_path("real/morning_run.gpx")).unwrap();
    let fc = to_feature_collection(&doc, &TrackProcessor::default()).unwrap();
    assert_eq!(fc.features.len(), 1);

    let props = fc.features[0].properties.as_ref().unwrap();
    assert_eq!(props["name"], "Morning Run");
    assert_eq!(props["type"], "running");
    let distance = props["distance"].as_f64().unwrap();
    assert!(distance > 8000.0 && distance < 9500.0);
    assert!(props["elevationGain"].as_f64().is_some());
}
