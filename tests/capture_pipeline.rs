//! End-to-end capture: mock location stream through session, sampler and reducer

use geocapture::{
    CaptureConfig, CaptureError, CaptureEvent, CaptureSession, GeoidCorrector, MockLocationSource,
    PoolTier, RawFix, Reducer, Sampler, SamplerState,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EPS: f64 = 1e-9;

fn fix(i: u64, accuracy_m: f64) -> RawFix {
    RawFix::new(41.0 + i as f64 * 1e-4, 29.0 + i as f64 * 1e-4, 1_000 + i * 500)
        .with_accuracy(accuracy_m)
        .with_altitude(100.0 + i as f64)
}

fn run_window(fixes: Vec<RawFix>) -> geocapture::CaptureResult<geocapture::ReducedCoordinate> {
    let mut session = CaptureSession::new(
        CaptureConfig::default(),
        Box::new(MockLocationSource::with_fixes(fixes)),
    );
    session.start_window(0).unwrap();
    assert!(session.poll(4_999).is_none());
    session.poll(5_000).expect("window should close at its deadline")
}

#[test]
fn test_high_tier_drops_outlier_and_worst() {
    // 40 m exceeds the 20 m threshold, so the high pool holds four fixes
    // and the trimmed mean keeps floor(4 * 0.8) = 3 of them.
    let fixes = vec![fix(0, 3.0), fix(1, 5.0), fix(2, 8.0), fix(3, 12.0), fix(4, 40.0)];
    let coord = run_window(fixes.clone()).unwrap();

    assert_eq!(coord.pool_tier, PoolTier::High);
    assert_eq!(coord.sample_count, 5);
    assert_eq!(coord.kept_count, 3);
    assert!((coord.lat - (fixes[0].lat + fixes[1].lat + fixes[2].lat) / 3.0).abs() < EPS);
    assert!((coord.accuracy_m.unwrap() - 16.0 / 3.0).abs() < EPS);
}

#[test]
fn test_medium_tier_keeps_two_best() {
    let fixes = vec![fix(0, 30.0), fix(1, 45.0), fix(2, 60.0)];
    let coord = run_window(fixes.clone()).unwrap();

    assert_eq!(coord.pool_tier, PoolTier::Medium);
    assert_eq!(coord.kept_count, 2);
    assert!((coord.accuracy_m.unwrap() - 37.5).abs() < EPS);
    assert!((coord.lon - (fixes[0].lon + fixes[1].lon) / 2.0).abs() < EPS);
}

#[test]
fn test_degraded_single_fix_passes_through() {
    let single = RawFix::new(-33.8688, 151.2093, 1_000).with_accuracy(500.0);
    let coord = run_window(vec![single.clone()]).unwrap();

    assert_eq!(coord.pool_tier, PoolTier::Degraded);
    assert_eq!(coord.kept_count, 1);
    assert_eq!(coord.lat, single.lat);
    assert_eq!(coord.lon, single.lon);
    assert_eq!(coord.accuracy_m, Some(500.0));
    assert_eq!(coord.orthometric_altitude_m, None);
}

#[test]
fn test_altitude_corrected_to_mean_sea_level() {
    // (50, 20) is an EGM96 grid node with +30 m undulation
    let raw = RawFix::new(50.0, 20.0, 0).with_accuracy(4.0).with_altitude(1000.0);
    let coord = run_window(vec![raw]).unwrap();
    assert!((coord.orthometric_altitude_m.unwrap() - 970.0).abs() < EPS);
}

#[test]
fn test_empty_window_is_an_error() {
    assert_eq!(run_window(Vec::new()), Err(CaptureError::NoData));
}

#[test]
fn test_reduction_is_deterministic() {
    let fixes = vec![fix(0, 9.0), fix(1, 4.0), fix(2, 4.0), fix(3, 15.0)];
    let a = run_window(fixes.clone()).unwrap();
    let b = run_window(fixes).unwrap();

    assert_eq!(a.lat, b.lat);
    assert_eq!(a.lon, b.lon);
    assert_eq!(a.accuracy_m, b.accuracy_m);
    assert_eq!(a.orthometric_altitude_m, b.orthometric_altitude_m);
}

#[test]
fn test_sampler_ignores_fixes_outside_window() {
    let mut sampler = Sampler::new(GeoidCorrector::egm96(), Reducer::default());
    sampler.on_fix(fix(0, 5.0)).unwrap();
    assert_eq!(sampler.sample_count(), 0);

    sampler.start_window(Duration::from_secs(5)).unwrap();
    sampler.on_fix(fix(1, 5.0)).unwrap();
    assert_eq!(sampler.tick(Duration::from_secs(5)), SamplerState::Completed);
    sampler.on_fix(fix(2, 5.0)).unwrap();

    let coord = sampler.complete().unwrap();
    assert_eq!(coord.sample_count, 1);
    assert_eq!(sampler.state(), SamplerState::Idle);
}

#[test]
fn test_session_event_sequence() {
    let mut session = CaptureSession::new(
        CaptureConfig::default(),
        Box::new(MockLocationSource::with_fixes(vec![fix(0, 6.0), fix(1, 6.0)])),
    );
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.register_event_callback(Box::new(move |event| {
        sink.lock().unwrap().push(event.clone());
    }));

    session.start_window(0).unwrap();
    session.poll(5_000).unwrap().unwrap();

    let recorded = events.lock().unwrap();
    assert_eq!(
        recorded.first(),
        Some(&CaptureEvent::WindowStarted { duration_secs: 5 })
    );
    assert_eq!(
        recorded.last(),
        Some(&CaptureEvent::WindowCompleted {
            sample_count: 2,
            success: true
        })
    );
    let accepted = recorded
        .iter()
        .filter(|e| matches!(e, CaptureEvent::SampleAccepted { .. }))
        .count();
    assert_eq!(accepted, 2);
}
