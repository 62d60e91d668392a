//! Integration tests for the tracking pipeline.
//!
//! These tests verify the complete data flows:
//! - Satellite status → EnvironmentMonitor → controller (indoor flags)
//! - Location fixes → controller → sink/subscribers
//! - Sensor samples → DeadReckoningEngine → controller → subscribers
//! - Zone-aware and periodic mode arbitration, including idempotence
//!
//! Run with: `cargo test --test tracking_integration`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};

use geostride::environment::{SatelliteInfo, SatelliteSnapshot};
use geostride::geo::GeoPoint;
use geostride::pdr::SensorSample;
use geostride::session::{SessionConfig, TrackingSession};
use geostride::sources::{
    Fix, FixError, LocationProvider, SatelliteStatusSource, SensorSource, UpdateProfile,
};
use geostride::tracking::{ControllerConfig, PositioningMode, TrackingPolicy, TrackingStatus};

// ============================================================================
// Test Helpers
// ============================================================================

/// Office building coordinates for testing.
const OFFICE: GeoPoint = GeoPoint::new(53.630278, 9.988333);

/// Mock satellite-status source.
struct MockSatellites {
    granted: bool,
    tx: broadcast::Sender<SatelliteSnapshot>,
}

impl MockSatellites {
    fn new(granted: bool) -> Arc<Self> {
        let (tx, _) = broadcast::channel(32);
        Arc::new(Self { granted, tx })
    }

    fn send_indoor(&self) {
        let _ = self
            .tx
            .send(SatelliteSnapshot::new(vec![SatelliteInfo::new(true, 15.0); 2]));
    }

    fn send_outdoor(&self) {
        let _ = self
            .tx
            .send(SatelliteSnapshot::new(vec![SatelliteInfo::new(true, 30.0); 8]));
    }
}

impl SatelliteStatusSource for MockSatellites {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn subscribe(&self) -> broadcast::Receiver<SatelliteSnapshot> {
        self.tx.subscribe()
    }
}

/// Calls recorded against the mock location provider.
#[derive(Default)]
struct ProviderLog {
    starts: Vec<UpdateProfile>,
    stops: usize,
}

/// Mock location provider with scripted single-fix replies.
struct MockProvider {
    fix_tx: broadcast::Sender<Fix>,
    log: Mutex<ProviderLog>,
    fresh: Mutex<VecDeque<Result<Fix, FixError>>>,
}

impl MockProvider {
    fn new() -> Arc<Self> {
        let (fix_tx, _) = broadcast::channel(32);
        Arc::new(Self {
            fix_tx,
            log: Mutex::new(ProviderLog::default()),
            fresh: Mutex::new(VecDeque::new()),
        })
    }

    fn send_fix(&self, point: GeoPoint) {
        let _ = self.fix_tx.send(Fix::new(point, 3.0));
    }

    fn script_fresh(&self, reply: Result<Fix, FixError>) {
        self.fresh.lock().unwrap().push_back(reply);
    }

    fn starts(&self) -> Vec<UpdateProfile> {
        self.log.lock().unwrap().starts.clone()
    }

    fn stops(&self) -> usize {
        self.log.lock().unwrap().stops
    }
}

impl LocationProvider for MockProvider {
    fn start_updates(&self, profile: UpdateProfile) {
        self.log.lock().unwrap().starts.push(profile);
    }

    fn stop_updates(&self) {
        self.log.lock().unwrap().stops += 1;
    }

    fn subscribe(&self) -> broadcast::Receiver<Fix> {
        self.fix_tx.subscribe()
    }

    fn request_current_fix(&self, reply: oneshot::Sender<Result<Fix, FixError>>) {
        let next = self
            .fresh
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FixError::Unavailable("nothing scripted".into())));
        let _ = reply.send(next);
    }
}

/// Mock raw-sensor source that counts subscriptions.
struct MockSensors {
    tx: broadcast::Sender<SensorSample>,
    subscriptions: AtomicUsize,
}

impl MockSensors {
    fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        Arc::new(Self {
            tx,
            subscriptions: AtomicUsize::new(0),
        })
    }

    /// How many times dead reckoning subscribed (i.e. was started).
    fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Active receivers (0 once dead reckoning has fully stopped).
    fn active_receivers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Push one clean step: a quiet sample, then a threshold crossing.
    fn send_step(&self, t0_ms: u64) {
        let _ = self.tx.send(SensorSample::accelerometer(0.0, 0.0, 9.0, t0_ms));
        let _ = self
            .tx
            .send(SensorSample::accelerometer(0.0, 0.0, 11.0, t0_ms + 400));
    }
}

impl SensorSource for MockSensors {
    fn subscribe(&self) -> broadcast::Receiver<SensorSample> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.tx.subscribe()
    }
}

/// Short timing so the suite runs fast.
fn test_config(policy: TrackingPolicy) -> SessionConfig {
    SessionConfig {
        policy,
        controller: ControllerConfig {
            acquisition_window: Duration::from_millis(100),
            recheck_interval: Duration::from_millis(60),
            fix_request_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Harness {
    session: TrackingSession,
    satellites: Arc<MockSatellites>,
    provider: Arc<MockProvider>,
    sensors: Arc<MockSensors>,
}

fn harness(policy: TrackingPolicy) -> Harness {
    harness_with_permission(policy, true)
}

fn harness_with_permission(policy: TrackingPolicy, granted: bool) -> Harness {
    let satellites = MockSatellites::new(granted);
    let provider = MockProvider::new();
    let sensors = MockSensors::new();
    let session = TrackingSession::new(
        test_config(policy),
        satellites.clone(),
        provider.clone(),
        sensors.clone(),
    );
    Harness {
        session,
        satellites,
        provider,
        sensors,
    }
}

/// Let spawned tasks catch up.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

/// Drain everything currently queued on a broadcast receiver.
fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(value) = rx.try_recv() {
        out.push(value);
    }
    out
}

// ============================================================================
// Zone-Aware Policy: Satellite Tracking
// ============================================================================

#[tokio::test]
async fn test_session_starts_satellite_tracking() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;

    assert_eq!(h.provider.starts(), vec![UpdateProfile::HIGH_ACCURACY]);
    assert_eq!(h.sensors.subscription_count(), 0);

    let statuses = drain(&mut status_rx);
    assert_eq!(
        statuses.first(),
        Some(&TrackingStatus {
            indoor: false,
            pdr_active: false
        })
    );

    h.session.stop();
}

#[tokio::test]
async fn test_fix_reaches_subscribers_and_sink() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut position_rx = h.session.subscribe();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;

    let update = position_rx.try_recv().expect("fix should be forwarded");
    assert_eq!(update.point, OFFICE);
    assert_eq!(update.mode, PositioningMode::GpsActive);

    assert_eq!(h.session.sink().position(), Some(OFFICE));
    assert_eq!(h.session.sink().mode(), Some(PositioningMode::GpsActive));

    h.session.stop();
}

// ============================================================================
// Zone-Aware Policy: Dead-Reckoning Activation
// ============================================================================

#[tokio::test]
async fn test_indoor_in_zone_without_seed_enters_acquisition() {
    let h = harness(TrackingPolicy::ZoneAware);

    h.session.start();
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    // Satellite updates must stay up and dead reckoning must not start.
    assert_eq!(h.sensors.subscription_count(), 0);
    assert_eq!(h.provider.stops(), 0);
    assert_eq!(h.provider.starts(), vec![UpdateProfile::HIGH_ACCURACY]);

    h.session.stop();
}

#[tokio::test]
async fn test_acquisition_resolves_once_fix_arrives() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    // A fix lands inside the acquisition window.
    h.provider.send_fix(OFFICE);

    // After the window elapses the decision re-runs and finds a seed.
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(h.sensors.subscription_count(), 1);
    assert_eq!(h.provider.stops(), 1);
    let statuses = drain(&mut status_rx);
    assert!(statuses.contains(&TrackingStatus {
        indoor: true,
        pdr_active: true
    }));

    h.session.stop();
}

#[tokio::test]
async fn test_indoor_in_zone_with_seed_switches_to_dead_reckoning() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    assert_eq!(h.sensors.subscription_count(), 1);
    assert_eq!(h.provider.stops(), 1);
    let statuses = drain(&mut status_rx);
    assert!(statuses.contains(&TrackingStatus {
        indoor: true,
        pdr_active: true
    }));

    // Re-delivering the same inputs must not restart anything.
    h.satellites.send_indoor();
    h.session.set_zone(true);
    settle().await;

    assert_eq!(h.sensors.subscription_count(), 1);
    assert_eq!(h.provider.stops(), 1);
    assert_eq!(h.provider.starts().len(), 1);

    h.session.stop();
}

#[tokio::test]
async fn test_steps_drive_output_while_dead_reckoning() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut position_rx = h.session.subscribe();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    drain(&mut position_rx);
    h.sensors.send_step(1_000);
    settle().await;

    let update = position_rx
        .try_recv()
        .expect("step displacement should be forwarded");
    assert_eq!(update.mode, PositioningMode::PdrActive);
    // Azimuth is at its northward rest value, so the step adds latitude.
    assert!(update.point.latitude > OFFICE.latitude);
    assert_eq!(update.point.longitude, OFFICE.longitude);

    assert_eq!(h.session.sink().mode(), Some(PositioningMode::PdrActive));

    h.session.stop();
}

#[tokio::test]
async fn test_fix_not_forwarded_while_dead_reckoning() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut position_rx = h.session.subscribe();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    drain(&mut position_rx);

    // A stray fix while dead reckoning owns the output.
    let elsewhere = GeoPoint::new(43.6, 1.4);
    h.provider.send_fix(elsewhere);
    settle().await;

    assert!(
        position_rx.try_recv().is_err(),
        "fixes must not reach the output while dead reckoning is active"
    );

    h.session.stop();
}

// ============================================================================
// Zone-Aware Policy: Returning to Satellite Tracking
// ============================================================================

#[tokio::test]
async fn test_outdoor_flip_returns_to_satellite_exactly_once() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;
    assert_eq!(h.sensors.subscription_count(), 1);

    drain(&mut status_rx);
    h.satellites.send_outdoor();
    settle().await;

    // Exactly one engine stop and one satellite restart.
    assert_eq!(h.sensors.active_receivers(), 0);
    assert_eq!(h.provider.starts().len(), 2);
    let statuses = drain(&mut status_rx);
    assert!(statuses.contains(&TrackingStatus {
        indoor: false,
        pdr_active: false
    }));

    // A second outdoor reading changes nothing.
    h.satellites.send_outdoor();
    settle().await;
    assert_eq!(h.provider.starts().len(), 2);
    assert_eq!(h.sensors.subscription_count(), 1);

    h.session.stop();
}

#[tokio::test]
async fn test_zone_exit_reactivates_satellite() {
    let h = harness(TrackingPolicy::ZoneAware);

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;
    assert_eq!(h.provider.stops(), 1);

    h.session.set_zone(false);
    settle().await;

    assert_eq!(h.sensors.active_receivers(), 0);
    assert_eq!(h.provider.starts().len(), 2);

    h.session.stop();
}

// ============================================================================
// Zone-Aware Policy: Session Lifecycle
// ============================================================================

#[tokio::test]
async fn test_stop_emits_terminal_status_and_cleans_up() {
    let h = harness(TrackingPolicy::ZoneAware);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    drain(&mut status_rx);
    h.session.stop();
    settle().await;

    assert!(!h.session.is_running());
    assert_eq!(h.sensors.active_receivers(), 0);
    let statuses = drain(&mut status_rx);
    assert_eq!(
        statuses.last(),
        Some(&TrackingStatus {
            indoor: true,
            pdr_active: false
        })
    );
}

#[tokio::test]
async fn test_restart_behaves_like_fresh_session() {
    let h = harness(TrackingPolicy::ZoneAware);

    h.session.start();
    settle().await;
    h.provider.send_fix(OFFICE);
    settle().await;
    h.session.stop();
    settle().await;

    h.session.start();
    settle().await;

    // The restarted session requested satellite updates again...
    assert_eq!(
        h.provider.starts(),
        vec![UpdateProfile::HIGH_ACCURACY, UpdateProfile::HIGH_ACCURACY]
    );

    // ...and forgot the previous session's seed point: going indoor in
    // zone must fall into acquisition, not dead reckoning.
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    assert_eq!(h.sensors.subscription_count(), 0);

    h.session.stop();
}

#[tokio::test]
async fn test_stop_cancels_pending_acquisition_timer() {
    let h = harness(TrackingPolicy::ZoneAware);

    h.session.start();
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    settle().await;

    // Stop while the acquisition window is pending.
    h.session.stop();
    settle().await;
    let starts_at_stop = h.provider.starts().len();
    let stops_at_stop = h.provider.stops();

    // Wait well past the window: the cancelled timer must not resurrect
    // any side effects.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.provider.starts().len(), starts_at_stop);
    assert_eq!(h.provider.stops(), stops_at_stop);
    assert_eq!(h.sensors.subscription_count(), 0);
}

#[tokio::test]
async fn test_missing_permission_keeps_environment_unknown() {
    let h = harness_with_permission(TrackingPolicy::ZoneAware, false);
    let mut status_rx = h.session.subscribe_status();

    h.session.start();
    settle().await;
    h.session.set_zone(true);
    h.satellites.send_indoor();
    h.satellites.send_indoor();
    settle().await;

    // The environment stream closed without a value, so nothing may have
    // reported indoor=true and dead reckoning may not engage.
    let statuses = drain(&mut status_rx);
    assert!(statuses.iter().all(|s| !s.indoor));
    assert_eq!(h.sensors.subscription_count(), 0);

    h.session.stop();
}

// ============================================================================
// Periodic Policy
// ============================================================================

#[tokio::test]
async fn test_periodic_tight_fix_selects_satellite() {
    let h = harness(TrackingPolicy::Periodic);
    h.provider.script_fresh(Ok(Fix::new(OFFICE, 3.0)));

    h.session.start();
    settle().await;

    assert_eq!(h.provider.starts().first(), Some(&UpdateProfile::HIGH_ACCURACY));
    assert_eq!(h.sensors.subscription_count(), 0);
    assert_eq!(h.session.sink().mode(), Some(PositioningMode::GpsActive));
    assert_eq!(h.session.sink().position(), Some(OFFICE));

    h.session.stop();
}

#[tokio::test]
async fn test_periodic_loose_fix_falls_back_to_network_pdr() {
    let h = harness(TrackingPolicy::Periodic);
    // Poor accuracy: the fix is still the best available fallback point.
    h.provider.script_fresh(Ok(Fix::new(OFFICE, 30.0)));

    h.session.start();
    settle().await;

    assert_eq!(
        h.provider.starts().first(),
        Some(&UpdateProfile::BALANCED_POWER)
    );
    assert_eq!(h.sensors.subscription_count(), 1);
    assert_eq!(h.session.sink().mode(), Some(PositioningMode::NetworkPdr));
    assert_eq!(h.session.sink().position(), Some(OFFICE));

    h.session.stop();
}

#[tokio::test]
async fn test_periodic_error_without_seed_skips_dead_reckoning() {
    let h = harness(TrackingPolicy::Periodic);
    h.provider
        .script_fresh(Err(FixError::Unavailable("provider offline".into())));

    h.session.start();
    settle().await;

    // Fallback mode is selected, but with no point to seed from, dead
    // reckoning must not start and nothing is published.
    assert_eq!(h.sensors.subscription_count(), 0);
    assert!(h.session.sink().latest().is_none());

    h.session.stop();
}

#[tokio::test]
async fn test_periodic_error_with_seed_reuses_last_known() {
    let h = harness(TrackingPolicy::Periodic);
    h.provider.script_fresh(Ok(Fix::new(OFFICE, 3.0)));
    h.provider
        .script_fresh(Err(FixError::Unavailable("provider offline".into())));

    h.session.start();
    settle().await;
    assert_eq!(h.session.sink().mode(), Some(PositioningMode::GpsActive));

    // Second tick: the request fails, but the last known point seeds the
    // fallback.
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(h.session.sink().mode(), Some(PositioningMode::NetworkPdr));
    assert_eq!(h.session.sink().position(), Some(OFFICE));
    assert_eq!(h.sensors.subscription_count(), 1);

    h.session.stop();
}

#[tokio::test]
async fn test_periodic_steps_drive_output_in_network_pdr() {
    let h = harness(TrackingPolicy::Periodic);
    h.provider.script_fresh(Ok(Fix::new(OFFICE, 30.0)));
    let mut position_rx = h.session.subscribe();

    h.session.start();
    settle().await;
    drain(&mut position_rx);

    h.sensors.send_step(1_000);
    settle().await;

    let update = position_rx
        .try_recv()
        .expect("step displacement should be forwarded");
    assert_eq!(update.mode, PositioningMode::NetworkPdr);
    assert!(update.point.latitude > OFFICE.latitude);

    h.session.stop();
}
