use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::EstimationError;
use super::pricing::{FareEstimate, PricingCalculator};
use super::routes::{normalize, RouteInfo, RouteSourceKind, RouteTable};
use crate::external::google_maps::{DirectionsClient, DynDirectionsClient};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn route(&self, pickup: &str, destination: &str) -> Result<RouteInfo, EstimationError>;
}

pub type DynRouteSource = Arc<dyn RouteSource>;

/// Offline source backed by the static route table.
pub struct LocalRouteSource {
    table: RouteTable,
}

impl LocalRouteSource {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RouteSource for LocalRouteSource {
    async fn route(&self, pickup: &str, destination: &str) -> Result<RouteInfo, EstimationError> {
        Ok(self.table.route_or_default(pickup, destination))
    }
}

pub struct DirectionsRouteSource {
    client: DynDirectionsClient,
}

impl DirectionsRouteSource {
    pub fn new<C: DirectionsClient + 'static>(client: C) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn attempt(&self, pickup: &str, destination: &str) -> Result<RouteInfo, EstimationError> {
        match self.client.find_directions(pickup, destination).await {
            Ok(directions) => Ok(RouteInfo {
                distance_km: directions.distance_meters as f64 / 1000.0,
                base_time_minutes: ((directions.duration_seconds + 59) / 60) as u32,
                traffic_multiplier: 1.0,
                source: RouteSourceKind::Directions,
            }),
            Err(err) if err.is_route_not_found_error() => Err(EstimationError::RouteNotFound),
            Err(err) => {
                tracing::warn!("directions lookup failed: {}", err);
                Err(EstimationError::EstimationUnavailable)
            }
        }
    }
}

#[async_trait]
impl RouteSource for DirectionsRouteSource {
    #[tracing::instrument(skip(self))]
    async fn route(&self, pickup: &str, destination: &str) -> Result<RouteInfo, EstimationError> {
        match self.attempt(pickup, destination).await {
            Err(EstimationError::EstimationUnavailable) => {
                tracing::info!("retrying directions lookup after {:?}", RETRY_BACKOFF);
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.attempt(pickup, destination).await
            }
            result => result,
        }
    }
}

/// Route source and pricing bundled for estimation, shared by every estimator.
#[derive(Clone)]
pub struct FareService {
    source: DynRouteSource,
    calculator: Arc<PricingCalculator>,
    debounce: Duration,
}

impl FareService {
    pub fn new(source: DynRouteSource, calculator: PricingCalculator, debounce: Duration) -> Self {
        Self {
            source,
            calculator: Arc::new(calculator),
            debounce,
        }
    }

    pub fn calculator(&self) -> &PricingCalculator {
        &self.calculator
    }

    pub async fn estimate(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<FareEstimate, EstimationError> {
        let route = self.source.route(pickup, destination).await?;
        self.calculator.estimate(&route)
    }

    pub fn estimator(&self) -> Estimator {
        Estimator::new(self.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum EstimationState {
    Idle,
    Loading,
    Success(FareEstimate),
    Error(EstimationError),
}

#[derive(Default)]
struct Inputs {
    pickup: String,
    destination: String,
}

impl Inputs {
    fn is_estimable(&self) -> bool {
        let pickup = normalize(&self.pickup);
        let destination = normalize(&self.destination);

        !pickup.is_empty() && !destination.is_empty() && pickup != destination
    }
}

#[derive(Default)]
struct Inner {
    sequence: u64,
    inputs: Inputs,
    pending: Option<JoinHandle<()>>,
}

struct Shared {
    service: FareService,
    inner: Mutex<Inner>,
    state: watch::Sender<EstimationState>,
}

impl Shared {
    // Publishes only if no newer request has been issued since `sequence`.
    fn publish(&self, sequence: u64, state: EstimationState) -> bool {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };

        if inner.sequence != sequence {
            tracing::debug!(sequence, current = inner.sequence, "discarding stale estimate");
            return false;
        }

        self.state.send_replace(state);
        true
    }

    async fn run(self: Arc<Self>, sequence: u64, pickup: String, destination: String, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !self.publish(sequence, EstimationState::Loading) {
            return;
        }

        let state = match self.service.estimate(&pickup, &destination).await {
            Ok(estimate) => EstimationState::Success(estimate),
            Err(err) => EstimationState::Error(err),
        };

        self.publish(sequence, state);
    }
}

/// Debounced, cancelable fare estimation for one pair of pickup/destination inputs.
///
/// Every input change or recalculation starts a new request; only the latest
/// request's result is ever published. Must be used from within a tokio runtime.
pub struct Estimator {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl Estimator {
    pub fn new(service: FareService) -> Self {
        let debounce = service.debounce;
        let (state, _) = watch::channel(EstimationState::Idle);

        Self {
            shared: Arc::new(Shared {
                service,
                inner: Mutex::new(Inner::default()),
                state,
            }),
            debounce,
        }
    }

    pub fn state(&self) -> EstimationState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EstimationState> {
        self.shared.state.subscribe()
    }

    pub fn set_inputs(&self, pickup: impl Into<String>, destination: impl Into<String>) {
        let inputs = Inputs {
            pickup: pickup.into(),
            destination: destination.into(),
        };

        self.schedule(Some(inputs), self.debounce);
    }

    /// Runs immediately for the current inputs, skipping the debounce.
    pub fn recalculate(&self) {
        self.schedule(None, Duration::ZERO);
    }

    fn schedule(&self, inputs: Option<Inputs>, delay: Duration) {
        let mut inner = match self.shared.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };

        inner.sequence += 1;
        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }
        if let Some(inputs) = inputs {
            inner.inputs = inputs;
        }

        self.shared.state.send_replace(EstimationState::Idle);

        if !inner.inputs.is_estimable() {
            return;
        }

        let task = Arc::clone(&self.shared).run(
            inner.sequence,
            inner.inputs.pickup.clone(),
            inner.inputs.destination.clone(),
            delay,
        );
        inner.pending = Some(tokio::spawn(task));
    }
}

impl Drop for Estimator {
    fn drop(&mut self) {
        let mut inner = match self.shared.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fare::pricing::{FixedClock, PricingConfig};
    use chrono::{FixedOffset, TimeZone, Utc};
    use crate::error::{route_not_found_error, upstream_error, Error};
    use crate::external::google_maps::Directions;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Route source with per-pickup latency that counts its calls.
    struct ScriptedSource {
        calls: AtomicUsize,
        latency: HashMap<&'static str, Duration>,
        failure: Option<EstimationError>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                latency: HashMap::new(),
                failure: None,
            }
        }
    }

    #[async_trait]
    impl RouteSource for ScriptedSource {
        async fn route(&self, pickup: &str, destination: &str) -> Result<RouteInfo, EstimationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(latency) = self.latency.get(pickup) {
                tokio::time::sleep(*latency).await;
            }

            if let Some(err) = self.failure {
                return Err(err);
            }

            Ok(RouteTable::kolkata().route_or_default(pickup, destination))
        }
    }

    fn service(source: Arc<ScriptedSource>) -> FareService {
        let offset = FixedOffset::east_opt(330 * 60).unwrap();
        let noon = offset.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        let calculator = PricingCalculator::new(
            PricingConfig::default(),
            Arc::new(FixedClock(noon.with_timezone(&Utc))),
            offset,
        )
        .unwrap();

        FareService::new(source, calculator, DEFAULT_DEBOUNCE)
    }

    fn distance(state: &EstimationState) -> Option<f64> {
        match state {
            EstimationState::Success(estimate) => Some(estimate.distance_km),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_fire_once() {
        let source = Arc::new(ScriptedSource::new());
        let estimator = service(source.clone()).estimator();

        estimator.set_inputs("Park", "Howrah Station");
        tokio::time::sleep(Duration::from_millis(100)).await;
        estimator.set_inputs("Park Str", "Howrah Station");
        tokio::time::sleep(Duration::from_millis(100)).await;
        estimator.set_inputs("Park Street", "Howrah Station");

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(estimator.state(), EstimationState::Idle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(distance(&estimator.state()), Some(7.8));
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_inputs_stay_idle() {
        let source = Arc::new(ScriptedSource::new());
        let estimator = service(source.clone()).estimator();

        estimator.set_inputs("Park Street", "");
        tokio::time::sleep(Duration::from_secs(1)).await;
        estimator.set_inputs("Park Street", " park street ");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(estimator.state(), EstimationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn recalculate_skips_debounce() {
        let source = Arc::new(ScriptedSource::new());
        let estimator = service(source.clone()).estimator();
        let mut states = estimator.subscribe();

        estimator.set_inputs("Park Street", "Sealdah Station");
        estimator.recalculate();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(distance(&estimator.state()), Some(4.2));

        // the debounced request was superseded, nothing else fires
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(states.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_result_never_overwrites_newer_one() {
        let mut scripted = ScriptedSource::new();
        scripted.latency.insert("Howrah Station", Duration::from_secs(3));
        scripted.latency.insert("Esplanade", Duration::from_millis(50));
        let source = Arc::new(scripted);
        let estimator = service(source.clone()).estimator();

        estimator.set_inputs("Howrah Station", "Kolkata Airport");
        estimator.recalculate();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(estimator.state(), EstimationState::Loading);

        estimator.set_inputs("Esplanade", "Victoria Memorial");
        estimator.recalculate();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(distance(&estimator.state()), Some(2.4));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_sequence_is_discarded() {
        let source = Arc::new(ScriptedSource::new());
        let estimator = service(source).estimator();

        estimator.set_inputs("Park Street", "Gariahat");
        let stale = estimator.shared.inner.lock().unwrap().sequence;
        estimator.set_inputs("Park Street", "New Town");

        assert!(!estimator.shared.publish(stale, EstimationState::Loading));
        assert_eq!(estimator.state(), EstimationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failures_surface_as_errors() {
        let mut scripted = ScriptedSource::new();
        scripted.failure = Some(EstimationError::RouteNotFound);
        let estimator = service(Arc::new(scripted)).estimator();

        estimator.set_inputs("Atlantis", "El Dorado");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(
            estimator.state(),
            EstimationState::Error(EstimationError::RouteNotFound)
        );
    }

    #[tokio::test]
    async fn local_path_is_deterministic() {
        let source = Arc::new(ScriptedSource::new());
        let service = service(source);

        let first = service.estimate("Park Street", "Howrah Station").await.unwrap();
        let second = service.estimate("Park Street", "Howrah Station").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn local_source_uses_table_then_default() {
        let source = LocalRouteSource::new(RouteTable::kolkata());

        let known = source.route("new town", "KOLKATA AIRPORT").await.unwrap();
        assert_eq!(known.distance_km, 8.1);
        assert_eq!(known.source, RouteSourceKind::Table);

        let unknown = source.route("behala", "jadavpur").await.unwrap();
        assert_eq!(unknown.source, RouteSourceKind::Default);
    }

    /// Directions client replaying canned responses in order.
    struct CannedDirections {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<Result<Directions, Error>>>,
    }

    impl CannedDirections {
        fn new(responses: Vec<Result<Directions, Error>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl DirectionsClient for Arc<CannedDirections> {
        async fn find_directions(&self, _origin: &str, _destination: &str) -> Result<Directions, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(upstream_error()))
        }
    }

    fn howrah_directions() -> Directions {
        Directions {
            distance_meters: 7800,
            duration_seconds: 1500,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn directions_outage_is_retried_once_after_backoff() {
        let client = CannedDirections::new(vec![Err(upstream_error()), Ok(howrah_directions())]);
        let source = DirectionsRouteSource::new(client.clone());

        let started = tokio::time::Instant::now();
        let route = source.route("Park Street", "Howrah Station").await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= RETRY_BACKOFF);
        assert_eq!(route.distance_km, 7.8);
        assert_eq!(route.base_time_minutes, 25);
        assert_eq!(route.source, RouteSourceKind::Directions);
    }

    #[tokio::test(start_paused = true)]
    async fn directions_gives_up_after_second_failure() {
        let client = CannedDirections::new(vec![Err(upstream_error()), Err(upstream_error())]);
        let source = DirectionsRouteSource::new(client.clone());

        let err = source.route("Park Street", "Howrah Station").await.unwrap_err();

        assert_eq!(err, EstimationError::EstimationUnavailable);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_route_is_not_retried() {
        let client = CannedDirections::new(vec![Err(route_not_found_error()), Ok(howrah_directions())]);
        let source = DirectionsRouteSource::new(client.clone());

        let started = tokio::time::Instant::now();
        let err = source.route("Park Street", "Atlantis").await.unwrap_err();

        assert_eq!(err, EstimationError::RouteNotFound);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < RETRY_BACKOFF);
    }
}
