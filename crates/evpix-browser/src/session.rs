//! Browsing session for one event.
//!
//! A session loads clusters through the shared cache, crops every sample
//! once, rotates the displayed sample on a timer and keeps the selection in
//! sync with the page query. Shutting it down stops the timer and abandons
//! in-flight crops.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use evpix_clusters::{ClusterCache, LoadOrigin};
use evpix_media::{placeholder, CropResult, FaceCropper, MediaError, MediaResult};
use evpix_models::{BoundingBox, Cluster, ClusterId, ClusterKind, CropParams, FaceId};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{clamp_sample_size, BrowserConfig};
use crate::cycling::CyclingState;
use crate::error::{BrowserError, BrowserResult};
use crate::failures::CropFailureSet;
use crate::filter::{FilterSynchronizer, QueryState};
use crate::gallery::GalleryFilter;
use crate::selection::{Selection, ToggleOutcome};
use crate::thumbnails::ThumbnailTable;
use crate::view::{processing_notice, BrowserView, ClusterCard, EmptyState};

/// Process-wide collaborators shared by every session.
#[derive(Clone)]
pub struct BrowserServices {
    pub cache: Arc<ClusterCache>,
    pub cropper: Arc<dyn FaceCropper>,
    pub failures: Arc<CropFailureSet>,
}

impl BrowserServices {
    pub fn new(cache: Arc<ClusterCache>, cropper: Arc<dyn FaceCropper>) -> Self {
        Self {
            cache,
            cropper,
            failures: Arc::new(CropFailureSet::new()),
        }
    }
}

/// Outcome of one load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub origin: LoadOrigin,
    pub clusters: usize,
    pub crops_ready: usize,
    pub crops_failed: usize,
    /// A later load started before this one finished; its result was discarded
    pub superseded: bool,
}

impl LoadReport {
    fn new(origin: LoadOrigin, clusters: usize) -> Self {
        Self {
            origin,
            clusters,
            crops_ready: 0,
            crops_failed: 0,
            superseded: false,
        }
    }
}

struct CropJob {
    face_id: FaceId,
    image_ref: String,
    bbox: BoundingBox,
    params: CropParams,
}

#[derive(Default)]
struct BrowserState {
    clusters: Arc<Vec<Cluster>>,
    origin: Option<LoadOrigin>,
    cycling: CyclingState,
    selection: Selection,
    thumbnails: ThumbnailTable,
    sample_size: u32,
    load_seq: u64,
}

pub struct BrowserSession {
    event_code: String,
    services: BrowserServices,
    config: BrowserConfig,
    filter: FilterSynchronizer,
    state: Arc<RwLock<BrowserState>>,
    person_placeholder: CropResult,
    unassigned_placeholder: CropResult,
    shutdown: watch::Sender<bool>,
    cycler: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserSession {
    pub fn new(
        event_code: impl Into<String>,
        services: BrowserServices,
        config: BrowserConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let state = BrowserState {
            sample_size: clamp_sample_size(config.sample_size),
            ..Default::default()
        };

        Self {
            event_code: event_code.into(),
            services,
            filter: FilterSynchronizer::new(config.filter_param.clone()),
            person_placeholder: placeholder(&config.person_crop),
            unassigned_placeholder: placeholder(&config.unassigned_crop),
            config,
            state: Arc::new(RwLock::new(state)),
            shutdown,
            cycler: Mutex::new(None),
        }
    }

    /// Restore the selection from the query, load clusters and start cycling.
    pub async fn open(&self, query: &dyn QueryState) -> BrowserResult<LoadReport> {
        self.restore_selection(query).await;
        let report = self.load().await?;
        self.start_cycling();
        Ok(report)
    }

    pub fn event_code(&self) -> &str {
        &self.event_code
    }

    pub async fn sample_size(&self) -> u32 {
        self.state.read().await.sample_size
    }

    /// Load through the cache, serving a fresh entry if there is one.
    pub async fn load(&self) -> BrowserResult<LoadReport> {
        self.load_clusters(false).await
    }

    /// Load bypassing fresh cache entries.
    pub async fn refresh(&self) -> BrowserResult<LoadReport> {
        self.load_clusters(true).await
    }

    /// Manual retry from the empty state.
    pub async fn retry(&self) -> BrowserResult<LoadReport> {
        info!(event_code = %self.event_code, "Retrying cluster load");
        self.refresh().await
    }

    /// Change the number of samples per cluster and reload.
    pub async fn set_sample_size(&self, sample_size: u32) -> BrowserResult<LoadReport> {
        let sample_size = clamp_sample_size(sample_size);
        self.state.write().await.sample_size = sample_size;
        self.load().await
    }

    async fn load_clusters(&self, force_refresh: bool) -> BrowserResult<LoadReport> {
        if self.is_shut_down() {
            return Err(BrowserError::ShutDown);
        }

        let (seq, sample_size) = {
            let mut state = self.state.write().await;
            state.load_seq += 1;
            (state.load_seq, state.sample_size)
        };

        let mut shutdown_rx = self.shutdown.subscribe();
        let load = tokio::select! {
            load = self.services.cache.load(&self.event_code, sample_size, force_refresh) => load,
            _ = shutdown_requested(&mut shutdown_rx) => return Err(BrowserError::ShutDown),
        };

        let clusters = load.clusters;
        let mut report = LoadReport::new(load.origin, clusters.len());

        let jobs = {
            let mut state = self.state.write().await;
            if state.load_seq != seq {
                debug!(event_code = %self.event_code, "Discarding superseded cluster load");
                report.superseded = true;
                return Ok(report);
            }

            state.clusters = Arc::clone(&clusters);
            state.origin = Some(report.origin.clone());
            state.cycling = CyclingState::from_clusters(&clusters);

            let live: HashSet<FaceId> = clusters
                .iter()
                .flat_map(|c| c.samples.iter().map(|s| s.face_id))
                .collect();
            state.thumbnails.retain(|face_id| live.contains(&face_id));

            self.plan_crops(&mut state, &clusters).await
        };

        debug!(
            event_code = %self.event_code,
            clusters = clusters.len(),
            crops = jobs.len(),
            "Clusters loaded"
        );

        let timeout = self.config.crop_timeout;
        let mut in_flight: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| {
                let cropper = Arc::clone(&self.services.cropper);
                async move {
                    let crop = cropper.crop(&job.image_ref, job.bbox, job.params);
                    let outcome = match tokio::time::timeout(timeout, crop).await {
                        Ok(result) => result,
                        Err(_) => Err(MediaError::Timeout(timeout)),
                    };
                    (job.face_id, outcome)
                }
            })
            .collect();

        loop {
            tokio::select! {
                next = in_flight.next() => match next {
                    Some((face_id, outcome)) => {
                        self.record_crop(face_id, outcome, &mut report).await
                    }
                    None => break,
                },
                _ = shutdown_requested(&mut shutdown_rx) => {
                    debug!(
                        event_code = %self.event_code,
                        abandoned = in_flight.len(),
                        "Abandoning in-flight crops"
                    );
                    return Err(BrowserError::ShutDown);
                }
            }
        }

        Ok(report)
    }

    /// Decide which samples need a crop. Known failures are marked failed
    /// without being submitted; ready and in-flight crops are left alone.
    async fn plan_crops(&self, state: &mut BrowserState, clusters: &[Cluster]) -> Vec<CropJob> {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for cluster in clusters {
            let params = self.crop_params(cluster.cluster_id);
            for sample in &cluster.samples {
                if !seen.insert(sample.face_id) {
                    continue;
                }
                if self.services.failures.contains(sample.face_id).await {
                    state.thumbnails.mark_failed(sample.face_id);
                    continue;
                }
                if state.thumbnails.is_ready_or_pending(sample.face_id) {
                    continue;
                }

                state.thumbnails.mark_pending(sample.face_id);
                jobs.push(CropJob {
                    face_id: sample.face_id,
                    image_ref: sample.sample_blob_url.clone(),
                    bbox: sample.sample_bbox,
                    params,
                });
            }
        }

        jobs
    }

    async fn record_crop(
        &self,
        face_id: FaceId,
        outcome: MediaResult<CropResult>,
        report: &mut LoadReport,
    ) {
        let outcome = match outcome {
            Ok(crop) if crop.placeholder => {
                Err(MediaError::remote("cropper returned a placeholder"))
            }
            other => other,
        };

        match outcome {
            Ok(crop) => {
                self.state.write().await.thumbnails.mark_ready(face_id, crop);
                report.crops_ready += 1;
            }
            Err(e) => {
                warn!(face_id, reason = e.reason(), "Face crop failed: {}", e);
                self.services.failures.insert(face_id).await;
                self.state.write().await.thumbnails.mark_failed(face_id);
                report.crops_failed += 1;
            }
        }
    }

    fn crop_params(&self, cluster_id: ClusterId) -> CropParams {
        match cluster_id.kind() {
            ClusterKind::Person(_) => self.config.person_crop,
            _ => self.config.unassigned_crop,
        }
    }

    fn crop_placeholder(&self, cluster_id: ClusterId) -> &CropResult {
        match cluster_id.kind() {
            ClusterKind::Person(_) => &self.person_placeholder,
            _ => &self.unassigned_placeholder,
        }
    }

    /// Advance every rotating cluster by one sample.
    pub async fn tick(&self) -> usize {
        self.state.write().await.cycling.tick()
    }

    /// Current `cluster_id -> sample index` map.
    pub async fn cycling(&self) -> CyclingState {
        self.state.read().await.cycling.clone()
    }

    /// Spawn the timer that calls [`tick`](Self::tick) every
    /// `cycle_interval`. Restarting replaces the previous timer.
    pub fn start_cycling(&self) {
        if self.is_shut_down() {
            return;
        }

        let state = Arc::clone(&self.state);
        let period = self.config.cycle_interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown_rx) => break,
                    _ = ticker.tick() => {
                        state.write().await.cycling.tick();
                    }
                }
            }
        });

        if let Ok(mut cycler) = self.cycler.lock() {
            if let Some(previous) = cycler.replace(task) {
                previous.abort();
            }
        }
    }

    /// Load the selection from the query, replacing the current one.
    pub async fn restore_selection(&self, query: &dyn QueryState) -> Selection {
        let selection = self.filter.load(query);
        self.state.write().await.selection = selection.clone();
        selection
    }

    /// Toggle a cluster and persist the selection into `query`.
    pub async fn toggle(&self, cluster_id: ClusterId, query: &mut dyn QueryState) -> ToggleOutcome {
        let mut state = self.state.write().await;
        let outcome = state.selection.toggle(cluster_id);
        if outcome.changed() {
            self.filter.persist(&state.selection, query);
        } else {
            debug!(cluster_id = %cluster_id, "Ignoring toggle of non-selectable cluster");
        }
        outcome
    }

    /// Deselect everything and remove the filter from `query`.
    pub async fn clear_selection(&self, query: &mut dyn QueryState) {
        let mut state = self.state.write().await;
        state.selection.clear();
        self.filter.persist(&state.selection, query);
    }

    pub async fn selection(&self) -> Selection {
        self.state.read().await.selection.clone()
    }

    pub async fn gallery_filter(&self) -> GalleryFilter {
        GalleryFilter::from_selection(&self.state.read().await.selection)
    }

    /// Snapshot of what should be displayed.
    pub async fn view(&self) -> BrowserView {
        let state = self.state.read().await;
        let mut view = BrowserView {
            selected: state.selection.to_vec(),
            ..Default::default()
        };

        for cluster in state.clusters.iter() {
            let kind = cluster.cluster_id.kind();
            if cluster.cluster_id.is_sentinel() && cluster.face_count == 0 {
                continue;
            }

            let fallback = self.crop_placeholder(cluster.cluster_id);
            let current_sample = state.cycling.index(cluster.cluster_id);
            let thumbnail = current_sample
                .and_then(|i| cluster.samples.get(i))
                .and_then(|s| state.thumbnails.ready(s.face_id))
                .unwrap_or(fallback)
                .clone();

            match kind {
                ClusterKind::Processing => {
                    view.processing_notice = Some(processing_notice(cluster.face_count));
                }
                ClusterKind::Unassigned => {
                    view.unassigned_strip.extend(cluster.samples.iter().map(|s| {
                        state
                            .thumbnails
                            .ready(s.face_id)
                            .unwrap_or(fallback)
                            .clone()
                    }));
                }
                ClusterKind::Person(_) => {}
            }

            view.cards.push(ClusterCard {
                cluster_id: cluster.cluster_id,
                title: cluster.title(),
                caption: cluster.caption(),
                face_count: cluster.face_count,
                sample_count: cluster.samples.len(),
                current_sample,
                selectable: cluster.is_selectable(),
                selected: state.selection.contains(cluster.cluster_id),
                thumbnail,
            });
        }

        if state.clusters.is_empty() {
            view.empty = Some(empty_state(state.origin.as_ref()));
        }

        view
    }

    /// Stop the cycling timer and abandon in-flight loads.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        if let Ok(mut cycler) = self.cycler.lock() {
            if let Some(task) = cycler.take() {
                task.abort();
            }
        }
        debug!(event_code = %self.event_code, "Browser session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Ok(mut cycler) = self.cycler.lock() {
            if let Some(task) = cycler.take() {
                task.abort();
            }
        }
    }
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn empty_state(origin: Option<&LoadOrigin>) -> EmptyState {
    let message = match origin {
        None => "Face clusters have not been loaded yet".to_string(),
        Some(LoadOrigin::Failed { message }) => {
            format!("Could not load face clusters: {}", message)
        }
        Some(_) => "No face clusters found for this event".to_string(),
    };
    EmptyState {
        message,
        retryable: true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use evpix_clusters::{CacheConfig, ClusterError, ClusterQuery, ClusterResult};
    use evpix_models::Sample;
    use tokio::sync::Mutex as AsyncMutex;

    use super::*;
    use crate::filter::MemoryQuery;

    /// Replays responses in order, repeating the last one.
    struct FakeClusters {
        responses: AsyncMutex<Vec<ClusterResult<Vec<Cluster>>>>,
        calls: AtomicUsize,
    }

    impl FakeClusters {
        fn with(responses: Vec<ClusterResult<Vec<Cluster>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: AsyncMutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ClusterQuery for FakeClusters {
        async fn query_clusters(
            &self,
            _event_code: &str,
            _sample_size: u32,
        ) -> ClusterResult<Vec<Cluster>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().await;
            if responses.len() > 1 {
                return responses.remove(0);
            }
            match responses.first() {
                Some(Ok(clusters)) => Ok(clusters.clone()),
                _ => Err(ClusterError::ServiceUnavailable("down".to_string())),
            }
        }
    }

    /// Crops succeed except for listed faces, optionally after a delay.
    #[derive(Default)]
    struct FakeCropper {
        failing: HashSet<FaceId>,
        delays: HashMap<FaceId, Duration>,
        calls: AsyncMutex<BTreeMap<FaceId, usize>>,
    }

    impl FakeCropper {
        async fn calls_for(&self, face_id: FaceId) -> usize {
            self.calls.lock().await.get(&face_id).copied().unwrap_or(0)
        }
    }

    fn face_id_of(image_ref: &str) -> FaceId {
        image_ref
            .rsplit('/')
            .next()
            .and_then(|name| name.strip_suffix(".jpg"))
            .and_then(|id| id.parse().ok())
            .unwrap_or(-1)
    }

    #[async_trait]
    impl FaceCropper for FakeCropper {
        async fn crop(
            &self,
            image_ref: &str,
            _bbox: BoundingBox,
            params: CropParams,
        ) -> MediaResult<CropResult> {
            let face_id = face_id_of(image_ref);
            *self.calls.lock().await.entry(face_id).or_default() += 1;
            if let Some(delay) = self.delays.get(&face_id) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&face_id) {
                return Err(MediaError::decode("corrupt image"));
            }
            Ok(CropResult {
                data_uri: format!("data:image/png;base64,{}", face_id),
                width: params.target_width,
                height: params.target_height,
                placeholder: false,
                label: None,
            })
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn sample(face_id: FaceId) -> Sample {
        Sample {
            face_id,
            sample_blob_url: format!("https://blob.example.com/{}.jpg", face_id),
            sample_bbox: BoundingBox::new(10, 10, 40, 40),
        }
    }

    fn scenario_clusters() -> Vec<Cluster> {
        vec![
            Cluster::new(2, 5, vec![sample(21), sample(22)]),
            Cluster::new(ClusterId::PROCESSING, 3, vec![]),
        ]
    }

    fn session_with(query: Arc<FakeClusters>, cropper: Arc<FakeCropper>) -> BrowserSession {
        session_with_config(query, cropper, BrowserConfig::default())
    }

    fn session_with_config(
        query: Arc<FakeClusters>,
        cropper: Arc<FakeCropper>,
        config: BrowserConfig,
    ) -> BrowserSession {
        let cache = Arc::new(ClusterCache::new(query, CacheConfig::default()));
        BrowserSession::new("EVT1", BrowserServices::new(cache, cropper), config)
    }

    #[tokio::test]
    async fn test_cycling_and_sentinel_handling() {
        let session = session_with(
            FakeClusters::with(vec![Ok(scenario_clusters())]),
            Arc::new(FakeCropper::default()),
        );
        let report = session.load().await.unwrap();
        assert_eq!(report.origin, LoadOrigin::Fetched);
        assert_eq!(report.crops_ready, 2);

        assert_eq!(session.cycling().await.snapshot(), BTreeMap::from([(ClusterId(2), 0)]));
        assert_eq!(session.tick().await, 1);
        assert_eq!(session.cycling().await.snapshot(), BTreeMap::from([(ClusterId(2), 1)]));

        let view = session.view().await;
        assert_eq!(
            view.processing_notice.as_deref(),
            Some("Still processing approximately 3 new faces")
        );
        let processing = view.card(ClusterId::PROCESSING).unwrap();
        assert_eq!(processing.title, "Processing");
        assert!(!processing.selectable);
        assert!(processing.thumbnail.placeholder);

        let person = view.card(ClusterId(2)).unwrap();
        assert_eq!(person.caption, "Person 2 (5 photos)");
        assert_eq!(person.thumbnail.data_uri, "data:image/png;base64,22");

        let mut query = MemoryQuery::new();
        assert_eq!(
            session.toggle(ClusterId::PROCESSING, &mut query).await,
            ToggleOutcome::Rejected
        );
        assert!(query.is_empty());
        assert!(session.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_crop_is_never_resubmitted() {
        let cropper = Arc::new(FakeCropper {
            failing: HashSet::from([22]),
            ..Default::default()
        });
        let session = session_with(
            FakeClusters::with(vec![Ok(scenario_clusters())]),
            Arc::clone(&cropper),
        );

        let report = session.load().await.unwrap();
        assert_eq!((report.crops_ready, report.crops_failed), (1, 1));

        session.tick().await;
        let view = session.view().await;
        let card = view.card(ClusterId(2)).unwrap();
        assert_eq!(card.current_sample, Some(1));
        assert!(card.thumbnail.placeholder);
        assert_eq!(card.thumbnail.width, 100);

        let report = session.refresh().await.unwrap();
        assert_eq!((report.crops_ready, report.crops_failed), (0, 0));
        assert_eq!(cropper.calls_for(21).await, 1);
        assert_eq!(cropper.calls_for(22).await, 1);
        assert!(session.services.failures.contains(22).await);
    }

    #[tokio::test]
    async fn test_failures_are_shared_between_sessions() {
        let query = FakeClusters::with(vec![Ok(scenario_clusters())]);
        let cropper = Arc::new(FakeCropper {
            failing: HashSet::from([21]),
            ..Default::default()
        });
        let cache = Arc::new(ClusterCache::new(query, CacheConfig::default()));
        let services = BrowserServices::new(cache, cropper.clone());

        let first = BrowserSession::new("EVT1", services.clone(), BrowserConfig::default());
        first.load().await.unwrap();
        let second = BrowserSession::new("EVT1", services, BrowserConfig::default());
        second.load().await.unwrap();

        assert_eq!(cropper.calls_for(21).await, 1);
        assert_eq!(cropper.calls_for(22).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_crop_times_out() {
        let cropper = Arc::new(FakeCropper {
            delays: HashMap::from([(22, Duration::from_secs(60))]),
            ..Default::default()
        });
        let session = session_with(FakeClusters::with(vec![Ok(scenario_clusters())]), cropper);

        let report = session.load().await.unwrap();
        assert_eq!((report.crops_ready, report.crops_failed), (1, 1));
        assert!(session.services.failures.contains(22).await);
    }

    #[tokio::test]
    async fn test_refresh_replaces_cycling_state() {
        let three = vec![Cluster::new(1, 9, vec![sample(1), sample(2), sample(3)])];
        let one = vec![Cluster::new(1, 9, vec![sample(1)])];
        let session = session_with(
            FakeClusters::with(vec![Ok(three), Ok(one)]),
            Arc::new(FakeCropper::default()),
        );

        session.load().await.unwrap();
        session.tick().await;
        session.tick().await;
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(2));

        session.refresh().await.unwrap();
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(0));
        assert_eq!(session.tick().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycling_timer_stops_on_shutdown() {
        let clusters = vec![Cluster::new(1, 9, vec![sample(1), sample(2), sample(3)])];
        let session = session_with(
            FakeClusters::with(vec![Ok(clusters)]),
            Arc::new(FakeCropper::default()),
        );

        session.open(&MemoryQuery::new()).await.unwrap();
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(0));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(1));

        session.shutdown();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(1));
        assert!(matches!(session.load().await, Err(BrowserError::ShutDown)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_in_flight_crops() {
        let cropper = Arc::new(FakeCropper {
            delays: HashMap::from([(21, Duration::from_secs(10)), (22, Duration::from_secs(10))]),
            ..Default::default()
        });
        let session = Arc::new(session_with(
            FakeClusters::with(vec![Ok(scenario_clusters())]),
            Arc::clone(&cropper),
        ));

        let loading = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.load().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cropper.calls_for(21).await, 1);

        session.shutdown();
        let result = loading.await.unwrap();
        assert!(matches!(result, Err(BrowserError::ShutDown)));
        assert!(session.services.failures.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_running_timer() {
        let clusters = vec![Cluster::new(1, 9, vec![sample(1), sample(2), sample(3)])];
        let session = session_with(
            FakeClusters::with(vec![Ok(clusters)]),
            Arc::new(FakeCropper::default()),
        );

        session.load().await.unwrap();
        session.shutdown();
        assert!(session.is_shut_down());
        assert!(matches!(session.load().await, Err(BrowserError::ShutDown)));
        assert!(matches!(session.refresh().await, Err(BrowserError::ShutDown)));

        session.start_cycling();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(session.cycling().await.index(ClusterId(1)), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_does_not_resubmit_in_flight_crops() {
        let cropper = Arc::new(FakeCropper {
            delays: HashMap::from([(21, Duration::from_secs(5))]),
            ..Default::default()
        });
        let session = Arc::new(session_with(
            FakeClusters::with(vec![Ok(scenario_clusters())]),
            Arc::clone(&cropper),
        ));

        let loading = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.load().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let report = session.refresh().await.unwrap();
        assert_eq!((report.crops_ready, report.crops_failed), (0, 0));

        let first = loading.await.unwrap().unwrap();
        assert_eq!((first.crops_ready, first.crops_failed), (2, 0));
        assert_eq!(cropper.calls_for(21).await, 1);
        assert_eq!(cropper.calls_for(22).await, 1);

        let view = session.view().await;
        assert!(!view.card(ClusterId(2)).unwrap().thumbnail.placeholder);
    }

    #[tokio::test]
    async fn test_selection_round_trips_through_query() {
        let session = session_with(
            FakeClusters::with(vec![Ok(scenario_clusters())]),
            Arc::new(FakeCropper::default()),
        );
        let mut query = MemoryQuery::new().with("faceFilter", "7,abc");

        session.open(&query).await.unwrap();
        assert_eq!(session.selection().await.to_vec(), vec![ClusterId(7)]);

        session.toggle(ClusterId(2), &mut query).await;
        assert_eq!(query.get("faceFilter").as_deref(), Some("2,7"));
        assert_eq!(
            session.gallery_filter().await.query_pairs(),
            vec![("cluster_list_id", "2".to_string()), ("cluster_list_id", "7".to_string())]
        );

        let view = session.view().await;
        assert!(view.card(ClusterId(2)).unwrap().selected);
        assert_eq!(view.selected, vec![ClusterId(2), ClusterId(7)]);

        session.toggle(ClusterId(7), &mut query).await;
        assert_eq!(session.toggle(ClusterId(2), &mut query).await, ToggleOutcome::Deselected);
        assert_eq!(query.get("faceFilter"), None);
        assert!(session.gallery_filter().await.is_empty());
        session.shutdown();
    }

    #[tokio::test]
    async fn test_empty_state_and_retry() {
        let query = FakeClusters::with(vec![
            Err(ClusterError::ServiceUnavailable("down".to_string())),
            Ok(scenario_clusters()),
        ]);
        let session = session_with(Arc::clone(&query), Arc::new(FakeCropper::default()));

        let report = session.load().await.unwrap();
        assert!(matches!(report.origin, LoadOrigin::Failed { .. }));
        let empty = session.view().await.empty.unwrap();
        assert!(empty.retryable);
        assert!(empty.message.starts_with("Could not load face clusters"));

        let report = session.retry().await.unwrap();
        assert_eq!(report.origin, LoadOrigin::Fetched);
        assert!(session.view().await.empty.is_none());
        assert_eq!(query.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_view_sections() {
        let clusters = vec![
            Cluster::new(1, 3, vec![sample(11)]),
            Cluster::new(ClusterId::UNASSIGNED, 4, vec![sample(91), sample(92)]),
            Cluster::new(ClusterId::PROCESSING, 0, vec![]),
        ];
        let session = session_with(
            FakeClusters::with(vec![Ok(clusters)]),
            Arc::new(FakeCropper::default()),
        );
        session.load().await.unwrap();

        let view = session.view().await;
        assert_eq!(view.people().count(), 1);
        assert_eq!(view.unassigned_strip.len(), 2);
        assert!(view.unassigned_strip.iter().all(|crop| crop.width == 80));
        assert!(view.processing_notice.is_none());
        assert!(view.card(ClusterId::PROCESSING).is_none());
        assert_eq!(view.card(ClusterId::UNASSIGNED).unwrap().title, "Unidentified faces");
        assert!(view.empty.is_none());
    }

    #[tokio::test]
    async fn test_set_sample_size_clamps_and_reloads() {
        let query = FakeClusters::with(vec![Ok(scenario_clusters())]);
        let session = session_with(Arc::clone(&query), Arc::new(FakeCropper::default()));

        session.load().await.unwrap();
        session.set_sample_size(42).await.unwrap();
        assert_eq!(session.sample_size().await, 5);
        // Same key as the default, served from cache
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);

        session.set_sample_size(2).await.unwrap();
        assert_eq!(session.sample_size().await, 2);
        assert_eq!(query.calls.load(Ordering::SeqCst), 2);
    }
}
