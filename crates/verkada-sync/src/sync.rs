//! One sync run: inventory and leases in, feature collection and per-camera outcomes out.
//!
//! Order of operations:
//! 1. page through the registry's leases and the vendor's cameras
//! 2. synthesize one feature per camera and index the leases this layer owns
//! 3. fetch the footage grant and reconcile every eligible camera's lease in batches
//! 4. merge each batch's stream URLs back into the features as soon as the batch settles
//!
//! Any failure before step 3 aborts the run. Lease failures in step 3 are recorded per camera.

use anyhow::Result;
use common::{
    cameras::Camera,
    features::{Feature, FeatureCollection},
    ids::Id,
    validation,
};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::batcher::{for_each_batch, DEFAULT_BATCH_SIZE};
use crate::config::ConnectorConfig;
use crate::context::RunContext;
use crate::eligibility::eligibility;
use crate::error::{LeaseError, SyncError};
use crate::lease_index::LeaseIndex;
use crate::pagination::{fetch_all, CameraPages, LeasePages};
use crate::reconciler::{reconcile, LeaseAction, Reconciled};
use crate::registry::LeaseRegistry;
use crate::sink::FeatureSink;
use crate::synthesizer::to_features;
use crate::vendor::VendorApi;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub layer: Id,
    pub connection: Id,
    /// Streaming is skipped entirely when no organization is configured.
    pub org_id: Option<String>,
    pub stream_base: Url,
    pub batch_size: usize,
    /// Log every synthesized feature.
    pub debug: bool,
}

impl SyncOptions {
    pub fn new(layer: Id, connection: Id, stream_base: Url) -> Self {
        Self {
            layer,
            connection,
            org_id: None,
            stream_base,
            batch_size: DEFAULT_BATCH_SIZE,
            debug: false,
        }
    }

    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn from_config(config: &ConnectorConfig) -> Result<Self, SyncError> {
        Ok(Self {
            layer: config.layer.clone(),
            connection: config.connection.clone(),
            org_id: config.org_id.clone(),
            stream_base: config.region.base_url().map_err(SyncError::Config)?,
            batch_size: config.batch_size,
            debug: config.debug,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Created,
    Updated,
    Ineligible,
    StreamingDisabled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraOutcome {
    pub camera_id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CameraOutcome {
    fn skipped(camera: &Camera, status: OutcomeStatus) -> Self {
        Self {
            camera_id: camera.camera_id.clone(),
            status,
            lease_id: None,
            video_url: None,
            error: None,
        }
    }

    fn reconciled(camera: &Camera, result: Reconciled) -> Self {
        let status = match result.action {
            LeaseAction::Created => OutcomeStatus::Created,
            LeaseAction::Updated => OutcomeStatus::Updated,
        };
        Self {
            camera_id: camera.camera_id.clone(),
            status,
            lease_id: Some(result.lease_id),
            video_url: result.hls_url,
            error: None,
        }
    }

    fn failed(camera: &Camera, err: &LeaseError) -> Self {
        Self {
            camera_id: camera.camera_id.clone(),
            status: OutcomeStatus::Failed,
            lease_id: match err {
                LeaseError::Update { lease_id, .. } => Some(lease_id.clone()),
                _ => None,
            },
            video_url: None,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cameras: usize,
    pub leases: usize,
    pub owned_leases: usize,
    pub eligible: usize,
    pub created: usize,
    pub updated: usize,
    /// Leases provisioned without an HLS endpoint yet.
    pub pending: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub collection: FeatureCollection,
    /// One entry per camera, in inventory order.
    pub outcomes: Vec<CameraOutcome>,
    pub summary: RunSummary,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &CameraOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
    }
}

pub struct Connector {
    vendor: Arc<dyn VendorApi>,
    registry: Arc<dyn LeaseRegistry>,
    options: SyncOptions,
}

impl Connector {
    pub fn new(
        vendor: Arc<dyn VendorApi>,
        registry: Arc<dyn LeaseRegistry>,
        options: SyncOptions,
    ) -> Self {
        Self {
            vendor,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run once and hand the collection to `sink`. Nothing is submitted if the run aborts.
    pub async fn sync(&self, sink: &dyn FeatureSink) -> Result<SyncReport, SyncError> {
        let report = self.run().await?;
        sink.submit(&report.collection)
            .await
            .map_err(SyncError::Submit)?;
        Ok(report)
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let leases = fetch_all(&LeasePages::new(self.registry.as_ref()))
            .await
            .map_err(|e| SyncError::pagination("leases", e))?;

        let token = self.vendor.exchange_token().await.map_err(SyncError::Auth)?;
        let cameras = fetch_all(&CameraPages::new(self.vendor.as_ref(), &token))
            .await
            .map_err(|e| SyncError::pagination("cameras", e))?;

        let mut collection = to_features(&cameras);
        let lease_count = leases.len();
        let index = LeaseIndex::build(leases, &self.options.layer);
        info!(
            cameras = cameras.len(),
            leases = lease_count,
            owned_leases = index.len(),
            layer = %self.options.layer,
            "fetched inventory"
        );

        let mut summary = RunSummary {
            cameras: cameras.len(),
            leases: lease_count,
            owned_leases: index.len(),
            ..RunSummary::default()
        };

        let outcomes = match self.options.org_id.clone() {
            Some(org_id) => {
                self.reconcile_all(&cameras, &index, org_id, &mut collection, &mut summary)
                    .await?
            }
            None => {
                warn!("no organization configured, skipping video leases");
                cameras
                    .iter()
                    .map(|c| CameraOutcome::skipped(c, OutcomeStatus::StreamingDisabled))
                    .collect()
            }
        };

        if self.options.debug {
            for feature in &collection.features {
                debug!(
                    feature_id = %feature.id,
                    feature = %serde_json::to_string(feature).unwrap_or_default(),
                    "synthesized feature"
                );
            }
        }

        info!(
            cameras = summary.cameras,
            leases = summary.leases,
            eligible = summary.eligible,
            created = summary.created,
            updated = summary.updated,
            pending = summary.pending,
            failed = summary.failed,
            "sync run complete"
        );

        Ok(SyncReport {
            collection,
            outcomes,
            summary,
        })
    }

    async fn reconcile_all(
        &self,
        cameras: &[Camera],
        index: &LeaseIndex,
        org_id: String,
        collection: &mut FeatureCollection,
        summary: &mut RunSummary,
    ) -> Result<Vec<CameraOutcome>, SyncError> {
        let grant = self.vendor.footage_grant().await.map_err(SyncError::Grant)?;
        if grant.is_expired_at(validation::safe_unix_timestamp()) {
            warn!(expires_at = ?grant.expires_at, "footage grant is already expired");
        }
        debug!(
            cameras = grant.accessible_cameras.len(),
            sites = grant.accessible_sites.len(),
            "fetched footage grant"
        );

        let ctx = RunContext::new(org_id, self.options.stream_base.clone(), grant);

        let eligible: Vec<(usize, &Camera)> = cameras
            .iter()
            .enumerate()
            .filter(|(_, camera)| match eligibility(camera, &ctx.grant) {
                Some(reason) => {
                    debug!(camera_id = %camera.camera_id, ?reason, "camera is eligible for streaming");
                    true
                }
                None => false,
            })
            .collect();
        summary.eligible = eligible.len();

        let mut outcomes: Vec<Option<CameraOutcome>> = (0..cameras.len()).map(|_| None).collect();
        let ctx = &ctx;
        let registry = self.registry.as_ref();
        for_each_batch(
            eligible,
            self.options.batch_size,
            |(position, camera)| {
                let existing = index.get(&camera.camera_id);
                async move { (position, reconcile(ctx, registry, camera, existing).await) }
            },
            |settled| {
                for (position, result) in settled {
                    let camera = &cameras[position];
                    let outcome = merge(camera, result, &mut collection.features[position], summary);
                    outcomes[position] = Some(outcome);
                }
            },
        )
        .await;

        let outcomes = cameras
            .iter()
            .zip(outcomes)
            .map(|(camera, outcome)| {
                outcome.unwrap_or_else(|| CameraOutcome::skipped(camera, OutcomeStatus::Ineligible))
            })
            .collect();
        Ok(outcomes)
    }
}

/// Fold one settled lease result into its feature and the run summary.
fn merge(
    camera: &Camera,
    result: Result<Reconciled, LeaseError>,
    feature: &mut Feature,
    summary: &mut RunSummary,
) -> CameraOutcome {
    match result {
        Ok(reconciled) => {
            match reconciled.action {
                LeaseAction::Created => summary.created += 1,
                LeaseAction::Updated => summary.updated += 1,
            }
            match &reconciled.hls_url {
                Some(url) => feature.attach_video(url.clone()),
                None => summary.pending += 1,
            }
            CameraOutcome::reconciled(camera, reconciled)
        }
        Err(err) => {
            warn!(camera_id = %camera.camera_id, error = %err, "lease reconciliation failed");
            summary.failed += 1;
            CameraOutcome::failed(camera, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use common::{
        cameras::CameraPage,
        grants::StreamGrant,
        leases::{LeaseList, LeaseRecord, LeaseRequest},
    };
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    use crate::vendor::VendorToken;

    #[derive(Default)]
    struct StubVendor {
        cameras: Vec<Camera>,
        grant_cameras: Vec<&'static str>,
        grant_sites: Vec<&'static str>,
        fail_token: bool,
        fail_grant: bool,
        grant_requests: Mutex<usize>,
    }

    #[async_trait]
    impl VendorApi for StubVendor {
        async fn exchange_token(&self) -> Result<VendorToken> {
            if self.fail_token {
                return Err(anyhow!("401 Unauthorized"));
            }
            Ok(VendorToken::new("session"))
        }

        async fn list_cameras(&self, _token: &VendorToken, _page: Option<&Id>) -> Result<CameraPage> {
            Ok(CameraPage {
                cameras: self.cameras.clone(),
                next_page_token: None,
            })
        }

        async fn footage_grant(&self) -> Result<StreamGrant> {
            *self.grant_requests.lock().await += 1;
            if self.fail_grant {
                return Err(anyhow!("403 Forbidden"));
            }
            Ok(StreamGrant::new(
                "grant-jwt",
                self.grant_cameras.iter().copied(),
                self.grant_sites.iter().copied(),
            ))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(String),
        Update(Id, String),
    }

    #[derive(Default)]
    struct StubRegistry {
        leases: Vec<LeaseRecord>,
        fail_sources: HashSet<&'static str>,
        fail_list: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl StubRegistry {
        fn respond(&self, id: Id, request: &LeaseRequest) -> Result<LeaseRecord> {
            if self.fail_sources.contains(request.source_id.as_str()) {
                return Err(anyhow!("500 Internal Server Error"));
            }
            Ok(LeaseRecord::new(id)
                .with_layer("L1")
                .with_source(request.source_id.clone())
                .with_hls(format!("https://video.example.com/{}.m3u8", request.source_id)))
        }
    }

    #[async_trait]
    impl LeaseRegistry for StubRegistry {
        async fn list_leases(&self, _page: u32, _limit: u32) -> Result<LeaseList> {
            if self.fail_list {
                return Err(anyhow!("connection refused"));
            }
            Ok(LeaseList {
                total: self.leases.len() as u64,
                items: self.leases.clone(),
            })
        }

        async fn create_lease(&self, request: &LeaseRequest) -> Result<LeaseRecord> {
            self.calls
                .lock()
                .await
                .push(Call::Create(request.source_id.clone()));
            self.respond(Id::from(format!("new-{}", request.source_id)), request)
        }

        async fn update_lease(&self, lease_id: &Id, request: &LeaseRequest) -> Result<LeaseRecord> {
            self.calls
                .lock()
                .await
                .push(Call::Update(lease_id.clone(), request.source_id.clone()));
            self.respond(lease_id.clone(), request)
        }
    }

    struct RecordingSink {
        submitted: Mutex<Vec<FeatureCollection>>,
        fail: bool,
    }

    #[async_trait]
    impl FeatureSink for RecordingSink {
        async fn submit(&self, collection: &FeatureCollection) -> Result<()> {
            if self.fail {
                return Err(anyhow!("413 Payload Too Large"));
            }
            self.submitted.lock().await.push(collection.clone());
            Ok(())
        }
    }

    fn options() -> SyncOptions {
        SyncOptions::new(
            Id::from("L1"),
            Id::from("3"),
            Url::parse("https://api.verkada.com/").unwrap(),
        )
        .with_org("org-1")
    }

    fn connector(vendor: StubVendor, registry: Arc<StubRegistry>, options: SyncOptions) -> Connector {
        Connector::new(Arc::new(vendor), registry, options)
    }

    fn three_cameras() -> Vec<Camera> {
        vec![
            Camera::new("c1").with_site("s1"),
            Camera::new("c2").with_site("s1"),
            Camera::new("c3").with_site("s1"),
        ]
    }

    #[tokio::test]
    async fn failed_camera_does_not_abort_its_batch_or_the_next() {
        let vendor = StubVendor {
            cameras: three_cameras(),
            grant_sites: vec!["s1"],
            ..Default::default()
        };
        let registry = Arc::new(StubRegistry {
            leases: vec![LeaseRecord::new("41").with_layer("L1").with_source("c1")],
            fail_sources: HashSet::from(["c2"]),
            ..Default::default()
        });

        let report = connector(vendor, registry.clone(), options().with_batch_size(2))
            .run()
            .await
            .unwrap();

        let videos: Vec<_> = report
            .collection
            .features
            .iter()
            .map(|f| (f.id.as_str(), f.video_url()))
            .collect();
        assert_eq!(
            videos,
            vec![
                ("c1", Some("https://video.example.com/c1.m3u8")),
                ("c2", None),
                ("c3", Some("https://video.example.com/c3.m3u8")),
            ]
        );

        let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Updated, OutcomeStatus::Failed, OutcomeStatus::Created]
        );
        assert!(report.outcomes[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("500")));
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.summary.updated, 1);
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.failed, 1);

        let calls = registry.calls.lock().await;
        assert!(calls.contains(&Call::Update(Id::from("41"), "c1".into())));
        assert!(calls.contains(&Call::Create("c2".into())));
        assert!(calls.contains(&Call::Create("c3".into())));
    }

    #[tokio::test]
    async fn ineligible_cameras_keep_their_feature_without_a_lease() {
        let vendor = StubVendor {
            cameras: vec![
                Camera::new("c1").with_site("s9"),
                Camera::new("c2").with_site("s9"),
            ],
            grant_cameras: vec!["c2"],
            ..Default::default()
        };
        let registry = Arc::new(StubRegistry::default());

        let report = connector(vendor, registry.clone(), options())
            .run()
            .await
            .unwrap();

        assert_eq!(report.collection.len(), 2);
        assert_eq!(report.outcomes[0].status, OutcomeStatus::Ineligible);
        assert_eq!(report.outcomes[1].status, OutcomeStatus::Created);
        assert_eq!(report.summary.eligible, 1);
        assert!(report.collection.get("c1").unwrap().video_url().is_none());
        assert_eq!(*registry.calls.lock().await, vec![Call::Create("c2".into())]);
    }

    #[tokio::test]
    async fn foreign_layer_lease_is_not_reused() {
        let vendor = StubVendor {
            cameras: vec![Camera::new("c1")],
            grant_cameras: vec!["c1"],
            ..Default::default()
        };
        let registry = Arc::new(StubRegistry {
            leases: vec![LeaseRecord::new("99").with_layer("L2").with_source("c1")],
            ..Default::default()
        });

        let report = connector(vendor, registry.clone(), options())
            .run()
            .await
            .unwrap();

        assert_eq!(report.summary.owned_leases, 0);
        assert_eq!(*registry.calls.lock().await, vec![Call::Create("c1".into())]);
    }

    #[tokio::test]
    async fn without_org_no_grant_is_fetched() {
        let vendor = Arc::new(StubVendor {
            cameras: three_cameras(),
            grant_sites: vec!["s1"],
            ..Default::default()
        });
        let registry = Arc::new(StubRegistry::default());
        let mut opts = options();
        opts.org_id = None;

        let report = Connector::new(vendor.clone(), registry.clone(), opts)
            .run()
            .await
            .unwrap();

        assert_eq!(report.collection.len(), 3);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::StreamingDisabled));
        assert_eq!(*vendor.grant_requests.lock().await, 0);
        assert!(registry.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn fatal_failures_abort_the_run() {
        let vendor = StubVendor {
            fail_token: true,
            ..Default::default()
        };
        let err = connector(vendor, Arc::new(StubRegistry::default()), options())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));

        let registry = Arc::new(StubRegistry {
            fail_list: true,
            ..Default::default()
        });
        let err = connector(StubVendor::default(), registry, options())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Pagination { collection: "leases", .. }));

        let vendor = StubVendor {
            cameras: three_cameras(),
            fail_grant: true,
            ..Default::default()
        };
        let registry = Arc::new(StubRegistry::default());
        let err = connector(vendor, registry.clone(), options())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Grant(_)));
        assert!(registry.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn sync_submits_collection_to_sink() {
        let vendor = StubVendor {
            cameras: three_cameras(),
            grant_sites: vec!["s1"],
            ..Default::default()
        };
        let sink = RecordingSink {
            submitted: Mutex::new(vec![]),
            fail: false,
        };

        let report = connector(vendor, Arc::new(StubRegistry::default()), options())
            .sync(&sink)
            .await
            .unwrap();

        let submitted = sink.submitted.lock().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], report.collection);
    }

    #[tokio::test]
    async fn sink_failure_is_a_submit_error() {
        let sink = RecordingSink {
            submitted: Mutex::new(vec![]),
            fail: true,
        };
        let err = connector(StubVendor::default(), Arc::new(StubRegistry::default()), options())
            .sync(&sink)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Submit(_)));
    }

    #[test]
    fn outcome_serializes_compactly() {
        let outcome = CameraOutcome::skipped(&Camera::new("c1"), OutcomeStatus::StreamingDisabled);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, serde_json::json!({"camera_id": "c1", "status": "streaming_disabled"}));
    }
}
