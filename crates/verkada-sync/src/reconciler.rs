//! Per-camera lease provisioning.
//!
//! Every eligible camera gets a lease pointing the registry at the vendor's HLS stream. The
//! lease is refreshed on every run because it only lives for [`LEASE_DURATION_SECS`].

use anyhow::{Context, Result};
use common::{
    cameras::Camera,
    ids::Id,
    leases::{LeaseRecord, LeaseRequest, SourceType, LEASE_DURATION_SECS},
    validation,
};
use reqwest::Url;
use std::fmt;
use tracing::debug;

use crate::context::RunContext;
use crate::error::LeaseError;
use crate::registry::LeaseRegistry;

pub const STREAM_PATH: &str = "stream/cameras/v1/footage/stream/stream.m3u8";

const REDACTED: &str = "<redacted>";

/// Stream URL handed to the registry as a lease `proxy`.
///
/// It embeds the grant's bearer token, so `Debug` and `Display` print it with `jwt` redacted.
/// Use [`ProxyUrl::expose`] only when building the request body.
#[derive(Clone)]
pub struct ProxyUrl(Url);

impl ProxyUrl {
    pub fn build(stream_base: &Url, camera_id: &str, org_id: &str, jwt: &str) -> Result<Self> {
        let mut url = stream_base
            .join(STREAM_PATH)
            .context("invalid stream base URL")?;
        url.query_pairs_mut()
            .append_pair("start_time", "0")
            .append_pair("end_time", "0")
            .append_pair("codec", "hevc")
            .append_pair("resolution", "high_res")
            .append_pair("type", "stream")
            .append_pair("transcode", "false")
            .append_pair("jwt", jwt)
            .append_pair("camera_id", camera_id)
            .append_pair("org_id", org_id);
        Ok(Self(url))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    fn redacted(&self) -> Url {
        let mut url = self.0.clone();
        let pairs: Vec<(String, String)> = self
            .0
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "jwt" { REDACTED.to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url
    }
}

impl fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl fmt::Debug for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProxyUrl({})", self.redacted())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub action: LeaseAction,
    pub lease_id: Id,
    /// `None` until the registry reports an HLS endpoint for the lease.
    pub hls_url: Option<String>,
}

pub fn lease_request(camera: &Camera, proxy: &ProxyUrl) -> LeaseRequest {
    let name = camera
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| camera.camera_id.clone());

    LeaseRequest {
        name,
        duration: LEASE_DURATION_SECS,
        source_id: camera.camera_id.clone(),
        source_type: SourceType::Fixed,
        source_model: camera.model.clone().unwrap_or_default(),
        proxy: proxy.expose().to_string(),
    }
}

/// Update `existing` if present, otherwise create a new lease.
pub async fn reconcile(
    ctx: &RunContext,
    registry: &dyn LeaseRegistry,
    camera: &Camera,
    existing: Option<&LeaseRecord>,
) -> Result<Reconciled, LeaseError> {
    validation::validate_non_empty(&camera.camera_id, "camera_id")
        .and_then(|_| {
            validation::validate_length(&camera.camera_id, validation::MAX_ID_LENGTH, "camera_id")
        })
        .map_err(LeaseError::InvalidCamera)?;

    let proxy = ProxyUrl::build(&ctx.stream_base, &camera.camera_id, &ctx.org_id, &ctx.grant.jwt)
        .and_then(|proxy| {
            validation::validate_http_url(proxy.expose(), "proxy")?;
            Ok(proxy)
        })
        .map_err(LeaseError::InvalidCamera)?;
    let request = lease_request(camera, &proxy);

    let (action, lease) = match existing {
        Some(current) => {
            debug!(camera_id = %camera.camera_id, lease_id = %current.id, "updating lease");
            let lease = registry
                .update_lease(&current.id, &request)
                .await
                .map_err(|cause| LeaseError::Update {
                    lease_id: current.id.clone(),
                    cause,
                })?;
            (LeaseAction::Updated, lease)
        }
        None => {
            debug!(camera_id = %camera.camera_id, "creating lease");
            let lease = registry
                .create_lease(&request)
                .await
                .map_err(LeaseError::Create)?;
            (LeaseAction::Created, lease)
        }
    };

    let hls_url = lease.hls_url().map(str::to_string);
    if hls_url.is_none() {
        debug!(camera_id = %camera.camera_id, lease_id = %lease.id, "lease has no HLS endpoint yet");
    }

    Ok(Reconciled {
        action,
        lease_id: lease.id,
        hls_url,
    })
}
