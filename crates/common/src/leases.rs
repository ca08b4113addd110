use crate::ids::Id;
use serde::{Deserialize, Serialize};

/// Lease lifetime requested on every create/update, in seconds.
pub const LEASE_DURATION_SECS: u64 = 3600;

/// Cameras are always registered as fixed-position sources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Fixed,
}

/// Body of a lease create (`POST`) or update (`PATCH`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaseRequest {
    pub name: String,
    pub duration: u64,
    pub source_id: String,
    pub source_type: SourceType,
    pub source_model: String,
    pub proxy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolEndpoint {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeaseProtocols {
    #[serde(default)]
    pub hls: Option<ProtocolEndpoint>,
    #[serde(default)]
    pub rtsp: Option<ProtocolEndpoint>,
    #[serde(default)]
    pub rtmp: Option<ProtocolEndpoint>,
    #[serde(default)]
    pub webrtc: Option<ProtocolEndpoint>,
}

/// A video lease as stored in the lease registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaseRecord {
    pub id: Id,
    #[serde(default)]
    pub layer: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_model: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub protocols: Option<LeaseProtocols>,
}

impl LeaseRecord {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            layer: None,
            name: None,
            source_id: None,
            source_type: None,
            source_model: None,
            duration: None,
            expiration: None,
            proxy: None,
            protocols: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<Id>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_hls(mut self, url: impl Into<String>) -> Self {
        let protocols = self.protocols.get_or_insert_with(LeaseProtocols::default);
        protocols.hls = Some(ProtocolEndpoint {
            name: Some("HLS".to_string()),
            url: url.into(),
        });
        self
    }

    /// HLS playback URL, once the registry has provisioned one.
    pub fn hls_url(&self) -> Option<&str> {
        self.protocols
            .as_ref()
            .and_then(|p| p.hls.as_ref())
            .map(|hls| hls.url.as_str())
    }

    pub fn is_owned_by(&self, layer: &Id) -> bool {
        self.layer.as_ref() == Some(layer)
    }
}

/// One page of `GET .../video/lease`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseList {
    pub total: u64,
    pub items: Vec<LeaseRecord>,
}
