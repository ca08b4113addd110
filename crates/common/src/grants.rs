use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Short-lived footage permission returned by `GET /cameras/v1/footage/token`.
///
/// The `jwt` is a bearer credential; `Debug` never prints it.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamGrant {
    pub accessible_cameras: HashSet<String>,
    pub accessible_sites: HashSet<String>,
    #[serde(default)]
    pub expiration: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub jwt: String,
    #[serde(default)]
    pub permission: Vec<String>,
}

impl StreamGrant {
    pub fn new(
        jwt: impl Into<String>,
        cameras: impl IntoIterator<Item = impl Into<String>>,
        sites: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            accessible_cameras: cameras.into_iter().map(Into::into).collect(),
            accessible_sites: sites.into_iter().map(Into::into).collect(),
            expiration: None,
            expires_at: None,
            jwt: jwt.into(),
            permission: Vec::new(),
        }
    }

    pub fn covers_camera(&self, camera_id: &str) -> bool {
        self.accessible_cameras.contains(camera_id)
    }

    pub fn covers_site(&self, site_id: &str) -> bool {
        self.accessible_sites.contains(site_id)
    }

    pub fn is_expired_at(&self, now_epoch_secs: u64) -> bool {
        match self.expires_at {
            Some(at) => at <= now_epoch_secs as i64,
            None => false,
        }
    }
}

impl fmt::Debug for StreamGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamGrant")
            .field("accessible_cameras", &self.accessible_cameras.len())
            .field("accessible_sites", &self.accessible_sites.len())
            .field("expires_at", &self.expires_at)
            .field("jwt", &"<redacted>")
            .finish()
    }
}
