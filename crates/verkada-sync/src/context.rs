use common::grants::StreamGrant;
use reqwest::Url;

/// Everything a single run's reconciliation needs, fixed once the grant is fetched.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub org_id: String,
    /// `https://{region}.verkada.com/`, the host that serves live footage.
    pub stream_base: Url,
    pub grant: StreamGrant,
}

impl RunContext {
    pub fn new(org_id: impl Into<String>, stream_base: Url, grant: StreamGrant) -> Self {
        Self {
            org_id: org_id.into(),
            stream_base,
            grant,
        }
    }
}
