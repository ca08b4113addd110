use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{
    ids::Id,
    leases::{LeaseList, LeaseRecord, LeaseRequest},
    validation,
};
use reqwest::Url;
use std::time::Duration;
use tracing::instrument;

/// Video lease registry scoped to one connection.
#[async_trait]
pub trait LeaseRegistry: Send + Sync {
    /// Fetch one zero-based page of leases.
    async fn list_leases(&self, page: u32, limit: u32) -> Result<LeaseList>;

    async fn create_lease(&self, request: &LeaseRequest) -> Result<LeaseRecord>;

    async fn update_lease(&self, lease_id: &Id, request: &LeaseRequest) -> Result<LeaseRecord>;
}

pub struct HttpLeaseRegistry {
    base: Url,
    connection: Id,
    token: String,
    client: reqwest::Client,
}

impl HttpLeaseRegistry {
    pub fn new(base: Url, connection: Id, token: impl Into<String>) -> Result<Self> {
        validation::validate_id(connection.as_str(), "connection id")?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: with_trailing_slash(base),
            connection,
            token: token.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("api/connection/{}/{}", self.connection, path))
            .context("invalid lease registry endpoint")
    }
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
pub(crate) fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl LeaseRegistry for HttpLeaseRegistry {
    #[instrument(skip_all, fields(page = page, limit = limit))]
    async fn list_leases(&self, page: u32, limit: u32) -> Result<LeaseList> {
        let mut url = self.endpoint("video/lease")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("page", &page.to_string());

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("lease list request failed")?;
        let resp = resp
            .error_for_status()
            .context("lease list returned error status")?;
        resp.json().await.context("failed to parse lease list response")
    }

    #[instrument(skip_all, fields(source_id = %request.source_id))]
    async fn create_lease(&self, request: &LeaseRequest) -> Result<LeaseRecord> {
        let url = self.endpoint("video/lease")?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .context("lease create request failed")?;
        let resp = resp
            .error_for_status()
            .context("lease create returned error status")?;
        resp.json().await.context("failed to parse lease create response")
    }

    #[instrument(skip_all, fields(lease_id = %lease_id, source_id = %request.source_id))]
    async fn update_lease(&self, lease_id: &Id, request: &LeaseRequest) -> Result<LeaseRecord> {
        validation::validate_id(lease_id.as_str(), "lease id")?;
        let url = self.endpoint(&format!("video/lease/{lease_id}"))?;
        let resp = self
            .client
            .patch(url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .context("lease update request failed")?;
        let resp = resp
            .error_for_status()
            .context("lease update returned error status")?;
        resp.json().await.context("failed to parse lease update response")
    }
}
