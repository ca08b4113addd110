use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{cameras::CameraPage, grants::StreamGrant, ids::Id};
use reqwest::Url;
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::{debug, instrument};

use crate::registry::with_trailing_slash;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const AUTH_HEADER: &str = "x-verkada-auth";

/// Short-lived API token from `POST /token`.
#[derive(Clone, Deserialize)]
pub struct VendorToken {
    token: String,
}

impl VendorToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for VendorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VendorToken(<redacted>)")
    }
}

/// Camera vendor API surface used by a sync run.
#[async_trait]
pub trait VendorApi: Send + Sync {
    /// Exchange the API key for a session token.
    async fn exchange_token(&self) -> Result<VendorToken>;

    /// Fetch one page of the device inventory. `page_token` is `None` for the first page.
    async fn list_cameras(&self, token: &VendorToken, page_token: Option<&Id>) -> Result<CameraPage>;

    /// Fetch the footage grant listing the cameras and sites that may be streamed.
    async fn footage_grant(&self) -> Result<StreamGrant>;
}

pub struct HttpVendorClient {
    base: Url,
    api_key: String,
    client: reqwest::Client,
}

impl HttpVendorClient {
    pub fn new(base: Url, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: with_trailing_slash(base),
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).context("invalid vendor endpoint")
    }
}

#[async_trait]
impl VendorApi for HttpVendorClient {
    #[instrument(skip_all)]
    async fn exchange_token(&self) -> Result<VendorToken> {
        let url = self.endpoint("token")?;
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("token request failed")?;
        let resp = resp
            .error_for_status()
            .context("token request returned error status")?;
        resp.json().await.context("failed to parse token response")
    }

    #[instrument(skip_all, fields(page_token = page_token.map(|t| t.as_str())))]
    async fn list_cameras(&self, token: &VendorToken, page_token: Option<&Id>) -> Result<CameraPage> {
        let mut url = self.endpoint("cameras/v1/devices")?;
        if let Some(page_token) = page_token {
            url.query_pairs_mut()
                .append_pair("next_page_token", page_token.as_str());
        }

        let resp = self
            .client
            .get(url)
            .header(AUTH_HEADER, token.secret())
            .send()
            .await
            .context("camera list request failed")?;
        let resp = resp
            .error_for_status()
            .context("camera list returned error status")?;
        let page: CameraPage = resp
            .json()
            .await
            .context("failed to parse camera list response")?;

        debug!(cameras = page.cameras.len(), "fetched camera page");
        Ok(page)
    }

    #[instrument(skip_all)]
    async fn footage_grant(&self) -> Result<StreamGrant> {
        let url = self.endpoint("cameras/v1/footage/token")?;
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("footage token request failed")?;
        let resp = resp
            .error_for_status()
            .context("footage token returned error status")?;
        let grant: StreamGrant = resp
            .json()
            .await
            .context("failed to parse footage token response")?;

        debug!(
            cameras = grant.accessible_cameras.len(),
            sites = grant.accessible_sites.len(),
            expires_at = ?grant.expires_at,
            "fetched footage grant"
        );
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = VendorToken::new("abc123");
        assert_eq!(format!("{token:?}"), "VendorToken(<redacted>)");
        assert_eq!(token.secret(), "abc123");
    }

    #[test]
    fn endpoints_resolve_against_region_host() {
        let base = Url::parse("https://api.au.verkada.com/").unwrap();
        let client = HttpVendorClient::new(base, "key").unwrap();
        assert_eq!(
            client.endpoint("cameras/v1/devices").unwrap().as_str(),
            "https://api.au.verkada.com/cameras/v1/devices"
        );
    }
}
