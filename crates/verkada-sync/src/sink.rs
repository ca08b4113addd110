use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{features::FeatureCollection, ids::Id, validation};
use reqwest::Url;
use std::io::Write;
use std::time::Duration;
use tracing::{info, instrument};

use crate::registry::with_trailing_slash;

/// Destination for a run's feature collection.
#[async_trait]
pub trait FeatureSink: Send + Sync {
    async fn submit(&self, collection: &FeatureCollection) -> Result<()>;
}

/// Posts the collection to the host layer's feature intake.
pub struct HttpLayerSink {
    base: Url,
    connection: Id,
    layer: Id,
    token: String,
    client: reqwest::Client,
}

impl HttpLayerSink {
    pub fn new(base: Url, connection: Id, layer: Id, token: impl Into<String>) -> Result<Self> {
        validation::validate_id(connection.as_str(), "connection id")?;
        validation::validate_id(layer.as_str(), "layer id")?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: with_trailing_slash(base),
            connection,
            layer,
            token: token.into(),
            client,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        self.base
            .join(&format!(
                "api/connection/{}/layer/{}/cot",
                self.connection, self.layer
            ))
            .context("invalid layer endpoint")
    }
}

#[async_trait]
impl FeatureSink for HttpLayerSink {
    #[instrument(skip_all, fields(layer = %self.layer, features = collection.len()))]
    async fn submit(&self, collection: &FeatureCollection) -> Result<()> {
        let url = self.endpoint()?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(collection)
            .send()
            .await
            .context("layer submit request failed")?;
        resp.error_for_status()
            .context("layer submit returned error status")?;
        info!(features = collection.len(), "submitted features to layer");
        Ok(())
    }
}

/// Writes the collection to stdout as pretty JSON.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl FeatureSink for StdoutSink {
    async fn submit(&self, collection: &FeatureCollection) -> Result<()> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, collection).context("failed to encode features")?;
        writeln!(out).context("failed to write features")?;
        Ok(())
    }
}
