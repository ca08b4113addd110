use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use telemetry::LogConfig;
use tracing::{error, info, warn};
use verkada_sync::{
    config::ConnectorConfig,
    sink::{FeatureSink, HttpLayerSink, StdoutSink},
    Connector, HttpLeaseRegistry, HttpVendorClient, SyncOptions,
};

#[derive(Parser)]
#[command(name = "verkada-sync")]
#[command(about = "Sync Verkada cameras and live video leases into a feature layer", long_about = None)]
struct Cli {
    /// Print the feature collection to stdout instead of submitting it to the layer
    #[arg(long)]
    dry_run: bool,

    /// Concurrent lease operations per batch (1-500)
    #[arg(long, env = "SYNC_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Print per-camera outcomes as JSON once the run completes
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ConnectorConfig::from_env()?;
    if let Some(batch_size) = cli.batch_size {
        config.set_batch_size(batch_size)?;
    }

    let _log_guard = telemetry::init_structured_logging(
        LogConfig::new("verkada-sync")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_verbose(config.debug),
    );

    let vendor = HttpVendorClient::new(config.region.base_url()?, config.api_key.clone())
        .context("failed to build vendor client")?;
    let registry = HttpLeaseRegistry::new(
        config.etl_api.clone(),
        config.connection.clone(),
        config.etl_token.clone(),
    )
    .context("failed to build lease registry client")?;
    let sink: Box<dyn FeatureSink> = if cli.dry_run {
        info!("dry run, writing features to stdout");
        Box::new(StdoutSink)
    } else {
        Box::new(HttpLayerSink::new(
            config.etl_api.clone(),
            config.connection.clone(),
            config.layer.clone(),
            config.etl_token.clone(),
        )?)
    };

    info!(
        region = %config.region,
        layer = %config.layer,
        connection = %config.connection,
        batch_size = config.batch_size,
        streaming = config.streaming_enabled(),
        "starting sync run"
    );

    let connector = Connector::new(
        Arc::new(vendor),
        Arc::new(registry),
        SyncOptions::from_config(&config)?,
    );

    let report = match connector.sync(sink.as_ref()).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "sync run failed");
            return Err(err.into());
        }
    };

    for failure in report.failures() {
        warn!(
            camera_id = %failure.camera_id,
            error = failure.error.as_deref().unwrap_or_default(),
            "camera has no live stream this run"
        );
    }

    if cli.report {
        let outcomes =
            serde_json::to_string_pretty(&report.outcomes).context("failed to encode report")?;
        println!("{outcomes}");
    }

    Ok(())
}
