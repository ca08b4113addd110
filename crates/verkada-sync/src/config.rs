use anyhow::{anyhow, Context, Result};
use common::{ids::Id, validation};
use reqwest::Url;
use std::{env, fmt, str::FromStr};

use crate::batcher::DEFAULT_BATCH_SIZE;
use crate::error::SyncError;

pub const MAX_BATCH_SIZE: usize = 500;

/// Vendor API region; selects the `{region}.verkada.com` host for both the API and stream URLs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Us,
    Eu,
    Au,
}

impl Region {
    pub fn host_prefix(&self) -> &'static str {
        match self {
            Region::Us => "api",
            Region::Eu => "api.eu",
            Region::Au => "api.au",
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("https://{}.verkada.com/", self.host_prefix()))
            .context("invalid region base URL")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_prefix())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "" => Ok(Region::Us),
            "api.eu" => Ok(Region::Eu),
            "api.au" => Ok(Region::Au),
            _ => Err(format!("unknown API region '{s}' (expected api, api.eu or api.au)")),
        }
    }
}

#[derive(Clone)]
pub struct ConnectorConfig {
    // Vendor
    pub api_key: String,
    pub org_id: Option<String>,
    pub region: Region,
    pub debug: bool,

    // Host layer / lease registry
    pub etl_api: Url,
    pub etl_token: String,
    pub layer: Id,
    pub connection: Id,

    pub batch_size: usize,
}

impl ConnectorConfig {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::parse(lookup).map_err(SyncError::Config)
    }

    /// Override the batch size, e.g. from the command line. Bounded like `SYNC_BATCH_SIZE`.
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), SyncError> {
        self.batch_size = checked_batch_size(batch_size, "--batch-size").map_err(SyncError::Config)?;
        Ok(())
    }

    fn parse<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} environment variable required"))
        };

        let api_key = required("API_KEY")?;
        let org_id = lookup("API_ORG_ID").filter(|v| !v.trim().is_empty());

        let region = match lookup("API_Region") {
            Some(raw) => raw.parse::<Region>().map_err(|e| anyhow!(e))?,
            None => Region::default(),
        };

        let debug = lookup("DEBUG")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let etl_api = required("ETL_API")?;
        validation::validate_http_url(&etl_api, "ETL_API")?;
        let etl_api = Url::parse(&etl_api).context("invalid ETL_API")?;
        let etl_token = required("ETL_TOKEN")?;

        let layer = required("ETL_LAYER")?;
        validation::validate_id(&layer, "ETL_LAYER")?;
        let connection = required("ETL_CONNECTION")?;
        validation::validate_id(&connection, "ETL_CONNECTION")?;

        let batch_size = match lookup("SYNC_BATCH_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .context("invalid SYNC_BATCH_SIZE")?,
            None => DEFAULT_BATCH_SIZE,
        };
        let batch_size = checked_batch_size(batch_size, "SYNC_BATCH_SIZE")?;

        Ok(Self {
            api_key,
            org_id,
            region,
            debug,
            etl_api,
            etl_token,
            layer: Id::new(layer),
            connection: Id::new(connection),
            batch_size,
        })
    }

    pub fn streaming_enabled(&self) -> bool {
        self.org_id.is_some()
    }
}

fn checked_batch_size(batch_size: usize, field_name: &str) -> Result<usize> {
    validation::validate_range(batch_size, 1, MAX_BATCH_SIZE, field_name)?;
    Ok(batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> HashMap<String, String> {
        vars(&[
            ("API_KEY", "key"),
            ("API_ORG_ID", "org-1"),
            ("ETL_API", "https://cloudtak.example.com"),
            ("ETL_TOKEN", "etl-token"),
            ("ETL_LAYER", "12"),
            ("ETL_CONNECTION", "3"),
        ])
    }

    fn load(map: &HashMap<String, String>) -> Result<ConnectorConfig, SyncError> {
        ConnectorConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.region, Region::Us);
        assert!(!config.debug);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.layer, Id::from("12"));
        assert!(config.streaming_enabled());
    }

    #[test]
    fn test_region_and_debug() {
        let mut map = base();
        map.insert("API_Region".into(), "api.eu".into());
        map.insert("DEBUG".into(), "true".into());
        map.insert("SYNC_BATCH_SIZE".into(), "5".into());

        let config = load(&map).unwrap();
        assert_eq!(config.region, Region::Eu);
        assert!(config.debug);
        assert_eq!(config.batch_size, 5);
        assert_eq!(
            config.region.base_url().unwrap().as_str(),
            "https://api.eu.verkada.com/"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let mut map = base();
        map.remove("API_KEY");
        let err = load(&map).err().unwrap();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_org_id_optional() {
        let mut map = base();
        map.remove("API_ORG_ID");
        let config = load(&map).unwrap();
        assert!(!config.streaming_enabled());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut map = base();
        map.insert("API_Region".into(), "api.jp".into());
        assert!(load(&map).is_err());

        let mut map = base();
        map.insert("SYNC_BATCH_SIZE".into(), "0".into());
        assert!(load(&map).is_err());

        let mut map = base();
        map.insert("ETL_LAYER".into(), "../1".into());
        assert!(load(&map).is_err());

        let mut map = base();
        map.insert("ETL_API".into(), "ftp://cloudtak.example.com".into());
        assert!(load(&map).is_err());
    }

    #[test]
    fn test_batch_size_override_is_bounded() {
        let mut config = load(&base()).unwrap();

        config.set_batch_size(50).unwrap();
        assert_eq!(config.batch_size, 50);

        for bad in [0, MAX_BATCH_SIZE + 1] {
            let err = config.set_batch_size(bad).unwrap_err();
            assert!(matches!(err, SyncError::Config(_)));
            assert!(err.to_string().contains("--batch-size"), "{err}");
        }
        assert_eq!(config.batch_size, 50);

        config.set_batch_size(MAX_BATCH_SIZE).unwrap();
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("API.AU".parse::<Region>(), Ok(Region::Au));
        assert_eq!("api".parse::<Region>(), Ok(Region::Us));
        assert_eq!(Region::Au.to_string(), "api.au");
    }
}
