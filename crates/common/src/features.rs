use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// GeoJSON point. Coordinates are `[lon, lat]` carried as the vendor sent them; a missing axis
/// stays `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "Point")]
pub struct Point {
    pub coordinates: [JsonValue; 2],
}

impl Point {
    pub fn new(lon: JsonValue, lat: JsonValue) -> Self {
        Self {
            coordinates: [lon, lat],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sensor {
    pub range: f64,
    pub azimuth: JsonValue,
    #[serde(rename = "type")]
    pub kind: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoStream {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureProperties {
    pub callsign: Option<String>,
    pub course: JsonValue,
    pub sensor: Sensor,
    pub metadata: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoStream>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub id: String,
    pub geometry: Point,
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn attach_video(&mut self, url: impl Into<String>) {
        self.properties.video = Some(VideoStream { url: url.into() });
    }

    pub fn video_url(&self) -> Option<&str> {
        self.properties.video.as_ref().map(|v| v.url.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }
}
