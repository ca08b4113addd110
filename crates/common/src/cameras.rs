use crate::ids::Id;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// A camera device as reported by the vendor inventory API.
///
/// Only the fields the connector reasons about are typed. The record itself is kept exactly as
/// the vendor sent it, so location values and anything else pass downstream unchanged, and a
/// malformed location on one camera does not reject the page it came in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, JsonValue>")]
pub struct Camera {
    pub camera_id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub site_id: Option<String>,
    raw: Map<String, JsonValue>,
}

#[derive(Deserialize)]
struct TypedFields {
    camera_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    site_id: Option<String>,
}

impl TryFrom<Map<String, JsonValue>> for Camera {
    type Error = serde_json::Error;

    fn try_from(raw: Map<String, JsonValue>) -> Result<Self, Self::Error> {
        let typed: TypedFields = serde_json::from_value(JsonValue::Object(raw.clone()))?;
        Ok(Self {
            camera_id: typed.camera_id,
            name: typed.name,
            model: typed.model,
            site_id: typed.site_id,
            raw,
        })
    }
}

impl Serialize for Camera {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl Camera {
    pub fn new(camera_id: impl Into<String>) -> Self {
        let camera_id = camera_id.into();
        let mut raw = Map::new();
        raw.insert("camera_id".into(), JsonValue::String(camera_id.clone()));
        Self {
            camera_id,
            name: None,
            model: None,
            site_id: None,
            raw,
        }
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        self.raw.insert("site_id".into(), JsonValue::String(site_id.clone()));
        self.site_id = Some(site_id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.raw.insert("name".into(), JsonValue::String(name.clone()));
        self.name = Some(name);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.raw.insert("model".into(), JsonValue::String(model.clone()));
        self.model = Some(model);
        self
    }

    pub fn with_location(self, lat: f64, lon: f64, angle: f64) -> Self {
        self.with_field("location_lat", lat)
            .with_field("location_lon", lon)
            .with_field("location_angle", angle)
    }

    /// Set an untyped vendor field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.raw.insert(key.into(), value.into());
        self
    }

    /// A vendor field exactly as sent, or `null` when absent.
    pub fn field(&self, key: &str) -> JsonValue {
        self.raw.get(key).cloned().unwrap_or(JsonValue::Null)
    }

    pub fn location_lat(&self) -> JsonValue {
        self.field("location_lat")
    }

    pub fn location_lon(&self) -> JsonValue {
        self.field("location_lon")
    }

    /// Heading in degrees.
    pub fn location_angle(&self) -> JsonValue {
        self.field("location_angle")
    }

    /// The full record as the vendor sent it.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.raw.clone())
    }
}

/// One page of `GET /cameras/v1/devices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraPage {
    pub cameras: Vec<Camera>,
    #[serde(default)]
    pub next_page_token: Option<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_vendor_fields() {
        let raw = json!({
            "camera_id": "c1",
            "name": "Lobby",
            "model": "CD52",
            "site_id": "s1",
            "location_lat": 37.7,
            "location_lon": -122.4,
            "location_angle": 90,
            "mac": "00:11:22:33:44:55",
            "cloud_retention": 30
        });

        let camera: Camera = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(camera.camera_id, "c1");
        assert_eq!(camera.site_id.as_deref(), Some("s1"));
        assert_eq!(camera.location_angle(), json!(90));
        assert_eq!(camera.field("mac"), "00:11:22:33:44:55");
        assert_eq!(camera.to_json(), raw);
    }

    #[test]
    fn record_is_kept_byte_for_byte() {
        let raw = json!({"camera_id": "c1", "name": null, "location_angle": 90, "site_id": "s1"});

        let camera: Camera = serde_json::from_value(raw.clone()).unwrap();
        assert!(camera.name.is_none());
        assert_eq!(camera.to_json(), raw);
        assert_eq!(serde_json::to_value(&camera).unwrap(), raw);
    }

    #[test]
    fn camera_id_is_required() {
        let result = serde_json::from_value::<Camera>(json!({"name": "no id"}));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_location_does_not_reject_the_page() {
        let page: CameraPage = serde_json::from_value(json!({
            "cameras": [
                {"camera_id": "c1", "location_lat": 37.7, "status": "Live"},
                {"camera_id": "c2", "location_lat": "37.7", "serial": 1234}
            ]
        }))
        .unwrap();

        assert_eq!(page.cameras.len(), 2);
        assert_eq!(page.cameras[0].location_lat(), json!(37.7));
        assert_eq!(page.cameras[1].location_lat(), json!("37.7"));
        assert_eq!(page.cameras[1].field("serial"), 1234);
    }

    #[test]
    fn page_token_may_be_numeric_or_absent() {
        let page: CameraPage =
            serde_json::from_value(json!({"cameras": [], "next_page_token": 100})).unwrap();
        assert_eq!(page.next_page_token, Some(Id::from("100")));

        let page: CameraPage = serde_json::from_value(json!({"cameras": []})).unwrap();
        assert!(page.next_page_token.is_none());
    }
}
