use common::{
    cameras::Camera,
    features::{Feature, FeatureCollection, FeatureProperties, Point, Sensor},
};

/// Field-of-view radius drawn for every camera, in map units.
pub const SENSOR_RANGE: f64 = 50.0;
pub const SENSOR_TYPE: &str = "camera";

/// Map one camera record to a point feature.
///
/// Location values are copied as sent: absent ones stay `null` and malformed ones are not coerced.
pub fn to_feature(camera: &Camera) -> Feature {
    Feature {
        id: camera.camera_id.clone(),
        geometry: Point::new(camera.location_lon(), camera.location_lat()),
        properties: FeatureProperties {
            callsign: camera.name.clone(),
            course: camera.location_angle(),
            sensor: Sensor {
                range: SENSOR_RANGE,
                azimuth: camera.location_angle(),
                kind: SENSOR_TYPE.to_string(),
                model: camera.model.clone(),
            },
            metadata: camera.to_json(),
            video: None,
        },
    }
}

pub fn to_features(cameras: &[Camera]) -> FeatureCollection {
    FeatureCollection::new(cameras.iter().map(to_feature).collect())
}
