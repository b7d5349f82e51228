//! Camera resource descriptors produced by discovery

use crate::driver::CaptureProperty;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource API every discovered descriptor belongs to
pub const CAMERA_API: &str = "rdk:component:camera";

/// Camera model that consumes the descriptor attributes
pub const WEBCAM_MODEL: &str = "rdk:builtin:webcam";

/// Attributes understood by the webcam camera model.
///
/// Zero and empty values are left out when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebcamAttributes {
    /// Device access path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub video_path: String,
    /// Pixel format tag
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Frame width in pixels
    #[serde(skip_serializing_if = "is_zero")]
    pub width_px: u32,
    /// Frame height in pixels
    #[serde(skip_serializing_if = "is_zero")]
    pub height_px: u32,
    /// Frames per second
    #[serde(skip_serializing_if = "is_zero_rate")]
    pub frame_rate: f64,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_zero_rate(value: &f64) -> bool {
    *value == 0.0
}

impl WebcamAttributes {
    /// Attributes for streaming `property` from the device at `path`
    pub fn new(path: &str, property: &CaptureProperty) -> Self {
        Self {
            video_path: path.to_string(),
            format: property.format.clone(),
            width_px: property.width,
            height_px: property.height,
            frame_rate: property.frame_rate,
        }
    }

    /// Project into a generic string-keyed map through a JSON round trip.
    ///
    /// Fails when the map cannot be read back into identical attributes.
    pub fn to_attribute_map(&self) -> Result<Map<String, Value>> {
        let bytes = serde_json::to_vec(self)?;
        let map: Map<String, Value> = serde_json::from_slice(&bytes)?;

        let restored: WebcamAttributes = serde_json::from_value(Value::Object(map.clone()))?;
        if &restored != self {
            return Err(Error::Serialization(format!(
                "attributes for {} changed in round trip",
                self.video_path
            )));
        }

        Ok(map)
    }
}

/// A discovered camera resource configuration.
///
/// Deserializing rebuilds [`ConfigDescriptor::converted`] from the attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct ConfigDescriptor {
    /// Unique name made of ASCII letters, digits and hyphens
    pub name: String,
    /// Resource API type tag
    pub api: String,
    /// Resource model
    pub model: String,
    /// Attributes in generic key/value form
    pub attributes: Map<String, Value>,
    /// Typed attributes the generic map was built from
    #[serde(skip)]
    pub converted: WebcamAttributes,
}

impl ConfigDescriptor {
    /// Build a webcam descriptor, projecting its attributes
    pub fn webcam(name: String, attributes: WebcamAttributes) -> Result<Self> {
        Ok(Self {
            name,
            api: CAMERA_API.to_string(),
            model: WEBCAM_MODEL.to_string(),
            attributes: attributes.to_attribute_map()?,
            converted: attributes,
        })
    }

    /// Access path of the described device
    pub fn path(&self) -> &str {
        &self.converted.video_path
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    api: String,
    model: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl TryFrom<RawDescriptor> for ConfigDescriptor {
    type Error = serde_json::Error;

    fn try_from(raw: RawDescriptor) -> std::result::Result<Self, Self::Error> {
        let converted = serde_json::from_value(Value::Object(raw.attributes.clone()))?;
        Ok(Self {
            name: raw.name,
            api: raw.api,
            model: raw.model,
            attributes: raw.attributes,
            converted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_map_keys() {
        let prop = CaptureProperty::new(1920, 1080, "MJPEG", 30.0);
        let map = WebcamAttributes::new("/dev/video0", &prop)
            .to_attribute_map()
            .unwrap();

        assert_eq!(map["video_path"], "/dev/video0");
        assert_eq!(map["format"], "MJPEG");
        assert_eq!(map["width_px"], 1920);
        assert_eq!(map["height_px"], 1080);
        assert_eq!(map["frame_rate"], 30.0);
    }

    #[test]
    fn test_zero_values_are_omitted() {
        let prop = CaptureProperty::new(640, 0, "", 0.0);
        let map = WebcamAttributes::new("video0", &prop)
            .to_attribute_map()
            .unwrap();

        assert_eq!(map.len(), 2);
        assert!(map.contains_key("width_px"));
        assert!(!map.contains_key("frame_rate"));
    }

    #[test]
    fn test_large_values_survive() {
        let prop = CaptureProperty::new(u32::MAX, 1 << 31, "YUYV", 29.97002997002997);
        let attrs = WebcamAttributes::new("video0", &prop);
        let map = attrs.to_attribute_map().unwrap();
        assert_eq!(map["width_px"].as_u64(), Some(u64::from(u32::MAX)));
        assert_eq!(map["frame_rate"].as_f64(), Some(29.97002997002997));
    }

    #[test]
    fn test_non_finite_rate_is_rejected() {
        let prop = CaptureProperty::new(640, 480, "YUYV", f64::NAN);
        let result = WebcamAttributes::new("video0", &prop).to_attribute_map();
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_webcam_descriptor_tags() {
        let prop = CaptureProperty::new(640, 480, "YUYV", 30.0);
        let desc =
            ConfigDescriptor::webcam("cam".to_string(), WebcamAttributes::new("video0", &prop))
                .unwrap();
        assert_eq!(desc.api, CAMERA_API);
        assert_eq!(desc.model, WEBCAM_MODEL);
        assert_eq!(desc.path(), "video0");
    }

    #[test]
    fn test_awkward_rates_survive_projection() {
        for rate in [94.63232120552081, 1.0 / 11.0] {
            let prop = CaptureProperty::new(640, 480, "YUYV", rate);
            let desc = ConfigDescriptor::webcam(
                "cam".to_string(),
                WebcamAttributes::new("/dev/video1", &prop),
            )
            .unwrap();
            assert_eq!(desc.converted.frame_rate, rate);
            assert_eq!(desc.attributes["frame_rate"].as_f64(), Some(rate));
        }
    }

    #[test]
    fn test_deserialized_descriptor_keeps_path() {
        let prop = CaptureProperty::new(1280, 720, "MJPEG", 1.0 / 11.0);
        let desc = ConfigDescriptor::webcam(
            "cam".to_string(),
            WebcamAttributes::new("/dev/video2", &prop),
        )
        .unwrap();

        let json = serde_json::to_string(&desc).unwrap();
        let restored: ConfigDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, desc);
        assert_eq!(restored.path(), "/dev/video2");
    }

    #[test]
    fn test_deserialize_rejects_mistyped_attributes() {
        let json = r#"{"name":"cam","api":"a","model":"m","attributes":{"width_px":"wide"}}"#;
        assert!(serde_json::from_str::<ConfigDescriptor>(json).is_err());
    }
}
