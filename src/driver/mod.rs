//! Video driver registry abstraction
//!
//! Discovery never talks to the operating system directly. It asks a
//! [`DriverRegistry`] for the video-capable handles it currently knows about
//! and probes each one through the [`VideoDriver`] trait. The V4L2 registry
//! backs real discovery on Linux; [`MemoryRegistry`] is a scripted registry
//! for tests and fixture replays.

mod memory;
#[cfg(feature = "camera")]
mod video4linux;

pub use memory::{MemoryDriver, MemoryRegistry};
#[cfg(feature = "camera")]
pub use video4linux::{V4lDriver, V4lRegistry, format_tag};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by a driver handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    /// Not opened by anyone
    #[default]
    Closed,
    /// Opened but not streaming
    Opened,
    /// Actively streaming for another consumer
    Running,
}

/// Identity strings reported by a driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Human readable device name (e.g. "HD Pro Webcam C920")
    pub name: String,
    /// Platform label; either a bare access path or `name<SEP>path`
    pub label: String,
}

/// One capture mode a device can stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureProperty {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format tag (e.g. "MJPEG", "YUYV")
    pub format: String,
    /// Frames per second
    pub frame_rate: f64,
}

impl CaptureProperty {
    /// Build a capture property from its parts
    pub fn new(width: u32, height: u32, format: impl Into<String>, frame_rate: f64) -> Self {
        Self {
            width,
            height,
            format: format.into(),
            frame_rate,
        }
    }

    /// Pixel count of one frame
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A single video device handle exposed by a registry
pub trait VideoDriver: Send {
    /// Opaque identifier, stable for the lifetime of the registry scan
    fn id(&self) -> &str;

    /// Name and label reported by the driver
    fn info(&self) -> DriverInfo;

    /// Current lifecycle state
    fn status(&self) -> DriverState;

    /// Acquire the device
    fn open(&mut self) -> Result<()>;

    /// Release the device
    fn close(&mut self) -> Result<()>;

    /// Capture modes the device advertises.
    ///
    /// Only valid while the handle is open, or after an open/close cycle for
    /// drivers that cache what they read.
    fn properties(&self) -> Result<Vec<CaptureProperty>>;
}

/// Source of video driver handles
pub trait DriverRegistry: Send {
    /// Handle type produced by this registry
    type Driver: VideoDriver;

    /// Forget every registered video handle and scan again.
    ///
    /// Must be safe to call before the first scan.
    fn reinitialize(&mut self) -> Result<()>;

    /// All currently registered video-capable handles, in registry order
    fn video_drivers(&mut self) -> Vec<&mut Self::Driver>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_does_not_overflow() {
        let prop = CaptureProperty::new(u32::MAX, u32::MAX, "MJPEG", 30.0);
        assert_eq!(prop.area(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&DriverState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
