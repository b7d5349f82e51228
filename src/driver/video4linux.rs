//! V4L2 driver registry for Linux
//!
//! Scans `/dev/video*` nodes through the Video4Linux2 API and exposes every
//! node that can capture video as a [`VideoDriver`].

use crate::driver::{CaptureProperty, DriverInfo, DriverRegistry, DriverState, VideoDriver};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use v4l::capability::Flags;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::video::Capture;
use v4l::{Device, FourCC, Fraction};

/// Handle to a single V4L2 capture node
pub struct V4lDriver {
    id: String,
    path: PathBuf,
    name: String,
    label: String,
    device: Option<Device>,
    cached: Vec<CaptureProperty>,
}

impl V4lDriver {
    fn new(path: &Path, name: String, separator: &str) -> Self {
        let id = path.display().to_string();
        Self {
            label: format!("{name}{separator}{id}"),
            id,
            path: path.to_path_buf(),
            name,
            device: None,
            cached: Vec::new(),
        }
    }

    /// Device node path (e.g. `/dev/video0`)
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoDriver for V4lDriver {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> DriverInfo {
        DriverInfo {
            name: self.name.clone(),
            label: self.label.clone(),
        }
    }

    fn status(&self) -> DriverState {
        if self.device.is_some() {
            DriverState::Opened
        } else {
            DriverState::Closed
        }
    }

    fn open(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let dev = Device::with_path(&self.path).map_err(|e| {
            Error::Driver(format!("Failed to open {}: {}", self.path.display(), e))
        })?;

        // Capabilities are read once per open and cached for reads after close.
        self.cached = read_properties(&dev)?;
        self.device = Some(dev);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the device closes its file descriptor.
        self.device.take();
        Ok(())
    }

    fn properties(&self) -> Result<Vec<CaptureProperty>> {
        Ok(self.cached.clone())
    }
}

/// Registry of V4L2 capture nodes.
///
/// Nothing is scanned until the first [`DriverRegistry::reinitialize`] or
/// [`DriverRegistry::video_drivers`] call.
pub struct V4lRegistry {
    separator: String,
    drivers: Vec<V4lDriver>,
    scanned: bool,
}

impl V4lRegistry {
    /// Create an unscanned registry labelling drivers as `card<separator>path`
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            drivers: Vec::new(),
            scanned: false,
        }
    }
}

impl DriverRegistry for V4lRegistry {
    type Driver = V4lDriver;

    fn reinitialize(&mut self) -> Result<()> {
        for driver in &mut self.drivers {
            driver.close()?;
        }
        self.drivers = scan(&self.separator);
        self.scanned = true;
        tracing::debug!(devices = self.drivers.len(), "Rescanned V4L2 devices");
        Ok(())
    }

    fn video_drivers(&mut self) -> Vec<&mut V4lDriver> {
        if !self.scanned {
            self.drivers = scan(&self.separator);
            self.scanned = true;
        }
        self.drivers.iter_mut().collect()
    }
}

fn scan(separator: &str) -> Vec<V4lDriver> {
    let mut drivers = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path();

        let dev = match Device::with_path(path) {
            Ok(dev) => dev,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot open V4L2 node");
                continue;
            }
        };

        match dev.query_caps() {
            // Metadata and output nodes share the /dev/video namespace.
            Ok(caps) if caps.capabilities.contains(Flags::VIDEO_CAPTURE) => {
                drivers.push(V4lDriver::new(path, caps.card, separator));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot query V4L2 caps");
            }
        }
    }

    drivers.sort_by(|a, b| a.path.cmp(&b.path));
    drivers
}

fn read_properties(dev: &Device) -> Result<Vec<CaptureProperty>> {
    let mut props = Vec::new();

    let formats = dev
        .enum_formats()
        .map_err(|e| Error::Driver(format!("Failed to enumerate formats: {}", e)))?;

    for desc in formats {
        let format = format_tag(desc.fourcc);
        let sizes = dev
            .enum_framesizes(desc.fourcc)
            .map_err(|e| Error::Driver(format!("Failed to enumerate frame sizes: {}", e)))?;

        for size in sizes {
            let (width, height) = match size.size {
                FrameSizeEnum::Discrete(d) => (d.width, d.height),
                FrameSizeEnum::Stepwise(s) => (s.max_width, s.max_height),
            };

            let intervals = dev
                .enum_frameintervals(desc.fourcc, width, height)
                .unwrap_or_default();

            if intervals.is_empty() {
                props.push(CaptureProperty::new(width, height, format.clone(), 0.0));
                continue;
            }

            for interval in intervals {
                let frame_rate = match interval.interval {
                    FrameIntervalEnum::Discrete(fraction) => fps(fraction),
                    FrameIntervalEnum::Stepwise(step) => fps(step.min),
                };
                props.push(CaptureProperty::new(width, height, format.clone(), frame_rate));
            }
        }
    }

    Ok(props)
}

/// Frames per second for a frame interval given in seconds per frame
fn fps(interval: Fraction) -> f64 {
    if interval.numerator == 0 {
        return 0.0;
    }
    f64::from(interval.denominator) / f64::from(interval.numerator)
}

/// Normalize a V4L2 FourCC code into the format tag used in camera attributes
pub fn format_tag(fourcc: FourCC) -> String {
    match &fourcc.repr {
        b"MJPG" => "MJPEG".to_string(),
        b"YUYV" => "YUYV".to_string(),
        b"RGB3" => "RGB24".to_string(),
        repr => String::from_utf8_lossy(repr).trim().to_string(),
    }
}
