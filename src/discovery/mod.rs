//! Webcam discovery engine
//!
//! Walks the handles of a [`DriverRegistry`], drops devices that cannot or
//! should not be used, and emits one [`ConfigDescriptor`] per selected capture
//! mode.
//!
//! Per-device problems (open failures, empty capability lists, busy devices)
//! only skip that device. A registry rescan failure or an attribute projection
//! failure aborts the whole call.

mod descriptor;
pub mod naming;

pub use descriptor::{CAMERA_API, ConfigDescriptor, WEBCAM_MODEL, WebcamAttributes};

use crate::driver::{CaptureProperty, DriverRegistry, DriverState, VideoDriver};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Label separator used by the platform camera drivers
pub const DEFAULT_LABEL_SEPARATOR: &str = ";";

/// Name prefix of Broadcom embedded cameras, which misreport their capabilities
pub const BROADCOM_PREFIX: &str = "bcm";

/// How many descriptors a device with several capture modes yields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// One descriptor per advertised capture mode
    #[default]
    All,
    /// A single descriptor for the mode with the most pixels
    BestResolution,
}

impl SelectionPolicy {
    /// Capture modes to describe, in enumeration order
    pub fn select<'a>(&self, props: &'a [CaptureProperty]) -> Vec<&'a CaptureProperty> {
        match self {
            SelectionPolicy::All => props.iter().collect(),
            SelectionPolicy::BestResolution => {
                let mut best: Option<&CaptureProperty> = None;
                for prop in props {
                    // Strictly greater keeps the first of equal areas.
                    if best.is_none_or(|b| prop.area() > b.area()) {
                        best = Some(prop);
                    }
                }
                best.into_iter().collect()
            }
        }
    }

    /// Canonical string representation for configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionPolicy::All => "all",
            SelectionPolicy::BestResolution => "best-resolution",
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SelectionPolicy::All),
            "best" | "best-resolution" | "best_resolution" => Ok(SelectionPolicy::BestResolution),
            other => Err(format!(
                "Unsupported selection policy '{other}', expected 'all' or 'best-resolution'"
            )),
        }
    }
}

/// Platform specific registry and label handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPolicy {
    /// The registry must be cleared and rescanned before every discovery
    pub reinit_required: bool,
    /// Separator between the name and path parts of a driver label
    pub label_separator: String,
}

impl PlatformPolicy {
    /// Linux: labels are `name;path` and the registry needs a rescan
    pub fn linux() -> Self {
        Self {
            reinit_required: true,
            label_separator: DEFAULT_LABEL_SEPARATOR.to_string(),
        }
    }

    /// Windows: bare labels, registry needs a rescan
    pub fn windows() -> Self {
        Self::linux()
    }

    /// macOS: bare labels, the device observer keeps the registry current
    pub fn macos() -> Self {
        Self {
            reinit_required: false,
            label_separator: DEFAULT_LABEL_SEPARATOR.to_string(),
        }
    }

    /// Policy for the compilation target
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::macos()
        } else if cfg!(target_os = "windows") {
            Self::windows()
        } else {
            Self::linux()
        }
    }
}

impl Default for PlatformPolicy {
    fn default() -> Self {
        Self::current()
    }
}

/// Resolved discovery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Registry and label handling
    pub platform: PlatformPolicy,
    /// Capture mode selection
    pub selection: SelectionPolicy,
    /// Case-sensitive device name prefixes to ignore
    pub excluded_prefixes: Vec<String>,
    /// Salt unnamed devices with their enumeration position
    pub index_fallback_names: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            platform: PlatformPolicy::current(),
            selection: SelectionPolicy::All,
            excluded_prefixes: vec![BROADCOM_PREFIX.to_string()],
            index_fallback_names: false,
        }
    }
}

/// Produces camera descriptors from a driver registry
pub struct DiscoveryEngine<R> {
    registry: R,
    config: DiscoveryConfig,
}

impl<R: DriverRegistry> DiscoveryEngine<R> {
    /// Create an engine over `registry`
    pub fn new(registry: R, config: DiscoveryConfig) -> Self {
        Self { registry, config }
    }

    /// Discovery settings in use
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Underlying registry
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the underlying registry
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Enumerate devices and describe every usable capture mode
    pub fn discover(&mut self) -> Result<Vec<ConfigDescriptor>> {
        let _span = tracing::debug_span!(
            "discover",
            selection = self.config.selection.as_str(),
            reinit = self.config.platform.reinit_required,
        )
        .entered();

        if self.config.platform.reinit_required {
            self.registry.reinitialize()?;
        }

        let config = &self.config;
        let mut webcams = Vec::new();

        for (position, driver) in self.registry.video_drivers().into_iter().enumerate() {
            let info = driver.info();

            if let Some(prefix) = config
                .excluded_prefixes
                .iter()
                .find(|p| info.name.starts_with(p.as_str()))
            {
                tracing::debug!(driver = %info.label, prefix = %prefix, "Skipping excluded device");
                continue;
            }

            let props = match probe_properties(&mut *driver) {
                Ok(props) if props.is_empty() => {
                    tracing::debug!(driver = %info.label, "No properties detected, skipping");
                    continue;
                }
                Ok(props) => props,
                Err(err) => {
                    tracing::debug!(
                        driver = %info.label,
                        error = %err,
                        "Cannot access driver properties, skipping"
                    );
                    continue;
                }
            };

            if driver.status() == DriverState::Running {
                tracing::debug!(driver = %info.label, "Driver is in use, skipping");
                continue;
            }

            let path = naming::extract_path(&info.label, &config.platform.label_separator);
            let selected = config.selection.select(&props);
            let base = naming::base_name(
                &info.name,
                config.index_fallback_names.then_some(position),
            );

            tracing::debug!(
                name = %info.name,
                path = %path,
                properties = props.len(),
                selected = selected.len(),
                "Found camera driver"
            );

            for (index, prop) in selected.iter().enumerate() {
                tracing::trace!(
                    index,
                    width = prop.width,
                    height = prop.height,
                    frame_rate = prop.frame_rate,
                    format = %prop.format,
                    "Describing capture mode"
                );
                let name = naming::descriptor_name(&base, index, selected.len());
                webcams.push(ConfigDescriptor::webcam(
                    name,
                    WebcamAttributes::new(path, prop),
                )?);
            }
        }

        tracing::info!(webcams = webcams.len(), "Webcam discovery finished");
        Ok(webcams)
    }
}

/// Read a driver's capture modes, opening it first when it is closed.
///
/// The driver is closed again on every path once opened. A read error takes
/// precedence over a close error.
pub fn probe_properties<D: VideoDriver + ?Sized>(driver: &mut D) -> Result<Vec<CaptureProperty>> {
    if driver.status() != DriverState::Closed {
        return driver.properties();
    }

    driver.open()?;
    let read = driver.properties();
    let closed = driver.close();

    let props = read?;
    closed?;
    Ok(props)
}
