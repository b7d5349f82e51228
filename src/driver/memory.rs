//! In-memory driver registry
//!
//! Replays a fixed set of devices. Each rescan clones the seeded devices
//! afresh, so the registry behaves like a process-global device list that is
//! cleared and repopulated on every [`DriverRegistry::reinitialize`].

use crate::driver::{CaptureProperty, DriverInfo, DriverRegistry, DriverState, VideoDriver};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Scripted video driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDriver {
    /// Opaque identifier; defaults to the label when empty
    pub id: String,
    /// Raw device name
    pub name: String,
    /// Platform label
    pub label: String,
    /// Reported lifecycle state
    pub status: DriverState,
    /// Advertised capture modes
    pub properties: Vec<CaptureProperty>,
    /// Make `open` fail with this message
    pub fail_open: Option<String>,
    /// Make `properties` fail with this message
    pub fail_read: Option<String>,
    /// Make `close` fail with this message
    pub fail_close: Option<String>,
    #[serde(skip)]
    open_calls: usize,
    #[serde(skip)]
    close_calls: usize,
}

impl MemoryDriver {
    /// Create a closed driver with the given label, name and capture modes
    pub fn new(
        label: impl Into<String>,
        name: impl Into<String>,
        properties: Vec<CaptureProperty>,
    ) -> Self {
        let label = label.into();
        Self {
            id: label.clone(),
            name: name.into(),
            label,
            properties,
            ..Default::default()
        }
    }

    /// Report the given lifecycle state
    pub fn with_status(mut self, status: DriverState) -> Self {
        self.status = status;
        self
    }

    /// Fail every `open` call
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.fail_open = Some(message.into());
        self
    }

    /// Fail every property read
    pub fn failing_read(mut self, message: impl Into<String>) -> Self {
        self.fail_read = Some(message.into());
        self
    }

    /// Fail every `close` call
    pub fn failing_close(mut self, message: impl Into<String>) -> Self {
        self.fail_close = Some(message.into());
        self
    }

    /// Number of `open` calls since the last rescan
    pub fn open_calls(&self) -> usize {
        self.open_calls
    }

    /// Number of `close` calls since the last rescan
    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    fn normalized(mut self) -> Self {
        if self.id.is_empty() {
            self.id = self.label.clone();
        }
        self
    }
}

impl VideoDriver for MemoryDriver {
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
        self.status
    }

    fn open(&mut self) -> Result<()> {
        self.open_calls += 1;
        if let Some(message) = &self.fail_open {
            return Err(Error::Driver(message.clone()));
        }
        self.status = DriverState::Opened;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.status = DriverState::Closed;
        match &self.fail_close {
            Some(message) => Err(Error::Driver(message.clone())),
            None => Ok(()),
        }
    }

    fn properties(&self) -> Result<Vec<CaptureProperty>> {
        match &self.fail_read {
            Some(message) => Err(Error::Driver(message.clone())),
            None => Ok(self.properties.clone()),
        }
    }
}

/// Fixture file layout accepted by [`MemoryRegistry::from_file`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixture {
    devices: Vec<MemoryDriver>,
}

/// Registry backed by a list of [`MemoryDriver`]s
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    seed: Vec<MemoryDriver>,
    drivers: Vec<MemoryDriver>,
    rescans: usize,
    fail_rescan: Option<String>,
}

impl MemoryRegistry {
    /// Create a registry whose initial scan already contains `devices`
    pub fn new(devices: Vec<MemoryDriver>) -> Self {
        let seed: Vec<MemoryDriver> = devices.into_iter().map(MemoryDriver::normalized).collect();
        Self {
            drivers: seed.clone(),
            seed,
            rescans: 0,
            fail_rescan: None,
        }
    }

    /// Load devices from a TOML or YAML fixture containing a `devices` list
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        let fixture: Fixture = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            })?,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported fixture format '{}', expected toml/yaml",
                    other
                )));
            }
        };

        tracing::debug!(
            devices = fixture.devices.len(),
            "Loaded device fixture from {}",
            path.display()
        );
        Ok(Self::new(fixture.devices))
    }

    /// Make every rescan fail with this message
    pub fn failing_rescan(mut self, message: impl Into<String>) -> Self {
        self.fail_rescan = Some(message.into());
        self
    }

    /// Plug in a device; it shows up after the next rescan
    pub fn attach(&mut self, driver: MemoryDriver) {
        self.seed.push(driver.normalized());
    }

    /// Unplug a device by id; it disappears after the next rescan
    pub fn detach(&mut self, id: &str) -> Result<()> {
        let before = self.seed.len();
        self.seed.retain(|d| d.id != id);
        if self.seed.len() == before {
            return Err(Error::DeviceNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Currently registered drivers
    pub fn drivers(&self) -> &[MemoryDriver] {
        &self.drivers
    }

    /// Number of successful rescans
    pub fn rescans(&self) -> usize {
        self.rescans
    }
}

impl DriverRegistry for MemoryRegistry {
    type Driver = MemoryDriver;

    fn reinitialize(&mut self) -> Result<()> {
        if let Some(message) = &self.fail_rescan {
            return Err(Error::Registry(message.clone()));
        }
        self.drivers.clear();
        self.drivers.extend(self.seed.iter().cloned());
        self.rescans += 1;
        Ok(())
    }

    fn video_drivers(&mut self) -> Vec<&mut MemoryDriver> {
        self.drivers.iter_mut().collect()
    }
}
