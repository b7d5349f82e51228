//! find-webcams - on-demand webcam discovery
//!
//! Enumerates locally attached video capture devices and turns each usable
//! capture mode into a ready-to-use camera resource configuration.
//!
//! # Features
//!
//! - **Driver registries**: V4L2 scanning on Linux, plus an in-memory registry
//!   for tests and fixture replays
//! - **Filtering**: skips excluded vendors, busy devices and devices without
//!   capture modes
//! - **Stable naming**: alphanumeric resource names with per-mode suffixes
//! - **Async service**: serialized discovery calls on the Tokio blocking pool
//!
//! # Example
//!
//! ```no_run
//! use find_webcams::{DiscoveryConfig, DiscoveryEngine, V4lRegistry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DiscoveryConfig::default();
//!     let registry = V4lRegistry::new(config.platform.label_separator.clone());
//!     let mut engine = DiscoveryEngine::new(registry, config);
//!
//!     for webcam in engine.discover()? {
//!         println!("{} -> {:?}", webcam.name, webcam.attributes);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod logging;
pub mod service;

// Re-exports for convenience
pub use error::{Error, Result};

pub use config::{DiscoveryOptions, FindWebcamsConfig, LogRotation, LoggingOptions};
pub use discovery::{
    CAMERA_API, ConfigDescriptor, DiscoveryConfig, DiscoveryEngine, PlatformPolicy,
    SelectionPolicy, WEBCAM_MODEL, WebcamAttributes,
};
pub use driver::{
    CaptureProperty, DriverInfo, DriverRegistry, DriverState, MemoryDriver, MemoryRegistry,
    VideoDriver,
};
pub use service::{DiscoveryService, WebcamDiscovery};

#[cfg(feature = "camera")]
#[cfg_attr(docsrs, doc(cfg(feature = "camera")))]
pub use driver::{V4lDriver, V4lRegistry};
