//! find-webcams command line entrypoint

use anyhow::Context;
use clap::Parser;
use find_webcams::{
    ConfigDescriptor, DiscoveryConfig, DiscoveryEngine, DriverRegistry, FindWebcamsConfig,
    MemoryRegistry, WebcamDiscovery, logging,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "find-webcams",
    version,
    about = "Discover local webcams and print camera resource configs"
)]
struct Cli {
    /// Optional configuration file (toml/yaml).
    /// Defaults to find-webcams.{toml,yaml} in cwd, then the XDG config dir.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Capture mode selection: `all` or `best-resolution`
    #[arg(long, value_name = "POLICY")]
    policy: Option<String>,

    /// Replay devices from a toml/yaml fixture instead of scanning hardware
    #[arg(long, value_name = "PATH")]
    fixture: Option<PathBuf>,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = FindWebcamsConfig::load(cli.config.as_deref())?;

    if let Some(ref policy) = cli.policy {
        config.discovery.policy = policy.clone();
    }

    logging::init(&config.logging)?;

    let discovery_config = config.discovery_config()?;
    info!(?discovery_config, "Starting webcam discovery");

    let webcams = match cli.fixture {
        Some(ref path) => {
            let registry = MemoryRegistry::from_file(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            run(registry, discovery_config).await?
        }
        None => discover_hardware(discovery_config).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&webcams)?);
    } else {
        print_webcams(&webcams);
    }

    Ok(())
}

#[cfg(feature = "camera")]
async fn discover_hardware(config: DiscoveryConfig) -> anyhow::Result<Vec<ConfigDescriptor>> {
    let registry = find_webcams::V4lRegistry::new(config.platform.label_separator.clone());
    run(registry, config).await
}

#[cfg(not(feature = "camera"))]
async fn discover_hardware(_config: DiscoveryConfig) -> anyhow::Result<Vec<ConfigDescriptor>> {
    anyhow::bail!("built without the `camera` feature; pass --fixture to replay devices")
}

async fn run<R: DriverRegistry + 'static>(
    registry: R,
    config: DiscoveryConfig,
) -> anyhow::Result<Vec<ConfigDescriptor>> {
    let service = WebcamDiscovery::new(DiscoveryEngine::new(registry, config));
    service.discover().await.context("webcam discovery failed")
}

fn print_webcams(webcams: &[ConfigDescriptor]) {
    if webcams.is_empty() {
        println!("No usable webcams detected");
        return;
    }

    println!("Discovered webcams:");
    for webcam in webcams {
        let attrs = &webcam.converted;
        println!(
            "  {}  {}  {}x{} {} @ {:.2} fps",
            webcam.name,
            attrs.video_path,
            attrs.width_px,
            attrs.height_px,
            attrs.format,
            attrs.frame_rate
        );
    }
}
