//! Runtime configuration handling

use crate::discovery::{BROADCOM_PREFIX, DiscoveryConfig, PlatformPolicy, SelectionPolicy};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindWebcamsConfig {
    /// Discovery behaviour overrides
    pub discovery: DiscoveryOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl FindWebcamsConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No find-webcams.toml / find-webcams.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        let xdg_config = env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
        Ok(find_config_file(&cwd, xdg_config.as_deref()))
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply `FIND_WEBCAMS_*` environment overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.discovery.apply_overrides(&var);
        self.logging.apply_overrides(&var);
    }

    /// Produce the resolved settings for the discovery engine.
    pub fn discovery_config(&self) -> Result<DiscoveryConfig> {
        self.discovery.to_engine_config()
    }
}

/// Discovery overrides merged on top of the platform defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Selection policy (`all` or `best-resolution`)
    pub policy: String,
    /// Override for the label separator
    pub label_separator: Option<String>,
    /// Override for whether the registry is rescanned before each discovery
    pub reinit_required: Option<bool>,
    /// Device name prefixes to skip
    pub excluded_prefixes: Vec<String>,
    /// Salt unnamed devices with their enumeration position
    pub index_fallback_names: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::All.as_str().to_string(),
            label_separator: None,
            reinit_required: None,
            excluded_prefixes: vec![BROADCOM_PREFIX.to_string()],
            index_fallback_names: false,
        }
    }
}

impl DiscoveryOptions {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(policy) = var("FIND_WEBCAMS_POLICY") {
            self.policy = policy;
        }
        if let Some(separator) = var("FIND_WEBCAMS_LABEL_SEPARATOR") {
            self.label_separator = Some(separator);
        }
        // Unparseable flags keep the file/default value.
        if let Some(flag) = var("FIND_WEBCAMS_REINIT").as_deref().and_then(parse_flag) {
            self.reinit_required = Some(flag);
        }
        if let Some(prefixes) = var("FIND_WEBCAMS_EXCLUDE") {
            self.excluded_prefixes = prefixes
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(flag) = var("FIND_WEBCAMS_INDEX_FALLBACK").as_deref().and_then(parse_flag) {
            self.index_fallback_names = flag;
        }
    }

    /// Merge overrides onto the platform policy for this build.
    pub fn to_engine_config(&self) -> Result<DiscoveryConfig> {
        let selection = self.policy.parse::<SelectionPolicy>().map_err(Error::Config)?;

        let mut platform = PlatformPolicy::current();
        if let Some(reinit) = self.reinit_required {
            platform.reinit_required = reinit;
        }
        if let Some(separator) = &self.label_separator {
            if separator.is_empty() {
                return Err(Error::Config("Label separator must not be empty".to_string()));
            }
            platform.label_separator = separator.clone();
        }

        Ok(DiscoveryConfig {
            platform,
            selection,
            excluded_prefixes: self.excluded_prefixes.clone(),
            index_fallback_names: self.index_fallback_names,
        })
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `FIND_WEBCAMS_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stderr logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = var("FIND_WEBCAMS_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(file) = var("FIND_WEBCAMS_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(flag) = var("FIND_WEBCAMS_LOG_COLOR").as_deref().and_then(parse_flag) {
            self.color = flag;
        }
        if let Some(rotation) = var("FIND_WEBCAMS_LOG_ROTATION") {
            self.rotation = LogRotation::from_str(&rotation).or(self.rotation);
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

/// First config file found in `cwd`, then under `<xdg_config>/find-webcams`.
fn find_config_file(cwd: &Path, xdg_config: Option<&Path>) -> Option<PathBuf> {
    let local = ["find-webcams.toml", "find-webcams.yaml", "find-webcams.yml"]
        .into_iter()
        .map(|candidate| cwd.join(candidate));
    let user = xdg_config.into_iter().flat_map(|base| {
        let base = base.join("find-webcams");
        ["config.toml", "config.yaml"].map(|candidate| base.join(candidate))
    });
    local.chain(user).find(|path| path.exists())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Serializes tests that read or write process environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const ENV_VARS: [&str; 9] = [
        "FIND_WEBCAMS_POLICY",
        "FIND_WEBCAMS_LABEL_SEPARATOR",
        "FIND_WEBCAMS_REINIT",
        "FIND_WEBCAMS_EXCLUDE",
        "FIND_WEBCAMS_INDEX_FALLBACK",
        "FIND_WEBCAMS_LOG_LEVEL",
        "FIND_WEBCAMS_LOG_FILE",
        "FIND_WEBCAMS_LOG_COLOR",
        "FIND_WEBCAMS_LOG_ROTATION",
    ];

    fn with_vars(vars: &[(&str, &str)]) -> FindWebcamsConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = FindWebcamsConfig::default();
        config.apply_overrides(|name| vars.get(name).cloned());
        config
    }

    fn clear_env() {
        for name in ENV_VARS.iter().copied().chain(["XDG_CONFIG_HOME"]) {
            // SAFETY: callers hold ENV_LOCK, so no other test touches the environment.
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    fn test_defaults_resolve() {
        let config = FindWebcamsConfig::default().discovery_config().unwrap();
        assert_eq!(config.selection, SelectionPolicy::All);
        assert_eq!(config.excluded_prefixes, vec!["bcm".to_string()]);
        assert_eq!(config.platform, PlatformPolicy::current());
        assert!(!config.index_fallback_names);
    }

    #[test]
    fn test_overrides_resolve() {
        let options = DiscoveryOptions {
            policy: "best-resolution".to_string(),
            label_separator: Some("|".to_string()),
            reinit_required: Some(false),
            excluded_prefixes: Vec::new(),
            index_fallback_names: true,
        };
        let config = options.to_engine_config().unwrap();
        assert_eq!(config.selection, SelectionPolicy::BestResolution);
        assert_eq!(config.platform.label_separator, "|");
        assert!(!config.platform.reinit_required);
        assert!(config.excluded_prefixes.is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        let options = DiscoveryOptions {
            policy: "random".to_string(),
            ..Default::default()
        };
        assert!(matches!(options.to_engine_config(), Err(Error::Config(_))));

        let options = DiscoveryOptions {
            label_separator: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(options.to_engine_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[discovery]
policy = \"best\"
excluded_prefixes = [\"bcm\", \"unicam\"]

[logging]
level = \"debug\"
rotation = \"daily\""
        )
        .unwrap();

        let config = FindWebcamsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
        let resolved = config.discovery_config().unwrap();
        assert_eq!(resolved.selection, SelectionPolicy::BestResolution);
        assert_eq!(resolved.excluded_prefixes.len(), 2);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "discovery:\n  index_fallback_names: true\n  reinit_required: false"
        )
        .unwrap();

        let config = FindWebcamsConfig::from_file(file.path()).unwrap();
        assert!(config.discovery.index_fallback_names);
        assert_eq!(config.discovery.reinit_required, Some(false));
        assert_eq!(config.discovery.policy, "all");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_exclude_list_drops_blanks() {
        let config = with_vars(&[("FIND_WEBCAMS_EXCLUDE", " bcm, ,unicam,,  ")]);
        assert_eq!(config.discovery.excluded_prefixes, ["bcm", "unicam"]);

        let config = with_vars(&[("FIND_WEBCAMS_EXCLUDE", "")]);
        assert!(config.discovery.excluded_prefixes.is_empty());
    }

    #[test]
    fn test_invalid_flags_are_ignored() {
        let config = with_vars(&[
            ("FIND_WEBCAMS_REINIT", "sometimes"),
            ("FIND_WEBCAMS_INDEX_FALLBACK", "yes please"),
            ("FIND_WEBCAMS_LOG_COLOR", "rainbow"),
            ("FIND_WEBCAMS_LOG_ROTATION", "weekly"),
        ]);
        assert_eq!(config.discovery.reinit_required, None);
        assert!(!config.discovery.index_fallback_names);
        assert!(config.logging.color);
        assert_eq!(config.logging.rotation, None);
    }

    #[test]
    fn test_log_rotation_override() {
        let config = with_vars(&[("FIND_WEBCAMS_LOG_ROTATION", "HOURLY")]);
        assert_eq!(config.logging.rotation, Some(LogRotation::Hourly));

        let mut config = with_vars(&[("FIND_WEBCAMS_LOG_ROTATION", "daily")]);
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
        config.apply_overrides(|name| {
            (name == "FIND_WEBCAMS_LOG_ROTATION").then(|| "never".to_string())
        });
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
    }

    #[test]
    fn test_env_overrides_every_setting() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let values = [
            "best-resolution",
            "|",
            "off",
            "unicam, ,ov",
            "1",
            "trace",
            "/tmp/find-webcams.log",
            "false",
            "daily",
        ];
        for (name, value) in ENV_VARS.iter().zip(values) {
            // SAFETY: ENV_LOCK is held.
            unsafe { env::set_var(name, value) };
        }

        let config = FindWebcamsConfig::load(None);
        clear_env();
        let config = config.unwrap();

        let resolved = config.discovery_config().unwrap();
        assert_eq!(resolved.selection, SelectionPolicy::BestResolution);
        assert_eq!(resolved.platform.label_separator, "|");
        assert!(!resolved.platform.reinit_required);
        assert_eq!(resolved.excluded_prefixes, ["unicam", "ov"]);
        assert!(resolved.index_fallback_names);

        assert_eq!(config.logging.level, "trace");
        assert_eq!(
            config.logging.file.as_deref(),
            Some(Path::new("/tmp/find-webcams.log"))
        );
        assert!(!config.logging.color);
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
    }

    #[test]
    fn test_load_finds_xdg_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let xdg = tempfile::tempdir().unwrap();
        let dir = xdg.path().join("find-webcams");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "[discovery]\npolicy = \"best-resolution\"\nindex_fallback_names = true\n",
        )
        .unwrap();

        // SAFETY: ENV_LOCK is held.
        unsafe { env::set_var("XDG_CONFIG_HOME", xdg.path()) };
        let found = FindWebcamsConfig::discover_file();
        let config = FindWebcamsConfig::load(None);
        clear_env();

        assert_eq!(found.unwrap(), Some(dir.join("config.toml")));
        let config = config.unwrap();
        assert_eq!(config.discovery.policy, "best-resolution");
        assert!(config.discovery.index_fallback_names);
    }

    #[test]
    fn test_local_file_wins_over_xdg() {
        let cwd = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        assert_eq!(find_config_file(cwd.path(), Some(xdg.path())), None);

        let user_dir = xdg.path().join("find-webcams");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(user_dir.join("config.yaml"), "{}").unwrap();
        assert_eq!(
            find_config_file(cwd.path(), Some(xdg.path())),
            Some(user_dir.join("config.yaml"))
        );

        fs::write(cwd.path().join("find-webcams.yml"), "{}").unwrap();
        assert_eq!(
            find_config_file(cwd.path(), Some(xdg.path())),
            Some(cwd.path().join("find-webcams.yml"))
        );
        assert_eq!(find_config_file(cwd.path(), None), Some(cwd.path().join("find-webcams.yml")));
    }
}
