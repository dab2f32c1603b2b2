//! Shared configuration for SmartCB tools.
//!
//! TOML profiles naming a breaker's address, global scan and timeout
//! defaults, optional local threshold overrides, and translation into
//! `smartcb_core::ManagerConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smartcb_core::{DEFAULT_PORT, DeviceEndpoint, ManagerConfig, ScanOptions, Thresholds};

/// Overrides the config file location when set.
pub const CONFIG_PATH_ENV: &str = "SMARTCB_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named breaker profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    /// Local threshold overrides, applied before the first device sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
            thresholds: None,
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    ///
    /// Returns `Ok(None)` when no name was asked for and the default
    /// profile does not exist, so callers can fall back to scanning.
    pub fn profile(&self, name: Option<&str>) -> Result<Option<(&str, &Profile)>, ConfigError> {
        match name {
            Some(name) => self
                .profiles
                .get_key_value(name)
                .map(|(k, p)| Some((k.as_str(), p)))
                .ok_or_else(|| ConfigError::UnknownProfile {
                    profile: name.into(),
                }),
            None => Ok(self
                .default_profile
                .as_deref()
                .and_then(|name| self.profiles.get_key_value(name))
                .map(|(k, p)| (k.as_str(), p))),
        }
    }

    /// Thresholds to seed the local store with.
    pub fn initial_thresholds(&self) -> Result<Thresholds, ConfigError> {
        let thresholds = self.thresholds.unwrap_or_default();
        thresholds
            .validate()
            .map_err(|e| ConfigError::Validation {
                field: "thresholds".into(),
                reason: e.to_string(),
            })?;
        Ok(thresholds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Handshake and sync request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Per-probe deadline while scanning.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Sweep the local subnet in addition to the common addresses.
    #[serde(default = "default_scan_subnet")]
    pub scan_subnet: bool,

    /// Push the local clock after connecting.
    #[serde(default = "default_sync_clock")]
    pub sync_clock: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            scan_concurrency: default_scan_concurrency(),
            scan_subnet: default_scan_subnet(),
            sync_clock: default_sync_clock(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_probe_timeout_ms() -> u64 {
    1_000
}
fn default_scan_concurrency() -> usize {
    24
}
fn default_scan_subnet() -> bool {
    true
}
fn default_sync_clock() -> bool {
    true
}

impl Defaults {
    /// Engine configuration from these defaults alone.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            scan: ScanOptions {
                probe_timeout: Duration::from_millis(self.probe_timeout_ms),
                concurrency: self.scan_concurrency,
            },
            sync_clock: self.sync_clock,
        }
    }
}

/// A named breaker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Dotted-quad IPv4 address.
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Override `defaults.timeout_ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Profile {
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        Self {
            host: endpoint.host.to_string(),
            port: endpoint.port,
            timeout_ms: None,
        }
    }

    pub fn endpoint(&self) -> Result<DeviceEndpoint, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation {
                field: "port".into(),
                reason: "port must be between 1 and 65535".into(),
            });
        }
        let host = self.host.trim().parse().map_err(|_| ConfigError::Validation {
            field: "host".into(),
            reason: format!("'{}' is not a dotted-quad IPv4 address", self.host),
        })?;
        Ok(DeviceEndpoint::new(host, self.port))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `SMARTCB_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "smartcb", "smartcb").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("smartcb");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys use `__` for nesting, e.g.
/// `SMARTCB_DEFAULTS__TIMEOUT_MS=2000`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SMARTCB_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate a profile and build the engine configuration for it.
pub fn profile_to_manager_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<(DeviceEndpoint, ManagerConfig), ConfigError> {
    let endpoint = profile.endpoint()?;
    let mut config = defaults.manager_config();
    if let Some(ms) = profile.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }
    Ok((endpoint, config))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::net::Ipv4Addr;

    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.defaults.timeout_ms, 5_000);
        assert_eq!(cfg.defaults.scan_concurrency, 24);
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "home"

                [defaults]
                probe_timeout_ms = 400

                [profiles.home]
                host = "192.168.1.50"

                [thresholds.current]
                max = 20.0
                enabled = true
                "#,
            )?;
            jail.set_env("SMARTCB_DEFAULTS__TIMEOUT_MS", "2000");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.defaults.probe_timeout_ms, 400);
            assert_eq!(cfg.defaults.timeout_ms, 2_000);
            assert_eq!(cfg.defaults.output, "table");

            let (name, profile) = cfg.profile(None).unwrap().unwrap();
            assert_eq!(name, "home");
            assert_eq!(profile.port, 80);

            let thresholds = cfg.initial_thresholds().unwrap();
            assert!((thresholds.current.max - 20.0).abs() < f64::EPSILON);
            // Sections not in the file keep factory values.
            assert!((thresholds.voltage.max - 250.0).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn partial_threshold_overrides_keep_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [thresholds.voltage]
                max = 240.0
                "#,
            )?;
            jail.set_env("SMARTCB_THRESHOLDS__CURRENT__MAX", "20");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            let thresholds = cfg.initial_thresholds().unwrap();
            assert!((thresholds.voltage.max - 240.0).abs() < f64::EPSILON);
            assert!((thresholds.voltage.min - 180.0).abs() < f64::EPSILON);
            assert!((thresholds.current.max - 20.0).abs() < f64::EPSILON);
            assert!(thresholds.current.enabled);
            assert!(thresholds.frequency.enabled);
            Ok(())
        });
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = Config::default();
        assert!(cfg.profile(None).unwrap().is_none());
        assert!(matches!(
            cfg.profile(Some("garage")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_translation_validates_host() {
        let defaults = Defaults::default();
        let bad = Profile {
            host: "breaker.local".into(),
            port: 80,
            timeout_ms: None,
        };
        assert!(matches!(
            profile_to_manager_config(&bad, &defaults),
            Err(ConfigError::Validation { .. })
        ));

        let good = Profile {
            host: "10.0.0.7".into(),
            port: 8080,
            timeout_ms: Some(750),
        };
        let (endpoint, config) = profile_to_manager_config(&good, &defaults).unwrap();
        assert_eq!(endpoint, DeviceEndpoint::new(Ipv4Addr::new(10, 0, 0, 7), 8080));
        assert_eq!(config.timeout, Duration::from_millis(750));
        assert_eq!(config.scan.probe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile::new(DeviceEndpoint::new(Ipv4Addr::new(192, 168, 4, 1), 80)),
        );
        save_config_to(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("192.168.4.1"));
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }
}
