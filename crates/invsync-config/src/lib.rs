//! Configuration for the invsync collector.
//!
//! Layered with figment: built-in defaults, then the TOML file, then
//! `INVSYNC_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `INVSYNC_HUB__URL`). [`Config::into_collector_config`] turns the
//! result into the core's `CollectorConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use invsync_api::transport::{TlsMode, TransportConfig};
use invsync_core::config::{CollectorConfig, HardwarePluginConfig, HubConfig, WatchConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const REDACTED: &str = "<redacted>";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// SQLite database path. Defaults to the platform data directory.
    pub database: Option<PathBuf>,

    /// Owning cloud id; required.
    pub cloud_id: Option<Uuid>,

    /// Global cloud id; falls back to `cloud_id`.
    pub global_cloud_id: Option<Uuid>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    pub hub: Option<HubSettings>,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub hardware_plugins: Vec<PluginSettings>,

    #[serde(default)]
    pub discover_hardware_plugins: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            cloud_id: None,
            global_cloud_id: None,
            poll_interval_secs: default_poll_interval(),
            log_format: default_log_format(),
            hub: None,
            watch: WatchSettings::default(),
            hardware_plugins: Vec::new(),
            discover_hardware_plugins: false,
        }
    }
}

fn default_poll_interval() -> u64 {
    600
}
fn default_log_format() -> String {
    "text".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// Connection to the cluster hub.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HubSettings {
    pub url: String,

    /// Bearer token (plaintext; prefer `token_env`).
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,

    /// Namespace of the inventory resources; all namespaces when unset.
    pub namespace: Option<String>,

    #[serde(default)]
    pub insecure: bool,

    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchSettings {
    #[serde(default = "default_true")]
    pub clusters: bool,
    #[serde(default = "default_true")]
    pub resource_pools: bool,
    #[serde(default = "default_true")]
    pub locations: bool,
    #[serde(default = "default_true")]
    pub ocloud_sites: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            clusters: true,
            resource_pools: true,
            locations: true,
            ocloud_sites: true,
        }
    }
}

/// A statically configured hardware plugin.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PluginSettings {
    pub name: String,
    pub api_root: String,
    pub token: Option<String>,
    pub token_env: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "invsync", "invsync")
}

/// Default config file path (platform config directory).
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("invsync.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default database path (platform data directory).
pub fn default_database_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("invsync.db"),
        |dirs| dirs.data_dir().join("inventory.db"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then the environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("INVSYNC_").split("__"))
}

/// Extracts the layered configuration without validating it. `path`
/// overrides the default file location; a missing file is not an error.
pub fn read_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Ok(figment(&path).extract()?)
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.cloud_id {
            None => return Err(invalid("cloud_id", "must be set")),
            Some(id) if id.is_nil() => return Err(invalid("cloud_id", "must not be the nil UUID")),
            Some(_) => {}
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be greater than zero"));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(invalid(
                "log_format",
                format!("expected 'text' or 'json', got '{}'", self.log_format),
            ));
        }
        if let Some(hub) = &self.hub {
            parse_url("hub.url", &hub.url)?;
        } else if self.discover_hardware_plugins {
            return Err(invalid(
                "discover_hardware_plugins",
                "requires a [hub] section",
            ));
        }
        for (i, plugin) in self.hardware_plugins.iter().enumerate() {
            if plugin.name.trim().is_empty() {
                return Err(invalid(format!("hardware_plugins[{i}].name"), "must not be empty"));
            }
            parse_url(&format!("hardware_plugins[{i}].api_root"), &plugin.api_root)?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(default_database_path)
    }

    /// Validates and produces the collector settings.
    pub fn into_collector_config(self) -> Result<CollectorConfig, ConfigError> {
        self.validate()?;
        let cloud_id = self.cloud_id.unwrap_or_default();

        let hub = self
            .hub
            .as_ref()
            .map(|hub| -> Result<HubConfig, ConfigError> {
                Ok(HubConfig {
                    url: parse_url("hub.url", &hub.url)?,
                    namespace: hub.namespace.clone().filter(|ns| !ns.is_empty()),
                    transport: transport(
                        hub.insecure,
                        hub.ca_cert.as_deref(),
                        hub.timeout_secs,
                        resolve_token(hub.token.as_deref(), hub.token_env.as_deref()),
                    ),
                })
            })
            .transpose()?;

        let hardware_plugins = self
            .hardware_plugins
            .iter()
            .enumerate()
            .map(|(i, plugin)| -> Result<HardwarePluginConfig, ConfigError> {
                Ok(HardwarePluginConfig {
                    name: plugin.name.clone(),
                    api_root: parse_url(&format!("hardware_plugins[{i}].api_root"), &plugin.api_root)?,
                    transport: transport(
                        plugin.insecure,
                        plugin.ca_cert.as_deref(),
                        plugin.timeout_secs,
                        resolve_token(plugin.token.as_deref(), plugin.token_env.as_deref()),
                    ),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Discovered plugins are reached with the hub's credentials.
        let plugin_transport = hub
            .as_ref()
            .map(|hub| hub.transport.clone())
            .unwrap_or_default();

        Ok(CollectorConfig {
            cloud_id,
            global_cloud_id: self.global_cloud_id.unwrap_or(cloud_id),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            hub,
            watch: WatchConfig {
                clusters: self.watch.clusters,
                resource_pools: self.watch.resource_pools,
                locations: self.watch.locations,
                ocloud_sites: self.watch.ocloud_sites,
            },
            hardware_plugins,
            discover_hardware_plugins: self.discover_hardware_plugins,
            plugin_transport,
        })
    }

    /// TOML rendering with every token replaced by a placeholder.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        if let Some(hub) = &mut redacted.hub {
            redact(&mut hub.token);
        }
        for plugin in &mut redacted.hardware_plugins {
            redact(&mut plugin.token);
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

fn redact(token: &mut Option<String>) {
    if token.is_some() {
        *token = Some(REDACTED.to_owned());
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|e| invalid(field, format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}

/// Token from the named environment variable, else the plaintext value.
fn resolve_token(token: Option<&str>, token_env: Option<&str>) -> Option<SecretString> {
    if let Some(value) = token_env.and_then(|name| std::env::var(name).ok()) {
        return Some(SecretString::from(value));
    }
    token.map(SecretString::from)
}

fn transport(
    insecure: bool,
    ca_cert: Option<&Path>,
    timeout_secs: u64,
    bearer_token: Option<SecretString>,
) -> TransportConfig {
    let tls = if insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(path) = ca_cert {
        TlsMode::CustomCa(path.to_path_buf())
    } else {
        TlsMode::System
    };
    TransportConfig {
        tls,
        timeout: Duration::from_secs(timeout_secs),
        bearer_token,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const CLOUD: &str = "6575154a-72fc-4ed8-9a87-a81885ab38bb";

    fn parse(toml: &str) -> Config {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = parse(&format!("cloud_id = \"{CLOUD}\""));
        assert_eq!(config.poll_interval_secs, 600);
        assert_eq!(config.log_format, "text");
        assert!(config.watch.clusters && config.watch.ocloud_sites);
        config.validate().unwrap();
    }

    #[test]
    fn missing_cloud_id_names_the_field() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid cloud_id: must be set");
    }

    #[test]
    fn bad_plugin_url_names_its_index() {
        let config = parse(&format!(
            r#"
            cloud_id = "{CLOUD}"
            [[hardware_plugins]]
            name = "metal3"
            api_root = "ftp://plugin"
            "#
        ));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("invalid hardware_plugins[0].api_root"));
    }

    #[test]
    fn discovery_requires_a_hub() {
        let config = parse(&format!(
            "cloud_id = \"{CLOUD}\"\ndiscover_hardware_plugins = true"
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn translates_into_collector_config() {
        let config = parse(&format!(
            r#"
            cloud_id = "{CLOUD}"
            poll_interval_secs = 120
            discover_hardware_plugins = true

            [hub]
            url = "https://hub.example:6443"
            token = "hub-token"
            namespace = "oran-o2ims"
            insecure = true

            [watch]
            locations = false

            [[hardware_plugins]]
            name = "metal3"
            api_root = "https://metal3.example"
            "#
        ));

        let collector = config.into_collector_config().unwrap();
        let cloud = Uuid::parse_str(CLOUD).unwrap();
        assert_eq!(collector.cloud_id, cloud);
        assert_eq!(collector.global_cloud_id, cloud);
        assert_eq!(collector.poll_interval, Duration::from_secs(120));
        assert!(!collector.watch.locations);
        assert!(collector.watch.clusters);

        let hub = collector.hub.unwrap();
        assert_eq!(hub.namespace.as_deref(), Some("oran-o2ims"));
        assert!(matches!(hub.transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(
            hub.transport.bearer_token.unwrap().expose_secret(),
            "hub-token"
        );
        assert_eq!(
            collector
                .plugin_transport
                .bearer_token
                .unwrap()
                .expose_secret(),
            "hub-token"
        );

        assert_eq!(collector.hardware_plugins[0].name, "metal3");
        assert!(collector.hardware_plugins[0].transport.bearer_token.is_none());
    }

    #[test]
    fn toml_output_redacts_tokens() {
        let config = parse(&format!(
            r#"
            cloud_id = "{CLOUD}"
            [hub]
            url = "https://hub.example:6443"
            token = "hub-token"
            "#
        ));
        let rendered = config.to_toml_string().unwrap();
        assert!(!rendered.contains("hub-token"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("cloud_id = \"{CLOUD}\"\ndatabase = \"/var/lib/invsync/db.sqlite\"\n"),
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/invsync/db.sqlite")
        );
    }
}
