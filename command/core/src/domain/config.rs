// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Command Service Configuration
//
// Defines the configuration schema for the lighthouse command service:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP listener settings
// - Document store backend selection
// - Reconciliation policy for renamed objects
// - Agent index queue settings
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const CONFIG_API_VERSION: &str = "lighthouse/v1";
pub const CONFIG_KIND: &str = "CommandConfig";
pub const CONFIG_PATH_ENV: &str = "LIGHTHOUSE_CONFIG_PATH";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfigManifest {
    /// API version (must be "lighthouse/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CommandConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: CommandConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: DatabaseBackend,

    /// Connection string, required for the postgres backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Which object of an UPDATE pair locates the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKeySource {
    /// Resolve by the old object's key, fall back to the new one. A rename
    /// moves the document; no orphan is left behind.
    Old,
    /// Resolve by the new object's key only. A rename inserts a second
    /// document and leaves the old one orphaned.
    New,
}

impl std::str::FromStr for UpdateKeySource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "old" => Ok(UpdateKeySource::Old),
            "new" => Ok(UpdateKeySource::New),
            other => Err(format!("unknown update key source '{}', expected old or new", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_update_key_source")]
    pub update_key_source: UpdateKeySource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pending index writes buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus exporter port, disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

/// Process run mode (`RUN_MODE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Develop,
    Test,
}

impl RunMode {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("RUN_MODE").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_uppercase()).as_deref() {
            Some("PRODUCTION") => RunMode::Production,
            Some("TEST") => RunMode::Test,
            _ => RunMode::Develop,
        }
    }

    /// `.env` files are only honoured outside production.
    pub fn loads_dotenv(&self) -> bool {
        *self != RunMode::Production
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_backend() -> DatabaseBackend {
    DatabaseBackend::InMemory
}

fn default_max_connections() -> u32 {
    5
}

fn default_update_key_source() -> UpdateKeySource {
    UpdateKeySource::Old
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            update_key_source: default_update_key_source(),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: None,
        }
    }
}

impl Default for CommandConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "lighthouse-command".to_string());

        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: CommandConfigSpec::default(),
        }
    }
}

impl CommandConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. LIGHTHOUSE_CONFIG_PATH environment variable
    /// 2. ./lighthouse-config.yaml (working directory)
    /// 3. ~/.lighthouse/config.yaml (user home)
    /// 4. /etc/lighthouse/config.yaml (Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./lighthouse-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".lighthouse").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/lighthouse/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SERVER_PORT") {
            match val.trim().parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: SERVER_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => tracing::warn!("Invalid value for SERVER_PORT: '{}'. Ignoring.", val),
            }
        }

        if let Some(val) = lookup("DATABASE") {
            match val.trim().to_uppercase().as_str() {
                "POSTGRES" | "POSTGRESQL" => {
                    tracing::info!("Environment override: DATABASE=POSTGRES");
                    self.spec.database.backend = DatabaseBackend::Postgres;
                }
                "INMEMORY" | "IN_MEMORY" => {
                    tracing::info!("Environment override: DATABASE=INMEMORY");
                    self.spec.database.backend = DatabaseBackend::InMemory;
                }
                _ => tracing::warn!(
                    "Invalid value for DATABASE: '{}'. Expected POSTGRES or INMEMORY. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("DATABASE_URL") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: DATABASE_URL");
                self.spec.database.url = Some(val);
            }
        }

        if let Some(val) = lookup("LIGHTHOUSE_UPDATE_KEY_SOURCE") {
            match val.parse::<UpdateKeySource>() {
                Ok(source) => {
                    tracing::info!("Environment override: LIGHTHOUSE_UPDATE_KEY_SOURCE={:?}", source);
                    self.spec.reconciliation.update_key_source = source;
                }
                Err(e) => tracing::warn!("{}. Ignoring.", e),
            }
        }
    }

    /// Store backend selected by this configuration
    pub fn storage_backend(&self) -> StorageBackend {
        match self.spec.database.backend {
            DatabaseBackend::InMemory => StorageBackend::InMemory,
            DatabaseBackend::Postgres => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: self.spec.database.url.clone().unwrap_or_default(),
                max_connections: self.spec.database.max_connections,
            }),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != CONFIG_API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                CONFIG_API_VERSION
            );
        }

        if self.kind != CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.database.backend == DatabaseBackend::Postgres {
            let has_url = self
                .spec
                .database
                .url
                .as_deref()
                .map(|url| !url.trim().is_empty())
                .unwrap_or(false);
            if !has_url {
                anyhow::bail!("spec.database.url is required for the postgres backend");
            }
        }

        if self.spec.database.max_connections == 0 {
            anyhow::bail!("spec.database.max_connections must be at least 1");
        }

        if self.spec.indexer.queue_capacity == 0 {
            anyhow::bail!("spec.indexer.queue_capacity must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = CommandConfigManifest::default();
        assert_eq!(manifest.api_version, CONFIG_API_VERSION);
        assert_eq!(manifest.kind, CONFIG_KIND);
        assert_eq!(manifest.spec.server.port, 8080);
        assert_eq!(manifest.spec.database.backend, DatabaseBackend::InMemory);
        assert_eq!(manifest.spec.reconciliation.update_key_source, UpdateKeySource::Old);
        assert!(manifest.spec.indexer.enabled);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing_with_partial_spec() {
        let yaml = r#"
apiVersion: lighthouse/v1
kind: CommandConfig
metadata:
  name: command-eu-1
spec:
  server:
    port: 9000
  database:
    backend: postgres
    url: postgres://lighthouse:secret@db:5432/lighthouse
  reconciliation:
    update_key_source: new
"#;
        let manifest = CommandConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.server.port, 9000);
        assert_eq!(manifest.spec.server.bind_address, "0.0.0.0");
        assert_eq!(manifest.spec.database.max_connections, 5);
        assert_eq!(manifest.spec.reconciliation.update_key_source, UpdateKeySource::New);
        assert_eq!(manifest.spec.indexer.queue_capacity, 1024);
        assert!(manifest.validate().is_ok());

        match manifest.storage_backend() {
            StorageBackend::PostgreSQL(pg) => {
                assert_eq!(pg.connection_string, "postgres://lighthouse:secret@db:5432/lighthouse");
            }
            other => panic!("expected postgres backend, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lighthouse-config.yaml");

        let mut manifest = CommandConfigManifest::default();
        manifest.spec.observability.metrics_port = Some(9102);
        manifest.to_yaml_file(&path).unwrap();

        let loaded = CommandConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.observability.metrics_port, Some(9102));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = CommandConfigManifest::load_or_default(Some(PathBuf::from("/nonexistent/lighthouse.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut manifest = CommandConfigManifest::default();
        manifest.api_version = "v2".to_string();
        assert!(manifest.validate().is_err());

        let mut manifest = CommandConfigManifest::default();
        manifest.spec.database.backend = DatabaseBackend::Postgres;
        assert!(manifest.validate().is_err(), "postgres without url");

        let mut manifest = CommandConfigManifest::default();
        manifest.spec.indexer.queue_capacity = 0;
        assert!(manifest.validate().is_err());

        let mut manifest = CommandConfigManifest::default();
        manifest.metadata.name = String::new();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "7070"),
            ("DATABASE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/lighthouse"),
            ("LIGHTHOUSE_UPDATE_KEY_SOURCE", "new"),
        ]);
        let mut manifest = CommandConfigManifest::default();
        manifest.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.server.port, 7070);
        assert_eq!(manifest.spec.database.backend, DatabaseBackend::Postgres);
        assert_eq!(manifest.spec.database.url.as_deref(), Some("postgres://localhost/lighthouse"));
        assert_eq!(manifest.spec.reconciliation.update_key_source, UpdateKeySource::New);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "not-a-port"),
            ("DATABASE", "MONGO"),
            ("LIGHTHOUSE_UPDATE_KEY_SOURCE", "sideways"),
        ]);
        let mut manifest = CommandConfigManifest::default();
        manifest.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.server.port, 8080);
        assert_eq!(manifest.spec.database.backend, DatabaseBackend::InMemory);
        assert_eq!(manifest.spec.reconciliation.update_key_source, UpdateKeySource::Old);
    }

    #[test]
    fn test_run_mode() {
        assert_eq!(RunMode::parse(Some("PRODUCTION")), RunMode::Production);
        assert_eq!(RunMode::parse(Some("test")), RunMode::Test);
        assert_eq!(RunMode::parse(None), RunMode::Develop);
        assert!(!RunMode::Production.loads_dotenv());
        assert!(RunMode::Develop.loads_dotenv());
    }
}
