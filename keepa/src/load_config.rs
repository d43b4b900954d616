/// `load_config` module: loads the TOML run configuration into strongly-typed structs.
///
/// This module is the only place where the user's config file is parsed.
///
/// # Responsibilities
/// - Parse `config.toml` into [`KeepaConfig`]: `client_settings` for the storage client
///   and the ordered list of upload [`Entry`] records
/// - Keep read errors and parse errors distinguishable in diagnostics
///
/// # Errors
/// All errors in this module use `anyhow::Error` with the file path attached, and are
/// surfaced at the CLI boundary.
use anyhow::Result;
use keepa_core::Entry;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Default file name looked up when `--config` is not given.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Deserialize)]
pub struct KeepaConfig {
    #[serde(default)]
    pub client_settings: ClientSettings,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Connection parameters handed to the storage client constructor.
///
/// Every field is optional; anything missing falls back to the AWS SDK default chain
/// (environment, profile files, instance metadata).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ClientSettings {
    pub service_name: Option<String>,
    pub endpoint_url: Option<String>,
    pub region_name: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

impl KeepaConfig {
    /// Entries flagged for date-based retention, in config order.
    pub fn date_handling_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.date_handling)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<KeepaConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: KeepaConfig = match toml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config TOML successfully");
            conf
        }
        Err(e) => {
            error!(error = %e, config_path = ?path_ref, "Failed to parse config TOML");
            return Err(anyhow::anyhow!(
                "Failed to parse config TOML {:?}: {e}",
                path_ref
            ));
        }
    };

    if let Some(service) = config.client_settings.service_name.as_deref() {
        if service != "s3" {
            error!(service_name = %service, "Unsupported client_settings.service_name");
            anyhow::bail!("Unsupported client_settings.service_name: {service} (only \"s3\" is supported)");
        }
    }
    let settings = &config.client_settings;
    if settings.aws_access_key_id.is_some() != settings.aws_secret_access_key.is_some() {
        error!("client_settings must set both aws_access_key_id and aws_secret_access_key, or neither");
        anyhow::bail!(
            "client_settings must set both aws_access_key_id and aws_secret_access_key, or neither"
        );
    }

    for entry in &config.entries {
        entry.trace_loaded();
    }
    info!(
        entries = config.entries.len(),
        date_handling = config.date_handling_entries().count(),
        "Config loaded successfully"
    );
    Ok(config)
}
