use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ShakeError;

pub const DEFAULT_CONFIG_FILE: &str = "shakemap-hazus.json";
pub const DEFAULT_DATABASE_EXTENSION: &str = "mdb";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub template_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub output_root: Option<Utf8PathBuf>,
    #[serde(default)]
    pub database_extension: Option<String>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub template_dir: Option<Utf8PathBuf>,
    pub output_root: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub template_dir: Utf8PathBuf,
    pub output_root: Option<Utf8PathBuf>,
    pub database_extension: String,
}

impl ResolvedConfig {
    pub fn require_output_root(&self) -> Result<&Utf8Path, ShakeError> {
        self.output_root
            .as_deref()
            .ok_or(ShakeError::MissingOutputRoot)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ShakeError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        // Only an explicitly named config file has to exist.
        let config = if path.is_none() && !config_path.as_std_path().exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(config_path.as_std_path())
                .map_err(|_| ShakeError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| ShakeError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ShakeError> {
        let template_dir = match overrides.template_dir.or(config.template_dir) {
            Some(dir) => dir,
            None => default_template_dir()?,
        };

        let database_extension = config
            .database_extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_EXTENSION.to_string());

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            template_dir,
            output_root: overrides.output_root.or(config.output_root),
            database_extension,
        })
    }
}

pub fn default_template_dir() -> Result<Utf8PathBuf, ShakeError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.data_dir().join("shakemap-hazus").join("template"))
                .ok()
        })
        .ok_or_else(|| ShakeError::Filesystem("unable to resolve template directory".to_string()))
}
