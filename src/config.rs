use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "markerboard")]
#[command(about = "Runs the markerboard service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".markerboard")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

/// What `GET /markers` answers when the store cannot be read.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListFailure {
    /// Respond 500 with the error body.
    #[default]
    Error,
    /// Log the failure and respond with an empty list.
    Empty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    database: String,
    port: u16,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
    #[serde(default)]
    pub list_failure: ListFailure,
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            database: ":memory:".to_owned(),
            port: 8080,
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
            list_failure: ListFailure::default(),
        }
    }
}

impl App {
    pub fn in_memory() -> Self {
        App::default()
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_owned();
        self
    }

    pub fn with_list_failure(mut self, policy: ListFailure) -> Self {
        self.list_failure = policy;
        self
    }

    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Resolves the database location against `data_dir`. `:memory:` is kept as is.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.database == ":memory:" {
            return PathBuf::from(&self.database);
        }
        data_dir.join(&self.database)
    }

    pub fn is_replica(&self) -> bool {
        self.turso_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.turso_auth_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path).with_context(|| format!("failed to read config file {path}"))?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str);
        let config: Config = serde_yaml::from_str(&yaml_with_env).context("failed to parse config yaml")?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            let Some(end) = result[actual_start..].find('}') else {
                break;
            };
            let var_name = &result[actual_start + 2..actual_start + end];

            // ${VAR:-default}
            let env_value = if let Some(default_start) = var_name.find(":-") {
                let actual_var = &var_name[..default_start];
                let default_val = &var_name[default_start + 2..];
                env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
            } else {
                env::var(var_name).unwrap_or_else(|_| {
                    tracing::warn!(var = var_name, "environment variable not found");
                    String::new()
                })
            };

            result.replace_range(actual_start..actual_start + end + 1, &env_value);
            offset = actual_start + env_value.len();
        }

        result
    }
}
