//! Registered environments and the current selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::prelude::*;

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "DQ_CONFIG";

/// Where the platform behind an environment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Kubernetes,
    Docker,
}

/// One management API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub kind: EnvironmentKind,
    /// Base URL of the management API.
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

/// Configuration path: `$DQ_CONFIG` if set, else `<config dir>/dq/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs::config_dir().ok_or(Error::NoConfigDir)?;
    Ok(dir.join("dq").join("config.toml"))
}

impl DqConfig {
    /// Load configuration from a TOML file, empty when the file is missing.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        if !file_path.exists() {
            debug!("No configuration at {}", file_path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Write configuration, creating parent directories.
    pub fn to_file(&self, file_path: &Path) -> Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file_path, toml::to_string(self)?)?;
        info!("Saved configuration to {}", file_path.display());
        Ok(())
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments
            .iter()
            .find(|env| env.name == name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))
    }

    pub fn current_environment(&self) -> Result<&Environment> {
        let name = self.current.as_deref().ok_or(Error::NoEnvironment)?;
        self.environment(name)
    }

    /// Select a registered environment.
    pub fn set_current(&mut self, name: &str) -> Result<()> {
        self.environment(name)?;
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Register an environment, replacing any with the same name.
    ///
    /// The first environment registered becomes current.
    pub fn upsert(&mut self, environment: Environment) {
        match self
            .environments
            .iter_mut()
            .find(|env| env.name == environment.name)
        {
            Some(existing) => *existing = environment,
            None => {
                if self.current.is_none() {
                    self.current = Some(environment.name.clone());
                }
                self.environments.push(environment);
            }
        }
    }

    /// Forget an environment, clearing the selection if it was current.
    pub fn remove(&mut self, name: &str) -> Result<Environment> {
        let index = self
            .environments
            .iter()
            .position(|env| env.name == name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(self.environments.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str, url: &str) -> Environment {
        Environment {
            name: name.to_string(),
            kind: EnvironmentKind::Kubernetes,
            api_url: url.to_string(),
            namespace: Some("dq-system".to_string()),
        }
    }

    #[test]
    fn deserialize() -> Result<()> {
        let config = DqConfig::from_toml(
            r#"
            current = "prod"

            [[environments]]
            name = "local"
            kind = "docker"
            api_url = "http://localhost:8080"

            [[environments]]
            name = "prod"
            kind = "kubernetes"
            api_url = "http://10.0.0.5:8080"
            namespace = "dq-system"
            "#,
        )?;
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.environments[0].kind, EnvironmentKind::Docker);
        assert_eq!(config.environments[0].namespace, None);
        assert_eq!(config.current_environment()?.api_url, "http://10.0.0.5:8080");
        Ok(())
    }

    #[test]
    fn empty_config_has_no_current() {
        let config = DqConfig::from_toml("").unwrap();
        assert!(matches!(config.current_environment(), Err(Error::NoEnvironment)));
    }

    #[test]
    fn upsert_replaces_and_selects_first() {
        let mut config = DqConfig::default();
        config.upsert(env("a", "http://a"));
        config.upsert(env("b", "http://b"));
        config.upsert(env("a", "http://a2"));

        assert_eq!(config.current.as_deref(), Some("a"));
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.environment("a").unwrap().api_url, "http://a2");
    }

    #[test]
    fn set_current_requires_registration() {
        let mut config = DqConfig::default();
        config.upsert(env("a", "http://a"));
        assert!(matches!(
            config.set_current("zzz"),
            Err(Error::UnknownEnvironment(name)) if name == "zzz"
        ));
        assert_eq!(config.current.as_deref(), Some("a"));
    }

    #[test]
    fn removing_current_clears_selection() {
        let mut config = DqConfig::default();
        config.upsert(env("a", "http://a"));
        config.upsert(env("b", "http://b"));

        config.remove("b").unwrap();
        assert_eq!(config.current.as_deref(), Some("a"));
        config.remove("a").unwrap();
        assert_eq!(config.current, None);
        assert!(config.remove("a").is_err());
    }

    #[test]
    fn file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.toml");

        assert_eq!(DqConfig::from_file(&path)?, DqConfig::default());

        let mut config = DqConfig::default();
        config.upsert(env("prod", "http://10.0.0.5:8080"));
        config.to_file(&path)?;

        assert_eq!(DqConfig::from_file(&path)?, config);
        Ok(())
    }
}
