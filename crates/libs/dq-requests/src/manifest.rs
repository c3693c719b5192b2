//! Resource manifests and API routes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::prelude::*;

/// API version used when a manifest does not name one.
pub const DEFAULT_API_VERSION: &str = "v1";

/// One resource definition to apply, wait for or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub spec: Value,
}

/// A resource as reported by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub spec: Value,
    #[serde(default)]
    pub status: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonManifests {
    Many(Vec<Manifest>),
    One(Manifest),
}

#[derive(Deserialize)]
struct TomlManifests {
    manifests: Vec<Manifest>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Collection path segment for a resource kind, case insensitive.
pub fn kind_route(kind: &str) -> Result<&'static str> {
    let route = match kind.to_ascii_lowercase().as_str() {
        "continuousquery" | "query" => "continuousQueries",
        "querycontainer" => "queryContainers",
        "reaction" => "reactions",
        "reactionprovider" => "reactionProviders",
        "source" => "sources",
        "sourceprovider" => "sourceProviders",
        _ => return Err(Error::UnknownKind(kind.to_string())),
    };
    Ok(route)
}

impl Manifest {
    /// Resource name as addressed by the API, `name:tag` when tagged.
    pub fn resource_name(&self) -> String {
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() => format!("{}:{tag}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn api_version(&self) -> &str {
        if self.api_version.is_empty() {
            DEFAULT_API_VERSION
        } else {
            &self.api_version
        }
    }

    /// Parse a JSON document holding one manifest or an array of them.
    pub fn from_json(value: &str) -> Result<Vec<Self>> {
        Ok(match serde_json::from_str(value)? {
            JsonManifests::Many(manifests) => manifests,
            JsonManifests::One(manifest) => vec![manifest],
        })
    }

    /// Parse a TOML document with a `[[manifests]]` array.
    pub fn from_toml(value: &str) -> Result<Vec<Self>> {
        let file: TomlManifests = toml::from_str(value)?;
        Ok(file.manifests)
    }

    /// Load manifests from a file, TOML when the extension says so.
    pub fn from_file(path: &Path) -> Result<Vec<Self>> {
        let contents = std::fs::read_to_string(path)?;
        let manifests = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&contents)?,
            _ => Self::from_json(&contents)?,
        };
        debug!("Loaded {} manifests from {}", manifests.len(), path.display());
        Ok(manifests)
    }
}

/// Load and concatenate the manifests of every file, in order.
pub fn load_manifests<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for path in paths {
        manifests.extend(Manifest::from_file(path.as_ref())?);
    }
    Ok(manifests)
}
