use log::{ info, warn };
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::error::RelayError;

/// One entry of the endpoints config file: a display name plus the
/// environment variable holding the backend URL.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSpec {
    pub name: String,
    pub env: String,
}

#[derive(Debug, Deserialize)]
struct EndpointsFile {
    endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

/// Static name -> URL mapping resolved once at startup. Immutable for the
/// process lifetime; no hot-reload.
#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
    by_name: HashMap<String, String>,
}

impl EndpointRegistry {
    /// Read the endpoints file and resolve each entry from the process
    /// environment, keeping configured order. Entries whose variable is
    /// unset or blank are skipped with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file: EndpointsFile = serde_json::from_str(&raw).map_err(|e| {
            RelayError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Self::from_specs(&file.endpoints)
    }

    pub fn from_specs(specs: &[EndpointSpec]) -> Result<Self, RelayError> {
        let mut endpoints = Vec::new();
        let mut by_name = HashMap::new();

        for spec in specs {
            let url = env::var(&spec.env).unwrap_or_default().trim().to_string();
            if url.is_empty() {
                warn!("Endpoint '{}' skipped: {} is unset or empty", spec.name, spec.env);
                continue;
            }
            if by_name.insert(spec.name.clone(), url.clone()).is_some() {
                return Err(RelayError::Config(
                    format!("Duplicate endpoint name: {}", spec.name),
                ));
            }
            endpoints.push(Endpoint { name: spec.name.clone(), url });
        }

        if endpoints.is_empty() {
            return Err(RelayError::Config(
                "No endpoints resolved - check your environment variables!".into(),
            ));
        }

        info!("Resolved {} endpoint(s): {}", endpoints.len(), endpoints
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(", "));
        Ok(Self { endpoints, by_name })
    }

    /// Endpoint names in configured order, for display.
    pub fn names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.name.clone()).collect()
    }

    pub fn url(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// First successfully resolved entry.
    pub fn default_name(&self) -> &str {
        &self.endpoints[0].name
    }
}
