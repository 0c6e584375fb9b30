//! Serialized form of the test definitions file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One language entry in the definitions file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDefinition {
    /// Unique language name.
    pub name: String,
    /// Default working directory for both endpoints.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// Transports shared by the client and server of this language.
    #[serde(default)]
    pub transports: Vec<String>,
    /// Protocols shared by the client and server of this language.
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub client: Option<EndpointDefinition>,
    #[serde(default)]
    pub server: Option<EndpointDefinition>,
}

/// Client or server section of a language entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointDefinition {
    /// Program followed by fixed arguments.
    pub command: Vec<String>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub transports: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Client timeout in seconds.
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Server startup delay in seconds.
    #[serde(default)]
    pub delay: Option<f64>,
}

impl LanguageDefinition {
    /// Union of language-level and endpoint-level values, first appearance wins.
    pub(crate) fn merged(shared: &[String], own: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(shared.len() + own.len());
        for value in shared.iter().chain(own) {
            if !merged.contains(value) {
                merged.push(value.clone());
            }
        }
        merged
    }
}

/// Convert a seconds value from the definitions file.
///
/// Absent values stay `None`. Anything that is not a positive duration that
/// fits in a [`Duration`] is returned as `Err` with the raw value.
pub(crate) fn seconds(value: Option<f64>) -> Result<Option<Duration>, f64> {
    match value {
        None => Ok(None),
        Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| secs),
        Some(secs) => Err(secs),
    }
}
