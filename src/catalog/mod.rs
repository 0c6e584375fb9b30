//! Test definition catalog.
//!
//! The definitions file lists language implementations, each with an
//! optional client and server. Loading expands that list into the ordered
//! set of client/server [`Pair`]s that share a protocol and transport.

pub mod definition;
pub mod pair;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use definition::{EndpointDefinition, LanguageDefinition};
pub use pair::{Endpoint, Outcome, Pair, PairLogs};

/// Errors that can occur while loading test definitions.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The definitions file could not be read.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The definitions file is not valid JSON for the expected schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry has an empty command.
    #[error("Language '{language}' has an empty {role} command")]
    EmptyCommand { language: String, role: &'static str },

    /// Two entries share a name.
    #[error("Language '{0}' is defined more than once")]
    DuplicateLanguage(String),

    /// A timeout or delay is not a usable positive number of seconds.
    #[error("Language '{language}' has an invalid {role} {field}: {value}")]
    InvalidDuration {
        language: String,
        role: &'static str,
        field: &'static str,
        value: f64,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Load the definitions file at `path` and expand it into pairs whose
/// logs live under `log_dir`.
pub fn load(path: &Path, log_dir: &Path) -> CatalogResult<Vec<Pair>> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, log_dir)
}

/// Parse definitions from a JSON string.
pub fn parse(content: &str, log_dir: &Path) -> CatalogResult<Vec<Pair>> {
    let languages: Vec<LanguageDefinition> = serde_json::from_str(content)?;
    expand(&languages, log_dir)
}

struct Side {
    endpoint: Endpoint,
    transports: Vec<String>,
    protocols: Vec<String>,
}

fn resolve(
    language: &LanguageDefinition,
    def: &EndpointDefinition,
    role: &'static str,
) -> CatalogResult<Side> {
    if def.command.iter().all(|part| part.trim().is_empty()) {
        return Err(CatalogError::EmptyCommand {
            language: language.name.clone(),
            role,
        });
    }

    let workdir = def
        .workdir
        .clone()
        .or_else(|| language.workdir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let duration = |field: &'static str, value: Option<f64>| {
        definition::seconds(value).map_err(|value| CatalogError::InvalidDuration {
            language: language.name.clone(),
            role,
            field,
            value,
        })
    };

    Ok(Side {
        endpoint: Endpoint {
            name: language.name.clone(),
            command: def.command.clone(),
            workdir,
            timeout: duration("timeout", def.timeout)?,
            delay: duration("delay", def.delay)?,
        },
        transports: LanguageDefinition::merged(&language.transports, &def.transports),
        protocols: LanguageDefinition::merged(&language.protocols, &def.protocols),
    })
}

/// Expand language definitions into the client x server x protocol x
/// transport matrix, in catalog order.
pub fn expand(languages: &[LanguageDefinition], log_dir: &Path) -> CatalogResult<Vec<Pair>> {
    let mut seen = HashSet::new();
    let mut clients = Vec::new();
    let mut servers = Vec::new();

    for language in languages {
        if !seen.insert(language.name.as_str()) {
            return Err(CatalogError::DuplicateLanguage(language.name.clone()));
        }
        if let Some(def) = &language.client {
            clients.push(resolve(language, def, "client")?);
        }
        if let Some(def) = &language.server {
            servers.push(resolve(language, def, "server")?);
        }
    }

    let mut pairs = Vec::new();
    for client in &clients {
        for server in &servers {
            for protocol in client
                .protocols
                .iter()
                .filter(|p| server.protocols.contains(*p))
            {
                for transport in client
                    .transports
                    .iter()
                    .filter(|t| server.transports.contains(*t))
                {
                    pairs.push(Pair::new(
                        client.endpoint.clone(),
                        server.endpoint.clone(),
                        protocol.as_str(),
                        transport.as_str(),
                        log_dir,
                    ));
                }
            }
        }
    }

    Ok(pairs)
}
