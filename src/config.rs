//! Process configuration, read once from the environment.
//!
//! [`Config::from_lookup`] takes the variable lookup as an argument so the
//! core never reads ambient globals; [`Config::from_env`] is the wrapper
//! used at process start. Empty values count as unset. Every missing
//! required variable is reported in a single
//! [`RetrievalError::MissingConfig`].

use std::path::Path;

use crate::error::RetrievalError;

pub const QDRANT_URL: &str = "QDRANT_URL";
pub const QDRANT_APIKEY: &str = "QDRANT_APIKEY";
pub const QDRANT_API_KEY: &str = "QDRANT_API_KEY";
pub const QDRANT_COLLECTION: &str = "QDRANT_COLLECTION";
pub const QDRANT_VECTOR_NAME: &str = "QDRANT_VECTOR_NAME";
pub const OPENAI_APIKEY: &str = "OPENAI_APIKEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_EMBEDDING_MODEL: &str = "OPENAI_EMBEDDING_MODEL";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const MCP_TRANSPORT: &str = "MCP_TRANSPORT";
pub const MCP_HOST: &str = "MCP_HOST";
pub const MCP_PORT: &str = "MCP_PORT";
pub const MCP_PATH: &str = "MCP_PATH";

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
}

/// Vector backend connection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub collection: String,
    /// Named vector to search; `None` uses the collection's default vector.
    pub vector_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    StreamableHttp,
}

impl std::str::FromStr for Transport {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "streamable-http" => Ok(Transport::StreamableHttp),
            other => Err(RetrievalError::InvalidConfig(format!(
                "Unsupported {}: '{}'. Use 'stdio' or 'streamable-http'.",
                MCP_TRANSPORT, other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    /// Mount point of the MCP streamable-HTTP endpoint.
    pub mcp_path: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::StreamableHttp,
            host: "0.0.0.0".to_string(),
            port: 8000,
            mcp_path: "/mcp".to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present;
    /// variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self, RetrievalError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], but loads the given env file instead of `./.env`.
    pub fn from_env_file(path: &Path) -> Result<Self, RetrievalError> {
        dotenvy::from_path(path).map_err(|e| {
            RetrievalError::InvalidConfig(format!(
                "failed to load env file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RetrievalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let get_either = |name: &str, alt: &str| get(name).or_else(|| get(alt));

        let url = get(QDRANT_URL);
        let backend_key = get_either(QDRANT_APIKEY, QDRANT_API_KEY);
        let collection = get(QDRANT_COLLECTION);
        let embedding_key = get_either(OPENAI_APIKEY, OPENAI_API_KEY);

        let missing: Vec<String> = [
            (QDRANT_URL, url.is_none()),
            (QDRANT_APIKEY, backend_key.is_none()),
            (QDRANT_COLLECTION, collection.is_none()),
            (OPENAI_APIKEY, embedding_key.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(url), Some(backend_key), Some(collection), Some(embedding_key)) =
            (url, backend_key, collection, embedding_key)
        else {
            return Err(RetrievalError::MissingConfig(missing));
        };

        let defaults = ServerConfig::default();
        let transport = match get(MCP_TRANSPORT) {
            Some(value) => value.parse()?,
            None => defaults.transport,
        };
        let port = match get(MCP_PORT) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| {
                RetrievalError::InvalidConfig(format!(
                    "{} must be a port number, got '{}'",
                    MCP_PORT, value
                ))
            })?,
            None => defaults.port,
        };

        Ok(Config {
            backend: BackendConfig {
                url,
                api_key: backend_key,
                collection,
                vector_name: get(QDRANT_VECTOR_NAME),
            },
            embedding: EmbeddingConfig {
                api_key: embedding_key,
                model: get(OPENAI_EMBEDDING_MODEL)
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                base_url: get(OPENAI_BASE_URL)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            },
            server: ServerConfig {
                transport,
                host: get(MCP_HOST).unwrap_or(defaults.host),
                port,
                mcp_path: get(MCP_PATH).unwrap_or(defaults.mcp_path),
            },
        })
    }
}
