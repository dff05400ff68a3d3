use crate::error::{AnalysisError, Result};
use crate::llm::{DEFAULT_MODEL, GEMINI_BASE_URL};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `GEMINI_API_KEY`. The server still starts without it.
    pub api_key: Option<String>,
    /// `HOST`
    pub host: String,
    /// `PORT`
    pub port: u16,
    /// `GEMINI_MODEL`
    pub model: String,
    /// `GEMINI_BASE_URL`
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AnalysisError::Config(format!("PORT must be a port number, got '{}'", raw)))?,
            None => defaults.port,
        };

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            host: get("HOST").unwrap_or(defaults.host),
            port,
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
