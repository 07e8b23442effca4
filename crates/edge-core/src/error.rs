//! Error types shared across the runtime.

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Error type for response rendering and streaming.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Response already finished")]
    AlreadyFinished,

    #[error("Streaming error: {0}")]
    StreamError(String),
}
