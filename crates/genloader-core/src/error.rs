use thiserror::Error;

/// Core error type shared across genloader crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing a required key or carries a bad value.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    /// A random value provider could not produce a usable value.
    #[error("synthetic value generation unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
}

/// Convenience alias for results returned by genloader crates.
pub type Result<T> = std::result::Result<T, Error>;
