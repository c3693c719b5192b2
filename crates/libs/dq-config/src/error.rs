//! Configuration error types.

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error(transparent)]
    Deserialization(#[from] toml::de::Error),

    /// TOML serialization failed.
    #[error(transparent)]
    Serialization(#[from] toml::ser::Error),

    /// No environment with that name is registered.
    #[error("Environment {0:?} is not registered")]
    UnknownEnvironment(String),

    /// No environment was selected and none was named.
    #[error("No environment selected, register one with `dqctl env add`")]
    NoEnvironment,

    /// The platform has no configuration directory.
    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}
