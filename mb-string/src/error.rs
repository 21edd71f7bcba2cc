use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MbError {
    /// The configured backend name is not registered.
    #[error("Configuration error: unknown multibyte backend '{0}'")]
    UnknownBackend(String),
}
