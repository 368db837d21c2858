use thiserror::Error;

/// Preference storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    /// The backing database failed.
    #[error("preference storage I/O: {0}")]
    Io(String),

    /// A value could not be encoded.
    #[error("preference serialization: {0}")]
    Serialization(String),
}
