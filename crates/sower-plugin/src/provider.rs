//! Provider abstraction for per-OS user-data generation.

use sower_proto::UserDataRequest;
use thiserror::Error;

/// Application-level failure reported by a provider.
///
/// The message travels back to the manager verbatim inside the response's
/// `err` field, so it should describe the problem in caller terms, for
/// example an unsupported machine configuration.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    /// Creates an error carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Generates bootstrap user data for one operating system.
///
/// Implementations hold the per-OS templating logic; the server never
/// inspects the request payloads it forwards.
pub trait UserDataProvider: Send + Sync + 'static {
    /// Renders the user-data document for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the request cannot be served. The
    /// error message is forwarded to the caller unchanged.
    fn user_data(&self, request: &UserDataRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_its_message() {
        let error = ProviderError::new("machine spec is empty");
        assert_eq!(error.to_string(), "machine spec is empty");
    }
}
