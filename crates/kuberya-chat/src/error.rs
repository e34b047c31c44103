//! Error types for the conversation engine.

use kuberya_core::error::KuberyaError;

/// Errors from the conversation engine.
///
/// Session operations themselves never fail (invalid input is a no-op);
/// these cover the reply backend, the voice agent and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("reply backend error: {0}")]
    Backend(String),
    #[error("reply timed out after {0} ms")]
    Timeout(u64),
    #[error("reply was cancelled")]
    Cancelled,
    #[error("voice error: {0}")]
    VoiceError(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<KuberyaError> for ChatError {
    fn from(err: KuberyaError) -> Self {
        ChatError::Config(err.to_string())
    }
}
