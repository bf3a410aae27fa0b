//! Error types for the SoundCloud provider

use thiserror::Error;

/// SoundCloud provider errors
#[derive(Error, Debug)]
pub enum SoundcloudError {
    /// The API rejected our client id
    #[error("SoundCloud rejected the client id (status {status_code})")]
    AuthenticationFailed { status_code: u16 },

    /// No client id configured and none could be discovered
    #[error("Could not discover a SoundCloud client id from the web app")]
    ClientIdDiscovery,

    /// API request returned an error
    #[error("SoundCloud API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The resolved resource was not a playlist
    #[error("URL resolved to a {kind}, not a playlist")]
    NotAPlaylist { kind: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for SoundCloud operations
pub type Result<T> = std::result::Result<T, SoundcloudError>;

impl From<SoundcloudError> for bridge_traits::error::BridgeError {
    fn from(error: SoundcloudError) -> Self {
        match error {
            SoundcloudError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::Upstream {
                status: status_code,
                message,
            },
            SoundcloudError::AuthenticationFailed { status_code } => {
                bridge_traits::error::BridgeError::Upstream {
                    status: status_code,
                    message: "client id rejected".to_string(),
                }
            }
            SoundcloudError::BridgeError(e) => e,
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}
