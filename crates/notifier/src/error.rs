use thiserror::Error;

/// Why a request to the messaging API produced no usable answer.
///
/// Every variant is terminal for the current attempt: the same payload would
/// fail the same way, so none of them trigger a partial-failure retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchFailure {
    #[error("JSON encoding failed: {0}")]
    Encode(String),

    #[error("Connecting to the API failed: {0}")]
    Connect(String),

    #[error("JSON decoding failed: {0}")]
    Decode(String),

    /// Error text reported by the API itself (bad parameters and the like).
    #[error("{0}")]
    Rejected(String),

    #[error("Response parsing failed: {0}")]
    Malformed(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}
