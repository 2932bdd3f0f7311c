/// Errors the interception framework reports back to Gatekeep.
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    /// The connection was closed before the action could be delivered.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Queueing an outbound packet failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The connection is no longer in the login phase.
    #[error("connection left the login phase")]
    WrongPhase,
}
