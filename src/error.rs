//! Error types for controller sessions, the session pool and AP operations.
//!
//! Parse misses are deliberately absent: a missing anchor in command output
//! produces an empty field, never an error.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur while talking to a wireless LAN controller.
#[derive(Error, Debug)]
pub enum WlcError {
    /// A session (or every slot of a pool) could not be established within
    /// the retry bound.
    #[error("connect failure: {0}")]
    ConnectFailure(String),

    /// The session is not connected.
    ///
    /// Returned when a command is issued on a session that was never
    /// connected or has been torn down.
    #[error("session not connected")]
    NotConnected,

    /// The SSH channel was disconnected while waiting for a prompt.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnectError,

    /// The controller answered with an error line for the command.
    ///
    /// Carries the command and the output received before the prompt.
    #[error("command rejected: {command}: {output}")]
    CommandRejected { command: String, output: String },

    /// Command execution timed out.
    ///
    /// The error contains the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// Timed out waiting for the first prompt after the shell opened.
    #[error("init timeout: {0}")]
    InitTimeout(String),

    /// The session pool has been shut down.
    #[error("session pool closed")]
    PoolClosed,

    /// A prompt template could not be compiled.
    #[error("invalid device handler config: {0}")]
    InvalidDeviceHandlerConfig(String),

    /// Controller configuration is incomplete or malformed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A replayed session has no recorded output for a command.
    #[error("replay mismatch: {0}")]
    ReplayMismatch(String),

    /// The HTTP inventory path failed.
    #[error("api error: {0}")]
    Api(String),

    /// Invariant violation inside the crate.
    #[error("internal error: {0}")]
    Internal(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Failed to send data through the channel.
    #[error("Failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),
}

impl WlcError {
    /// True for failures of a single command round-trip.
    ///
    /// These are isolated per item during a harvest.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            WlcError::CommandRejected { .. }
                | WlcError::ExecTimeout(_)
                | WlcError::ChannelDisconnectError
                | WlcError::NotConnected
                | WlcError::SendDataError(_)
                | WlcError::ReplayMismatch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::WlcError;

    #[test]
    fn rejected_command_is_a_command_failure() {
        let err = WlcError::CommandRejected {
            command: "show ap config general ap1".to_string(),
            output: "Incorrect usage".to_string(),
        };
        assert!(err.is_command_failure());
        assert!(!WlcError::ConnectFailure("x".to_string()).is_command_failure());
    }
}
