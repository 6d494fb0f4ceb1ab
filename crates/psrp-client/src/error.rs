use std::time::Duration;

/// Error taxonomy for the session/pipeline engine (§7). Each variant wraps
/// its lower-layer cause where one exists, so a caller sees one coherent
/// chain via `std::error::Error::source`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("session is already closed")]
    AlreadyClosed,

    #[error("circuit breaker is open, failing fast")]
    CircuitOpen,

    #[error("pipeline queue is full")]
    QueueFull,

    #[error("timed out waiting to acquire a runspace slot after {0:?}")]
    AcquireTimeout(Duration),

    #[error("PSRP protocol violation: {0}")]
    #[allow(dead_code)]
    ProtocolViolation(String),

    #[error(transparent)]
    Protocol(#[from] psrp_protocol::PowerShellRemotingError),

    #[error(transparent)]
    WinRm(#[from] psrp_winrm::WinRmError),

    #[error("unexpected end of stream: {0}")]
    UnexpectedEof(String),

    #[error("transport operation timed out: {0}")]
    TransportTimeout(String),

    #[error("transient transport error: {0}")]
    TransportTransient(String),

    #[error("runspace pool entered a broken state: {0}")]
    PoolBroken(String),

    #[error("pipeline failed: {0}")]
    PipelineFailed(String),

    #[error("WSMan SOAP fault: code={code} subcode={subcode:?} reason={reason}")]
    WSManFault {
        code: String,
        subcode: Option<String>,
        reason: String,
        access_denied: bool,
        shell_not_found: bool,
        timed_out: bool,
    },

    #[error("remote script produced {0} error record(s)")]
    RemoteScriptError(usize),

    #[error("operation cancelled")]
    Cancelled,

    #[error("file transfer error during {phase}: {message}")]
    FileTransferError {
        phase: FileTransferPhase,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTransferPhase {
    Validate,
    Preallocate,
    UploadChunk,
    DownloadChunk,
    VerifyChecksum,
    ChecksumMismatch,
}

impl std::fmt::Display for FileTransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileTransferPhase::Validate => "validate",
            FileTransferPhase::Preallocate => "preallocate",
            FileTransferPhase::UploadChunk => "upload-chunk",
            FileTransferPhase::DownloadChunk => "download-chunk",
            FileTransferPhase::VerifyChecksum => "verify-checksum",
            FileTransferPhase::ChecksumMismatch => "checksum-mismatch",
        };
        f.write_str(s)
    }
}

impl ClientError {
    /// Retryable conditions per §4.F / §7: deadline-exceeded, (unexpected-)EOF,
    /// connection-reset, connection-refused, i/o-timeout, no-route-to-host,
    /// broken-pipe. Everything else (pool-closed, pool-broken, cancelled,
    /// auth-failed) is non-retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::TransportTimeout(_) | ClientError::TransportTransient(_)
        )
    }

    pub fn from_io(phase: &'static str, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => ClientError::TransportTimeout(format!("{phase}: {err}")),
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ClientError::TransportTransient(format!("{phase}: {err}")),
            _ => ClientError::Io(err),
        }
    }
}
