//! A blocking PowerShell Remoting Protocol client (§1 OVERVIEW). Runs PSRP
//! over either WinRM/WSMan or a direct Hyper-V socket, fragmenting and
//! defragmenting PSRP messages through [`psrp_protocol`], and exposing a
//! single [`Session`] façade with runspace pooling, retry, circuit
//! breaking, auto-reconnect, keepalive, and chunked file transfer.
//!
//! Transport I/O is a collaborator seam: this crate depends on
//! [`backend::HttpTransport`], [`backend::PacketSocket`], and
//! [`backend::HvSocketConnector`], not on a TLS stack, an auth provider, or
//! a Hyper-V platform shim (§2 "Collaborator seams").

pub mod backend;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod file_transfer;
pub mod pipeline;
pub mod pool;
pub mod resilience;
pub mod security_log;
pub mod session;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
pub use config::{AuthType, ClientConfig, ReconnectPolicy, RetryPolicy, Transport};
pub use credentials::Credentials;
pub use error::{ClientError, FileTransferPhase};
pub use file_transfer::{FileTransferEngine, ScriptExecutor, TransferProgress};
pub use pipeline::{PipelineChannels, PipelineCommand, PipelineSpec};
pub use pool::{RunspacePool, RunspacePoolConfig};
pub use security_log::{Outcome, SecurityEvent, SecurityEventType, SecurityLogger, Severity};
pub use session::{CloseStrategy, ExecutionResult, PersistedSessionState, Session};
