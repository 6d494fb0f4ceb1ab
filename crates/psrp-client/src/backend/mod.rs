//! Backend abstraction (§3 "Backend", §4.B): presents either transport as a
//! byte-stream reader/writer. The collaborator seams — `HttpTransport` and
//! `PacketSocket` — are out of scope per §1/§2: this crate depends on the
//! traits, not on a TLS stack, an auth provider, or a Hyper-V platform shim.

pub mod hvsocket;
pub mod wsman;

use std::time::Duration;

use crate::error::ClientError;

/// One blocking SOAP round trip per WSMan action. A real implementation
/// layers TLS and Basic/NTLM/SPNEGO/Kerberos authentication beneath this;
/// this crate only depends on the trait (§2 "Collaborator seams").
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequestAction) -> Result<HttpResponse, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpRequestAction {
    pub url: String,
    pub soap_action: String,
    pub body: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One blocking `send`/`recv` pair of framed bytes over an already-connected
/// Hyper-V socket. A real implementation supplies the platform shim that
/// opens the socket (§2 "Collaborator seams").
pub trait PacketSocket: Send + Sync {
    fn send(&self, data: &[u8]) -> Result<(), ClientError>;
    fn recv(&self, timeout: Duration) -> Result<Option<Vec<u8>>, ClientError>;
}

/// Produces the `Authorization` header value (or equivalent side channel)
/// for a given challenge; real implementations wrap SSPI/GSSAPI/Basic.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, challenge: Option<&str>) -> Result<String, ClientError>;
}

/// Opens a fresh Hyper-V socket to one of the two well-known service GUIDs
/// (`hvsocket::BROKER_SERVICE_GUID`/`SERVER_SERVICE_GUID`); the platform shim
/// that actually calls into `AF_HYPERV` is injected through this trait (§2
/// "Collaborator seams"). `server_handshake` calls this repeatedly across
/// its reconnect attempts, so each call must return an independent socket.
pub trait HvSocketConnector: Send + Sync {
    fn connect(&self, service_guid: uuid::Uuid) -> Result<Box<dyn PacketSocket>, ClientError>;
}

/// The byte-stream presented to the fragment codec, regardless of which
/// transport backs it (§4.B). `open`/`create_pipeline`/`signal_terminate`/
/// `close` default to plain `write_all` calls, which is all an HvSocket
/// stream needs; WSMan overrides them with its Create/Command/Signal/Delete
/// SOAP actions.
pub trait ByteStreamAdapter: Send {
    fn write_all(&mut self, pipeline_id: Option<uuid::Uuid>, data: &[u8]) -> Result<(), ClientError>;
    /// Returns `None` on a clean end-of-stream for the given pipeline.
    fn read(&mut self, pipeline_id: Option<uuid::Uuid>) -> Result<Option<Vec<u8>>, ClientError>;

    /// Establishes the pool-scoped connection, sending the initial
    /// session-capability/init-runspacepool fragments.
    fn open(&mut self, creation_fragments: &[u8]) -> Result<(), ClientError> {
        self.write_all(None, creation_fragments)
    }

    /// Reattaches to a previously disconnected pool, sending an optional
    /// connect-runspacepool fragment and returning any server reply payload.
    fn connect(&mut self, connect_fragment: Option<&[u8]>) -> Result<Option<Vec<u8>>, ClientError> {
        if let Some(fragment) = connect_fragment {
            self.write_all(None, fragment)?;
        }
        self.read(None)
    }

    /// Starts a new pipeline, sending its create-pipeline fragment.
    fn create_pipeline(&mut self, pipeline_id: uuid::Uuid, fragment: &[u8]) -> Result<(), ClientError> {
        self.write_all(Some(pipeline_id), fragment)
    }

    /// Requests out-of-band termination of a running pipeline.
    fn signal_terminate(&mut self, _pipeline_id: uuid::Uuid) -> Result<(), ClientError> {
        Ok(())
    }

    /// Tears down the pool-scoped connection.
    fn close(&mut self) -> Result<(), ClientError> {
        Ok(())
    }

    /// Releases the transport binding without tearing down the server-side
    /// pool, so a later `connect` can resume it.
    fn disconnect(&mut self) -> Result<(), ClientError> {
        Ok(())
    }

    /// The server-side shell identifier this adapter is bound to, if any
    /// (§6 "persisted session state"). Only `WsManBackend` has one; HvSocket
    /// sessions do not survive a socket loss and have nothing to persist.
    fn shell_id(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}
