//! WSMan byte-stream adapter (§4.B): turns shell/command lifecycle calls and
//! PSRP fragment send/receive into WS-Management SOAP round trips over an
//! injected [`HttpTransport`]. Grounded on `powershell-sync`'s blocking
//! request/response loop, generalized from its Hyper-V-free, single-shell
//! happy path to the pool-level Create/Command/Send/Receive/Signal/Connect/
//! Disconnect/Delete lifecycle this crate needs.

use std::sync::Arc;
use std::time::Duration;

use psrp_winrm::envelope::{Envelope, FaultBody};
use psrp_winrm::receive::{CommandState, ReceiveResponseBody};
use psrp_winrm::requests::RequestContext;
use psrp_winrm::shell::{ConnectResponseBody, CreateResponseBody};
use psrp_winrm::command::CommandResponseBody;
use psrp_winrm::WinRmError;
use uuid::Uuid;

use super::{ByteStreamAdapter, HttpRequestAction, HttpTransport};
use crate::error::ClientError;

fn parse_fault(body: &str) -> Option<WinRmError> {
    quick_xml::de::from_str::<Envelope<FaultBody>>(body)
        .ok()
        .map(|env| WinRmError::SoapFault {
            code: env.body.fault.code_value().to_string(),
            reason: env.body.fault.reason.text,
        })
}

/// A WSMan-backed connection to one remote shell, created from a single
/// `Create` call and torn down by a single `Delete` call. Each pipeline
/// opened against it gets its own WinRM `CommandId`.
pub struct WsManBackend {
    transport: Arc<dyn HttpTransport>,
    context: RequestContext,
    shell_id: Option<String>,
    command_ids: std::collections::HashMap<Uuid, String>,
    timeout: Duration,
}

impl WsManBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, context: RequestContext, timeout: Duration) -> Self {
        Self {
            transport,
            context,
            shell_id: None,
            command_ids: std::collections::HashMap::new(),
            timeout,
        }
    }

    fn post<B: serde::Serialize>(
        &self,
        soap_action: &str,
        envelope: &Envelope<B>,
    ) -> Result<String, ClientError> {
        let body = quick_xml::se::to_string(envelope).map_err(WinRmError::from)?;
        let response = self.transport.send(HttpRequestAction {
            url: self.context.target_url.clone(),
            soap_action: soap_action.to_string(),
            body,
            timeout: self.timeout,
        })?;

        if !response.is_success() {
            if let Some(fault) = parse_fault(&response.body) {
                return Err(fault.into());
            }
            return Err(ClientError::WSManFault {
                code: response.status.to_string(),
                subcode: None,
                reason: response.body,
                access_denied: response.status == 401 || response.status == 403,
                shell_not_found: response.status == 404,
                timed_out: response.status == 408,
            });
        }
        Ok(response.body)
    }

    pub fn shell_id(&self) -> Option<&str> {
        self.shell_id.as_deref()
    }

    /// Primes this adapter with a previously obtained shell id, so `connect`
    /// can reattach without first calling `open` (§4.E `Session::from_persisted`).
    pub fn with_shell_id(mut self, shell_id: impl Into<String>) -> Self {
        self.shell_id = Some(shell_id.into());
        self
    }

    fn receive_once(&self, command_id: Option<&str>) -> Result<ReceiveResponseBody, ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let envelope = self.context.receive(&shell_id, command_id.unwrap_or(""));
        let body = self.post(psrp_winrm::action::ACTION_RECEIVE, &envelope)?;
        let parsed: Envelope<ReceiveResponseBody> =
            quick_xml::de::from_str(&body).map_err(WinRmError::from)?;
        Ok(parsed.body)
    }
}

impl ByteStreamAdapter for WsManBackend {
    fn write_all(&mut self, pipeline_id: Option<Uuid>, data: &[u8]) -> Result<(), ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let command_id = pipeline_id
            .and_then(|id| self.command_ids.get(&id))
            .cloned()
            .unwrap_or_default();
        let envelope = self.context.send(&shell_id, &command_id, data);
        self.post(psrp_winrm::action::ACTION_SEND, &envelope)?;
        Ok(())
    }

    fn read(&mut self, pipeline_id: Option<Uuid>) -> Result<Option<Vec<u8>>, ClientError> {
        let command_id = pipeline_id.and_then(|id| self.command_ids.get(&id).cloned());
        let response = self.receive_once(command_id.as_deref())?;

        let mut collected = Vec::new();
        for stream in &response.streams {
            collected.extend(stream.decode().map_err(ClientError::WinRm)?);
        }

        let done = response
            .command_state
            .as_ref()
            .map(CommandState::is_done)
            .unwrap_or(false);

        if collected.is_empty() && done {
            return Ok(None);
        }
        Ok(Some(collected))
    }

    /// `Create`: opens the shell, piggy-backing the PSRP session-capability
    /// and init-runspacepool fragments as base64 `creationXml`.
    fn open(&mut self, creation_fragments: &[u8]) -> Result<(), ClientError> {
        let envelope = self.context.create_shell(creation_fragments);
        let body = self.post(psrp_winrm::action::ACTION_CREATE, &envelope)?;
        let parsed: Envelope<CreateResponseBody> =
            quick_xml::de::from_str(&body).map_err(WinRmError::from)?;
        self.shell_id = Some(parsed.body.shell.shell_id);
        Ok(())
    }

    /// `Connect`: reattaches to a previously disconnected shell.
    fn connect(&mut self, connect_fragment: Option<&[u8]>) -> Result<Option<Vec<u8>>, ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let envelope = self.context.connect_shell(&shell_id, connect_fragment);
        let body = self.post(psrp_winrm::action::ACTION_CONNECT, &envelope)?;
        let parsed: Envelope<ConnectResponseBody> =
            quick_xml::de::from_str(&body).map_err(WinRmError::from)?;
        match parsed.body.connect_response.connect_response_xml {
            Some(b64) => {
                let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64)
                    .map_err(|e| ClientError::ProtocolViolation(format!("bad connectResponseXml: {e}")))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// `Command`: creates a pipeline, returning a local pipeline id that maps
    /// to the WinRM `CommandId` for subsequent `Send`/`Receive`/`Signal`.
    fn create_pipeline(&mut self, pipeline_id: Uuid, fragment: &[u8]) -> Result<(), ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let envelope = self.context.command(&shell_id, fragment);
        let body = self.post(psrp_winrm::action::ACTION_COMMAND, &envelope)?;
        let parsed: Envelope<CommandResponseBody> =
            quick_xml::de::from_str(&body).map_err(WinRmError::from)?;
        self.command_ids
            .insert(pipeline_id, parsed.body.command_response.command_id);
        Ok(())
    }

    /// `Signal`: terminates a pipeline out of band (e.g. cancellation, §4.D).
    fn signal_terminate(&mut self, pipeline_id: Uuid) -> Result<(), ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let command_id = self
            .command_ids
            .get(&pipeline_id)
            .ok_or(ClientError::NotConnected)?
            .clone();
        let envelope = self.context.signal_terminate(&shell_id, &command_id);
        self.post(psrp_winrm::action::ACTION_SIGNAL, &envelope)?;
        Ok(())
    }

    /// `Delete`: tears down the shell and every pipeline on it.
    fn close(&mut self) -> Result<(), ClientError> {
        if let Some(shell_id) = self.shell_id.take() {
            let envelope = self.context.delete_shell(&shell_id);
            self.post(psrp_winrm::action::ACTION_DELETE, &envelope)?;
        }
        self.command_ids.clear();
        Ok(())
    }

    /// `Disconnect`: releases the transport binding without tearing down the
    /// server-side runspace pool, so a later `connect` can resume it.
    fn disconnect(&mut self) -> Result<(), ClientError> {
        let shell_id = self.shell_id.clone().ok_or(ClientError::NotConnected)?;
        let envelope = self.context.disconnect_shell(&shell_id);
        self.post(psrp_winrm::action::ACTION_DISCONNECT, &envelope)?;
        Ok(())
    }

    fn shell_id(&self) -> Option<&str> {
        self.shell_id.as_deref()
    }
}
