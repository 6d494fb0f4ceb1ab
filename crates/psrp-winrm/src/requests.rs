//! Convenience constructors for each WS-Management request envelope a PSRP
//! WSMan backend needs to send. These build the envelope only; issuing the
//! HTTP POST and feeding back the response body is the collaborator's job
//! (see the `HttpTransport` trait in the client crate).

use std::time::Duration;

use crate::action::{
    ACTION_COMMAND, ACTION_CONNECT, ACTION_CREATE, ACTION_DELETE, ACTION_DISCONNECT,
    ACTION_RECEIVE, ACTION_SEND, ACTION_SIGNAL, DEFAULT_MAX_ENVELOPE_SIZE, RESOURCE_URI_SHELL,
};
use crate::addressing::{EndpointReference, MessageId};
use crate::command::CommandBody;
use crate::command::CommandLine;
use crate::envelope::{Envelope, Header};
use crate::management::{OptionSet, SelectorSet, WsDuration};
use crate::receive::{ReceiveBody, SendBody};
use crate::shell::{ConnectBody, CreateBody, ShellConnect, ShellCreate};
use crate::signal::{Signal, SignalBody};

/// Identifies the resource a request targets and the operation budget to
/// advertise; shared across every request built for one WSMan session.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub target_url: String,
    pub resource_uri: String,
    pub max_envelope_size: u32,
    pub operation_timeout: Duration,
}

impl RequestContext {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            resource_uri: RESOURCE_URI_SHELL.to_string(),
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
            operation_timeout: Duration::from_secs(60),
        }
    }

    fn header(&self, action: &str, selector_set: Option<SelectorSet>) -> Header {
        Header {
            to: self.target_url.clone(),
            action: action.to_string(),
            message_id: MessageId::new(),
            reply_to: EndpointReference::anonymous(),
            relates_to: None,
            resource_uri: self.resource_uri.clone(),
            max_envelope_size: self.max_envelope_size,
            operation_timeout: WsDuration(self.operation_timeout),
            selector_set,
            option_set: None,
        }
    }

    /// `Create`: open a new shell, piggy-backing the PSRP session-capability
    /// and init-runspacepool fragments as base64 `creationXml`.
    pub fn create_shell(&self, psrp_creation_fragments: &[u8]) -> Envelope<CreateBody> {
        let mut header = self.header(ACTION_CREATE, None);
        header.option_set = Some(
            OptionSet::new()
                .with("WINRS_NOPROFILE", "FALSE")
                .with("WINRS_CODEPAGE", "65001"),
        );
        Envelope::new(
            header,
            CreateBody {
                shell: ShellCreate::new(psrp_creation_fragments),
            },
        )
    }

    /// `Command`: create a pipeline on an existing shell, piggy-backing the
    /// PSRP create-pipeline fragment as a base64 command argument.
    pub fn command(&self, shell_id: &str, psrp_fragment: &[u8]) -> Envelope<CommandBody> {
        let header = self.header(ACTION_COMMAND, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(
            header,
            CommandBody {
                command_line: CommandLine::for_pipeline_payload(psrp_fragment),
            },
        )
    }

    /// `Send`: write a PSRP fragment to a pipeline's stdin.
    pub fn send(&self, shell_id: &str, command_id: &str, data: &[u8]) -> Envelope<SendBody> {
        let header = self.header(ACTION_SEND, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(header, SendBody::stdin(command_id, data))
    }

    /// `Receive`: long-poll for stdout fragments from a pipeline.
    pub fn receive(&self, shell_id: &str, command_id: &str) -> Envelope<ReceiveBody> {
        let header = self.header(ACTION_RECEIVE, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(header, ReceiveBody::stdout(command_id))
    }

    /// `Signal`: terminate a running pipeline out of band.
    pub fn signal_terminate(&self, shell_id: &str, command_id: &str) -> Envelope<SignalBody> {
        let header = self.header(ACTION_SIGNAL, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(
            header,
            SignalBody {
                signal: Signal::terminate(command_id),
            },
        )
    }

    /// `Delete`: tear down the shell (and its server-side runspace pool).
    pub fn delete_shell(&self, shell_id: &str) -> Envelope<()> {
        let header = self.header(ACTION_DELETE, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(header, ())
    }

    /// `Connect`: reattach to a previously disconnected shell, piggy-backing
    /// the PSRP connect-runspacepool fragment.
    pub fn connect_shell(
        &self,
        shell_id: &str,
        psrp_connect_fragment: Option<&[u8]>,
    ) -> Envelope<ConnectBody> {
        let header = self.header(ACTION_CONNECT, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(
            header,
            ConnectBody {
                connect: ShellConnect {
                    connect_xml: psrp_connect_fragment
                        .map(|bytes| base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)),
                },
            },
        )
    }

    /// `Disconnect`: release the shell's transport binding without tearing
    /// down the server-side session.
    pub fn disconnect_shell(&self, shell_id: &str) -> Envelope<()> {
        let header = self.header(ACTION_DISCONNECT, Some(SelectorSet::shell_id(shell_id)));
        Envelope::new(header, ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_shell_envelope_shape() {
        let ctx = RequestContext::new("http://example.com/wsman");
        let envelope = ctx.create_shell(b"frag");
        assert_eq!(envelope.header.action, ACTION_CREATE);
        assert_eq!(envelope.header.resource_uri, RESOURCE_URI_SHELL);
        assert!(envelope.header.selector_set.is_none());
        assert!(envelope.body.shell.creation_xml.is_some());
    }

    #[test]
    fn test_command_envelope_carries_shell_selector() {
        let ctx = RequestContext::new("http://example.com/wsman");
        let envelope = ctx.command("shell-123", b"fragment");
        assert_eq!(
            envelope
                .header
                .selector_set
                .as_ref()
                .unwrap()
                .get("ShellId"),
            Some("shell-123")
        );
        assert_eq!(envelope.body.command_line.arguments.len(), 1);
    }

    #[test]
    fn test_receive_envelope_targets_stdout() {
        let ctx = RequestContext::new("http://example.com/wsman");
        let envelope = ctx.receive("shell-1", "cmd-1");
        assert_eq!(envelope.body.receive.desired_stream.name, "stdout");
        assert_eq!(
            envelope.body.receive.desired_stream.command_id.as_deref(),
            Some("cmd-1")
        );
    }
}
