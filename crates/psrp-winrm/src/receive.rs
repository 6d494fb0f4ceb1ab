//! `rsp:Send`/`rsp:Receive` bodies: the long-poll streams that carry PSRP
//! fragments in each direction once a shell and command are established.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::WinRmError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBody {
    #[serde(rename = "rsp:Send")]
    pub send: Send,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Send {
    #[serde(rename = "rsp:Stream")]
    pub stream: StreamIn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamIn {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "@CommandId")]
    pub command_id: String,
    #[serde(rename = "$text")]
    pub data_base64: String,
}

impl SendBody {
    pub fn stdin(command_id: impl Into<String>, data: &[u8]) -> Self {
        Self {
            send: Send {
                stream: StreamIn {
                    name: "stdin".to_string(),
                    command_id: command_id.into(),
                    data_base64: BASE64.encode(data),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveBody {
    #[serde(rename = "rsp:Receive")]
    pub receive: Receive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receive {
    #[serde(rename = "rsp:DesiredStream")]
    pub desired_stream: DesiredStream,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredStream {
    #[serde(rename = "@CommandId", skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(rename = "$text")]
    pub name: String,
}

impl ReceiveBody {
    pub fn stdout(command_id: impl Into<String>) -> Self {
        Self {
            receive: Receive {
                desired_stream: DesiredStream {
                    command_id: Some(command_id.into()),
                    name: "stdout".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponseBody {
    #[serde(rename = "rsp:ReceiveResponse")]
    pub receive_response: ReceiveResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    #[serde(rename = "rsp:Stream", default)]
    pub streams: Vec<StreamOut>,
    #[serde(rename = "rsp:CommandState", skip_serializing_if = "Option::is_none")]
    pub command_state: Option<CommandState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOut {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "@CommandId", skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(rename = "@End", skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
    #[serde(rename = "$text", default)]
    pub data_base64: Option<String>,
}

impl StreamOut {
    pub fn decode(&self) -> Result<Vec<u8>, WinRmError> {
        match &self.data_base64 {
            Some(b64) => BASE64
                .decode(b64)
                .map_err(|e| WinRmError::UnexpectedResponse(format!("bad base64 in stream: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    pub fn is_end(&self) -> bool {
        self.end.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandState {
    #[serde(rename = "@State")]
    pub state: String,
    #[serde(rename = "rsp:ExitCode", skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

pub const COMMAND_STATE_DONE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done";
pub const COMMAND_STATE_RUNNING: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running";

impl CommandState {
    pub fn is_done(&self) -> bool {
        self.state == COMMAND_STATE_DONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_body_stdin_encodes() {
        let body = SendBody::stdin("cmd-1", b"abc");
        assert_eq!(body.send.stream.name, "stdin");
        assert_eq!(body.send.stream.command_id, "cmd-1");
        assert_eq!(body.send.stream.data_base64, BASE64.encode(b"abc"));
    }

    #[test]
    fn test_stream_out_decode_roundtrip() {
        let encoded = BASE64.encode(b"payload");
        let stream = StreamOut {
            name: "stdout".to_string(),
            command_id: Some("cmd-1".to_string()),
            end: None,
            data_base64: Some(encoded),
        };
        assert_eq!(stream.decode().unwrap(), b"payload");
        assert!(!stream.is_end());
    }

    #[test]
    fn test_command_state_is_done() {
        let state = CommandState {
            state: COMMAND_STATE_DONE.to_string(),
            exit_code: Some(0),
        };
        assert!(state.is_done());
    }
}
