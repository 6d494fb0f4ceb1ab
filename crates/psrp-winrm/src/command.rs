//! `rsp:CommandLine` body for the WinRM `Command` action: this is how a
//! PSRP create-pipeline payload is piggy-backed onto a shell (see MS-PSRP
//! 2.1.5's "Command" message-creation guidance — the actual PSRP message is
//! base64 in `Arguments`, not `Command` itself).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandBody {
    #[serde(rename = "rsp:CommandLine")]
    pub command_line: CommandLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLine {
    #[serde(rename = "rsp:Command")]
    pub command: String,
    #[serde(rename = "rsp:Arguments", default)]
    pub arguments: Vec<String>,
}

impl CommandLine {
    /// Build the command-line body carrying a base64 PSRP create-pipeline
    /// fragment as the sole argument. The `Command` field itself is left
    /// empty: execution is entirely driven by the PSRP payload.
    pub fn for_pipeline_payload(psrp_fragment: &[u8]) -> Self {
        Self {
            command: String::new(),
            arguments: vec![BASE64.encode(psrp_fragment)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponseBody {
    #[serde(rename = "rsp:CommandResponse")]
    pub command_response: CommandResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(rename = "rsp:CommandId")]
    pub command_id: String,
}
