//! `rsp:Shell` bodies: the WS-Transfer `Create`/`CreateResponse` exchange
//! that opens a remote shell, and `Connect`/`ConnectResponse` that
//! reattaches to one.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::management::SelectorSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBody {
    #[serde(rename = "rsp:Shell")]
    pub shell: ShellCreate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellCreate {
    #[serde(rename = "rsp:InputStreams")]
    pub input_streams: String,
    #[serde(rename = "rsp:OutputStreams")]
    pub output_streams: String,
    /// Base64-encoded PSRP fragments (session-capability + init-runspacepool)
    /// piggy-backed on the shell create, per MS-PSRP 2.2.1 "CreationXml".
    #[serde(rename = "creationXml", skip_serializing_if = "Option::is_none")]
    pub creation_xml: Option<String>,
}

impl ShellCreate {
    pub fn new(psrp_creation_fragments: &[u8]) -> Self {
        Self {
            input_streams: "stdin".to_string(),
            output_streams: "stdout".to_string(),
            creation_xml: Some(BASE64.encode(psrp_creation_fragments)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponseBody {
    #[serde(rename = "rsp:Shell")]
    pub shell: ShellCreateResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellCreateResponse {
    #[serde(rename = "rsp:ShellId")]
    pub shell_id: String,
    #[serde(rename = "rsp:ResourceUri", skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(rename = "rsp:Selectors", skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectBody {
    #[serde(rename = "rsp:Connect")]
    pub connect: ShellConnect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConnect {
    /// Base64-encoded PSRP connect-runspacepool fragment.
    #[serde(rename = "connectXml", skip_serializing_if = "Option::is_none")]
    pub connect_xml: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponseBody {
    #[serde(rename = "rsp:ConnectResponse")]
    pub connect_response: ShellConnectResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConnectResponse {
    #[serde(rename = "connectResponseXml", skip_serializing_if = "Option::is_none")]
    pub connect_response_xml: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponseBody {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_create_encodes_creation_xml() {
        let shell = ShellCreate::new(b"<hello/>");
        assert_eq!(shell.input_streams, "stdin");
        assert_eq!(shell.output_streams, "stdout");
        assert_eq!(
            shell.creation_xml.as_deref(),
            Some(BASE64.encode(b"<hello/>").as_str())
        );
    }
}
