//! The SOAP 1.2 envelope (`s:Envelope`) that every WS-Management request and
//! response travels inside, plus the WS-Management header block and the
//! SOAP fault shape used to report server-side errors.

use serde::{Deserialize, Serialize};

use crate::action::{NS_ADDRESSING, NS_ENVELOPE, NS_MANAGEMENT, NS_SHELL};
use crate::addressing::{EndpointReference, MessageId};
use crate::management::{OptionSet, SelectorSet, WsDuration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<B> {
    #[serde(rename = "@xmlns:s")]
    pub xmlns_s: String,
    #[serde(rename = "@xmlns:a")]
    pub xmlns_a: String,
    #[serde(rename = "@xmlns:w")]
    pub xmlns_w: String,
    #[serde(rename = "@xmlns:rsp")]
    pub xmlns_rsp: String,
    #[serde(rename = "s:Header")]
    pub header: Header,
    #[serde(rename = "s:Body")]
    pub body: B,
}

impl<B> Envelope<B> {
    pub fn new(header: Header, body: B) -> Self {
        Self {
            xmlns_s: NS_ENVELOPE.to_string(),
            xmlns_a: NS_ADDRESSING.to_string(),
            xmlns_w: NS_MANAGEMENT.to_string(),
            xmlns_rsp: NS_SHELL.to_string(),
            header,
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "a:To")]
    pub to: String,
    #[serde(rename = "a:Action")]
    pub action: String,
    #[serde(rename = "a:MessageID")]
    pub message_id: MessageId,
    #[serde(rename = "a:ReplyTo")]
    pub reply_to: EndpointReference,
    #[serde(rename = "a:RelatesTo", skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<String>,
    #[serde(rename = "w:ResourceURI")]
    pub resource_uri: String,
    #[serde(rename = "w:MaxEnvelopeSize")]
    pub max_envelope_size: u32,
    #[serde(rename = "w:OperationTimeout")]
    pub operation_timeout: WsDuration,
    #[serde(rename = "w:SelectorSet", skip_serializing_if = "Option::is_none")]
    pub selector_set: Option<SelectorSet>,
    #[serde(rename = "w:OptionSet", skip_serializing_if = "Option::is_none")]
    pub option_set: Option<OptionSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultBody {
    #[serde(rename = "s:Fault")]
    pub fault: Fault,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    #[serde(rename = "s:Code")]
    pub code: FaultCode,
    #[serde(rename = "s:Reason")]
    pub reason: FaultReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultCode {
    #[serde(rename = "s:Value")]
    pub value: String,
    #[serde(rename = "s:Subcode", skip_serializing_if = "Option::is_none")]
    pub subcode: Option<FaultSubcode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultSubcode {
    #[serde(rename = "s:Value")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultReason {
    #[serde(rename = "s:Text")]
    pub text: String,
}

impl Fault {
    pub fn code_value(&self) -> &str {
        self.code
            .subcode
            .as_ref()
            .map(|s| s.value.as_str())
            .unwrap_or(&self.code.value)
    }
}
