#[derive(Debug, thiserror::Error)]
pub enum WinRmError {
    #[error("Failed to serialize SOAP envelope: {0}")]
    SerializeError(#[from] quick_xml::SeError),

    #[error("Failed to parse SOAP envelope: {0}")]
    DeserializeError(#[from] quick_xml::DeError),

    #[error("SOAP fault: code={code}, reason={reason}")]
    SoapFault { code: String, reason: String },

    #[error("Unexpected WS-Management response: {0}")]
    UnexpectedResponse(String),

    #[error("Missing required field in response: {0}")]
    MissingField(&'static str),
}
