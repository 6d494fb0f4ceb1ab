//! WS-Management / WS-Transfer action and resource URIs (DMTF DSP0226,
//! MS-WSMV) used on the wire as the WS-Addressing `Action` header.

pub const RESOURCE_URI_SHELL: &str =
    "http://schemas.microsoft.com/powershell/Microsoft.PowerShell";

pub const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
pub const ACTION_CREATE_RESPONSE: &str =
    "http://schemas.xmlsoap.org/ws/2004/09/transfer/CreateResponse";
pub const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
pub const ACTION_DELETE_RESPONSE: &str =
    "http://schemas.xmlsoap.org/ws/2004/09/transfer/DeleteResponse";

pub const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
pub const ACTION_COMMAND_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandResponse";
pub const ACTION_SEND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Send";
pub const ACTION_SEND_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/SendResponse";
pub const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
pub const ACTION_RECEIVE_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/ReceiveResponse";
pub const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";
pub const ACTION_SIGNAL_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/SignalResponse";

pub const ACTION_CONNECT: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Connect";
pub const ACTION_CONNECT_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/ConnectResponse";
pub const ACTION_DISCONNECT: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Disconnect";
pub const ACTION_DISCONNECT_RESPONSE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/DisconnectResponse";

pub const ACTION_FAULT: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/fault";

pub const SIGNAL_CODE_TERMINATE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
pub const SIGNAL_CODE_CTRL_C: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/ctrl_c";

pub const NS_ADDRESSING: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const NS_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const NS_MANAGEMENT: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
pub const NS_SHELL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell";
pub const NS_ANONYMOUS_ROLE: &str =
    "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// The max-envelope-size (bytes) advertised on every request, matching the
/// conservative default most WinRM listeners negotiate down to anyway.
pub const DEFAULT_MAX_ENVELOPE_SIZE: u32 = 512_000;
