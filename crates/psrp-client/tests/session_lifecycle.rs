//! Session lifecycle against an in-process fake WSMan backend: `connect()`
//! drives the real Create+Receive handshake through `WsManBackend` and the
//! PSRP fragment codec, exactly as it would against a live server, except
//! the HTTP leg is a scripted `HttpTransport` instead of a socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use psrp_client::backend::{HttpRequestAction, HttpResponse, HttpTransport};
use psrp_client::{ClientConfig, ClientError, Credentials, Session, Transport};
use psrp_protocol::{
    ApplicationPrivateData, Fragmenter, PsObjectWithType, PsPrimitiveValue, PsValue,
    SessionCapability,
};

/// Replies to calls in order for the handshake, then falls back to an
/// empty, still-running `ReceiveResponse` forever, so the session's
/// background dispatch loop (which keeps polling `Receive` after `connect()`
/// returns) never runs out of scripted responses and never sees a body
/// shaped for the wrong request.
struct ScriptedTransport {
    responses: Mutex<Vec<(u16, String)>>,
}

const EMPTY_RECEIVE_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell">
<s:Header></s:Header>
<s:Body><rsp:ReceiveResponse><rsp:CommandState State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running"/></rsp:ReceiveResponse></s:Body>
</s:Envelope>"#;

impl HttpTransport for ScriptedTransport {
    fn send(&self, _request: HttpRequestAction) -> Result<HttpResponse, ClientError> {
        let mut responses = self.responses.lock().unwrap();
        let (status, body) = if responses.is_empty() {
            (200, EMPTY_RECEIVE_RESPONSE.to_string())
        } else {
            responses.remove(0)
        };
        Ok(HttpResponse { status, body })
    }
}

fn create_response(shell_id: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell">
<s:Header></s:Header>
<s:Body><rsp:Shell><rsp:ShellId>{shell_id}</rsp:ShellId></rsp:Shell></s:Body>
</s:Envelope>"#
    )
}

/// The handshake reply a server sends in response to the pool-scoped
/// `Receive` that follows `Create`: the session-capability echo followed by
/// `ApplicationPrivateData`, both carried as base64 PSRP fragments inside a
/// single `rsp:Stream`. One `Receive` round trip is enough because the
/// defragmenter completes both messages from the same buffer.
fn negotiation_receive_response() -> String {
    let rpid = Uuid::new_v4();
    let cap = SessionCapability::builder()
        .protocol_version("2.3".to_string())
        .ps_version("2.0".to_string())
        .serialization_version("1.1.0.1".to_string())
        .build();
    let private_data = ApplicationPrivateData {
        data: Some(PsValue::Primitive(PsPrimitiveValue::Nil)),
    };

    let mut fragmenter = Fragmenter::new(32 * 1024);
    let messages: Vec<&dyn PsObjectWithType> = vec![&cap, &private_data];
    let groups = fragmenter.fragment_multiple(&messages, rpid, None).unwrap();
    let wire: Vec<u8> = groups.concat();
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &wire);

    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell">
<s:Header></s:Header>
<s:Body><rsp:ReceiveResponse><rsp:Stream Name="stdout">{encoded}</rsp:Stream></rsp:ReceiveResponse></s:Body>
</s:Envelope>"#
    )
}

fn scripted_session(responses: Vec<(u16, String)>) -> Session {
    let transport = Arc::new(ScriptedTransport {
        responses: Mutex::new(responses),
    });
    let config = ClientConfig::builder().timeout(Duration::from_secs(5)).build();
    Session::new(
        "example.com",
        config,
        Credentials::default(),
        Some(transport),
        None,
    )
    .unwrap()
}

#[test]
fn connect_drives_create_and_negotiation_then_reports_healthy() {
    let session = scripted_session(vec![
        (200, create_response("shell-abc-123")),
        (200, negotiation_receive_response()),
    ]);

    assert_eq!(session.message_id(), 0);
    session.connect().unwrap();
    assert_eq!(session.message_id(), 2);
    assert_eq!(session.health(), psrp_client::backend::BackendHealth::Healthy);

    let state = session.save_state().unwrap();
    assert_eq!(state.shell_id.as_deref(), Some("shell-abc-123"));
    assert_eq!(state.transport, Transport::WSMan);
    assert_eq!(state.message_id, 2);

    session.close(psrp_client::CloseStrategy::Force).unwrap();
    assert_eq!(session.health(), psrp_client::backend::BackendHealth::Unknown);
}

#[test]
fn connect_is_idempotent_once_open() {
    let session = scripted_session(vec![
        (200, create_response("shell-idempotent")),
        (200, negotiation_receive_response()),
    ]);
    session.connect().unwrap();
    // A second connect() should short-circuit on `pool.is_open()` rather than
    // issuing another Create; if it didn't, the scripted transport would
    // have nothing queued and would fall back to a bare ReceiveResponse,
    // which `open()` would reject (it isn't a Create response).
    session.connect().unwrap();
    assert_eq!(session.health(), psrp_client::backend::BackendHealth::Healthy);
    session.close(psrp_client::CloseStrategy::Force).unwrap();
}

#[test]
fn execute_before_connect_fails_without_touching_the_transport() {
    let session = scripted_session(vec![]);
    let err = session.execute("1 + 1").unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[test]
fn save_state_before_connect_fails_not_connected() {
    let session = scripted_session(vec![]);
    let err = session.save_state().unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}
