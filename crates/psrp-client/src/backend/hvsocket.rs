//! HvSocket direct transport (§4.B, §6 "HvSocket direct"): two sequential
//! connections over an already-opened Hyper-V socket, identified by fixed
//! service GUIDs — a broker connection that authenticates and negotiates a
//! session token, and a server connection that redeems that token and then
//! carries the PSRP out-of-proc packet stream. Opening the socket itself is
//! the platform shim's job; this module only speaks the wire protocol once
//! [`PacketSocket`] hands it bytes.

use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use super::{ByteStreamAdapter, PacketSocket};
use crate::clock::SharedClock;
use crate::error::ClientError;

/// Service GUID for the broker connection (authentication, token issue).
pub const BROKER_SERVICE_GUID: Uuid = Uuid::from_u128(0x999e53d4_3d5c_4c3e_8779_bed06ec056e1);
/// Service GUID for the server connection (redeems the broker's token).
pub const SERVER_SERVICE_GUID: Uuid = Uuid::from_u128(0xa5201c21_2770_4c11_a68e_f182edb29220);

const VERSION_2: &str = "VERSION_2";

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

fn read_token(socket: &dyn PacketSocket, timeout: Duration) -> Result<String, ClientError> {
    let bytes = socket
        .recv(timeout)?
        .ok_or_else(|| ClientError::from_io("hvsocket handshake", broken_pipe()))?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

fn broken_pipe() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "hvsocket peer closed connection")
}

/// Runs the broker exchange (§6): version negotiation, domain/username/
/// password exchange, optional configuration exchange, and returns the
/// session token to redeem on the server connection.
pub fn broker_handshake(
    socket: &dyn PacketSocket,
    domain: Option<&str>,
    username: &str,
    password: Option<&str>,
    configuration_name: Option<&str>,
    timeout: Duration,
) -> Result<String, ClientError> {
    socket.send(b"VERSION")?;
    let banner = read_token(socket, timeout)?;
    if !banner.starts_with("VERSION_") {
        return Err(ClientError::AuthFailed(format!(
            "unexpected broker banner: {banner}"
        )));
    }
    let banner_version: u32 = banner
        .trim_start_matches("VERSION_")
        .parse()
        .unwrap_or(0);
    if banner_version < 2 {
        return Err(ClientError::AuthFailed(format!(
            "broker version {banner} too old, need >= VERSION_2"
        )));
    }

    socket.send(VERSION_2.as_bytes())?;
    expect_pass(socket, timeout, "version ack")?;

    socket.send(&utf16le(domain.unwrap_or_default()))?;
    expect_pass(socket, timeout, "domain ack")?;

    socket.send(&utf16le(username))?;
    expect_pass(socket, timeout, "username ack")?;

    match password {
        Some(password) if !password.is_empty() => {
            socket.send(b"NONEMPTYPW")?;
            expect_pass(socket, timeout, "password marker ack")?;
            socket.send(&utf16le(password))?;
        }
        _ => {
            socket.send(b"EMPTYPW")?;
            expect_pass(socket, timeout, "password marker ack")?;
        }
    }

    let reply = read_token(socket, timeout)?;
    match reply.as_str() {
        "FAIL" => {
            // Replaying the failure keeps the broker's state machine in
            // sync; the client must not attempt stage 2 afterward (§6 S6).
            socket.send(b"FAIL")?;
            Err(ClientError::AuthFailed("hvsocket broker rejected credentials".to_string()))
        }
        "PASS" => Err(ClientError::AuthFailed(
            "hvsocket broker accepted credentials without a configuration exchange".to_string(),
        )),
        "CONF" => {
            match configuration_name {
                Some(name) if !name.is_empty() => {
                    socket.send(b"NONEMPTYCF")?;
                    expect_pass(socket, timeout, "configuration marker ack")?;
                    socket.send(&utf16le(name))?;
                }
                _ => {
                    socket.send(b"EMPTYCF")?;
                    expect_pass(socket, timeout, "configuration marker ack")?;
                }
            }
            let token_line = read_token(socket, timeout)?;
            let token = token_line
                .strip_prefix("TOKEN ")
                .ok_or_else(|| {
                    ClientError::AuthFailed(format!("expected TOKEN reply, got: {token_line}"))
                })?
                .to_string();
            socket.send(b"PASS")?;
            Ok(token)
        }
        other => Err(ClientError::AuthFailed(format!(
            "unexpected broker reply: {other}"
        ))),
    }
}

fn expect_pass(socket: &dyn PacketSocket, timeout: Duration, what: &str) -> Result<(), ClientError> {
    let reply = read_token(socket, timeout)?;
    if reply != "PASS" {
        return Err(ClientError::AuthFailed(format!("expected PASS for {what}, got: {reply}")));
    }
    Ok(())
}

/// Redials the server connection with bounded exponential backoff (initial
/// 250ms, max 3s, up to 10 attempts) while the guest finishes starting the
/// PSRP listener, then redeems the broker's token (§6).
pub fn server_handshake<F>(
    token: &str,
    timeout: Duration,
    clock: &SharedClock,
    mut connect: F,
) -> Result<Box<dyn PacketSocket>, ClientError>
where
    F: FnMut() -> Result<Box<dyn PacketSocket>, ClientError>,
{
    const MAX_ATTEMPTS: u32 = 10;
    let mut delay = Duration::from_millis(250);
    let max_delay = Duration::from_secs(3);

    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match connect() {
            Ok(socket) => {
                socket.send(b"VERSION")?;
                let banner = read_token(socket.as_ref(), timeout)?;
                if !banner.starts_with("VERSION_") {
                    last_err = Some(ClientError::AuthFailed(format!(
                        "unexpected server banner: {banner}"
                    )));
                } else {
                    socket.send(VERSION_2.as_bytes())?;
                    expect_pass(socket.as_ref(), timeout, "server version ack")?;
                    socket.send(format!("TOKEN {token}").as_bytes())?;
                    expect_pass(socket.as_ref(), timeout, "server token ack")?;
                    return Ok(socket);
                }
            }
            Err(err) => last_err = Some(err),
        }

        if attempt + 1 < MAX_ATTEMPTS {
            clock.sleep(delay);
            delay = std::cmp::min(delay * 2, max_delay);
        }
    }

    Err(last_err.unwrap_or(ClientError::AuthFailed(
        "hvsocket server connection never became reachable".to_string(),
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacketKind {
    Data = 0,
    CommandAck = 1,
    CloseAck = 2,
    SignalAck = 3,
    Close = 4,
    Signal = 5,
}

impl PacketKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Data),
            1 => Some(Self::CommandAck),
            2 => Some(Self::CloseAck),
            3 => Some(Self::SignalAck),
            4 => Some(Self::Close),
            5 => Some(Self::Signal),
            _ => None,
        }
    }
}

const NULL_PIPELINE_ID: Uuid = Uuid::nil();

fn frame(kind: PacketKind, pipeline_id: Uuid, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 16 + payload.len());
    buf.push(kind as u8);
    buf.extend_from_slice(pipeline_id.as_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Frames PSRP traffic as out-of-proc data packets over a single shared
/// socket (§3 "HvSocket adapter"). A small pacing delay before writes avoids
/// overrunning the peer.
pub struct HvSocketBackend {
    socket: Box<dyn PacketSocket>,
    queues: HashMap<Uuid, Vec<u8>>,
    write_pacing: Duration,
}

impl HvSocketBackend {
    pub fn new(socket: Box<dyn PacketSocket>) -> Self {
        Self {
            socket,
            queues: HashMap::new(),
            write_pacing: Duration::from_millis(2),
        }
    }

    fn pump(&mut self, timeout: Duration) -> Result<(), ClientError> {
        while let Some(bytes) = self.socket.recv(timeout)? {
            if bytes.len() < 17 {
                continue;
            }
            let kind = PacketKind::from_byte(bytes[0]);
            let pipeline_id = Uuid::from_slice(&bytes[1..17]).unwrap_or(NULL_PIPELINE_ID);
            let payload = &bytes[17..];
            match kind {
                Some(PacketKind::Data) => {
                    self.queues.entry(pipeline_id).or_default().extend_from_slice(payload);
                }
                Some(PacketKind::Close) => {
                    self.socket.send(&frame(PacketKind::CloseAck, pipeline_id, &[]))?;
                }
                Some(PacketKind::Signal) => {
                    self.socket.send(&frame(PacketKind::SignalAck, pipeline_id, &[]))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl ByteStreamAdapter for HvSocketBackend {
    fn write_all(&mut self, pipeline_id: Option<Uuid>, data: &[u8]) -> Result<(), ClientError> {
        std::thread::sleep(self.write_pacing);
        let id = pipeline_id.unwrap_or(NULL_PIPELINE_ID);
        self.socket.send(&frame(PacketKind::Data, id, data))
    }

    fn read(&mut self, pipeline_id: Option<Uuid>) -> Result<Option<Vec<u8>>, ClientError> {
        self.pump(Duration::from_millis(50))?;
        let id = pipeline_id.unwrap_or(NULL_PIPELINE_ID);
        match self.queues.get_mut(&id) {
            Some(buf) if !buf.is_empty() => Ok(Some(std::mem::take(buf))),
            _ => Ok(Some(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedSocket {
        outbound: Mutex<Vec<Vec<u8>>>,
        inbound: Mutex<Vec<Vec<u8>>>,
    }

    impl PacketSocket for ScriptedSocket {
        fn send(&self, data: &[u8]) -> Result<(), ClientError> {
            self.outbound.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn recv(&self, _timeout: Duration) -> Result<Option<Vec<u8>>, ClientError> {
            let mut inbound = self.inbound.lock().unwrap();
            if inbound.is_empty() {
                return Ok(None);
            }
            Ok(Some(inbound.remove(0)))
        }
    }

    #[test]
    fn test_broker_handshake_happy_path() {
        let socket = ScriptedSocket {
            outbound: Mutex::new(vec![]),
            inbound: Mutex::new(vec![
                b"VERSION_2".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"CONF".to_vec(),
                b"PASS".to_vec(),
                b"TOKEN abc123".to_vec(),
            ]),
        };

        let token = broker_handshake(
            &socket,
            Some("CONTOSO"),
            "alice",
            Some("hunter2"),
            Some("Microsoft.PowerShell"),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_broker_handshake_fail_does_not_attempt_stage_two() {
        let socket = ScriptedSocket {
            outbound: Mutex::new(vec![]),
            inbound: Mutex::new(vec![
                b"VERSION_2".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"PASS".to_vec(),
                b"FAIL".to_vec(),
            ]),
        };

        let err = broker_handshake(&socket, None, "bob", Some("bad"), None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthFailed(_)));
        let outbound = socket.outbound.lock().unwrap();
        assert_eq!(outbound.last().map(Vec::as_slice), Some(b"FAIL".as_slice()));
    }

    #[test]
    fn test_frame_roundtrips_kind_and_pipeline_id() {
        let id = Uuid::new_v4();
        let bytes = frame(PacketKind::Data, id, b"payload");
        assert_eq!(bytes[0], PacketKind::Data as u8);
        assert_eq!(&bytes[1..17], id.as_bytes());
        assert_eq!(&bytes[17..], b"payload");
    }
}
