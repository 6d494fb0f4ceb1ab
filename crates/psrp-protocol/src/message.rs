use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::PowerShellRemotingError;
use crate::ps_value::{PsObjectWithType, PsValue, deserialize::DeserializationContext};

/// MS-PSRP 2.2.1 `Destination` field: who the message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Client,
    Server,
}

impl Destination {
    pub fn value(self) -> u32 {
        match self {
            Destination::Client => 0x0000_0001,
            Destination::Server => 0x0000_0002,
        }
    }

    pub fn from_value(value: u32) -> Result<Self, PowerShellRemotingError> {
        match value {
            0x0000_0001 => Ok(Destination::Client),
            0x0000_0002 => Ok(Destination::Server),
            other => Err(PowerShellRemotingError::InvalidMessage(format!(
                "Unknown destination: {other:#010x}"
            ))),
        }
    }
}

/// MS-PSRP 2.2.1 `MessageType` field.
///
/// <https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/497ac440-89fb-4cb3-9cc1-3434c1aa672e>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SessionCapability,
    InitRunspacepool,
    PublicKey,
    EncryptedSessionKey,
    PublicKeyRequest,
    ConnectRunspacepool,
    RunspacepoolInitData,
    ResetRunspaceState,
    SetMaxRunspaces,
    SetMinRunspaces,
    RunspaceAvailability,
    RunspacepoolState,
    CreatePipeline,
    GetAvailableRunspaces,
    UserEvent,
    ApplicationPrivateData,
    GetCommandMetadata,
    RunspacepoolHostCall,
    RunspacepoolHostResponse,
    PipelineInput,
    EndOfPipelineInput,
    PipelineOutput,
    ErrorRecord,
    PipelineState,
    DebugRecord,
    VerboseRecord,
    WarningRecord,
    ProgressRecord,
    InformationRecord,
    PipelineHostCall,
    PipelineHostResponse,
}

impl MessageType {
    pub fn value(self) -> u32 {
        match self {
            MessageType::SessionCapability => 0x0004_0002,
            MessageType::InitRunspacepool => 0x0004_0004,
            MessageType::PublicKey => 0x0004_0005,
            MessageType::EncryptedSessionKey => 0x0004_0006,
            MessageType::PublicKeyRequest => 0x0004_0007,
            MessageType::ConnectRunspacepool => 0x0004_0008,
            MessageType::RunspacepoolInitData => 0x0004_002b,
            MessageType::ResetRunspaceState => 0x0004_002d,
            MessageType::SetMaxRunspaces => 0x0002_1002,
            MessageType::SetMinRunspaces => 0x0002_1003,
            MessageType::RunspaceAvailability => 0x0002_1004,
            MessageType::RunspacepoolState => 0x0002_1005,
            MessageType::CreatePipeline => 0x0002_1006,
            MessageType::GetAvailableRunspaces => 0x0002_1007,
            MessageType::UserEvent => 0x0002_1008,
            MessageType::ApplicationPrivateData => 0x0002_1009,
            MessageType::GetCommandMetadata => 0x0002_100a,
            MessageType::RunspacepoolHostCall => 0x0002_100b,
            MessageType::RunspacepoolHostResponse => 0x0002_100c,
            MessageType::PipelineInput => 0x0004_1002,
            MessageType::EndOfPipelineInput => 0x0004_1003,
            MessageType::PipelineOutput => 0x0004_1004,
            MessageType::ErrorRecord => 0x0004_1005,
            MessageType::PipelineState => 0x0004_1006,
            MessageType::DebugRecord => 0x0004_1007,
            MessageType::VerboseRecord => 0x0004_1008,
            MessageType::WarningRecord => 0x0004_1009,
            MessageType::ProgressRecord => 0x0004_1010,
            MessageType::InformationRecord => 0x0004_1011,
            MessageType::PipelineHostCall => 0x0004_1100,
            MessageType::PipelineHostResponse => 0x0004_1101,
        }
    }

    pub fn from_value(value: u32) -> Result<Self, PowerShellRemotingError> {
        Ok(match value {
            0x0004_0002 => MessageType::SessionCapability,
            0x0004_0004 => MessageType::InitRunspacepool,
            0x0004_0005 => MessageType::PublicKey,
            0x0004_0006 => MessageType::EncryptedSessionKey,
            0x0004_0007 => MessageType::PublicKeyRequest,
            0x0004_0008 => MessageType::ConnectRunspacepool,
            0x0004_002b => MessageType::RunspacepoolInitData,
            0x0004_002d => MessageType::ResetRunspaceState,
            0x0002_1002 => MessageType::SetMaxRunspaces,
            0x0002_1003 => MessageType::SetMinRunspaces,
            0x0002_1004 => MessageType::RunspaceAvailability,
            0x0002_1005 => MessageType::RunspacepoolState,
            0x0002_1006 => MessageType::CreatePipeline,
            0x0002_1007 => MessageType::GetAvailableRunspaces,
            0x0002_1008 => MessageType::UserEvent,
            0x0002_1009 => MessageType::ApplicationPrivateData,
            0x0002_100a => MessageType::GetCommandMetadata,
            0x0002_100b => MessageType::RunspacepoolHostCall,
            0x0002_100c => MessageType::RunspacepoolHostResponse,
            0x0004_1002 => MessageType::PipelineInput,
            0x0004_1003 => MessageType::EndOfPipelineInput,
            0x0004_1004 => MessageType::PipelineOutput,
            0x0004_1005 => MessageType::ErrorRecord,
            0x0004_1006 => MessageType::PipelineState,
            0x0004_1007 => MessageType::DebugRecord,
            0x0004_1008 => MessageType::VerboseRecord,
            0x0004_1009 => MessageType::WarningRecord,
            0x0004_1010 => MessageType::ProgressRecord,
            0x0004_1011 => MessageType::InformationRecord,
            0x0004_1100 => MessageType::PipelineHostCall,
            0x0004_1101 => MessageType::PipelineHostResponse,
            other => {
                return Err(PowerShellRemotingError::InvalidMessage(format!(
                    "Unknown message type: {other:#010x}"
                )));
            }
        })
    }
}

/// A fully reassembled MS-PSRP message (2.2.1): the envelope that travels
/// inside a fragment train once all fragments for an object have been
/// concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerShellRemotingMessage {
    pub destination: Destination,
    pub message_type: MessageType,
    pub rpid: Uuid,
    pub pid: Option<Uuid>,
    pub data: Vec<u8>,
}

impl PowerShellRemotingMessage {
    /// Build a message envelope around a typed payload, serializing it to CLIXML.
    pub fn from_ps_message(
        ps_object: &dyn PsObjectWithType,
        rpid: Uuid,
        pid: Option<Uuid>,
    ) -> Result<Self, PowerShellRemotingError> {
        let ps_value = ps_object.to_ps_object();
        let data = crate::ps_value::serialize::to_clixml_string(&ps_value)?.into_bytes();

        Ok(Self {
            destination: Destination::Server,
            message_type: ps_object.message_type(),
            rpid,
            pid,
            data,
        })
    }

    /// Parse the message's CLIXML payload into a generic [`PsValue`].
    pub fn parse_ps_message(&self) -> Result<PsValue, PowerShellRemotingError> {
        let xml = std::str::from_utf8(&self.data)?;
        let mut context = DeserializationContext::new();
        crate::ps_value::deserialize::from_clixml_str(xml, &mut context)
    }

    /// Pack the envelope into wire format: Destination, MessageType, RPID,
    /// PID, then the raw data bytes (all little-endian per MS-PSRP 2.2.1).
    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(24 + self.data.len());

        buffer
            .write_u32::<LittleEndian>(self.destination.value())
            .expect("writing to a Vec never fails");
        buffer
            .write_u32::<LittleEndian>(self.message_type.value())
            .expect("writing to a Vec never fails");
        buffer.extend_from_slice(self.rpid.as_bytes());
        buffer.extend_from_slice(self.pid.unwrap_or_else(Uuid::nil).as_bytes());
        buffer.extend_from_slice(&self.data);

        buffer
    }

    /// Parse a message envelope from reassembled fragment data.
    pub fn parse(cursor: &mut Cursor<Vec<u8>>) -> Result<Self, PowerShellRemotingError> {
        let destination = Destination::from_value(cursor.read_u32::<LittleEndian>()?)?;
        let message_type = MessageType::from_value(cursor.read_u32::<LittleEndian>()?)?;

        let mut rpid_bytes = [0u8; 16];
        std::io::Read::read_exact(cursor, &mut rpid_bytes)?;
        let rpid = Uuid::from_bytes(rpid_bytes);

        let mut pid_bytes = [0u8; 16];
        std::io::Read::read_exact(cursor, &mut pid_bytes)?;
        let pid_uuid = Uuid::from_bytes(pid_bytes);
        let pid = if pid_uuid.is_nil() {
            None
        } else {
            Some(pid_uuid)
        };

        let position = cursor.position() as usize;
        let inner = cursor.get_ref();
        let data = inner[position..].to_vec();

        Ok(Self {
            destination,
            message_type,
            rpid,
            pid,
            data,
        })
    }
}
