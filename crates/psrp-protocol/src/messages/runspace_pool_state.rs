use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, PsObjectWithType, PsPrimitiveValue, PsProperty, PsValue,
};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.3.4 `RunspacePoolState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunspacePoolState {
    BeforeOpen = 0,
    Opening = 1,
    Opened = 2,
    Closed = 3,
    Closing = 4,
    Broken = 5,
    NegotiationSent = 6,
    NegotiationSucceeded = 7,
    Connecting = 8,
    Disconnected = 9,
}

impl RunspacePoolState {
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::BeforeOpen => 0,
            Self::Opening => 1,
            Self::Opened => 2,
            Self::Closed => 3,
            Self::Closing => 4,
            Self::Broken => 5,
            Self::NegotiationSent => 6,
            Self::NegotiationSucceeded => 7,
            Self::Connecting => 8,
            Self::Disconnected => 9,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Broken)
    }
}

impl TryFrom<i32> for RunspacePoolState {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BeforeOpen),
            1 => Ok(Self::Opening),
            2 => Ok(Self::Opened),
            3 => Ok(Self::Closed),
            4 => Ok(Self::Closing),
            5 => Ok(Self::Broken),
            6 => Ok(Self::NegotiationSent),
            7 => Ok(Self::NegotiationSucceeded),
            8 => Ok(Self::Connecting),
            9 => Ok(Self::Disconnected),
            _ => Err(crate::PowerShellRemotingError::InvalidMessage(format!(
                "Invalid RunspacePoolState value: {value}"
            ))),
        }
    }
}

/// MS-PSRP 2.2.2.9 `RUNSPACEPOOL_STATE` message: reports a runspace pool's
/// current lifecycle state, optionally carrying the error that broke it.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct RunspacePoolStateMessage {
    pub runspace_state: RunspacePoolState,
    #[builder(default)]
    pub error_record: Option<PsValue>,
}

impl PsObjectWithType for RunspacePoolStateMessage {
    fn message_type(&self) -> MessageType {
        MessageType::RunspacepoolState
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<RunspacePoolStateMessage> for ComplexObject {
    fn from(state: RunspacePoolStateMessage) -> Self {
        let mut extended_properties = BTreeMap::new();

        extended_properties.insert(
            "RunspaceState".to_string(),
            PsProperty {
                name: "RunspaceState".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::I32(state.runspace_state.as_i32())),
            },
        );

        if let Some(error) = state.error_record {
            extended_properties.insert(
                "ExceptionAsErrorRecord".to_string(),
                PsProperty {
                    name: "ExceptionAsErrorRecord".to_string(),
                    value: error,
                },
            );
        }

        Self {
            type_def: None,
            to_string: None,
            content: ComplexObjectContent::Standard,
            adapted_properties: BTreeMap::new(),
            extended_properties,
        }
    }
}

impl TryFrom<ComplexObject> for RunspacePoolStateMessage {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let state_prop = value
            .extended_properties
            .get("RunspaceState")
            .ok_or_else(|| {
                Self::Error::InvalidMessage("Missing RunspaceState property".to_string())
            })?;

        let runspace_state = match &state_prop.value {
            PsValue::Primitive(PsPrimitiveValue::I32(state)) => {
                RunspacePoolState::try_from(*state)?
            }
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "RunspaceState property is not an I32".to_string(),
                ));
            }
        };

        let error_record = value
            .extended_properties
            .get("ExceptionAsErrorRecord")
            .map(|prop| prop.value.clone());

        Ok(Self {
            runspace_state,
            error_record,
        })
    }
}

impl RunspacePoolStateMessage {
    pub fn opened() -> Self {
        Self::builder()
            .runspace_state(RunspacePoolState::Opened)
            .build()
    }

    pub fn broken_with_error(error_record: PsValue) -> Self {
        Self::builder()
            .runspace_state(RunspacePoolState::Broken)
            .error_record(Some(error_record))
            .build()
    }

    pub fn is_terminal(&self) -> bool {
        self.runspace_state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runspace_pool_state_opened_roundtrip() {
        let state = RunspacePoolStateMessage::opened();

        let complex_obj = ComplexObject::from(state.clone());
        let roundtrip = RunspacePoolStateMessage::try_from(complex_obj).unwrap();

        assert_eq!(state, roundtrip);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_runspace_pool_state_broken_with_error() {
        let error_record = PsValue::Primitive(PsPrimitiveValue::Str("connection lost".to_string()));
        let state = RunspacePoolStateMessage::broken_with_error(error_record.clone());

        let complex_obj = ComplexObject::from(state.clone());
        let roundtrip = RunspacePoolStateMessage::try_from(complex_obj).unwrap();

        assert_eq!(state, roundtrip);
        assert!(state.is_terminal());
        assert_eq!(state.error_record, Some(error_record));
    }

    #[test]
    fn test_message_type() {
        let state = RunspacePoolStateMessage::opened();
        assert_eq!(state.message_type().value(), 0x00021005);
    }

    #[test]
    fn test_runspace_pool_state_try_from_invalid() {
        assert!(RunspacePoolState::try_from(99).is_err());
    }
}
