use crate::ps_value::{ComplexObject, ComplexObjectContent, PsEnums, PsType};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.3.4: the apartment threading model a pipeline runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApartmentState {
    STA = 0,
    MTA = 1,
    #[default]
    Unknown = 2,
}

impl ApartmentState {
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl From<i32> for ApartmentState {
    fn from(value: i32) -> Self {
        match value {
            0 => ApartmentState::STA,
            1 => ApartmentState::MTA,
            _ => ApartmentState::Unknown,
        }
    }
}

impl From<ApartmentState> for ComplexObject {
    fn from(state: ApartmentState) -> Self {
        let to_string = match state {
            ApartmentState::STA => "STA",
            ApartmentState::MTA => "MTA",
            ApartmentState::Unknown => "Unknown",
        };

        ComplexObject {
            type_def: Some(PsType::apartment_state()),
            to_string: Some(to_string.to_string()),
            content: ComplexObjectContent::PsEnums(PsEnums { value: state.value() }),
            adapted_properties: BTreeMap::new(),
            extended_properties: BTreeMap::new(),
        }
    }
}

impl TryFrom<ComplexObject> for ApartmentState {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        match value.content {
            ComplexObjectContent::PsEnums(PsEnums { value }) => Ok(ApartmentState::from(value)),
            _ => Err(Self::Error::InvalidMessage(
                "ApartmentState must be an enum".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apartment_state_roundtrip() {
        for state in [ApartmentState::STA, ApartmentState::MTA, ApartmentState::Unknown] {
            let complex_obj = ComplexObject::from(state);
            let roundtrip = ApartmentState::try_from(complex_obj).unwrap();
            assert_eq!(state, roundtrip);
        }
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(ApartmentState::default(), ApartmentState::Unknown);
    }
}
