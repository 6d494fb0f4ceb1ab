use crate::ps_value::{ComplexObject, ComplexObjectContent, PsEnums, PsType};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.3.4: the threading model used to run commands in the runspace pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PSThreadOptions {
    #[default]
    Default = 0,
    UseNewThread = 1,
    ReuseThread = 2,
    UseCurrentThread = 3,
}

impl PSThreadOptions {
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl From<i32> for PSThreadOptions {
    fn from(value: i32) -> Self {
        match value {
            1 => PSThreadOptions::UseNewThread,
            2 => PSThreadOptions::ReuseThread,
            3 => PSThreadOptions::UseCurrentThread,
            _ => PSThreadOptions::Default,
        }
    }
}

impl From<PSThreadOptions> for ComplexObject {
    fn from(options: PSThreadOptions) -> Self {
        let to_string = match options {
            PSThreadOptions::Default => "Default",
            PSThreadOptions::UseNewThread => "UseNewThread",
            PSThreadOptions::ReuseThread => "ReuseThread",
            PSThreadOptions::UseCurrentThread => "UseCurrentThread",
        };

        ComplexObject {
            type_def: Some(PsType::ps_thread_options()),
            to_string: Some(to_string.to_string()),
            content: ComplexObjectContent::PsEnums(PsEnums {
                value: options.value(),
            }),
            adapted_properties: BTreeMap::new(),
            extended_properties: BTreeMap::new(),
        }
    }
}

impl TryFrom<ComplexObject> for PSThreadOptions {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        match value.content {
            ComplexObjectContent::PsEnums(PsEnums { value }) => Ok(PSThreadOptions::from(value)),
            _ => Err(Self::Error::InvalidMessage(
                "PSThreadOptions must be an enum".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ps_thread_options_roundtrip() {
        for options in [
            PSThreadOptions::Default,
            PSThreadOptions::UseNewThread,
            PSThreadOptions::ReuseThread,
            PSThreadOptions::UseCurrentThread,
        ] {
            let complex_obj = ComplexObject::from(options);
            let roundtrip = PSThreadOptions::try_from(complex_obj).unwrap();
            assert_eq!(options, roundtrip);
        }
    }
}
