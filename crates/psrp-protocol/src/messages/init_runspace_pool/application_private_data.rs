use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, PsObjectWithType, PsProperty, PsValue,
};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.2.17: server-to-client message carrying the server's
/// `PSVersionTable` and other capability data, sent once after the
/// runspace pool opens. The client does not need to interpret every
/// entry; it is kept as a raw value and inspected on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationPrivateData {
    pub data: Option<PsValue>,
}

impl PsObjectWithType for ApplicationPrivateData {
    fn message_type(&self) -> MessageType {
        MessageType::ApplicationPrivateData
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<ApplicationPrivateData> for ComplexObject {
    fn from(value: ApplicationPrivateData) -> Self {
        let mut extended_properties = BTreeMap::new();

        if let Some(data) = value.data {
            extended_properties.insert(
                "ApplicationPrivateData".to_string(),
                PsProperty {
                    name: "ApplicationPrivateData".to_string(),
                    value: data,
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

impl TryFrom<ComplexObject> for ApplicationPrivateData {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let data = value
            .extended_properties
            .get("ApplicationPrivateData")
            .map(|prop| prop.value.clone());

        Ok(Self { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ps_value::PsPrimitiveValue;

    #[test]
    fn test_application_private_data_roundtrip() {
        let data = ApplicationPrivateData {
            data: Some(PsValue::Primitive(PsPrimitiveValue::Str(
                "payload".to_string(),
            ))),
        };
        let complex_obj = ComplexObject::from(data.clone());
        let roundtrip = ApplicationPrivateData::try_from(complex_obj).unwrap();
        assert_eq!(data, roundtrip);
    }

    #[test]
    fn test_application_private_data_empty() {
        let data = ApplicationPrivateData { data: None };
        let complex_obj = ComplexObject::from(data.clone());
        let roundtrip = ApplicationPrivateData::try_from(complex_obj).unwrap();
        assert_eq!(data, roundtrip);
    }

    #[test]
    fn test_message_type() {
        let data = ApplicationPrivateData { data: None };
        assert_eq!(data.message_type().value(), 0x0002_1009);
    }
}
