use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, PsObjectWithType, PsPrimitiveValue, PsProperty, PsValue,
};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.2.1 `SESSION_CAPABILITY` message: the first message exchanged
/// in either direction on a runspace pool, advertising protocol/PS/serializer
/// versions.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct SessionCapability {
    pub protocol_version: String,
    pub ps_version: String,
    pub serialization_version: String,
    #[builder(default)]
    pub time_zone: Option<String>,
}

impl PsObjectWithType for SessionCapability {
    fn message_type(&self) -> MessageType {
        MessageType::SessionCapability
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<SessionCapability> for ComplexObject {
    fn from(cap: SessionCapability) -> Self {
        let mut extended_properties = BTreeMap::new();

        extended_properties.insert(
            "PSVersion".to_string(),
            PsProperty {
                name: "PSVersion".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Version(cap.ps_version)),
            },
        );
        extended_properties.insert(
            "protocolversion".to_string(),
            PsProperty {
                name: "protocolversion".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Version(cap.protocol_version)),
            },
        );
        extended_properties.insert(
            "SerializationVersion".to_string(),
            PsProperty {
                name: "SerializationVersion".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Version(cap.serialization_version)),
            },
        );

        if let Some(time_zone) = cap.time_zone {
            extended_properties.insert(
                "TimeZone".to_string(),
                PsProperty {
                    name: "TimeZone".to_string(),
                    value: PsValue::Primitive(PsPrimitiveValue::Bytes(time_zone.into_bytes())),
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

impl TryFrom<ComplexObject> for SessionCapability {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        fn version_string(
            props: &BTreeMap<String, PsProperty>,
            name: &str,
        ) -> Result<String, crate::PowerShellRemotingError> {
            match props.get(name).map(|p| &p.value) {
                Some(PsValue::Primitive(PsPrimitiveValue::Version(v))) => Ok(v.clone()),
                Some(PsValue::Primitive(PsPrimitiveValue::Str(v))) => Ok(v.clone()),
                _ => Err(crate::PowerShellRemotingError::InvalidMessage(format!(
                    "Missing or invalid {name} property"
                ))),
            }
        }

        let protocol_version = version_string(&value.extended_properties, "protocolversion")?;
        let ps_version = version_string(&value.extended_properties, "PSVersion")?;
        let serialization_version =
            version_string(&value.extended_properties, "SerializationVersion")?;

        let time_zone = value
            .extended_properties
            .get("TimeZone")
            .and_then(|p| match &p.value {
                PsValue::Primitive(PsPrimitiveValue::Bytes(b)) => {
                    String::from_utf8(b.clone()).ok()
                }
                PsValue::Primitive(PsPrimitiveValue::Str(s)) => Some(s.clone()),
                _ => None,
            });

        Ok(Self {
            protocol_version,
            ps_version,
            serialization_version,
            time_zone,
        })
    }
}

impl SessionCapability {
    /// The capability this crate advertises when opening a runspace pool.
    pub fn current() -> Self {
        Self::builder()
            .protocol_version("2.3".to_string())
            .ps_version("2.0".to_string())
            .serialization_version("1.1.0.1".to_string())
            .time_zone(None)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_capability_roundtrip() {
        let cap = SessionCapability::builder()
            .protocol_version("2.3".to_string())
            .ps_version("2.0".to_string())
            .serialization_version("1.1.0.1".to_string())
            .time_zone(Some("UTC".to_string()))
            .build();

        let complex_obj = ComplexObject::from(cap.clone());
        let roundtrip = SessionCapability::try_from(complex_obj).unwrap();

        assert_eq!(cap, roundtrip);
    }

    #[test]
    fn test_session_capability_no_time_zone() {
        let cap = SessionCapability::current();
        let complex_obj = ComplexObject::from(cap.clone());
        let roundtrip = SessionCapability::try_from(complex_obj).unwrap();

        assert_eq!(cap, roundtrip);
        assert_eq!(cap.time_zone, None);
    }

    #[test]
    fn test_message_type() {
        let cap = SessionCapability::current();
        assert_eq!(cap.message_type().value(), 0x00040002);
    }
}
