use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, PsObjectWithType, PsPrimitiveValue, PsProperty, PsValue,
};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.2.2 `CONNECT_RUNSPACEPOOL` message: sent by the client to
/// reattach to a runspace pool the server already has open. Both fields are
/// optional; when omitted the server keeps its current runspace bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectRunspacePool {
    pub min_runspaces: Option<i32>,
    pub max_runspaces: Option<i32>,
}

impl PsObjectWithType for ConnectRunspacePool {
    fn message_type(&self) -> MessageType {
        MessageType::ConnectRunspacepool
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(*self))
    }
}

impl From<ConnectRunspacePool> for ComplexObject {
    fn from(value: ConnectRunspacePool) -> Self {
        let mut extended_properties = BTreeMap::new();

        if let Some(min) = value.min_runspaces {
            extended_properties.insert(
                "MinRunspaces".to_string(),
                PsProperty {
                    name: "MinRunspaces".to_string(),
                    value: PsValue::Primitive(PsPrimitiveValue::I32(min)),
                },
            );
        }

        if let Some(max) = value.max_runspaces {
            extended_properties.insert(
                "MaxRunspaces".to_string(),
                PsProperty {
                    name: "MaxRunspaces".to_string(),
                    value: PsValue::Primitive(PsPrimitiveValue::I32(max)),
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

impl TryFrom<ComplexObject> for ConnectRunspacePool {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        fn i32_prop(props: &BTreeMap<String, PsProperty>, name: &str) -> Option<i32> {
            match props.get(name).map(|p| &p.value) {
                Some(PsValue::Primitive(PsPrimitiveValue::I32(v))) => Some(*v),
                _ => None,
            }
        }

        Ok(Self {
            min_runspaces: i32_prop(&value.extended_properties, "MinRunspaces"),
            max_runspaces: i32_prop(&value.extended_properties, "MaxRunspaces"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_runspacepool_roundtrip() {
        let msg = ConnectRunspacePool {
            min_runspaces: Some(1),
            max_runspaces: Some(5),
        };
        let complex_obj = ComplexObject::from(msg);
        let roundtrip = ConnectRunspacePool::try_from(complex_obj).unwrap();
        assert_eq!(msg, roundtrip);
    }

    #[test]
    fn test_connect_runspacepool_empty() {
        let msg = ConnectRunspacePool::default();
        let complex_obj = ComplexObject::from(msg);
        let roundtrip = ConnectRunspacePool::try_from(complex_obj).unwrap();
        assert_eq!(msg, roundtrip);
    }

    #[test]
    fn test_message_type() {
        let msg = ConnectRunspacePool::default();
        assert_eq!(msg.message_type().value(), 0x0004_0008);
    }
}
