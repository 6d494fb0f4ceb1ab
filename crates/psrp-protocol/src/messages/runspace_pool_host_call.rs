use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsObjectWithType, PsPrimitiveValue, PsProperty,
    PsType, PsValue,
};
use std::collections::BTreeMap;

/// RunspacepoolHostCall is sent from the server to the client to perform a
/// method call on the host associated with the runspace pool itself (as
/// opposed to a specific pipeline).
///
/// MessageType value: 0x0002100b
/// Direction: Server to Client
/// Target: RunspacePool
///
/// Wire shape is identical to PipelineHostCall: call ID (ci), host method
/// identifier (mi), and method parameters (mp).
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct RunspacePoolHostCall {
    pub call_id: i64,
    pub method_id: i32,
    pub method_name: String,
    #[builder(default)]
    pub parameters: Vec<PsValue>,
}

impl PsObjectWithType for RunspacePoolHostCall {
    fn message_type(&self) -> MessageType {
        MessageType::RunspacepoolHostCall
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<RunspacePoolHostCall> for ComplexObject {
    fn from(host_call: RunspacePoolHostCall) -> Self {
        let mut extended_properties = BTreeMap::new();

        extended_properties.insert(
            "ci".to_string(),
            PsProperty {
                name: "ci".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::I64(host_call.call_id)),
            },
        );

        let method_id_obj = Self {
            type_def: Some(PsType::remote_host_method_id()),
            to_string: Some(host_call.method_name),
            content: ComplexObjectContent::ExtendedPrimitive(PsPrimitiveValue::I32(
                host_call.method_id,
            )),
            adapted_properties: BTreeMap::new(),
            extended_properties: BTreeMap::new(),
        };

        extended_properties.insert(
            "mi".to_string(),
            PsProperty {
                name: "mi".to_string(),
                value: PsValue::Object(method_id_obj),
            },
        );

        let parameters_obj = Self {
            type_def: Some(PsType::array_list()),
            to_string: None,
            content: ComplexObjectContent::Container(Container::List(host_call.parameters)),
            adapted_properties: BTreeMap::new(),
            extended_properties: BTreeMap::new(),
        };

        extended_properties.insert(
            "mp".to_string(),
            PsProperty {
                name: "mp".to_string(),
                value: PsValue::Object(parameters_obj),
            },
        );

        Self {
            type_def: None,
            to_string: None,
            content: ComplexObjectContent::Standard,
            adapted_properties: BTreeMap::new(),
            extended_properties,
        }
    }
}

impl TryFrom<ComplexObject> for RunspacePoolHostCall {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let ci_property = value.extended_properties.get("ci").ok_or_else(|| {
            Self::Error::InvalidMessage("Missing call ID (ci) property".to_string())
        })?;

        let PsValue::Primitive(PsPrimitiveValue::I64(call_id)) = &ci_property.value else {
            return Err(Self::Error::InvalidMessage(
                "Call ID (ci) is not a signed long integer".to_string(),
            ));
        };

        let mi_property = value.extended_properties.get("mi").ok_or_else(|| {
            Self::Error::InvalidMessage("Missing method identifier (mi) property".to_string())
        })?;

        let PsValue::Object(mi_obj) = &mi_property.value else {
            return Err(Self::Error::InvalidMessage(
                "Method identifier (mi) is not an object".to_string(),
            ));
        };

        let method_id = match &mi_obj.content {
            ComplexObjectContent::PsEnums(ps_enums) => ps_enums.value,
            ComplexObjectContent::ExtendedPrimitive(PsPrimitiveValue::I32(value)) => *value,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "Method identifier content is not an I32 or Enum".to_string(),
                ));
            }
        };

        let method_name = mi_obj.to_string.clone().unwrap_or_default();

        let mp = value.extended_properties.get("mp").ok_or_else(|| {
            Self::Error::InvalidMessage("Missing method parameters (mp) property".to_string())
        })?;

        let PsValue::Object(obj) = &mp.value else {
            return Err(Self::Error::InvalidMessage(
                "Method parameters (mp) is not an object".to_string(),
            ));
        };

        let parameters =
            if let ComplexObjectContent::Container(Container::List(params)) = &obj.content {
                params.clone()
            } else {
                Vec::new()
            };

        Ok(Self {
            call_id: *call_id,
            method_id,
            method_name,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runspace_pool_host_call_roundtrip() {
        let original = RunspacePoolHostCall::builder()
            .call_id(7)
            .method_id(1) // GetName
            .method_name("GetName".to_string())
            .build();

        let complex_obj = ComplexObject::from(original.clone());
        let restored = RunspacePoolHostCall::try_from(complex_obj).unwrap();

        assert_eq!(original, restored);
    }

    #[test]
    fn test_message_type() {
        let call = RunspacePoolHostCall::builder()
            .call_id(1)
            .method_id(1)
            .method_name("GetName".to_string())
            .build();
        assert_eq!(call.message_type().value(), 0x0002100b);
    }
}
