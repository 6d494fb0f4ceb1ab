use crate::MessageType;
use crate::ps_value::{ComplexObject, ComplexObjectContent, PsObjectWithType, PsPrimitiveValue, PsProperty, PsValue};
use std::collections::BTreeMap;

/// RunspacePoolHostResponse answers a prior `RunspacePoolHostCall`. Wire
/// shape is identical to `PipelineHostResponse`.
///
/// MessageType value: 0x0002100c
/// Direction: Client to Server
/// Target: RunspacePool
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct RunspacePoolHostResponse {
    pub call_id: i64,
    #[builder(default)]
    pub method_result: Option<PsValue>,
    #[builder(default)]
    pub method_error: Option<PsValue>,
}

impl PsObjectWithType for RunspacePoolHostResponse {
    fn message_type(&self) -> MessageType {
        MessageType::RunspacepoolHostResponse
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<RunspacePoolHostResponse> for ComplexObject {
    fn from(response: RunspacePoolHostResponse) -> Self {
        let mut extended_properties = BTreeMap::new();

        extended_properties.insert(
            "ci".to_string(),
            PsProperty {
                name: "ci".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::I64(response.call_id)),
            },
        );

        if let Some(result) = response.method_result {
            extended_properties.insert(
                "mr".to_string(),
                PsProperty {
                    name: "mr".to_string(),
                    value: result,
                },
            );
        }

        if let Some(error) = response.method_error {
            extended_properties.insert(
                "me".to_string(),
                PsProperty {
                    name: "me".to_string(),
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

impl TryFrom<ComplexObject> for RunspacePoolHostResponse {
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

        let method_result = value
            .extended_properties
            .get("mr")
            .map(|p| p.value.clone());
        let method_error = value
            .extended_properties
            .get("me")
            .map(|p| p.value.clone());

        Ok(Self {
            call_id: *call_id,
            method_result,
            method_error,
        })
    }
}
