pub mod command;
pub mod command_parameter;
pub mod pipeline_result_types;
pub mod powershell_pipeline;
pub mod remote_stream_options;

pub use command::Command;
pub use command_parameter::CommandParameter;
pub use pipeline_result_types::PipelineResultTypes;
pub use powershell_pipeline::PowerShellPipeline;
pub use remote_stream_options::RemoteStreamOptions;

use crate::MessageType;
use crate::messages::init_runspace_pool::{ApartmentState, HostInfo};
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, PsObjectWithType, PsPrimitiveValue, PsProperty, PsValue,
};
use std::collections::BTreeMap;

/// MS-PSRP 2.2.2.4: the `CREATE_PIPELINE` message that starts a single
/// pipeline execution on an opened runspace pool.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct CreatePipelineMessage {
    #[builder(default = false)]
    pub no_input: bool,
    pub pipeline: PowerShellPipeline,
    #[builder(default)]
    pub apartment_state: ApartmentState,
    #[builder(default)]
    pub remote_stream_options: RemoteStreamOptions,
    #[builder(default = true)]
    pub add_to_history: bool,
    pub host_info: HostInfo,
    #[builder(default = false)]
    pub is_nested: bool,
}

impl PsObjectWithType for CreatePipelineMessage {
    fn message_type(&self) -> MessageType {
        MessageType::CreatePipeline
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<CreatePipelineMessage> for ComplexObject {
    fn from(msg: CreatePipelineMessage) -> Self {
        let mut extended_properties = BTreeMap::new();

        extended_properties.insert(
            "NoInput".to_string(),
            PsProperty {
                name: "NoInput".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Bool(msg.no_input)),
            },
        );

        extended_properties.insert(
            "ApartmentState".to_string(),
            PsProperty {
                name: "ApartmentState".to_string(),
                value: PsValue::Object(msg.apartment_state.into()),
            },
        );

        extended_properties.insert(
            "RemoteStreamOptions".to_string(),
            PsProperty {
                name: "RemoteStreamOptions".to_string(),
                value: PsValue::Object(msg.remote_stream_options.into()),
            },
        );

        extended_properties.insert(
            "AddToHistory".to_string(),
            PsProperty {
                name: "AddToHistory".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Bool(msg.add_to_history)),
            },
        );

        extended_properties.insert(
            "HostInfo".to_string(),
            PsProperty {
                name: "HostInfo".to_string(),
                value: PsValue::Object(msg.host_info.into()),
            },
        );

        extended_properties.insert(
            "PowerShell".to_string(),
            PsProperty {
                name: "PowerShell".to_string(),
                value: PsValue::Object(msg.pipeline.into()),
            },
        );

        extended_properties.insert(
            "IsNested".to_string(),
            PsProperty {
                name: "IsNested".to_string(),
                value: PsValue::Primitive(PsPrimitiveValue::Bool(msg.is_nested)),
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

impl TryFrom<ComplexObject> for CreatePipelineMessage {
    type Error = crate::PowerShellRemotingError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let get_property = |name: &str| -> Result<&PsProperty, Self::Error> {
            value
                .extended_properties
                .get(name)
                .ok_or_else(|| Self::Error::InvalidMessage(format!("Missing property: {name}")))
        };

        let no_input = match &get_property("NoInput")?.value {
            PsValue::Primitive(PsPrimitiveValue::Bool(b)) => *b,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "NoInput must be a bool".to_string(),
                ));
            }
        };

        let apartment_state = match &get_property("ApartmentState")?.value {
            PsValue::Object(obj) => ApartmentState::try_from(obj.clone())?,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "ApartmentState must be an object".to_string(),
                ));
            }
        };

        let remote_stream_options = match &get_property("RemoteStreamOptions")?.value {
            PsValue::Object(obj) => RemoteStreamOptions::try_from(obj.clone())?,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "RemoteStreamOptions must be an object".to_string(),
                ));
            }
        };

        let add_to_history = match &get_property("AddToHistory")?.value {
            PsValue::Primitive(PsPrimitiveValue::Bool(b)) => *b,
            _ => true,
        };

        let host_info = match &get_property("HostInfo")?.value {
            PsValue::Object(obj) => HostInfo::try_from(obj.clone())?,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "HostInfo must be an object".to_string(),
                ));
            }
        };

        let pipeline = match &get_property("PowerShell")?.value {
            PsValue::Object(obj) => PowerShellPipeline::try_from(obj.clone())?,
            _ => {
                return Err(Self::Error::InvalidMessage(
                    "PowerShell must be an object".to_string(),
                ));
            }
        };

        let is_nested = match value.extended_properties.get("IsNested") {
            Some(prop) => match &prop.value {
                PsValue::Primitive(PsPrimitiveValue::Bool(b)) => *b,
                _ => false,
            },
            None => false,
        };

        Ok(Self {
            no_input,
            pipeline,
            apartment_state,
            remote_stream_options,
            add_to_history,
            host_info,
            is_nested,
        })
    }
}

impl CreatePipelineMessage {
    /// Build a create-pipeline message for a single non-interactive script,
    /// declaring `NoInput = true` so the server closes its input stream
    /// automatically (see `Pipeline::close_input`).
    pub fn for_script(script: impl Into<String>, host_info: HostInfo) -> Self {
        let command = Command::builder().cmd(script).is_script(true).build();

        Self::builder()
            .no_input(true)
            .pipeline(
                PowerShellPipeline::builder()
                    .cmds(vec![command])
                    .build(),
            )
            .host_info(host_info)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::init_runspace_pool::HostDefaultData;

    fn sample_host_info() -> HostInfo {
        HostInfo::enabled_all(HostDefaultData::minimal())
    }

    #[test]
    fn test_for_script_roundtrip() {
        let msg = CreatePipelineMessage::for_script("Get-Process", sample_host_info());
        let complex_obj = ComplexObject::from(msg.clone());
        let roundtrip = CreatePipelineMessage::try_from(complex_obj).unwrap();

        assert_eq!(msg, roundtrip);
        assert!(roundtrip.no_input);
        assert_eq!(roundtrip.pipeline.cmds.len(), 1);
        assert_eq!(roundtrip.pipeline.cmds[0].cmd, "Get-Process");
        assert!(roundtrip.pipeline.cmds[0].is_script);
    }

    #[test]
    fn test_message_type() {
        let msg = CreatePipelineMessage::for_script("1+1", sample_host_info());
        assert_eq!(msg.message_type().value(), 0x0002_1006);
    }

    #[test]
    fn test_default_add_to_history_true() {
        let msg = CreatePipelineMessage::for_script("Get-Date", sample_host_info());
        assert!(msg.add_to_history);
        assert!(!msg.is_nested);
    }
}
