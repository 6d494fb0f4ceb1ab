use crate::{MessageType, PowerShellRemotingError, PowerShellRemotingMessage, PsObjectWithType};

use super::PsValue;

/// MS-PSRP 2.2.2.14 `PIPELINE_INPUT` message: a single object fed into a
/// running pipeline's input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInput {
    pub data: PsValue,
}

impl From<PsValue> for PipelineInput {
    fn from(data: PsValue) -> Self {
        Self { data }
    }
}

impl PsObjectWithType for PipelineInput {
    fn message_type(&self) -> MessageType {
        MessageType::PipelineInput
    }

    fn to_ps_object(&self) -> PsValue {
        self.data.clone()
    }
}

impl TryFrom<&PowerShellRemotingMessage> for PipelineInput {
    type Error = PowerShellRemotingError;

    fn try_from(msg: &PowerShellRemotingMessage) -> Result<Self, Self::Error> {
        if msg.message_type != MessageType::PipelineInput {
            return Err(PowerShellRemotingError::InvalidMessage(
                "not a PipelineInput message".into(),
            ));
        }
        Ok(PipelineInput {
            data: msg.parse_ps_message()?,
        })
    }
}

/// MS-PSRP 2.2.2.15 `END_OF_PIPELINE_INPUT` message: a sentinel with no
/// payload, closing the pipeline's input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndOfPipelineInput;

impl PsObjectWithType for EndOfPipelineInput {
    fn message_type(&self) -> MessageType {
        MessageType::EndOfPipelineInput
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Primitive(crate::ps_value::PsPrimitiveValue::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ps_value::PsPrimitiveValue;

    #[test]
    fn test_pipeline_input_message_type() {
        let input = PipelineInput::from(PsValue::Primitive(PsPrimitiveValue::Str(
            "hello".to_string(),
        )));
        assert_eq!(input.message_type(), MessageType::PipelineInput);
    }

    #[test]
    fn test_end_of_pipeline_input_message_type() {
        assert_eq!(
            EndOfPipelineInput.message_type(),
            MessageType::EndOfPipelineInput
        );
    }
}
