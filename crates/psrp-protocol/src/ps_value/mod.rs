//! The PSRP object model (MS-PSRP section 2.2.5): primitive and complex
//! `.NET` values as they travel inside a PSRP message payload, plus the
//! (de)serialization glue that maps them to/from CLIXML.

pub mod complex_object;
pub mod container;
pub mod deserialize;
pub mod primitive;
pub mod property;
pub mod serialize;
pub mod types;
pub mod value;

pub use complex_object::{ComplexObject, ComplexObjectContent};
pub use container::{Container, PsEnums};
pub use primitive::PsPrimitiveValue;
pub use property::PsProperty;
pub use serialize::to_clixml_string;
pub use types::PsType;
pub use value::PsValue;

use crate::MessageType;

/// Implemented by every typed PSRP message payload (`SessionCapability`,
/// `ErrorRecord`, `PipelineOutput`, ...) so it can be fragmented and sent
/// without the caller needing to know its wire shape up front.
pub trait PsObjectWithType: std::fmt::Debug {
    /// The MS-PSRP `MessageType` this payload is carried under.
    fn message_type(&self) -> MessageType;

    /// The payload itself, ready to be serialized as the message's CLIXML data.
    fn to_ps_object(&self) -> PsValue;
}
