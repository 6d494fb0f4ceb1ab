use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Container, PsEnums, PsPrimitiveValue, PsProperty, PsType};

/// The payload carried by a `ComplexObject`, per MS-PSRP 2.2.5.2.
///
/// An object is either "standard" (only adapted/extended properties), an
/// extended primitive (a primitive value with extra properties hung off it,
/// e.g. `System.Version`), a container (list/stack/queue/dictionary), or an
/// enum value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplexObjectContent {
    Standard,
    ExtendedPrimitive(PsPrimitiveValue),
    Container(Container),
    PsEnums(PsEnums),
}

/// A deserialized/serializable `.NET` object as described by MS-PSRP's
/// object model (section 2.2.5). This is the in-memory counterpart of a
/// CLIXML `<Obj>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComplexObject {
    /// The `<TN>`/`<TNRef>` type name chain, most specific first.
    pub type_def: Option<PsType>,
    /// The `<ToString>` element, when present.
    pub to_string: Option<String>,
    pub content: ComplexObjectContent,
    pub adapted_properties: BTreeMap<String, PsProperty>,
    pub extended_properties: BTreeMap<String, PsProperty>,
}

impl Default for ComplexObjectContent {
    fn default() -> Self {
        Self::Standard
    }
}

impl Display for ComplexObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(s) = &self.to_string {
            return write!(f, "{s}");
        }

        match &self.content {
            ComplexObjectContent::ExtendedPrimitive(p) => write!(f, "{p}"),
            ComplexObjectContent::Container(c) => write!(f, "{c}"),
            ComplexObjectContent::PsEnums(e) => write!(f, "{e}"),
            ComplexObjectContent::Standard => write!(f, "System.Object"),
        }
    }
}

impl ComplexObject {
    pub fn get_property(&self, name: &str) -> Option<&PsProperty> {
        self.extended_properties
            .get(name)
            .or_else(|| self.adapted_properties.get(name))
    }
}
