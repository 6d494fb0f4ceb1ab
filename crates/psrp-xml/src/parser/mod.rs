//! Minimal node-visitor based parsing support built on top of `roxmltree`.
//!
//! This module only covers the read side of the CLIXML pipeline: deserializing
//! already-parsed XML nodes into typed Rust values. Serialization of outgoing
//! CLIXML/SOAP payloads is handled by the crates that own those wire shapes
//! (e.g. `psrp-protocol`, `psrp-winrm`) via `quick-xml`/`serde`.

pub use roxmltree::Document;
pub use roxmltree::Error;
pub use roxmltree::Node;

use crate::XmlError;

/// Parse a complete XML document.
pub fn parse(xml: &str) -> Result<Document<'_>, XmlError> {
    Ok(roxmltree::Document::parse(xml)?)
}

/// A single-pass visitor over one XML node and (optionally) its children.
///
/// Implementors typically accumulate state in `visit_node`/`visit_children`
/// and hand back the finished value from `finish`.
pub trait XmlVisitor<'a> {
    type Value;

    fn visit_node(&mut self, node: Node<'a, 'a>) -> Result<(), XmlError>;

    fn visit_children(
        &mut self,
        children: impl Iterator<Item = Node<'a, 'a>>,
    ) -> Result<(), XmlError>;

    fn finish(self) -> Result<Self::Value, XmlError>;
}

/// Implemented by types that can be produced from a single XML node via an
/// associated [`XmlVisitor`].
pub trait XmlDeserialize<'a>: Sized {
    type Visitor: XmlVisitor<'a, Value = Self>;

    fn visitor() -> Self::Visitor;

    /// Deserialize `Self` from a single node, without descending into children.
    ///
    /// Visitors that need child nodes call `visit_children` themselves from
    /// within `visit_node`.
    fn from_node(node: Node<'a, 'a>) -> Result<Self, XmlError> {
        let mut visitor = Self::visitor();
        visitor.visit_node(node)?;
        visitor.finish()
    }
}
