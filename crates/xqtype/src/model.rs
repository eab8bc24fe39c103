use crate::runtime::Error;
use crate::xdm::ExpandedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    /// Namespace URI + local name; the prefix does not take part in name identity.
    pub fn expanded(&self) -> ExpandedName {
        ExpandedName { ns_uri: self.ns_uri.clone(), local: self.local.clone() }
    }
}

/// Host node abstraction consumed by the matching engine.
///
/// Only node identity (kind + name) is needed to decide kind tests. Adapters backed by live
/// data (UI trees, remote documents) may fail to produce a name; they override
/// [`XdmNode::try_name`] and the failure surfaces as a dynamic error of the match.
pub trait XdmNode: Clone + Eq + core::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    fn try_name(&self) -> Result<Option<QName>, Error> {
        Ok(self.name())
    }
}

/// Node models that can create fresh, parentless nodes for constructor expressions.
pub trait NodeFactory: XdmNode {
    fn document(children: Vec<Self>) -> Self;
    fn element(name: QName, attributes: Vec<Self>, children: Vec<Self>) -> Self;
    fn attribute(name: QName, value: String) -> Self;
    fn text(value: String) -> Self;
    fn comment(value: String) -> Self;
    fn processing_instruction(target: String, data: String) -> Self;
}
