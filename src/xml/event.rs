//! Owned XML events exchanged between pipeline stages.
//!
//! Events are fully owned so one event can be handed by reference to several consumers in turn without any of
//! them being able to change what the next one sees.

use xspec_core::{XML_NS, XSPEC_NS};

/// Namespace bound to `xmlns` / `xmlns:*` declarations.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// An element or attribute name: the spelling as written plus its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Prefixed name exactly as it appeared (`x:expect`), used when serializing.
    pub qualified: String,
    /// Resolved namespace URI, `None` when the name is in no namespace.
    pub namespace: Option<String>,
    /// Local part (`expect`).
    pub local: String,
}

impl Name {
    pub fn new(qualified: impl Into<String>, namespace: Option<String>, local: impl Into<String>) -> Self {
        Self {
            qualified: qualified.into(),
            namespace,
            local: local.into(),
        }
    }

    /// A name in no namespace, written without prefix.
    pub fn unqualified(local: impl Into<String>) -> Self {
        let local = local.into();
        Self {
            qualified: local.clone(),
            namespace: None,
            local,
        }
    }

    /// A name in the XSpec namespace written with the conventional `x:` prefix.
    pub fn xspec(local: &str) -> Self {
        Self {
            qualified: format!("x:{local}"),
            namespace: Some(XSPEC_NS.to_string()),
            local: local.to_string(),
        }
    }

    /// The `xml:base` attribute name.
    pub fn xml_base() -> Self {
        Self {
            qualified: "xml:base".to_string(),
            namespace: Some(XML_NS.to_string()),
            local: "base".to_string(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: Name,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    pub fn new(name: Name, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Whether this attribute is a namespace declaration rather than data.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.in_namespace(XMLNS_NS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    pub name: Name,
    /// Attributes in document order, namespace declarations included.
    pub attributes: Vec<Attribute>,
}

impl StartElement {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: Name, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Value of an attribute in no namespace.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespaced attribute.
    pub fn attr_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Local names of the attributes that are in no namespace.
    pub fn plain_attr_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|a| a.name.namespace.is_none())
            .map(|a| a.name.local.as_str())
    }
}

/// One node-level event of a document, in document order.
///
/// Empty elements are reported as a `Start` immediately followed by its `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Start(StartElement),
    End(Name),
    /// Unescaped character data.
    Text(String),
    CData(String),
    Comment(String),
    /// `<?target data?>` inside the root element.
    ProcessingInstruction { target: String, data: String },
}

impl XmlEvent {
    /// The start element, if this is one.
    pub fn as_start(&self) -> Option<&StartElement> {
        match self {
            XmlEvent::Start(el) => Some(el),
            _ => None,
        }
    }
}
