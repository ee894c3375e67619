//! Streaming pre-pass over a specification document.
//!
//! The filter sits between the parser and the compiler program. In one pass it:
//!
//! - counts every assertion element the description declares;
//! - tracks pending context (`x:pending`, or a `pending` attribute on a scenario or assertion) and, when the
//!   policy for the description's test kind says so, drops the whole pending subtree from the stream;
//! - stamps `xml:base` on the root element so relative references survive being streamed.
//!
//! The count only exists once the document has been consumed without error.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use xspec_core::vocab::{self, ElementId, PENDING_ATTR};
use xspec_core::{TestKind, XML_NS, XSPEC_NS};

use crate::xml::{Destination, Name, SinkError, Source, StartElement, StreamError, XmlEvent, XmlReader};

/// What to do with pending assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingPolicy {
    /// Pass them through to the compiler; the compiled test reports them as pending.
    #[default]
    Keep,
    /// Remove them from the compiled form. They are still counted.
    Elide,
}

/// Pending policy per test kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingPolicies {
    xslt: PendingPolicy,
    xquery: PendingPolicy,
    schematron: PendingPolicy,
}

impl PendingPolicies {
    /// Elide pending assertions for the listed kinds, keep them for the rest.
    pub fn eliding(kinds: &[TestKind]) -> Self {
        kinds
            .iter()
            .fold(Self::default(), |policies, kind| policies.with(*kind, PendingPolicy::Elide))
    }

    pub fn with(mut self, kind: TestKind, policy: PendingPolicy) -> Self {
        match kind {
            TestKind::Xslt => self.xslt = policy,
            TestKind::XQuery => self.xquery = policy,
            TestKind::Schematron => self.schematron = policy,
        }
        self
    }

    pub fn for_kind(&self, kind: TestKind) -> PendingPolicy {
        match kind {
            TestKind::Xslt => self.xslt,
            TestKind::XQuery => self.xquery,
            TestKind::Schematron => self.schematron,
        }
    }
}

/// Final assertion count of one specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssertionCount {
    /// Every assertion in the description, pending ones included.
    pub declared: usize,
    /// Assertions in pending context.
    pub pending: usize,
    /// Pending assertions removed from the stream. These will never produce a result.
    pub elided: usize,
}

impl AssertionCount {
    /// Assertions expected to produce a result element.
    pub fn expected_results(&self) -> usize {
        self.declared - self.elided
    }
}

pub struct SpecFilter<R: BufRead> {
    reader: XmlReader<R>,
    policies: PendingPolicies,
    base_uri: Option<String>,
    kind: Option<TestKind>,
    count: Option<AssertionCount>,
    consumed: bool,
}

impl SpecFilter<BufReader<File>> {
    /// Open a specification file; its file URI becomes the root's `xml:base`.
    pub fn open(path: &Path, policies: PendingPolicies) -> io::Result<Self> {
        let base_uri = file_uri(path)?;
        Ok(Self::new(XmlReader::from_file(path)?, policies).with_base_uri(base_uri))
    }
}

impl<R: BufRead> SpecFilter<R> {
    pub fn new(reader: XmlReader<R>, policies: PendingPolicies) -> Self {
        Self {
            reader,
            policies,
            base_uri: None,
            kind: None,
            count: None,
            consumed: false,
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// The final count, once the whole document has been filtered successfully.
    pub fn count(&self) -> Option<AssertionCount> {
        self.count
    }

    /// Test kind of the description, once its root element has been seen.
    pub fn kind(&self) -> Option<TestKind> {
        self.kind
    }

    fn root_element(&mut self, element: StartElement) -> StartElement {
        let kind = if element.name.is(XSPEC_NS, vocab::as_str(ElementId::Description)) {
            TestKind::from_description_attrs(element.plain_attr_names())
        } else {
            tracing::warn!("Root element <{}> is not an x:description", element.name.qualified);
            TestKind::default()
        };
        self.kind = Some(kind);

        match &self.base_uri {
            Some(base) if element.attr_ns(XML_NS, "base").is_none() => {
                element.with_attribute(Name::xml_base(), base.clone())
            }
            _ => element,
        }
    }
}

/// The XSpec element id of a start element, if it is one.
fn xspec_element(element: &StartElement) -> Option<ElementId> {
    if element.name.in_namespace(XSPEC_NS) {
        vocab::from_local_name(&element.name.local)
    } else {
        None
    }
}

fn opens_pending_context(id: ElementId, element: &StartElement) -> bool {
    id == ElementId::Pending || (vocab::accepts_pending_attr(id) && element.attr(PENDING_ATTR).is_some())
}

impl<R: BufRead> Source for SpecFilter<R> {
    fn pump(&mut self, dest: &mut dyn Destination) -> Result<(), StreamError> {
        if self.consumed {
            return Err(SinkError::Failed("specification already filtered".into()).into());
        }
        self.consumed = true;

        let mut count = AssertionCount::default();
        let mut policy = PendingPolicy::Keep;
        let mut depth = 0usize;
        // Depth of the element that opened the current pending context.
        let mut pending_from: Option<usize> = None;
        let mut eliding = false;

        while let Some(event) = self.reader.next_event()? {
            match event {
                XmlEvent::Start(element) => {
                    depth += 1;
                    let element = if depth == 1 {
                        let root = self.root_element(element);
                        policy = self.policies.for_kind(self.kind.unwrap_or_default());
                        root
                    } else {
                        element
                    };

                    if let Some(id) = xspec_element(&element) {
                        if pending_from.is_none() && opens_pending_context(id, &element) {
                            pending_from = Some(depth);
                            eliding = policy == PendingPolicy::Elide;
                        }
                        if vocab::is_assertion(id, self.kind.unwrap_or_default()) {
                            count.declared += 1;
                            if pending_from.is_some() {
                                count.pending += 1;
                                if eliding {
                                    count.elided += 1;
                                }
                            }
                        }
                    }

                    if !eliding {
                        dest.accept(&XmlEvent::Start(element))?;
                    }
                }
                XmlEvent::End(name) => {
                    if !eliding {
                        dest.accept(&XmlEvent::End(name))?;
                    }
                    if pending_from == Some(depth) {
                        pending_from = None;
                        eliding = false;
                    }
                    depth -= 1;
                }
                other => {
                    if !eliding {
                        dest.accept(&other)?;
                    }
                }
            }
        }

        tracing::debug!(
            "Filtered specification: {} declared, {} pending, {} elided",
            count.declared,
            count.pending,
            count.elided
        );
        self.count = Some(count);
        Ok(())
    }
}

/// `file:` URI of a path, made absolute against the working directory.
pub fn file_uri(path: &Path) -> io::Result<String> {
    let absolute = std::path::absolute(path)?;
    let text = absolute.to_string_lossy().replace('\\', "/");
    let mut uri = String::from("file://");
    if !text.starts_with('/') {
        uri.push('/');
    }
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                uri.push(byte as char)
            }
            _ => uri.push_str(&format!("%{byte:02X}")),
        }
    }
    Ok(uri)
}
