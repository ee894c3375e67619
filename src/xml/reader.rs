//! Streaming, namespace-aware XML reader.
//!
//! Wraps `quick_xml::NsReader` and turns its borrowed events into owned [`XmlEvent`]s one at a time, so a
//! document is never buffered as a whole. Names, text and attribute values are decoded from the encoding the
//! document declares (UTF-8 when it declares none); bytes that are not valid in that encoding are an error,
//! never replaced. Well-formedness problems (mismatched or missing end tags, unbound prefixes, bad escapes, no
//! root element) surface as [`XmlError`].

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use quick_xml::NsReader;
use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use thiserror::Error;
use xspec_core::XML_NS;

use super::event::{Attribute, Name, StartElement, XMLNS_NS, XmlEvent};
use super::sink::{Destination, Source, StreamError};

/// A well-formedness or encoding problem, with the byte offset where it was detected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct XmlError {
    pub message: String,
    pub position: u64,
}

impl XmlError {
    pub fn new(message: impl Into<String>, position: u64) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

pub struct XmlReader<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    /// End event owed for an empty element that was reported as a start.
    pending_end: Option<Name>,
    depth: usize,
    seen_root: bool,
    done: bool,
}

impl XmlReader<BufReader<File>> {
    /// Open a file for streaming.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> XmlReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: NsReader::from_reader(inner),
            buf: Vec::new(),
            pending_end: None,
            depth: 0,
            seen_root: false,
            done: false,
        }
    }

    /// Read the next event, or `None` at the end of a well-formed document.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>, XmlError> {
        if let Some(name) = self.pending_end.take() {
            self.depth -= 1;
            return Ok(Some(XmlEvent::End(name)));
        }
        if self.done {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            // Copied before the read: the event borrows the buffer, the resolved namespace the reader.
            let decoder = self.reader.decoder();
            let read = self
                .reader
                .read_resolved_event_into(&mut self.buf)
                .map(|(resolved, event)| (raw_namespace(&resolved), event));
            let position = self.reader.buffer_position() as u64;
            let (namespace, event) = read.map_err(|e| XmlError::new(e.to_string(), position))?;

            match event {
                Event::Start(start) => {
                    let element = Self::start_element(&self.reader, namespace, &start, position)?;
                    self.enter(position)?;
                    return Ok(Some(XmlEvent::Start(element)));
                }
                Event::Empty(start) => {
                    let element = Self::start_element(&self.reader, namespace, &start, position)?;
                    self.enter(position)?;
                    self.pending_end = Some(element.name.clone());
                    return Ok(Some(XmlEvent::Start(element)));
                }
                Event::End(end) => {
                    let namespace = resolve(decoder, namespace, position)?;
                    let qualified = decode(decoder, end.name().as_ref(), position)?;
                    let local = decode(decoder, end.local_name().as_ref(), position)?;
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(Some(XmlEvent::End(Name::new(qualified, namespace, local))));
                }
                Event::Text(text) => {
                    if self.depth == 0 {
                        continue;
                    }
                    let raw = decode(decoder, &text, position)?;
                    let value = unescape(&raw).map_err(|e| XmlError::new(e.to_string(), position))?;
                    return Ok(Some(XmlEvent::Text(value.into_owned())));
                }
                Event::CData(data) => {
                    if self.depth == 0 {
                        continue;
                    }
                    return Ok(Some(XmlEvent::CData(decode(decoder, &data, position)?)));
                }
                Event::Comment(comment) => {
                    if self.depth == 0 {
                        continue;
                    }
                    return Ok(Some(XmlEvent::Comment(decode(decoder, &comment, position)?)));
                }
                Event::PI(pi) => {
                    if self.depth == 0 {
                        continue;
                    }
                    let target = decode(decoder, pi.target(), position)?;
                    let data = decode(decoder, pi.content(), position)?;
                    return Ok(Some(XmlEvent::ProcessingInstruction {
                        target,
                        data: data.trim_start().to_string(),
                    }));
                }
                Event::Eof => {
                    if self.depth > 0 {
                        return Err(XmlError::new(
                            format!("unexpected end of document, {} element(s) left open", self.depth),
                            position,
                        ));
                    }
                    if !self.seen_root {
                        return Err(XmlError::new("document has no root element", position));
                    }
                    self.done = true;
                    return Ok(None);
                }
                // Declarations, doctypes and prolog instructions are not part of the event model.
                _ => continue,
            }
        }
    }

    fn enter(&mut self, position: u64) -> Result<(), XmlError> {
        if self.depth == 0 {
            if self.seen_root {
                return Err(XmlError::new("content after the root element", position));
            }
            self.seen_root = true;
        }
        self.depth += 1;
        Ok(())
    }

    fn start_element(
        reader: &NsReader<R>,
        namespace: RawNamespace,
        start: &BytesStart<'_>,
        position: u64,
    ) -> Result<StartElement, XmlError> {
        let decoder = reader.decoder();
        let namespace = resolve(decoder, namespace, position)?;
        let qualified = decode(decoder, start.name().as_ref(), position)?;
        let local = decode(decoder, start.local_name().as_ref(), position)?;
        let mut element = StartElement::new(Name::new(qualified, namespace, local));

        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::new(e.to_string(), position))?;
            let qualified = decode(decoder, attr.key.as_ref(), position)?;
            let raw = decode(decoder, &attr.value, position)?;
            let value = unescape(&raw)
                .map_err(|e| XmlError::new(e.to_string(), position))?
                .into_owned();

            let name = if qualified == "xmlns" {
                Name::new(qualified, Some(XMLNS_NS.to_string()), "xmlns")
            } else if let Some(prefix) = qualified.strip_prefix("xmlns:") {
                let prefix = prefix.to_string();
                Name::new(qualified, Some(XMLNS_NS.to_string()), prefix)
            } else if let Some(local) = qualified.strip_prefix("xml:") {
                let local = local.to_string();
                Name::new(qualified, Some(XML_NS.to_string()), local)
            } else {
                let (resolved, local) = reader.resolve_attribute(attr.key);
                let namespace = resolve(decoder, raw_namespace(&resolved), position)?;
                let local = decode(decoder, local.as_ref(), position)?;
                Name::new(qualified, namespace, local)
            };
            element.attributes.push(Attribute::new(name, value));
        }

        Ok(element)
    }
}

impl<R: BufRead> Source for XmlReader<R> {
    fn pump(&mut self, dest: &mut dyn Destination) -> Result<(), StreamError> {
        while let Some(event) = self.next_event()? {
            dest.accept(&event)?;
        }
        Ok(())
    }
}

/// A resolved namespace copied out of the reader, still undecoded: `Ok(None)` for no namespace, `Err(prefix)`
/// for an unbound prefix.
type RawNamespace = Result<Option<Vec<u8>>, Vec<u8>>;

fn raw_namespace(resolved: &ResolveResult<'_>) -> RawNamespace {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(ns.to_vec())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(prefix.clone()),
    }
}

fn resolve(decoder: Decoder, namespace: RawNamespace, position: u64) -> Result<Option<String>, XmlError> {
    match namespace {
        Ok(None) => Ok(None),
        Ok(Some(uri)) => decode(decoder, &uri, position).map(Some),
        Err(prefix) => {
            let prefix = decode(decoder, &prefix, position)?;
            Err(XmlError::new(format!("namespace prefix '{prefix}' is not bound"), position))
        }
    }
}

/// Decode bytes from the document encoding.
fn decode(decoder: Decoder, bytes: &[u8], position: u64) -> Result<String, XmlError> {
    decoder
        .decode(bytes)
        .map(|text| text.into_owned())
        .map_err(|e| XmlError::new(format!("invalid {} text: {e}", decoder.encoding().name()), position))
}
