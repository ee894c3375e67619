//! Event serializer.
//!
//! Writes events back out as text without re-indenting, so what a transform emitted is what lands on disk.
//! Empty elements are collapsed to `<a/>`. Whitespace that a parser would normalize (line breaks and tabs in
//! attribute values, carriage returns in text) is written as character references so it reads back unchanged.
//! Closing the writer closes any element still open, which keeps the output of an aborted execution well-formed.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::escape::{escape, partial_escape};

use super::event::{StartElement, XmlEvent};
use super::sink::{Destination, SinkError};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

pub struct XmlWriter<W: Write> {
    out: W,
    /// Qualified names of the elements currently open.
    open: Vec<String>,
    /// A start tag has been written without its closing `>` yet.
    start_pending: bool,
    declared: bool,
    closed: bool,
}

impl XmlWriter<BufWriter<File>> {
    /// Create (or truncate) a file and serialize into it.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            open: Vec::new(),
            start_pending: false,
            declared: false,
            closed: false,
        }
    }

    pub fn write_event(&mut self, event: &XmlEvent) -> io::Result<()> {
        self.declare()?;

        if let XmlEvent::End(_) = event {
            return self.end_element();
        }
        self.finish_start_tag()?;

        match event {
            XmlEvent::Start(element) => self.start_element(element),
            XmlEvent::Text(text) => self.out.write_all(escape_text(text).as_bytes()),
            XmlEvent::CData(data) => write!(self.out, "<![CDATA[{data}]]>"),
            XmlEvent::Comment(comment) => write!(self.out, "<!--{comment}-->"),
            XmlEvent::ProcessingInstruction { target, data } if data.is_empty() => write!(self.out, "<?{target}?>"),
            XmlEvent::ProcessingInstruction { target, data } => write!(self.out, "<?{target} {data}?>"),
            XmlEvent::End(_) => Ok(()),
        }
    }

    /// Close any open elements and flush. Further writes fail.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.declare()?;
        while !self.open.is_empty() {
            self.end_element()?;
        }
        self.out.flush()?;
        self.closed = true;
        Ok(())
    }

    /// Consume the writer and return the underlying output.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;
        Ok(self.out)
    }

    fn declare(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::other("XML writer already closed"));
        }
        if !self.declared {
            self.out.write_all(DECLARATION.as_bytes())?;
            self.declared = true;
        }
        Ok(())
    }

    fn start_element(&mut self, element: &StartElement) -> io::Result<()> {
        write!(self.out, "<{}", element.name.qualified)?;
        for attr in &element.attributes {
            write!(self.out, " {}=\"{}\"", attr.name.qualified, escape_attribute(&attr.value))?;
        }
        self.open.push(element.name.qualified.clone());
        self.start_pending = true;
        Ok(())
    }

    fn end_element(&mut self) -> io::Result<()> {
        let Some(name) = self.open.pop() else {
            return Err(io::Error::other("end tag without a matching start tag"));
        };
        if self.start_pending {
            self.start_pending = false;
            self.out.write_all(b"/>")
        } else {
            write!(self.out, "</{name}>")
        }
    }

    fn finish_start_tag(&mut self) -> io::Result<()> {
        if self.start_pending {
            self.start_pending = false;
            self.out.write_all(b">")?;
        }
        Ok(())
    }
}

fn escape_text(text: &str) -> Cow<'_, str> {
    let escaped = partial_escape(text);
    if escaped.contains('\r') {
        Cow::Owned(escaped.replace('\r', "&#13;"))
    } else {
        escaped
    }
}

fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped;
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

impl<W: Write> Destination for XmlWriter<W> {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        Ok(self.write_event(event)?)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(self.finish()?)
    }
}
