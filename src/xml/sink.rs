//! Push-style event interfaces.
//!
//! - [`Destination`]: something that accepts events (a file serializer, a results collector, a running
//!   transform's input, a fan-out of several of those).
//! - [`Source`]: something that produces a document by pushing its events into a destination (a parser,
//!   the specification filter).

use std::io;

use thiserror::Error;

use super::event::XmlEvent;
use super::reader::XmlError;

/// Errors raised by a destination while accepting or closing.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("destination already closed")]
    Closed,

    #[error("{0}")]
    Failed(String),
}

/// Errors raised while pumping a source into a destination.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed XML: {0}")]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Accepts a stream of events.
///
/// `close` marks the end of the stream. Implementations must not rely on it being called after a failed
/// `accept`, and must treat events after `close` as an error.
pub trait Destination {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError>;

    fn close(&mut self) -> Result<(), SinkError>;
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        (**self).accept(event)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        (**self).accept(event)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// Produces a document by pushing events.
///
/// `pump` does not close the destination; whoever owns the destination decides when the stream ends.
pub trait Source {
    fn pump(&mut self, dest: &mut dyn Destination) -> Result<(), StreamError>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullDestination;

impl Destination for NullDestination {
    fn accept(&mut self, _event: &XmlEvent) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<XmlEvent>,
    pub closed: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local names of all start elements, in order.
    pub fn element_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(XmlEvent::as_start)
            .map(|el| el.name.local.as_str())
            .collect()
    }
}

impl Destination for Recorder {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}
