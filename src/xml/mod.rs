//! XML event plumbing shared by every pipeline stage.
//!
//! ## Modules
//!
//! - `event` - owned event model (names resolved to namespaces)
//! - `reader` - streaming reader producing events
//! - `writer` - serializer consuming events
//! - `sink` - `Destination` / `Source` traits and small helper sinks

pub mod event;
pub mod reader;
pub mod sink;
pub mod writer;

pub use event::{Attribute, Name, StartElement, XmlEvent};
pub use reader::{XmlError, XmlReader};
pub use sink::{Destination, NullDestination, Recorder, SinkError, Source, StreamError};
pub use writer::XmlWriter;
