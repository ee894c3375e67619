//! Provide the canonical XSpec vocabulary shared by the filter, the results collector and the CLI.
//!
//! This crate is intentionally small and dependency-light: **no IO**, no global state, no XML parser types.
//! Everything here is a `const` table or a pure lookup so that the pipeline never compares element names
//! with ad-hoc string literals.
//!
//! ## Notes
//!
//! - Element names are local names; callers are responsible for checking the namespace against
//!   [`XSPEC_NS`] first.
//! - Current scope: description/scenario/report containers, assertion elements (XSLT, XQuery and
//!   Schematron flavours), report result attributes and the compiled entry point.

pub mod kind;
pub mod vocab;

pub use kind::TestKind;

/// The XSpec namespace URI.
pub const XSPEC_NS: &str = "http://www.jenitennison.com/xslt/xspec";

/// The XSLT namespace URI.
pub const XSLT_NS: &str = "http://www.w3.org/1999/XSL/Transform";

/// The `xml:` namespace URI (always bound, never declared).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Local name of the named template every compiled XSpec exposes as its entry point.
pub const MAIN_TEMPLATE: &str = "main";

/// Default file-name suffix of XSpec documents.
pub const SPEC_SUFFIX: &str = ".xspec";

/// Return the Clark name (`{uri}local`) of the compiled entry point.
pub fn main_template_clark_name() -> String {
    format!("{{{XSPEC_NS}}}{MAIN_TEMPLATE}")
}
