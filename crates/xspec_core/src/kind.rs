//! Test kinds an XSpec description can target.

use std::fmt;
use std::str::FromStr;

/// What the description under test exercises.
///
/// Decided from the attributes of the root `x:description` element: `schematron` wins over `query`,
/// anything else is treated as an XSLT description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestKind {
    #[default]
    Xslt,
    XQuery,
    Schematron,
}

/// Attribute on `x:description` naming the query module under test.
pub const QUERY_ATTR: &str = "query";

/// Attribute on `x:description` naming the Schematron schema under test.
pub const SCHEMATRON_ATTR: &str = "schematron";

/// All kinds, in a stable order.
pub const ALL: &[TestKind] = &[TestKind::Xslt, TestKind::XQuery, TestKind::Schematron];

impl TestKind {
    /// Classify a description from the local names of its (unqualified) attributes.
    pub fn from_description_attrs<'a>(attrs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = TestKind::Xslt;
        for name in attrs {
            match name {
                SCHEMATRON_ATTR => return TestKind::Schematron,
                QUERY_ATTR => kind = TestKind::XQuery,
                _ => {}
            }
        }
        kind
    }

    /// Canonical lowercase spelling, as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Xslt => "xslt",
            TestKind::XQuery => "xquery",
            TestKind::Schematron => "schematron",
        }
    }
}

/// A test kind spelling that matches none of [`ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTestKind(pub String);

impl fmt::Display for UnknownTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown test kind `{}` (expected one of: ", self.0)?;
        for (i, kind) in ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.as_str())?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for UnknownTestKind {}

impl FromStr for TestKind {
    type Err = UnknownTestKind;

    /// Resolve a canonical spelling (case-insensitive).
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownTestKind(name.to_string()))
    }
}
