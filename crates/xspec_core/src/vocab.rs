//! XSpec element and attribute vocabulary registry.
//!
//! This module centralizes recognized XSpec element spellings so downstream code
//! doesn't need stringly-typed comparisons.

use crate::TestKind;

/// Stable identifier for the XSpec elements the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    Description,
    Scenario,
    Pending,
    Expect,
    ExpectAssert,
    ExpectNotAssert,
    ExpectReport,
    ExpectNotReport,
    ExpectValid,
    ExpectRule,
    Report,
    Test,
}

/// Role an element plays in a description or a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Groups other elements; never counted.
    Container,
    /// One individually checkable assertion in a description.
    Assertion,
    /// Marks everything below it as pending.
    PendingMarker,
    /// One assertion outcome in an execution report.
    Result,
}

/// Metadata entry for an XSpec element.
#[derive(Debug, Clone, Copy)]
pub struct ElementInfo {
    pub id: ElementId,
    pub local_name: &'static str,
    pub role: Role,
    /// Test kinds the element is meaningful for; empty means all kinds.
    pub kinds: &'static [TestKind],
    pub description: &'static str,
}

/// Attribute marking a scenario or assertion as pending (value is the reason).
pub const PENDING_ATTR: &str = "pending";

/// Attribute on report `x:test` elements carrying the boolean outcome.
pub const SUCCESSFUL_ATTR: &str = "successful";

/// Attribute on `x:pending` giving the reason.
pub const LABEL_ATTR: &str = "label";

const SCHEMATRON: &[TestKind] = &[TestKind::Schematron];

/// Registry of recognized elements.
pub const ELEMENTS: &[ElementInfo] = &[
    info(ElementId::Description, "description", Role::Container, &[], "Root of a test description."),
    info(ElementId::Scenario, "scenario", Role::Container, &[], "Group of assertions sharing a context."),
    info(ElementId::Pending, "pending", Role::PendingMarker, &[], "Everything inside is pending."),
    info(ElementId::Expect, "expect", Role::Assertion, &[], "Expected result of a scenario."),
    info(ElementId::ExpectAssert, "expect-assert", Role::Assertion, SCHEMATRON, "A failed assert is expected."),
    info(ElementId::ExpectNotAssert, "expect-not-assert", Role::Assertion, SCHEMATRON, "No failed assert is expected."),
    info(ElementId::ExpectReport, "expect-report", Role::Assertion, SCHEMATRON, "A successful report is expected."),
    info(ElementId::ExpectNotReport, "expect-not-report", Role::Assertion, SCHEMATRON, "No successful report is expected."),
    info(ElementId::ExpectValid, "expect-valid", Role::Assertion, SCHEMATRON, "The document is expected to be valid."),
    info(ElementId::ExpectRule, "expect-rule", Role::Assertion, SCHEMATRON, "A rule is expected to fire."),
    info(ElementId::Report, "report", Role::Container, &[], "Root of an execution report."),
    info(ElementId::Test, "test", Role::Result, &[], "Outcome of one assertion in a report."),
];

const fn info(
    id: ElementId,
    local_name: &'static str,
    role: Role,
    kinds: &'static [TestKind],
    description: &'static str,
) -> ElementInfo {
    ElementInfo {
        id,
        local_name,
        role,
        kinds,
        description,
    }
}

/// Resolve a local name (already known to be in the XSpec namespace) to its stable id.
pub fn from_local_name(name: &str) -> Option<ElementId> {
    ELEMENTS.iter().find(|e| e.local_name == name).map(|e| e.id)
}

/// Return the metadata for an id.
pub fn info_for(id: ElementId) -> &'static ElementInfo {
    // Every ElementId has exactly one row; the guardrail test keeps it that way.
    ELEMENTS.iter().find(|e| e.id == id).unwrap_or(&ELEMENTS[0])
}

/// Return the canonical local name of an element.
pub fn as_str(id: ElementId) -> &'static str {
    info_for(id).local_name
}

/// Whether the element declares an assertion for descriptions of the given kind.
pub fn is_assertion(id: ElementId, kind: TestKind) -> bool {
    let info = info_for(id);
    info.role == Role::Assertion && (info.kinds.is_empty() || info.kinds.contains(&kind))
}

/// Whether a `pending` attribute on this element puts its subtree into pending context.
pub fn accepts_pending_attr(id: ElementId) -> bool {
    id == ElementId::Scenario || info_for(id).role == Role::Assertion
}
