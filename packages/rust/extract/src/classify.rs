//! Node classification for the normalizer's tree passes.
//!
//! Every behavior switch in the document walk goes through [`classify`], so
//! the set of recognized storage-format constructs stays a single closed
//! match instead of tag-string comparisons scattered through the passes.

use scraper::node::Element;

/// The storage-format constructs the normalizer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// `<ac:structured-macro ac:name="children">` — child-listing macro.
    ChildrenMacro,
    /// Non-content markup stripped wholesale: macro parameters, schema
    /// versions, macro ids, raw resource URLs, scripts, styles.
    Noise,
    /// `<ri:attachment>` — attachment reference.
    Attachment,
    /// `<ac:link>` — cross-document link.
    CrossDocLink,
    /// `<table>` — delegated to the grid flattener.
    Table,
    /// Any other namespaced wrapper element, unwrapped before text collapse.
    Namespaced,
    /// Plain content markup, left for the text collapse pass.
    Other,
}

/// Classify an element by tag identity (plus the macro-name attribute for
/// the children macro). The noise denylist is fixed, not configurable.
pub(crate) fn classify(element: &Element) -> NodeKind {
    match element.name() {
        "ac:structured-macro" if element.attr("ac:name") == Some("children") => {
            NodeKind::ChildrenMacro
        }
        "ac:parameter" | "ac:schema-version" | "ac:macro-id" | "ri:url" | "script" | "style" => {
            NodeKind::Noise
        }
        "ri:attachment" => NodeKind::Attachment,
        "ac:link" => NodeKind::CrossDocLink,
        "table" => NodeKind::Table,
        name if name.contains(':') => NodeKind::Namespaced,
        _ => NodeKind::Other,
    }
}
