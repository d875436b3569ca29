//! Storage-format document extraction.
//!
//! Converts a wiki storage-format document (nested macros, tables with
//! merged cells, cross-document links, attachment references) into a
//! normalized [`ExtractionResult`]: clean line-oriented plain text, one
//! record list plus a markdown rendering per table, the referenced document
//! titles, the referenced attachment names, and a combined text block for
//! downstream chunking.
//!
//! The engine is pure and synchronous. Each call parses its own tree,
//! mutates it destructively, and discards it — no state survives a call, so
//! concurrent calls need no synchronization. The only external interaction
//! is the optional child-listing lookup, invoked at most once per call.

mod classify;

pub mod children;
pub mod table;

use std::path::Path;
use std::sync::LazyLock;

use ego_tree::{NodeId, Tree};
use regex::Regex;
use scraper::node::{Node, Text};
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use confex_shared::{ChildPage, ExtractionResult, TableRecord};

use classify::{NodeKind, classify};

pub use children::StaticChildMap;
pub use table::{
    LogicalGrid, extract_records, flatten_table, grid_to_records, header_row_index,
    records_to_markdown,
};

/// html5ever parses CDATA sections in HTML content as bogus comments, which
/// would silently drop plain-text link bodies. Unwrap them before parsing.
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

/// Normalize one storage-format document without child-listing expansion.
///
/// Any children macro in the document is detected but silently dropped,
/// contributing no block to `combined_text`.
pub fn normalize(document_id: &str, raw_markup: &str) -> ExtractionResult {
    normalize_inner(document_id, raw_markup, None)
}

/// Normalize one storage-format document, expanding a children macro through
/// the supplied lookup.
///
/// `list_children` receives `document_id` and returns the child documents in
/// listing order; it is called at most once, and only when the document
/// actually contains a children macro.
pub fn normalize_with_children(
    document_id: &str,
    raw_markup: &str,
    list_children: impl Fn(&str) -> Vec<ChildPage>,
) -> ExtractionResult {
    normalize_inner(document_id, raw_markup, Some(&list_children))
}

#[instrument(skip(raw_markup, list_children), fields(markup_len = raw_markup.len()))]
fn normalize_inner(
    document_id: &str,
    raw_markup: &str,
    list_children: Option<&dyn Fn(&str) -> Vec<ChildPage>>,
) -> ExtractionResult {
    if raw_markup.trim().is_empty() {
        return ExtractionResult::default();
    }

    let raw = CDATA_RE.replace_all(raw_markup, "$1");

    // A fresh private tree per call; every pass below mutates it.
    let mut doc = Html::parse_fragment(&raw);

    // The macro's presence must survive noise stripping, so detect it before
    // anything is removed.
    let has_children_macro = !collect_kind(&doc, NodeKind::ChildrenMacro).is_empty();

    // Noise removal: fixed denylist, stripped wholesale.
    for id in collect_kind(&doc, NodeKind::Noise) {
        detach(&mut doc.tree, id);
    }

    // Attachment filenames, extension stripped. The nodes stay in place;
    // their link wrappers (if any) are handled by the link pass.
    let mut attachments: Vec<String> = Vec::new();
    for id in collect_kind(&doc, NodeKind::Attachment) {
        let Some(el) = element(&doc, id) else { continue };
        let filename = el
            .value()
            .attr("ri:filename")
            .or_else(|| el.value().attr("filename"));
        if let Some(filename) = filename {
            attachments.push(file_stem(filename));
        }
    }

    // Cross-document links become inline citation markers; the referenced
    // titles are collected in encounter order, duplicates kept.
    let mut links: Vec<String> = Vec::new();
    for id in collect_kind(&doc, NodeKind::CrossDocLink) {
        let Some(link) = element(&doc, id) else { continue };

        let body: String = link.text().map(str::trim).collect();
        let target: String = link
            .descendants()
            .filter_map(|n| n.value().as_element())
            .find(|el| el.name() == "ri:page")
            .and_then(|el| el.attr("ri:content-title"))
            .unwrap_or("")
            .to_string();

        let replacement = if target.is_empty() {
            // No resolvable target: drop the wrapper, keep the label.
            body
        } else {
            links.push(target.clone());
            format!("[{body}](관련문서: {target})")
        };
        replace_with_text(&mut doc.tree, id, &replacement);
    }

    // Tables: flatten through the grid pipeline, then remove the element
    // unconditionally so raw cell markup never leaks into the text pass.
    let mut tables: Vec<Vec<TableRecord>> = Vec::new();
    let mut markdown_blocks: Vec<String> = Vec::new();
    for id in collect_kind(&doc, NodeKind::Table) {
        // A table nested in an already-removed table is not revisited.
        if is_attached(&doc.tree, id) {
            if let Some(el) = element(&doc, id) {
                let records = table::extract_records(&el);
                if !records.is_empty() {
                    markdown_blocks.push(table::records_to_markdown(&records));
                    tables.push(records);
                }
            }
        }
        detach(&mut doc.tree, id);
    }

    // Unwrap leftover namespaced wrapper elements (macro bodies, layout
    // containers, the children macro shell) so they don't read as tag noise.
    let leftover: Vec<NodeId> = doc
        .tree
        .root()
        .descendants()
        .filter(|n| {
            n.value()
                .as_element()
                .is_some_and(|el| el.name().contains(':'))
        })
        .map(|n| n.id())
        .collect();
    for id in leftover {
        unwrap_element(&mut doc.tree, id);
    }

    // Child-listing expansion: at most one lookup call, only when the macro
    // was present and a lookup was supplied.
    let mut child_block = String::new();
    if has_children_macro {
        if let Some(lookup) = list_children {
            let children = lookup(document_id);
            if !children.is_empty() {
                child_block = children
                    .iter()
                    .map(|c| format!("- [{}](child_id:{})", c.title, c.id))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
    }

    // Text collapse: remaining text nodes with block boundaries as newlines,
    // each line trimmed, blank lines dropped.
    let mut chunks: Vec<&str> = Vec::new();
    for node in doc.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            chunks.push(&text.text);
        }
    }
    let joined = chunks.join("\n");
    let plain_text: String = joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let tables_markdown = markdown_blocks.join("\n\n");

    let mut blocks: Vec<String> = Vec::new();
    if !plain_text.is_empty() {
        blocks.push(plain_text.clone());
    }
    if !tables_markdown.is_empty() {
        blocks.push(format!("[표]\n{tables_markdown}"));
    }
    if !child_block.is_empty() {
        blocks.push(format!("[하위 페이지 목록]\n{child_block}"));
    }
    let combined_text = blocks.join("\n\n");

    debug!(
        tables = tables.len(),
        links = links.len(),
        attachments = attachments.len(),
        has_children_macro,
        "document normalized"
    );

    ExtractionResult {
        plain_text,
        tables,
        links,
        attachments,
        tables_markdown,
        combined_text,
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

/// Ids of all elements of one kind, in document order.
fn collect_kind(doc: &Html, want: NodeKind) -> Vec<NodeId> {
    doc.tree
        .root()
        .descendants()
        .filter(|n| n.value().as_element().is_some_and(|el| classify(el) == want))
        .map(|n| n.id())
        .collect()
}

fn element(doc: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    doc.tree.get(id).and_then(ElementRef::wrap)
}

fn detach(tree: &mut Tree<Node>, id: NodeId) {
    if let Some(mut node) = tree.get_mut(id) {
        node.detach();
    }
}

/// Whether a node is still reachable from the tree root. Detaching a node
/// leaves its id valid, so passes that collected ids up front check this
/// before revisiting.
fn is_attached(tree: &Tree<Node>, id: NodeId) -> bool {
    let root = tree.root().id();
    let mut current = tree.get(id);
    while let Some(node) = current {
        if node.id() == root {
            return true;
        }
        current = node.parent();
    }
    false
}

/// Replace a node (and its subtree) with a single text node.
fn replace_with_text(tree: &mut Tree<Node>, id: NodeId, text: &str) {
    if let Some(mut node) = tree.get_mut(id) {
        node.insert_before(Node::Text(Text { text: text.into() }));
        node.detach();
    }
}

/// Remove an element but keep its children in place.
fn unwrap_element(tree: &mut Tree<Node>, id: NodeId) {
    let Some(node) = tree.get(id) else { return };
    if node.parent().is_none() {
        return;
    }
    let child_ids: Vec<NodeId> = node.children().map(|c| c.id()).collect();
    if let Some(mut node) = tree.get_mut(id) {
        for child_id in child_ids {
            node.insert_id_before(child_id);
        }
        node.detach();
    }
}

/// Filename with its extension stripped (`diagram.png` → `diagram`).
fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
