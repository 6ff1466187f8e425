//! String renderer for hookwire output trees.
//!
//! Walks a runtime's committed output starting at a root unit and emits
//! markup (or bare text content). `Node::Unit` placeholders are followed
//! into the child instances the runtime holds for them, in the same
//! depth-first order the runtime collected them, so the rendered string
//! always reflects the committed tree.

use hookwire_core::{Node, Runtime, UnitId};

/// Render the committed tree under `root` as markup. Text content is
/// escaped; element tags are emitted as-is.
pub fn render_to_string(rt: &Runtime, root: UnitId) -> String {
    let mut out = String::new();
    write_unit(rt, root, &mut out, &mut write_markup);
    out
}

/// Collect only the text content under `root`, separating adjacent text
/// runs with a single space.
pub fn text_content(rt: &Runtime, root: UnitId) -> String {
    let mut out = String::new();
    write_unit(rt, root, &mut out, &mut write_text);
    out
}

type NodeWriter = dyn FnMut(&Runtime, &Node, &[UnitId], &mut usize, &mut String);

fn write_unit(rt: &Runtime, id: UnitId, out: &mut String, writer: &mut NodeWriter) {
    let node = rt.output(id);
    let children = rt.children(id);
    let mut next = 0usize;
    writer(rt, &node, &children, &mut next, out);
}

fn write_markup(rt: &Runtime, node: &Node, children: &[UnitId], next: &mut usize, out: &mut String) {
    match node {
        Node::Empty => {}
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Element { tag, children: kids } => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            for kid in kids {
                write_markup(rt, kid, children, next, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Node::Unit(..) => descend(rt, children, next, out, &mut write_markup),
    }
}

fn write_text(rt: &Runtime, node: &Node, children: &[UnitId], next: &mut usize, out: &mut String) {
    match node {
        Node::Empty => {}
        Node::Text(text) => {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            out.push_str(text);
        }
        Node::Element { children: kids, .. } => {
            for kid in kids {
                write_text(rt, kid, children, next, out);
            }
        }
        Node::Unit(..) => descend(rt, children, next, out, &mut write_text),
    }
}

fn descend(
    rt: &Runtime,
    children: &[UnitId],
    next: &mut usize,
    out: &mut String,
    writer: &mut NodeWriter,
) {
    let Some(&child) = children.get(*next) else {
        tracing::warn!("output tree references more child units than committed");
        return;
    };
    *next += 1;
    write_unit(rt, child, out, writer);
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
