//! Indented text outline of a view subtree.
//!
//! One line per node:
//!
//! ```text
//! div.stwid--book [data-book=Bestiary]
//!   span "Bestiary"
//!   input.stwid--active = true
//! ```
//!
//! The outline doubles as the headless binary's output and as a readable
//! snapshot in test failure messages.

use crate::render::{attr, class};
use crate::view::{NodeId, View, ViewTree};
use std::fmt::Write as _;

const ATTRS: [&str; 4] = [attr::BOOK, attr::UID, attr::ACTION, attr::FIELD];

/// Classes whose nodes are not displayed.
const HIDDEN: [&str; 3] = [class::FILTER_QUERY, class::FILTER_ACTIVE, class::FILTERED];

/// Rendering options for [`outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutlineOptions {
    /// Wrap classes and text in ANSI colour sequences.
    pub color: bool,
    /// Skip nodes that search or filters hide, with their subtrees.
    pub visible_only: bool,
}

/// Outline of `node` and its descendants.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::ui::{outline, OutlineOptions};
/// use lorebook_drawer::view::{View, ViewPatch, ViewTree};
///
/// let mut tree = ViewTree::new();
/// let label = tree.create("span");
/// tree.append(tree.root(), label)?;
/// tree.update(label, ViewPatch::SetText("Lore".into()))?;
///
/// let text = outline(&tree, tree.root(), OutlineOptions::default());
/// assert_eq!(text, "root\n  span \"Lore\"\n");
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
#[must_use]
pub fn outline(tree: &ViewTree, node: NodeId, options: OutlineOptions) -> String {
    let mut out = String::new();
    write_node(tree, node, 0, options, &mut out);
    out
}

fn write_node(tree: &ViewTree, node: NodeId, depth: usize, options: OutlineOptions, out: &mut String) {
    let Some(tag) = tree.tag(node) else {
        return;
    };
    if options.visible_only && HIDDEN.iter().any(|c| tree.has_class(node, c)) {
        return;
    }

    let _ = write!(out, "{:indent$}{tag}", "", indent = depth * 2);
    let classes = tree.classes(node);
    if !classes.is_empty() {
        let joined: String = classes.iter().map(|c| format!(".{c}")).collect();
        push_styled(out, &joined, palette::CLASS, options.color);
    }

    let attrs: Vec<String> = ATTRS
        .iter()
        .filter_map(|name| tree.attr(node, name).map(|v| format!("{name}={v}")))
        .collect();
    if !attrs.is_empty() {
        out.push(' ');
        push_styled(out, &format!("[{}]", attrs.join(" ")), palette::ATTR, options.color);
    }

    let spans = tree.spans(node);
    let text = if spans.is_empty() {
        tree.text(node).unwrap_or_default().to_string()
    } else {
        spans.iter().map(|s| s.text.as_str()).collect()
    };
    if !text.is_empty() {
        out.push(' ');
        push_styled(out, &format!("{text:?}"), palette::TEXT, options.color);
    }
    if let Some(value) = tree.value(node) {
        out.push_str(" = ");
        push_styled(out, &value, palette::VALUE, options.color);
    }
    out.push('\n');

    if options.visible_only && tree.has_class(node, class::COLLAPSED) {
        return;
    }
    for child in tree.children(node).unwrap_or_default() {
        write_node(tree, child, depth + 1, options, out);
    }
}

fn push_styled(out: &mut String, text: &str, hex: &str, color: bool) {
    if color {
        out.push_str(&palette::fg(hex));
        out.push_str(text);
        out.push_str(palette::RESET);
    } else {
        out.push_str(text);
    }
}

/// Catppuccin Mocha accents.
mod palette {
    pub const CLASS: &str = "#89b4fa";
    pub const ATTR: &str = "#6c7086";
    pub const TEXT: &str = "#cdd6f4";
    pub const VALUE: &str = "#f9e2af";
    pub const RESET: &str = "\u{001b}[0m";

    /// 24-bit foreground sequence; malformed colours render white.
    pub fn fg(hex: &str) -> String {
        let hex = hex.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .unwrap_or(255)
        };
        let (r, g, b) = if hex.len() == 6 {
            (channel(0..2), channel(2..4), channel(4..6))
        } else {
            (255, 255, 255)
        };
        format!("\u{001b}[38;2;{r};{g};{b}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewPatch;

    fn sample() -> (ViewTree, NodeId, NodeId) {
        let mut tree = ViewTree::new();
        let book = tree.create("div");
        tree.append(tree.root(), book).unwrap();
        tree.update(book, ViewPatch::add_class(class::BOOK)).unwrap();
        tree.update(book, ViewPatch::attr(attr::BOOK, "Lore")).unwrap();
        let entry = tree.create("div");
        tree.append(book, entry).unwrap();
        tree.update(entry, ViewPatch::SetText("Dragon".into())).unwrap();
        (tree, book, entry)
    }

    #[test]
    fn lists_classes_attributes_and_text() {
        let (tree, _, _) = sample();
        let text = outline(&tree, tree.root(), OutlineOptions::default());
        assert_eq!(text, "root\n  div.stwid--book [data-book=Lore]\n    div \"Dragon\"\n");
    }

    #[test]
    fn visible_only_skips_filtered_and_collapsed_content() {
        let (mut tree, book, entry) = sample();
        tree.update(entry, ViewPatch::add_class(class::FILTER_QUERY)).unwrap();
        let options = OutlineOptions { visible_only: true, ..OutlineOptions::default() };
        assert!(!outline(&tree, tree.root(), options).contains("Dragon"));

        tree.update(entry, ViewPatch::remove_class(class::FILTER_QUERY)).unwrap();
        tree.update(book, ViewPatch::add_class(class::COLLAPSED)).unwrap();
        let text = outline(&tree, tree.root(), options);
        assert!(text.contains("data-book=Lore"));
        assert!(!text.contains("Dragon"));
    }

    #[test]
    fn colour_wraps_segments() {
        let (tree, _, _) = sample();
        let options = OutlineOptions { color: true, ..OutlineOptions::default() };
        assert!(outline(&tree, tree.root(), options).contains("\u{001b}[38;2;137;180;250m.stwid--book"));
    }
}
