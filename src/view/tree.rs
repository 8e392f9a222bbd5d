//! In-memory view backend.
//!
//! [`ViewTree`] is an arena of nodes addressed by [`NodeId`]. Slots of removed
//! nodes are never reused, so a handle either points at the node it was issued
//! for or at nothing. Every mutating call bumps a counter, which lets tests
//! assert that a reconciliation pass left the view untouched.

use super::{NodeId, StyledSpan, View, ViewPatch};
use crate::domain::error::{DrawerError, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    value: Option<String>,
    draggable: bool,
    spans: Vec<StyledSpan>,
}

/// Arena-backed view tree.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::view::{View, ViewPatch, ViewTree};
///
/// let mut tree = ViewTree::new();
/// let label = tree.create("span");
/// tree.append(tree.root(), label)?;
/// tree.update(label, ViewPatch::SetText("Lore".into()))?;
/// assert_eq!(tree.text(label), Some("Lore"));
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ViewTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    mutations: u64,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    /// Creates a tree holding only a root node.
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            tag: "root".to_string(),
            ..Node::default()
        };
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
            mutations: 0,
        }
    }

    /// Number of mutating calls applied so far.
    #[must_use]
    pub const fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Element tag of a node.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().map(|n| n.tag.as_str())
    }

    /// Text content of a node.
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().map(|n| n.text.as_str())
    }

    /// Classes of a node, sorted.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.node(node)
            .map(|n| n.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the node may be dragged.
    #[must_use]
    pub fn is_draggable(&self, node: NodeId) -> bool {
        self.node(node).is_ok_and(|n| n.draggable)
    }

    /// Styled spans of a node.
    #[must_use]
    pub fn spans(&self, node: NodeId) -> &[StyledSpan] {
        self.node(node).map(|n| n.spans.as_slice()).unwrap_or(&[])
    }

    /// All live descendants of `node` in document order.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Ok(n) = self.node(current) {
                for child in n.children.iter().rev() {
                    stack.push(*child);
                }
                if current != node {
                    out.push(current);
                }
            }
        }
        out
    }

    /// First descendant of `node` whose attribute `name` equals `value`.
    #[must_use]
    pub fn find_by_attr(&self, node: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|id| self.attr(*id, name).as_deref() == Some(value))
    }

    /// First descendant of `node` carrying `class`.
    #[must_use]
    pub fn find_by_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|id| self.has_class(*id, class))
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| DrawerError::MissingNode(format!("node #{}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| DrawerError::MissingNode(format!("node #{}", id.0)))
    }

    fn detach(&mut self, node: NodeId) -> Result<()> {
        if let Some(parent) = self.node(node)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != node);
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }
}

impl View for ViewTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn create(&mut self, tag: &str) -> NodeId {
        self.mutations += 1;
        self.nodes.push(Some(Node {
            tag: tag.to_string(),
            ..Node::default()
        }));
        NodeId(self.nodes.len() - 1)
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) -> Result<()> {
        self.node(parent)?;
        self.node(node)?;
        if node == parent || before == Some(node) {
            return Err(DrawerError::MissingNode(format!(
                "cannot insert node #{} relative to itself",
                node.0
            )));
        }

        if let Some(anchor) = before {
            if self.node(anchor)?.parent != Some(parent) {
                return Err(DrawerError::MissingNode(format!(
                    "anchor #{} is not a child of #{}",
                    anchor.0, parent.0
                )));
            }
        }

        self.detach(node)?;
        let index = match before {
            None => self.node(parent)?.children.len(),
            Some(anchor) => self
                .node(parent)?
                .children
                .iter()
                .position(|c| *c == anchor)
                .ok_or_else(|| DrawerError::MissingNode(format!("anchor #{}", anchor.0)))?,
        };

        self.node_mut(parent)?.children.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        self.mutations += 1;
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<()> {
        self.detach(node)?;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(current.0) {
                if let Some(removed) = slot.take() {
                    stack.extend(removed.children);
                }
            }
        }
        self.mutations += 1;
        Ok(())
    }

    fn children(&self, parent: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(parent)?.children.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok().and_then(|n| n.parent)
    }

    fn update(&mut self, node: NodeId, patch: ViewPatch) -> Result<()> {
        let target = self.node_mut(node)?;
        match patch {
            ViewPatch::SetText(text) => target.text = text,
            ViewPatch::AddClass(class) => {
                target.classes.insert(class);
            }
            ViewPatch::RemoveClass(class) => {
                target.classes.remove(&class);
            }
            ViewPatch::SetValue(value) => target.value = Some(value),
            ViewPatch::SetAttr { name, value } => {
                target.attrs.insert(name, value);
            }
            ViewPatch::SetDraggable(on) => target.draggable = on,
            ViewPatch::SetSpans(spans) => target.spans = spans,
        }
        self.mutations += 1;
        Ok(())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).is_ok_and(|n| n.classes.contains(class))
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).ok().and_then(|n| n.attrs.get(name).cloned())
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.node(node).ok().and_then(|n| n.value.clone())
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let a = tree.create("div");
        let b = tree.create("div");
        let c = tree.create("div");
        tree.append(root, a).unwrap();
        tree.append(root, b).unwrap();
        tree.append(root, c).unwrap();

        tree.insert_before(root, c, Some(a)).unwrap();
        assert_eq!(tree.children(root).unwrap(), vec![c, a, b]);

        tree.append(root, c).unwrap();
        assert_eq!(tree.children(root).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn removed_handles_stay_dead() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let parent = tree.create("div");
        let child = tree.create("span");
        tree.append(root, parent).unwrap();
        tree.append(parent, child).unwrap();

        tree.remove(parent).unwrap();
        assert!(!tree.contains(parent));
        assert!(!tree.contains(child));

        let fresh = tree.create("div");
        assert_ne!(fresh, child);
        assert!(matches!(
            tree.update(child, ViewPatch::SetText("x".into())),
            Err(DrawerError::MissingNode(_))
        ));
    }

    #[test]
    fn foreign_anchor_is_rejected() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let list = tree.create("div");
        let stray = tree.create("div");
        let node = tree.create("div");
        tree.append(root, list).unwrap();

        assert!(tree.insert_before(list, node, Some(stray)).is_err());
        assert!(tree.children(list).unwrap().is_empty());
    }

    #[test]
    fn mutation_counter_tracks_writes_only() {
        let mut tree = ViewTree::new();
        let node = tree.create("div");
        let before = tree.mutations();
        let _ = tree.children(node).unwrap();
        let _ = tree.has_class(node, "x");
        assert_eq!(tree.mutations(), before);

        tree.update(node, ViewPatch::add_class("x")).unwrap();
        assert_eq!(tree.mutations(), before + 1);
        assert!(tree.has_class(node, "x"));
    }
}
