//! View abstraction: opaque node handles plus an incremental patch protocol.
//!
//! The drawer never holds closures over view nodes. It keeps [`NodeId`] handles
//! in its cache, keyed by book name and entry uid, and talks to the rendering
//! backend through the [`View`] trait. Interactions travel the other way as
//! events that name the book and uid (see [`crate::render::interaction_at`]), so
//! handlers always act on the current cache entry.
//!
//! # Invariants
//!
//! - A node has at most one parent; inserting an attached node moves it.
//! - Handles of removed nodes are never reused by a backend.
//! - `before` anchors must be children of the named parent.
//!
//! # Implementations
//!
//! - [`ViewTree`]: in-memory arena used by tests and the text outline

pub mod tree;

pub use tree::ViewTree;

use crate::domain::error::Result;

/// Opaque handle to a view node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena slot of the node, for backends that index their own storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Text fragment with an optional style class, used by highlight overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// Style class, `None` for plain text.
    pub class: Option<String>,
    /// Fragment text.
    pub text: String,
}

impl StyledSpan {
    /// Creates a span.
    #[must_use]
    pub fn new(class: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            class: class.map(String::from),
            text: text.into(),
        }
    }
}

/// In-place update applied to an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewPatch {
    /// Replace the node's text content.
    SetText(String),
    /// Add a class (no-op if present).
    AddClass(String),
    /// Remove a class (no-op if absent).
    RemoveClass(String),
    /// Set the value of an input or selector.
    SetValue(String),
    /// Set an attribute.
    SetAttr {
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: String,
    },
    /// Allow or forbid dragging the node.
    SetDraggable(bool),
    /// Replace the node's content with styled spans.
    SetSpans(Vec<StyledSpan>),
}

impl ViewPatch {
    /// Shorthand for [`ViewPatch::AddClass`].
    #[must_use]
    pub fn add_class(class: &str) -> Self {
        Self::AddClass(class.to_string())
    }

    /// Shorthand for [`ViewPatch::RemoveClass`].
    #[must_use]
    pub fn remove_class(class: &str) -> Self {
        Self::RemoveClass(class.to_string())
    }

    /// Adds or removes `class` depending on `on`.
    #[must_use]
    pub fn class(class: &str, on: bool) -> Self {
        if on {
            Self::add_class(class)
        } else {
            Self::remove_class(class)
        }
    }

    /// Shorthand for [`ViewPatch::SetAttr`].
    #[must_use]
    pub fn attr(name: &str, value: impl Into<String>) -> Self {
        Self::SetAttr {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Rendering backend.
///
/// Every method that names a node returns [`crate::DrawerError::MissingNode`]
/// when the handle is stale.
pub trait View {
    /// Root node all drawer content hangs under.
    fn root(&self) -> NodeId;

    /// Creates a detached node.
    fn create(&mut self, tag: &str) -> NodeId;

    /// Inserts `node` under `parent` before `before`, or appends when `before`
    /// is `None`. An attached node is moved.
    ///
    /// # Errors
    ///
    /// Fails if any handle is stale or `before` is not a child of `parent`.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) -> Result<()>;

    /// Appends `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Fails if any handle is stale.
    fn append(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.insert_before(parent, node, None)
    }

    /// Detaches and drops `node` with its subtree.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    fn remove(&mut self, node: NodeId) -> Result<()>;

    /// Drops every child of `node`.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    fn clear(&mut self, node: NodeId) -> Result<()> {
        for child in self.children(node)? {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Children of `parent` in order.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    fn children(&self, parent: NodeId) -> Result<Vec<NodeId>>;

    /// Parent of `node`, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Applies an in-place patch.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    fn update(&mut self, node: NodeId, patch: ViewPatch) -> Result<()>;

    /// Whether the node currently carries `class`.
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Attribute value.
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// Current value of an input or selector.
    fn value(&self, node: NodeId) -> Option<String>;

    /// Whether the handle refers to a live node.
    fn contains(&self, node: NodeId) -> bool;
}
