//! In-memory element tree standing in for the host page.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Elements are
//! built with [`ElementBuilder`] instead of markup strings, so message text
//! always ends up in text nodes and is escaped on render.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use url::Url;

/// Handle to a node in a [`Document`]. Handles stay valid until the node is
/// removed; after that every operation on them is a no-op.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Default)]
struct ElementData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    disabled: bool,
    display: Option<String>,
}

/// Arena-backed page tree.
///
/// Removed nodes leave a `None` slot behind and slots are never reused, so a
/// stale `NodeId` can only ever miss; it never aliases a newer node.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    body: NodeId,
    location: Url,
}

impl Document {
    pub fn new(location: Url) -> Self {
        let body = Node {
            kind: NodeKind::Element(ElementData {
                tag: "body".to_string(),
                ..ElementData::default()
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(body)],
            body: NodeId(0),
            location,
        }
    }

    pub const fn body(&self) -> NodeId {
        self.body
    }

    pub const fn location(&self) -> &Url {
        &self.location
    }

    pub fn navigate(&mut self, url: Url) {
        tracing::info!(from = %self.location, to = %url, "navigating");
        self.location = url;
    }

    /// Materialises a builder as a detached subtree and returns its root.
    pub fn create(&mut self, builder: ElementBuilder) -> NodeId {
        let ElementBuilder {
            tag,
            id,
            classes,
            attrs,
            disabled,
            display,
            children,
        } = builder;
        let root = self.insert_node(NodeKind::Element(ElementData {
            tag,
            id,
            classes,
            attrs,
            disabled,
            display,
        }));
        for child in children {
            let node = match child {
                Child::Element(el) => self.create(el),
                Child::Text(text) => self.create_text(text),
            };
            self.link(root, node, None);
        }
        root
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.insert_node(NodeKind::Text(text.into()))
    }

    fn insert_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Some(Node {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether the node is still alive (created and not removed).
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether the node is reachable from `body`.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|node| node == self.body)
    }

    /// The node itself followed by its parents up to the root of its tree.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.contains(id).then_some(id);
        std::iter::successors(first, |current| self.node(*current)?.parent)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[][..], |node| node.children.as_slice())
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.link(parent, child, None)
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.link(parent, child, Some(0))
    }

    fn link(&mut self, parent: NodeId, child: NodeId, at: Option<usize>) -> bool {
        if self.element(parent).is_none() || !self.contains(child) {
            return false;
        }
        // Refuse to create cycles.
        if self.ancestors(parent).any(|node| node == child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            let at = at.unwrap_or(node.children.len()).min(node.children.len());
            node.children.insert(at, child);
        }
        true
    }

    /// Unlinks the node from its parent but keeps it alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Detaches the node and frees its whole subtree. Returns `false` if the
    /// node was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) || id == self.body {
            return false;
        }
        self.detach(id);
        self.free(id);
        true
    }

    fn free(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.free(child);
        }
    }

    /// Detaches all children and hands them back alive, in order.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node_mut(id) else {
            return Vec::new();
        };
        let children = std::mem::take(&mut node.children);
        for child in &children {
            if let Some(node) = self.node_mut(*child) {
                node.parent = None;
            }
        }
        children
    }

    /// Frees the current children and appends `children` in their place.
    pub fn replace_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if self.element(id).is_none() {
            return;
        }
        for old in self.take_children(id) {
            self.free(old);
        }
        for child in children {
            self.link(id, child, None);
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.element(id)?.id.as_deref()
    }

    /// First attached element with the given `id` attribute.
    pub fn element_by_id(&self, id_attr: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|node| self.id_attr(*node) == Some(id_attr))
    }

    /// Element descendants of `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
                stack.extend(self.children(id).iter().rev().copied());
            }
        }
        out
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.element(id)
            .into_iter()
            .flat_map(|el| el.classes.iter().map(String::as_str))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id)
            && !el.classes.iter().any(|c| c == class)
        {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.disabled)
    }

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        if let Some(el) = self.element_mut(id) {
            el.disabled = disabled;
        }
    }

    /// Inline `display` style, if one is set.
    pub fn display(&self, id: NodeId) -> Option<&str> {
        self.element(id)?.display.as_deref()
    }

    pub fn set_display(&mut self, id: NodeId, display: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.display = Some(display.into());
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.render(*child, &mut out);
        }
        out
    }

    fn render(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let el = match &node.kind {
            NodeKind::Text(text) => {
                out.push_str(&escape(text));
                return;
            }
            NodeKind::Element(el) => el,
        };
        out.push('<');
        out.push_str(&el.tag);
        if let Some(id_attr) = &el.id {
            let _ = write!(out, " id=\"{}\"", escape(id_attr));
        }
        if !el.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&el.classes.join(" ")));
        }
        for (name, value) in &el.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if el.disabled {
            out.push_str(" disabled");
        }
        if let Some(display) = &el.display {
            let _ = write!(out, " style=\"display: {}\"", escape(display));
        }
        out.push('>');
        if is_void(&el.tag) {
            return;
        }
        for child in &node.children {
            self.render(*child, out);
        }
        let _ = write!(out, "</{}>", el.tag);
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "input" | "br" | "hr" | "img")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug)]
enum Child {
    Element(ElementBuilder),
    Text(String),
}

/// Structured description of an element subtree.
///
/// ```
/// use ui_feedback::dom::ElementBuilder;
///
/// let button = ElementBuilder::new("button")
///     .class("btn")
///     .attr("type", "submit")
///     .text("Save");
/// # let _ = button;
/// ```
#[derive(Debug)]
#[must_use]
pub struct ElementBuilder {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    disabled: bool,
    display: Option<String>,
    children: Vec<Child>,
}

impl ElementBuilder {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            disabled: false,
            display: None,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds one or more space-separated classes.
    pub fn class(mut self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            if !self.classes.iter().any(|c| c == class) {
                self.classes.push(class.to_string());
            }
        }
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Self) -> Self {
        self.children.push(Child::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children
            .extend(children.into_iter().map(Child::Element));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, ElementBuilder};
    use url::Url;

    fn doc() -> Document {
        Document::new(Url::parse("https://journal.test/").unwrap())
    }

    #[test]
    fn builder_renders_escaped_text() {
        let mut doc = doc();
        let el = doc.create(
            ElementBuilder::new("p")
                .class("note muted")
                .attr("data-x", "1")
                .text("<b>&</b>"),
        );
        assert_eq!(
            doc.outer_html(el),
            r#"<p class="note muted" data-x="1">&lt;b&gt;&amp;&lt;/b&gt;</p>"#
        );
    }

    #[test]
    fn remove_frees_subtree_and_is_idempotent() {
        let mut doc = doc();
        let body = doc.body();
        let parent = doc.create(ElementBuilder::new("div").child(ElementBuilder::new("span")));
        let span = doc.children(parent)[0];
        doc.append(body, parent);

        assert!(doc.is_attached(span));
        assert!(doc.remove(parent));
        assert!(!doc.contains(span));
        assert!(!doc.remove(parent));
        assert!(doc.children(body).is_empty());
    }

    #[test]
    fn stale_handle_never_aliases_new_node() {
        let mut doc = doc();
        let body = doc.body();
        let old = doc.create(ElementBuilder::new("div").id("old"));
        doc.append(body, old);
        doc.remove(old);

        let fresh = doc.create(ElementBuilder::new("div").id("fresh"));
        doc.append(body, fresh);
        assert_ne!(old, fresh);
        assert!(!doc.contains(old));
        assert_eq!(doc.id_attr(old), None);
        assert!(!doc.remove(old));
        assert!(doc.is_attached(fresh));
    }

    #[test]
    fn take_children_keeps_nodes_alive() {
        let mut doc = doc();
        let button = doc.create(ElementBuilder::new("button").text("Save"));
        let saved = doc.take_children(button);
        assert_eq!(doc.text_content(button), "");
        doc.replace_children(button, saved);
        assert_eq!(doc.text_content(button), "Save");
    }

    #[test]
    fn element_by_id_ignores_detached_nodes() {
        let mut doc = doc();
        let detached = doc.create(ElementBuilder::new("div").id("ghost"));
        assert!(doc.contains(detached));
        assert!(doc.element_by_id("ghost").is_none());
        let body = doc.body();
        doc.prepend(body, detached);
        assert_eq!(doc.element_by_id("ghost"), Some(detached));
    }

    #[test]
    fn link_rejects_cycles() {
        let mut doc = doc();
        let outer = doc.create(ElementBuilder::new("div").child(ElementBuilder::new("div")));
        let inner = doc.children(outer)[0];
        assert!(!doc.append(inner, outer));
    }
}
