//! In-memory document model and the view mounted on it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::html::escape_html;
use super::{ChatView, MessageId};
use crate::config::DomConfig;
use crate::error::{Result, WidgetError};
use crate::session::Role;

/// Index of an element inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single element. Text and children are exclusive in practice: setting
/// text content drops the children.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    /// Form value for inputs and textareas.
    pub value: String,
    /// Inline `display` style, `None` when unset.
    pub display: Option<String>,
    pub scroll_top: usize,
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Arena of elements rooted at `<body>`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with only a `<body>`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Element {
                tag: "body".to_string(),
                ..Element::default()
            }],
            body: NodeId(0),
        }
    }

    /// Document holding the widget's host page: transcript, input, send
    /// button, and the hidden sources panel.
    #[must_use]
    pub fn host_page(dom: &DomConfig) -> Self {
        let mut doc = Self::new();
        let body = doc.body();

        let container = doc.create_element("div");
        doc.add_class(container, "chat-container");
        doc.append_child(body, container);

        let messages = doc.create_element_with_id("div", &dom.messages_id);
        doc.add_class(messages, "chat-messages");
        doc.append_child(container, messages);

        let input_row = doc.create_element("div");
        doc.add_class(input_row, "chat-input-container");
        doc.append_child(container, input_row);

        let input = doc.create_element_with_id("textarea", &dom.input_id);
        doc.set_attr(input, "placeholder", "Ask a question...");
        doc.set_attr(input, "rows", "1");
        doc.append_child(input_row, input);

        let button = doc.create_element_with_id("button", &dom.send_button_id);
        doc.set_text_content(button, "Send");
        doc.append_child(input_row, button);

        let sources = doc.create_element_with_id("div", &dom.sources_container_id);
        doc.add_class(sources, "sources-container");
        doc.set_display(sources, "none");
        doc.append_child(body, sources);

        let heading = doc.create_element("h3");
        doc.set_text_content(heading, "Sources");
        doc.append_child(sources, heading);

        let list = doc.create_element_with_id("div", &dom.sources_list_id);
        doc.add_class(list, "sources-list");
        doc.append_child(sources, list);

        doc
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element {
            tag: tag.to_string(),
            ..Element::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element_with_id(&mut self, tag: &str, id: &str) -> NodeId {
        let node = self.create_element(tag);
        self.nodes[node.0].id = Some(id.to_string());
        node
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Depth-first lookup from the body, like `getElementById`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            let el = &self.nodes[node.0];
            if el.id.as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(el.children.iter().rev().copied());
        }
        None
    }

    #[must_use]
    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.0]
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        let el = &mut self.nodes[node.0];
        if !el.has_class(class) {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.nodes[node.0].classes.retain(|c| c != class);
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.nodes[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    /// Same as assigning `textContent`: children are dropped.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        let el = &mut self.nodes[node.0];
        el.children.clear();
        el.text = text.to_string();
    }

    /// Concatenated text of the element and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let el = &self.nodes[node.0];
        let mut out = el.text.clone();
        for child in &el.children {
            out.push_str(&self.text_content(*child));
        }
        out
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.nodes[node.0].value = value.to_string();
    }

    /// Same as `innerHTML = ''`.
    pub fn clear_children(&mut self, node: NodeId) {
        let el = &mut self.nodes[node.0];
        el.children.clear();
        el.text.clear();
    }

    pub fn set_display(&mut self, node: NodeId, display: &str) {
        self.nodes[node.0].display = Some(display.to_string());
    }

    /// One row per child.
    #[must_use]
    pub fn scroll_height(&self, node: NodeId) -> usize {
        self.nodes[node.0].children.len()
    }

    pub fn set_scroll_top(&mut self, node: NodeId, top: usize) {
        self.nodes[node.0].scroll_top = top;
    }

    /// Serialise the body subtree to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.body, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let el = &self.nodes[node.0];
        let _ = write!(out, "<{}", el.tag);
        if let Some(id) = &el.id {
            let _ = write!(out, " id=\"{}\"", escape_html(id));
        }
        if !el.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_html(&el.classes.join(" ")));
        }
        if let Some(display) = &el.display {
            let _ = write!(out, " style=\"display: {}\"", escape_html(display));
        }
        for (name, value) in &el.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape_html(value));
        }
        out.push('>');
        out.push_str(&escape_html(&el.text));
        if el.tag == "textarea" {
            out.push_str(&escape_html(&el.value));
        }
        for child in &el.children {
            self.write_html(*child, out);
        }
        let _ = write!(out, "</{}>", el.tag);
    }
}

/// Node handles of the mounted page elements.
#[derive(Debug, Clone, Copy)]
struct Mounted {
    messages: NodeId,
    input: NodeId,
    sources_container: NodeId,
    sources_list: NodeId,
}

#[derive(Debug)]
struct DomState {
    doc: Document,
    mounted: Mounted,
    /// Bubble and its `message-content` child, indexed by [`MessageId`].
    bubbles: Vec<(NodeId, NodeId)>,
}

/// [`ChatView`] over an in-memory [`Document`].
#[derive(Debug)]
pub struct DomView {
    state: Mutex<DomState>,
}

impl DomView {
    /// Mount on `doc`, failing if any element named in `dom` is missing.
    pub fn mount(doc: Document, dom: &DomConfig) -> Result<Self> {
        for id in dom.required_ids() {
            if doc.get_element_by_id(id).is_none() {
                return Err(WidgetError::MissingElement(id.to_string()));
            }
        }
        let lookup = |id: &str| {
            doc.get_element_by_id(id)
                .ok_or_else(|| WidgetError::MissingElement(id.to_string()))
        };
        let mounted = Mounted {
            messages: lookup(&dom.messages_id)?,
            input: lookup(&dom.input_id)?,
            sources_container: lookup(&dom.sources_container_id)?,
            sources_list: lookup(&dom.sources_list_id)?,
        };
        Ok(Self {
            state: Mutex::new(DomState {
                doc,
                mounted,
                bubbles: Vec::new(),
            }),
        })
    }

    /// Mount on a fresh host page.
    pub fn with_host_page(dom: &DomConfig) -> Result<Self> {
        Self::mount(Document::host_page(dom), dom)
    }

    fn state(&self) -> MutexGuard<'_, DomState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Type into the input field.
    pub fn set_input(&self, text: &str) {
        let mut state = self.state();
        let input = state.mounted.input;
        state.doc.set_value(input, text);
    }

    /// Read-only access to the document.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.state().doc)
    }

    /// Text currently shown in a bubble.
    pub fn message_text(&self, id: MessageId) -> Option<String> {
        let state = self.state();
        let (_, content) = *state.bubbles.get(id.0)?;
        Some(state.doc.text_content(content))
    }

    /// Whether a bubble carries the `loading` class.
    pub fn is_loading(&self, id: MessageId) -> bool {
        let state = self.state();
        state
            .bubbles
            .get(id.0)
            .is_some_and(|(bubble, _)| state.doc.element(*bubble).has_class("loading"))
    }

    /// Every bubble in transcript order as `(classes, text)`.
    pub fn transcript(&self) -> Vec<(String, String)> {
        let state = self.state();
        let doc = &state.doc;
        doc.element(state.mounted.messages)
            .children
            .iter()
            .map(|node| (doc.element(*node).classes.join(" "), doc.text_content(*node)))
            .collect()
    }

    /// Rendered source rows as `(title, score)`.
    pub fn sources(&self) -> Vec<(String, String)> {
        let state = self.state();
        let doc = &state.doc;
        doc.element(state.mounted.sources_list)
            .children
            .iter()
            .map(|item| {
                let parts = &doc.element(*item).children;
                let text = |i: usize| parts.get(i).map(|n| doc.text_content(*n)).unwrap_or_default();
                (text(0), text(1))
            })
            .collect()
    }

    /// Whether the sources panel is displayed.
    pub fn sources_visible(&self) -> bool {
        let state = self.state();
        state.doc.element(state.mounted.sources_container).display.as_deref() == Some("block")
    }

    /// Whether the transcript is scrolled to its last row.
    pub fn is_scrolled_to_bottom(&self) -> bool {
        let state = self.state();
        let messages = state.mounted.messages;
        state.doc.element(messages).scroll_top == state.doc.scroll_height(messages)
    }
}

impl ChatView for DomView {
    fn input_value(&self) -> String {
        let state = self.state();
        state.doc.element(state.mounted.input).value.clone()
    }

    fn clear_input(&self) {
        self.set_input("");
    }

    fn append_message(&self, role: Role, text: &str, loading: bool) -> MessageId {
        let mut state = self.state();
        let messages = state.mounted.messages;
        let doc = &mut state.doc;

        let bubble = doc.create_element("div");
        doc.add_class(bubble, "message");
        doc.add_class(bubble, role.as_str());
        if loading {
            doc.add_class(bubble, "loading");
        }

        let content = doc.create_element("div");
        doc.add_class(content, "message-content");
        doc.set_text_content(content, text);

        doc.append_child(bubble, content);
        doc.append_child(messages, bubble);

        state.bubbles.push((bubble, content));
        MessageId(state.bubbles.len() - 1)
    }

    fn set_loading(&self, id: MessageId, loading: bool) {
        let mut state = self.state();
        let Some(&(bubble, _)) = state.bubbles.get(id.0) else {
            return;
        };
        if loading {
            state.doc.add_class(bubble, "loading");
        } else {
            state.doc.remove_class(bubble, "loading");
        }
    }

    fn set_message_text(&self, id: MessageId, text: &str) {
        let mut state = self.state();
        if let Some(&(_, content)) = state.bubbles.get(id.0) {
            state.doc.set_text_content(content, text);
        }
    }

    fn scroll_to_bottom(&self) {
        let mut state = self.state();
        let messages = state.mounted.messages;
        let height = state.doc.scroll_height(messages);
        state.doc.set_scroll_top(messages, height);
    }

    fn clear_sources(&self) {
        let mut state = self.state();
        let list = state.mounted.sources_list;
        state.doc.clear_children(list);
    }

    fn append_source(&self, title: &str, score: &str) {
        let mut state = self.state();
        let list = state.mounted.sources_list;
        let doc = &mut state.doc;

        let item = doc.create_element("div");
        doc.add_class(item, "source-item");

        let title_el = doc.create_element("div");
        doc.add_class(title_el, "source-title");
        doc.set_text_content(title_el, title);

        let score_el = doc.create_element("div");
        doc.add_class(score_el, "source-score");
        doc.set_text_content(score_el, score);

        doc.append_child(item, title_el);
        doc.append_child(item, score_el);
        doc.append_child(list, item);
    }

    fn set_sources_visible(&self, visible: bool) {
        let mut state = self.state();
        let container = state.mounted.sources_container;
        state
            .doc
            .set_display(container, if visible { "block" } else { "none" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_page_has_required_ids() {
        let dom = DomConfig::default();
        let doc = Document::host_page(&dom);
        for id in dom.required_ids() {
            assert!(doc.get_element_by_id(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_mount_rejects_incomplete_page() {
        let dom = DomConfig::default();
        let mut doc = Document::new();
        let body = doc.body();
        let messages = doc.create_element_with_id("div", "chat-messages");
        doc.append_child(body, messages);

        let err = DomView::mount(doc, &dom).unwrap_err();
        assert!(matches!(err, WidgetError::MissingElement(id) if id == "chat-input"));
    }

    #[test]
    fn test_message_bubbles() {
        let view = DomView::with_host_page(&DomConfig::default()).unwrap();

        let user = view.append_message(Role::User, "hi", false);
        let reply = view.append_message(Role::Assistant, "", true);
        assert!(!view.is_loading(user));
        assert!(view.is_loading(reply));

        view.set_message_text(reply, "Hel");
        view.set_message_text(reply, "Hello");
        view.set_loading(reply, false);

        assert_eq!(view.message_text(reply).as_deref(), Some("Hello"));
        assert_eq!(
            view.transcript(),
            vec![
                ("message user".to_string(), "hi".to_string()),
                ("message assistant".to_string(), "Hello".to_string()),
            ]
        );
    }

    #[test]
    fn test_scroll_follows_new_rows() {
        let view = DomView::with_host_page(&DomConfig::default()).unwrap();
        view.append_message(Role::User, "one", false);
        assert!(!view.is_scrolled_to_bottom());
        view.scroll_to_bottom();
        assert!(view.is_scrolled_to_bottom());
    }

    #[test]
    fn test_sources_panel() {
        let view = DomView::with_host_page(&DomConfig::default()).unwrap();
        assert!(!view.sources_visible());

        view.append_source("stale", "relevance: 1.0%");
        view.clear_sources();
        view.append_source("Doc A", "relevance: 87.3%");
        view.set_sources_visible(true);

        assert!(view.sources_visible());
        assert_eq!(
            view.sources(),
            vec![("Doc A".to_string(), "relevance: 87.3%".to_string())]
        );
    }

    #[test]
    fn test_to_html_escapes_text() {
        let view = DomView::with_host_page(&DomConfig::default()).unwrap();
        view.append_message(Role::User, "<b>&</b>", false);
        let html = view.with_document(Document::to_html);
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(html.contains(r#"<div id="sources-container" class="sources-container" style="display: none">"#));
    }
}
