//! Declarative view tree shared by every component
//!
//! Components are pure functions from their state to a [`Node`]. Two adapters
//! consume the tree: [`Node::to_html`] for HTTP responses and
//! [`crate::document::Document`] for the in-process interactive host.

use chrono::NaiveDate;
use handlebars::html_escape;

use crate::date_utils::format_iso;

/// Interaction attached to an element
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// A heatmap day with tasks was clicked
    OpenDay { date: NaiveDate, count: u32 },

    /// Explicit close control of the modal
    CloseModal,

    /// Click on the modal backdrop; only fires when the backdrop itself is the target
    DismissOverlay,
}

impl Action {
    /// Whether a click on a descendant bubbles up to this action
    pub fn fires_from_descendants(&self) -> bool {
        !matches!(self, Action::DismissOverlay)
    }

    fn data_attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            Action::OpenDay { date, count } => vec![
                ("data-action", "open-day".to_string()),
                ("data-date", format_iso(*date)),
                ("data-count", count.to_string()),
            ],
            Action::CloseModal => vec![("data-action", "close-modal".to_string())],
            Action::DismissOverlay => vec![("data-action", "dismiss-overlay".to_string())],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    pub action: Option<Action>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Element {
            tag,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
            styles: Vec::new(),
            action: None,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_style(property, value);
        self
    }

    pub fn on_click(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set an inline style, replacing a previous value of the same property
    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self.styles.iter_mut().find(|(p, _)| *p == property) {
            Some(slot) => slot.1 = value,
            None => self.styles.push((property, value)),
        }
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    fn children(&self) -> &[Node] {
        match self {
            Node::Element(e) => &e.children,
            Node::Text(_) => &[],
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => e.children.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// First element in document order carrying `class`
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        if let Node::Element(e) = self {
            if e.has_class(class) {
                return Some(e);
            }
        }
        self.children().iter().find_map(|c| c.find_by_class(class))
    }

    /// All elements carrying `class`, in document order
    pub fn find_all_by_class<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.walk(&mut |node: &'a Node| {
            if let Node::Element(e) = node {
                if e.has_class(class) {
                    found.push(e);
                }
            }
        });
        found
    }

    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Child-index path to the first node matching `pred`
    pub fn path_to(&self, pred: &dyn Fn(&Node) -> bool) -> Option<Vec<usize>> {
        if pred(self) {
            return Some(Vec::new());
        }
        for (i, child) in self.children().iter().enumerate() {
            if let Some(mut rest) = child.path_to(pred) {
                rest.insert(0, i);
                return Some(rest);
            }
        }
        None
    }

    /// Path to the first element carrying `class`
    pub fn path_to_class(&self, class: &str) -> Option<Vec<usize>> {
        self.path_to(&|n| n.as_element().is_some_and(|e| e.has_class(class)))
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.children().get(*first)?.get(rest),
        }
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => match self {
                Node::Element(e) => e.children.get_mut(*first)?.get_mut(rest),
                Node::Text(_) => None,
            },
        }
    }

    /// Mutable access to the first element carrying `class`
    pub fn find_by_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        let path = self.path_to_class(class)?;
        self.get_mut(&path)?.as_element_mut()
    }

    /// Render the tree as HTML, escaping text and attribute values
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&html_escape(t)),
            Node::Element(e) => {
                out.push('<');
                out.push_str(e.tag);
                if let Some(id) = &e.id {
                    push_attr(out, "id", id);
                }
                if !e.classes.is_empty() {
                    push_attr(out, "class", &e.classes.join(" "));
                }
                if !e.styles.is_empty() {
                    let style = e
                        .styles
                        .iter()
                        .map(|(p, v)| format!("{}: {}", p, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    push_attr(out, "style", &style);
                }
                for (name, value) in &e.attrs {
                    push_attr(out, name, value);
                }
                if let Some(action) = &e.action {
                    for (name, value) in action.data_attributes() {
                        push_attr(out, name, &value);
                    }
                }
                out.push('>');
                if VOID_TAGS.contains(&e.tag) {
                    return;
                }
                for child in &e.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(e.tag);
                out.push('>');
            }
        }
    }
}

/// Elements written without children or a closing tag
const VOID_TAGS: [&str; 4] = ["input", "br", "img", "meta"];

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape(value));
    out.push('"');
}
