//! 渲染输出树模型
//!
//! 只读面板的内容：元素/文本节点构成的 arena 树。
//! 每次结构或文本变更都会递增 `version`，供搜索 provider 检测外部修改。

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use slotmap::{new_key_type, SlotMap};
use std::fmt;
use std::ops::Range;

new_key_type! { pub struct NodeId; }

#[derive(Debug)]
pub enum RenderTreeError {
    InvalidNodeId,
    NotText,
    NotAChild,
    OffsetOutOfBounds,
}

impl fmt::Display for RenderTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderTreeError::InvalidNodeId => write!(f, "invalid node id"),
            RenderTreeError::NotText => write!(f, "node is not a text node"),
            RenderTreeError::NotAChild => write!(f, "reference node is not a child of parent"),
            RenderTreeError::OffsetOutOfBounds => write!(f, "split offset out of bounds"),
        }
    }
}

impl std::error::Error for RenderTreeError {}

pub type Result<T> = std::result::Result<T, RenderTreeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element { tag: String, classes: Vec<String> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            data: NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                classes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        }
    }

    fn text(text: &str) -> Self {
        Self {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        }
    }
}

pub struct RenderTree {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
    version: u64,
    viewport: Range<usize>,
    focused: Option<NodeId>,
}

impl RenderTree {
    pub fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node::element("div"));
        Self {
            arena,
            root,
            version: 0,
            viewport: 0..usize::MAX,
            focused: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// 内容版本：结构或文本每变化一次加一
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains_key(id)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.insert(Node::element(tag))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.insert(Node::text(text))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.arena.get(id).map(|n| &n.data)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.arena.get(id)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.arena.get(id)?.data {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// 祖先链（由近及远，不含节点本身）
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.detach(child)?;
        let parent_node = self
            .arena
            .get_mut(parent)
            .ok_or(RenderTreeError::InvalidNodeId)?;
        parent_node.children.push(child);
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
        self.version += 1;
        Ok(())
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        if !self.children(parent).contains(&reference) {
            return Err(RenderTreeError::NotAChild);
        }
        self.detach(child)?;
        let parent_node = self
            .arena
            .get_mut(parent)
            .ok_or(RenderTreeError::InvalidNodeId)?;
        let pos = parent_node
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(RenderTreeError::NotAChild)?;
        parent_node.children.insert(pos, child);
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
        self.version += 1;
        Ok(())
    }

    pub fn insert_after(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        match self.next_sibling(reference) {
            Some(next) => self.insert_before(parent, child, next),
            None => {
                if self.parent(reference) != Some(parent) {
                    return Err(RenderTreeError::NotAChild);
                }
                self.append_child(parent, child)
            }
        }
    }

    /// 移除节点及其子树
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(RenderTreeError::InvalidNodeId);
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                stack.extend(node.children);
            }
        }
        self.version += 1;
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        let node = self.arena.get_mut(id).ok_or(RenderTreeError::InvalidNodeId)?;
        match &mut node.data {
            NodeData::Text(current) => {
                if current != text {
                    *current = text.to_string();
                    self.version += 1;
                }
                Ok(())
            }
            NodeData::Element { .. } => Err(RenderTreeError::NotText),
        }
    }

    /// 在字符偏移处拆分文本节点：原节点保留前半段，新节点（紧随其后）保存后半段
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Result<NodeId> {
        let text = self.text(id).ok_or(RenderTreeError::NotText)?.to_string();
        let byte_offset = match text.char_indices().nth(char_offset) {
            Some((b, _)) => b,
            None if char_offset == text.chars().count() => text.len(),
            None => return Err(RenderTreeError::OffsetOutOfBounds),
        };
        let (head, tail) = text.split_at(byte_offset);
        let tail_id = self.create_text(tail);
        if let Some(node) = self.arena.get_mut(id) {
            node.data = NodeData::Text(head.to_string());
        }
        match self.parent(id) {
            Some(parent) => self.insert_after(parent, tail_id, id)?,
            None => self.version += 1,
        }
        Ok(tail_id)
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        match self.arena.get(id).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.as_slice(),
            _ => &[],
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    /// class 属于属性，不计入内容版本
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(Node {
            data: NodeData::Element { classes, .. },
            ..
        }) = self.arena.get_mut(id)
        {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(Node {
            data: NodeData::Element { classes, .. },
            ..
        }) = self.arena.get_mut(id)
        {
            classes.retain(|c| c != class);
        }
    }

    /// 文档顺序（先序）遍历 `under` 子树内的文本节点
    pub fn text_nodes(&self, under: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![under];
        while let Some(id) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            match node.data {
                NodeData::Text(_) => out.push(id),
                NodeData::Element { .. } => stack.extend(node.children.iter().rev().copied()),
            }
        }
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|t| self.text(t))
            .collect()
    }

    // ==================== 视口与焦点（宿主布局的简化模型）====================

    /// 视口以根节点下顶层块的下标表示
    pub fn set_viewport(&mut self, blocks: Range<usize>) {
        self.viewport = blocks;
    }

    pub fn viewport(&self) -> Range<usize> {
        self.viewport.clone()
    }

    pub fn block_index(&self, id: NodeId) -> Option<usize> {
        let top = if self.parent(id) == Some(self.root) {
            id
        } else {
            self.ancestors(id)
                .take_while(|&a| a != self.root)
                .last()?
        };
        self.children(self.root).iter().position(|&c| c == top)
    }

    pub fn is_in_viewport(&self, id: NodeId) -> bool {
        self.block_index(id)
            .map(|b| self.viewport.contains(&b))
            .unwrap_or(false)
    }

    pub fn scroll_into_view(&mut self, id: NodeId) {
        let Some(block) = self.block_index(id) else {
            return;
        };
        let height = self.viewport.end.saturating_sub(self.viewport.start).max(1);
        self.viewport = block..block.saturating_add(height);
    }

    pub fn focus(&mut self, id: NodeId) {
        self.focused = Some(id);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|&id| self.contains(id))
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self
            .arena
            .get(id)
            .ok_or(RenderTreeError::InvalidNodeId)?
            .parent;
        if let Some(parent) = parent {
            if let Some(p) = self.arena.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
            if let Some(node) = self.arena.get_mut(id) {
                node.parent = None;
            }
            self.version += 1;
        }
        Ok(())
    }

    // ==================== Markdown 渲染 ====================

    pub fn from_markdown(markdown: &str) -> Self {
        let mut tree = Self::new();
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        let mut stack = vec![tree.root];
        for event in Parser::new_ext(markdown, options) {
            let parent = stack.last().copied().unwrap_or(tree.root);
            match event {
                Event::Start(tag) => {
                    let el = tree.create_element(markdown_tag_name(&tag));
                    let _ = tree.append_child(parent, el);
                    if matches!(tag, Tag::CodeBlock(_)) {
                        let code = tree.create_element("code");
                        let _ = tree.append_child(el, code);
                        stack.push(el);
                        stack.push(code);
                    } else {
                        stack.push(el);
                    }
                }
                Event::End(end) => {
                    stack.pop();
                    if matches!(end, TagEnd::CodeBlock) {
                        stack.pop();
                    }
                    if stack.is_empty() {
                        stack.push(tree.root);
                    }
                }
                Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                    let t = tree.create_text(&text);
                    let _ = tree.append_child(parent, t);
                }
                Event::Code(text) => {
                    let code = tree.create_element("code");
                    let t = tree.create_text(&text);
                    let _ = tree.append_child(code, t);
                    let _ = tree.append_child(parent, code);
                }
                Event::SoftBreak => {
                    let t = tree.create_text(" ");
                    let _ = tree.append_child(parent, t);
                }
                Event::HardBreak => {
                    let br = tree.create_element("br");
                    let _ = tree.append_child(parent, br);
                }
                Event::Rule => {
                    let hr = tree.create_element("hr");
                    let _ = tree.append_child(parent, hr);
                }
                _ => {}
            }
        }
        tree.version = 0;
        tree
    }
}

impl Default for RenderTree {
    fn default() -> Self {
        Self::new()
    }
}

fn markdown_tag_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Paragraph => "p",
        Tag::Heading { level, .. } => match level {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        },
        Tag::BlockQuote(_) => "blockquote",
        Tag::CodeBlock(_) => "pre",
        Tag::List(Some(_)) => "ol",
        Tag::List(None) => "ul",
        Tag::Item => "li",
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "del",
        Tag::Link { .. } => "a",
        Tag::Image { .. } => "img",
        Tag::Table(_) => "table",
        Tag::TableHead => "thead",
        Tag::TableRow => "tr",
        Tag::TableCell => "td",
        _ => "div",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/render_tree.rs"]
mod tests;
