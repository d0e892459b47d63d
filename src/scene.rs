//! In-memory canvas surface: an arena of frames, cards, text boxes and ellipses.
//!
//! Node handles are plain indices into the arena and are never reused, so a handle
//! captured for an avatar request stays valid for the lifetime of the scene.

use crate::fonts::FontSpec;
use crate::theme::Rgb;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Frame,
    Card,
    Text,
    Ellipse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Min,
    Center,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sizing {
    Fixed,
    Hug,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    pub fn symmetric(x: f32, y: f32) -> Self {
        Self {
            top: y,
            right: x,
            bottom: y,
            left: x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutoLayout {
    pub axis: Axis,
    pub item_spacing: f32,
    pub padding: Padding,
    pub primary_align: Align,
    pub counter_align: Align,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Paint {
    None,
    Solid {
        color: Rgb,
    },
    Image {
        #[serde(skip)]
        bytes: Arc<[u8]>,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Rgb,
    pub opacity: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    DropShadow {
        color: Rgb,
        opacity: f32,
        offset_x: f32,
        offset_y: f32,
        radius: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextProps {
    pub characters: String,
    pub font: FontSpec,
    pub size: f32,
    pub color: Rgb,
    pub letter_spacing: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub visible: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub width: f32,
    pub height: f32,
    pub sizing_x: Sizing,
    pub sizing_y: Sizing,
    pub fill: Paint,
    pub stroke: Option<Stroke>,
    pub corner_radius: f32,
    pub auto_layout: Option<AutoLayout>,
    pub effects: Vec<Effect>,
    pub text: Option<TextProps>,
    /// Absolute position, filled in by the layout pass.
    pub x: f32,
    pub y: f32,
}

impl SceneNode {
    fn blank(id: NodeId, kind: NodeKind, name: &str) -> Self {
        Self {
            id,
            kind,
            name: name.to_string(),
            visible: true,
            parent: None,
            children: Vec::new(),
            width: 0.0,
            height: 0.0,
            sizing_x: Sizing::Fixed,
            sizing_y: Sizing::Fixed,
            fill: Paint::None,
            stroke: None,
            corner_radius: 0.0,
            auto_layout: None,
            effects: Vec::new(),
            text: None,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.sizing_x = Sizing::Fixed;
        self.sizing_y = Sizing::Fixed;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    fn push(&mut self, kind: NodeKind, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::blank(id, kind, name));
        id
    }

    pub fn create_frame(&mut self, name: &str, layout: Option<AutoLayout>) -> NodeId {
        let id = self.push(NodeKind::Frame, name);
        let node = self.node_mut(id);
        node.auto_layout = layout;
        if layout.is_some() {
            node.sizing_x = Sizing::Hug;
            node.sizing_y = Sizing::Hug;
        }
        id
    }

    pub fn create_card(&mut self, name: &str, layout: AutoLayout) -> NodeId {
        let id = self.push(NodeKind::Card, name);
        self.node_mut(id).auto_layout = Some(layout);
        id
    }

    pub fn create_text(&mut self, name: &str, props: TextProps) -> NodeId {
        let id = self.push(NodeKind::Text, name);
        let node = self.node_mut(id);
        node.text = Some(props);
        node.sizing_x = Sizing::Hug;
        node.sizing_y = Sizing::Hug;
        id
    }

    pub fn create_ellipse(&mut self, name: &str, diameter: f32) -> NodeId {
        let id = self.push(NodeKind::Ellipse, name);
        self.node_mut(id).resize(diameter, diameter);
        id
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Deep-copies `id` and its subtree. The copy has no parent.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.nodes[id.0].clone();
        let new_id = NodeId(self.nodes.len());
        copy.id = new_id;
        copy.parent = None;
        copy.children = Vec::new();
        self.nodes.push(copy);

        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append_child(new_id, child_copy);
        }
        new_id
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// Pre-order walk of `root`'s subtree, `root` included.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn find_all<F>(&self, root: Option<NodeId>, kind: NodeKind, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&SceneNode) -> bool,
    {
        let candidates = match root {
            Some(root) => self.descendants(root),
            None => self.roots().into_iter().flat_map(|r| self.descendants(r)).collect(),
        };
        candidates
            .into_iter()
            .filter(|id| {
                let node = &self.nodes[id.0];
                node.kind == kind && predicate(node)
            })
            .collect()
    }

    pub fn find_named(&self, root: NodeId, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.find_all(Some(root), kind, |n| n.name == name)
            .into_iter()
            .next()
    }

    /// Returns false when `id` does not exist or is not an ellipse.
    pub fn set_image_fill(&mut self, id: NodeId, bytes: Vec<u8>) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) if node.kind == NodeKind::Ellipse => {
                let len = bytes.len();
                node.fill = Paint::Image {
                    bytes: Arc::from(bytes),
                    len,
                };
                true
            }
            _ => false,
        }
    }

    pub fn set_text(&mut self, id: NodeId, characters: &str) {
        if let Some(text) = self.nodes[id.0].text.as_mut() {
            text.characters = characters.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(characters: &str) -> TextProps {
        TextProps {
            characters: characters.to_string(),
            font: FontSpec {
                family: "Inter".to_string(),
                style: "Regular".to_string(),
            },
            size: 12.0,
            color: Rgb::BLACK,
            letter_spacing: 0.0,
            line_height: 1.2,
        }
    }

    #[test]
    fn clone_is_deep_and_independent() {
        let mut scene = Scene::new();
        let frame = scene.create_frame("Card", None);
        let label = scene.create_text("Name", text("Name"));
        scene.append_child(frame, label);

        let copy = scene.clone_subtree(frame);
        let copied_label = scene.find_named(copy, NodeKind::Text, "Name").unwrap();
        assert_ne!(copied_label, label);
        scene.set_text(copied_label, "Ada");

        assert_eq!(scene.node(label).text.as_ref().unwrap().characters, "Name");
        assert_eq!(scene.node(copy).parent, None);
        assert_eq!(scene.node(copied_label).parent, Some(copy));
    }

    #[test]
    fn append_reparents() {
        let mut scene = Scene::new();
        let a = scene.create_frame("a", None);
        let b = scene.create_frame("b", None);
        let c = scene.create_frame("c", None);
        scene.append_child(a, c);
        scene.append_child(b, c);
        assert!(scene.node(a).children.is_empty());
        assert_eq!(scene.node(b).children, vec![c]);
        assert_eq!(scene.roots(), vec![a, b]);
    }

    #[test]
    fn image_fill_only_targets_ellipses() {
        let mut scene = Scene::new();
        let frame = scene.create_frame("f", None);
        let avatar = scene.create_ellipse("Avatar", 40.0);
        assert!(!scene.set_image_fill(frame, vec![1, 2, 3]));
        assert!(scene.set_image_fill(avatar, vec![1, 2, 3]));
        assert!(matches!(scene.node(avatar).fill, Paint::Image { len: 3, .. }));
    }

    #[test]
    fn find_all_walks_in_document_order() {
        let mut scene = Scene::new();
        let root = scene.create_frame("root", None);
        let first = scene.create_text("T", text("1"));
        let inner = scene.create_frame("inner", None);
        let second = scene.create_text("T", text("2"));
        scene.append_child(root, first);
        scene.append_child(root, inner);
        scene.append_child(inner, second);
        assert_eq!(
            scene.find_all(None, NodeKind::Text, |n| n.name == "T"),
            vec![first, second]
        );
    }
}
