use crate::engine::TraversalStats;
use crate::layout::ChartLayout;
use crate::scene::{NodeId, NodeKind, Paint, Scene};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub stats: TraversalStats,
    pub roots: Vec<NodeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: usize,
    pub kind: NodeKind,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub fill: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDump>,
}

impl NodeDump {
    fn from_node(scene: &Scene, id: NodeId) -> Self {
        let node = scene.node(id);
        let fill = match &node.fill {
            Paint::None => "none".to_string(),
            Paint::Solid { color } => color.to_hex(),
            Paint::Image { len, .. } => format!("image ({len} bytes)"),
        };
        let children = node
            .children
            .iter()
            .filter(|c| scene.node(**c).visible)
            .map(|c| NodeDump::from_node(scene, *c))
            .collect();
        NodeDump {
            id: id.index(),
            kind: node.kind,
            name: node.name.clone(),
            x: node.x,
            y: node.y,
            width: node.width,
            height: node.height,
            text: node.text.as_ref().map(|t| t.characters.clone()),
            fill,
            children,
        }
    }
}

impl LayoutDump {
    pub fn from_scene(scene: &Scene, layout: &ChartLayout, stats: TraversalStats) -> Self {
        LayoutDump {
            width: layout.width,
            height: layout.height,
            stats,
            roots: layout
                .roots
                .iter()
                .map(|root| NodeDump::from_node(scene, *root))
                .collect(),
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::fonts::{FastTextMetrics, FontBook};
    use crate::scene::{Align, AutoLayout, Axis, Padding};

    #[test]
    fn dump_skips_hidden_nodes_and_nests_children() {
        let mut scene = Scene::new();
        let hidden_root = scene.create_frame("template", None);
        scene.node_mut(hidden_root).visible = false;
        let root = scene.create_frame(
            "root",
            Some(AutoLayout {
                axis: Axis::Vertical,
                item_spacing: 0.0,
                padding: Padding::default(),
                primary_align: Align::Min,
                counter_align: Align::Min,
            }),
        );
        let avatar = scene.create_ellipse("Avatar", 40.0);
        scene.append_child(root, avatar);
        scene.set_image_fill(avatar, vec![0; 12]);

        let fonts = FontBook::load(&mut FastTextMetrics::new(), &Default::default()).unwrap();
        let layout = crate::layout::compute_layout(&mut scene, &fonts, &LayoutConfig::default());
        let dump = LayoutDump::from_scene(&scene, &layout, TraversalStats::default());

        assert_eq!(dump.roots.len(), 1);
        assert_eq!(dump.roots[0].children[0].fill, "image (12 bytes)");

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["roots"][0]["kind"], "frame");
        assert_eq!(json["roots"][0]["height"], 40.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        write_layout_dump(Some(&path), &dump).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["stats"]["cards"], 0);
    }
}
