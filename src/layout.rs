//! Auto-layout pass: sizes hug frames bottom-up, then assigns absolute positions
//! top-down. Hidden nodes (the card template) take no part.

use crate::config::LayoutConfig;
use crate::fonts::FontBook;
use crate::scene::{Align, Axis, NodeId, NodeKind, Scene, Sizing};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub width: f32,
    pub height: f32,
    pub roots: Vec<NodeId>,
}

pub fn compute_layout(scene: &mut Scene, fonts: &FontBook, config: &LayoutConfig) -> ChartLayout {
    let roots: Vec<NodeId> = scene
        .roots()
        .into_iter()
        .filter(|id| scene.node(*id).visible)
        .collect();

    let mut x = 0.0f32;
    let mut height = 0.0f32;
    for (idx, root) in roots.iter().enumerate() {
        if idx > 0 {
            x += config.root_gap;
        }
        let (w, h) = measure(scene, fonts, *root);
        place(scene, *root, x, 0.0);
        x += w;
        height = height.max(h);
    }

    tracing::debug!(width = x, height, roots = roots.len(), "layout computed");
    ChartLayout {
        width: x,
        height,
        roots,
    }
}

fn visible_children(scene: &Scene, id: NodeId) -> Vec<NodeId> {
    scene
        .node(id)
        .children
        .iter()
        .copied()
        .filter(|c| scene.node(*c).visible)
        .collect()
}

fn measure(scene: &mut Scene, fonts: &FontBook, id: NodeId) -> (f32, f32) {
    let children = visible_children(scene, id);
    let child_sizes: Vec<(f32, f32)> = children
        .iter()
        .map(|child| measure(scene, fonts, *child))
        .collect();

    let node = scene.node_mut(id);
    match node.kind {
        NodeKind::Text => {
            if let Some(text) = &node.text {
                if node.sizing_x == Sizing::Hug {
                    node.width = fonts.measure(&text.font, &text.characters, text.size, text.letter_spacing);
                }
                if node.sizing_y == Sizing::Hug {
                    let lines = text.characters.lines().count().max(1) as f32;
                    node.height = text.size * text.line_height * lines;
                }
            }
        }
        NodeKind::Frame | NodeKind::Card => {
            if let Some(auto) = node.auto_layout {
                let gaps = child_sizes.len().saturating_sub(1) as f32 * auto.item_spacing;
                let (primary, counter) = child_sizes.iter().fold((0.0f32, 0.0f32), |(p, c), (w, h)| {
                    match auto.axis {
                        Axis::Horizontal => (p + w, c.max(*h)),
                        Axis::Vertical => (p + h, c.max(*w)),
                    }
                });
                let pad = auto.padding;
                let (content_w, content_h) = match auto.axis {
                    Axis::Horizontal => (primary + gaps, counter),
                    Axis::Vertical => (counter, primary + gaps),
                };
                if node.sizing_x == Sizing::Hug {
                    node.width = content_w + pad.left + pad.right;
                }
                if node.sizing_y == Sizing::Hug {
                    node.height = content_h + pad.top + pad.bottom;
                }
            }
        }
        NodeKind::Ellipse => {}
    }
    (node.width, node.height)
}

fn align_offset(align: Align, available: f32, size: f32) -> f32 {
    match align {
        Align::Min => 0.0,
        Align::Center => (available - size) / 2.0,
        Align::Max => available - size,
    }
}

fn place(scene: &mut Scene, id: NodeId, x: f32, y: f32) {
    let (auto, width, height) = {
        let node = scene.node_mut(id);
        node.x = x;
        node.y = y;
        (node.auto_layout, node.width, node.height)
    };
    let children = visible_children(scene, id);
    let Some(auto) = auto else {
        for child in children {
            place(scene, child, x, y);
        }
        return;
    };

    let pad = auto.padding;
    let inner_w = width - pad.left - pad.right;
    let inner_h = height - pad.top - pad.bottom;
    let sizes: Vec<(f32, f32)> = children
        .iter()
        .map(|c| {
            let node = scene.node(*c);
            (node.width, node.height)
        })
        .collect();
    let gaps = sizes.len().saturating_sub(1) as f32 * auto.item_spacing;
    let total: f32 = sizes
        .iter()
        .map(|(w, h)| match auto.axis {
            Axis::Horizontal => *w,
            Axis::Vertical => *h,
        })
        .sum::<f32>()
        + gaps;

    let mut cursor = match auto.axis {
        Axis::Horizontal => align_offset(auto.primary_align, inner_w, total),
        Axis::Vertical => align_offset(auto.primary_align, inner_h, total),
    };
    for (child, (w, h)) in children.into_iter().zip(sizes) {
        let (cx, cy, advance) = match auto.axis {
            Axis::Horizontal => (cursor, align_offset(auto.counter_align, inner_h, h), w),
            Axis::Vertical => (align_offset(auto.counter_align, inner_w, w), cursor, h),
        };
        place(scene, child, x + pad.left + cx, y + pad.top + cy);
        cursor += advance + auto.item_spacing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartConfig, TextConfig};
    use crate::fonts::{FastTextMetrics, FontSpec};
    use crate::scene::{AutoLayout, Padding, TextProps};
    use crate::theme::Rgb;

    fn fonts() -> FontBook {
        FontBook::load(&mut FastTextMetrics::new(), &TextConfig::default()).unwrap()
    }

    fn text(scene: &mut Scene, characters: &str) -> NodeId {
        let style = &ChartConfig::default().text.name;
        scene.create_text(
            "T",
            TextProps {
                characters: characters.to_string(),
                font: FontSpec::from(style),
                size: 10.0,
                color: Rgb::BLACK,
                letter_spacing: 0.0,
                line_height: 1.2,
            },
        )
    }

    fn column(spacing: f32, padding: Padding, counter: Align) -> AutoLayout {
        AutoLayout {
            axis: Axis::Vertical,
            item_spacing: spacing,
            padding,
            primary_align: Align::Min,
            counter_align: counter,
        }
    }

    #[test]
    fn hug_frame_wraps_children_with_padding_and_spacing() {
        let mut scene = Scene::new();
        let frame = scene.create_frame("f", Some(column(10.0, Padding::symmetric(5.0, 7.0), Align::Min)));
        for size in [(40.0, 20.0), (60.0, 30.0)] {
            let child = scene.create_frame("c", None);
            scene.node_mut(child).resize(size.0, size.1);
            scene.append_child(frame, child);
        }
        let layout = compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        let node = scene.node(frame);
        assert_eq!((node.width, node.height), (70.0, 74.0));
        assert_eq!((layout.width, layout.height), (70.0, 74.0));

        let second = scene.node(frame).children[1];
        assert_eq!((scene.node(second).x, scene.node(second).y), (5.0, 37.0));
    }

    #[test]
    fn counter_alignment_centers_and_ends() {
        let mut scene = Scene::new();
        let frame = scene.create_frame("f", Some(column(0.0, Padding::default(), Align::Center)));
        let wide = scene.create_frame("wide", None);
        scene.node_mut(wide).resize(100.0, 10.0);
        let narrow = scene.create_frame("narrow", None);
        scene.node_mut(narrow).resize(40.0, 10.0);
        scene.append_child(frame, wide);
        scene.append_child(frame, narrow);

        compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        assert_eq!(scene.node(narrow).x, 30.0);

        scene.node_mut(frame).auto_layout.as_mut().unwrap().counter_align = Align::Max;
        compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        assert_eq!(scene.node(narrow).x, 60.0);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut scene = Scene::new();
        let template = scene.create_frame("template", None);
        scene.node_mut(template).resize(500.0, 500.0);
        scene.node_mut(template).visible = false;

        let frame = scene.create_frame("f", Some(column(8.0, Padding::default(), Align::Min)));
        let shown = scene.create_frame("shown", None);
        scene.node_mut(shown).resize(10.0, 10.0);
        let hidden = scene.create_frame("hidden", None);
        scene.node_mut(hidden).resize(10.0, 10.0);
        scene.node_mut(hidden).visible = false;
        scene.append_child(frame, shown);
        scene.append_child(frame, hidden);

        let layout = compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        assert_eq!(layout.roots, vec![frame]);
        assert_eq!((layout.width, layout.height), (10.0, 10.0));
    }

    #[test]
    fn text_hugs_measured_width() {
        let mut scene = Scene::new();
        let short = text(&mut scene, "Al");
        let long = text(&mut scene, "Alexandra");
        let layout = compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        assert!(scene.node(long).width > scene.node(short).width);
        assert!((scene.node(short).height - 12.0).abs() < 1e-4);
        assert_eq!(layout.roots.len(), 2);
        assert_eq!(
            scene.node(long).x,
            scene.node(short).width + LayoutConfig::default().root_gap
        );
    }

    #[test]
    fn fixed_width_text_keeps_its_width() {
        let mut scene = Scene::new();
        let label = text(&mut scene, "A very long team name that overflows");
        scene.node_mut(label).width = 50.0;
        scene.node_mut(label).sizing_x = Sizing::Fixed;
        compute_layout(&mut scene, &fonts(), &LayoutConfig::default());
        assert_eq!(scene.node(label).width, 50.0);
    }
}
