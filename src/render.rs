use crate::config::RenderConfig;
use crate::layout::ChartLayout;
use crate::scene::{Effect, NodeId, NodeKind, Paint, Scene, SceneNode, Stroke};
use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

pub fn render_svg(scene: &Scene, layout: &ChartLayout, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&config.background)
    ));

    for root in &layout.roots {
        render_subtree(scene, *root, &mut svg);
    }

    svg.push_str("</svg>");
    svg
}

fn render_subtree(scene: &Scene, id: NodeId, svg: &mut String) {
    let node = scene.node(id);
    if !node.visible {
        return;
    }
    match node.kind {
        NodeKind::Frame | NodeKind::Card => render_frame(node, svg),
        NodeKind::Ellipse => render_ellipse(node, svg),
        NodeKind::Text => render_text(node, svg),
    }
    for child in &node.children {
        render_subtree(scene, *child, svg);
    }
}

fn stroke_attrs(stroke: Option<&Stroke>) -> String {
    match stroke {
        Some(stroke) => format!(
            " stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"{}\"",
            stroke.color.to_hex(),
            stroke.opacity,
            stroke.weight
        ),
        None => String::new(),
    }
}

fn render_frame(node: &SceneNode, svg: &mut String) {
    for effect in &node.effects {
        let Effect::DropShadow {
            color,
            opacity,
            offset_x,
            offset_y,
            radius,
        } = effect;
        // a zero-radius shadow shows only where it sticks out past the frame
        let (line_y, line_h) = if *offset_y < 0.0 {
            (node.y + offset_y, -offset_y)
        } else {
            (node.y + node.height, *offset_y)
        };
        if line_h > 0.0 && *radius == 0.0 {
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"{}\"/>",
                node.x + offset_x,
                line_y,
                node.width,
                line_h,
                color.to_hex(),
                opacity
            ));
        }
    }

    let fill = match &node.fill {
        Paint::Solid { color } => color.to_hex(),
        _ if node.stroke.is_some() => "none".to_string(),
        _ => return,
    };
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{r}\" ry=\"{r}\" fill=\"{fill}\"{}/>",
        node.x,
        node.y,
        node.width,
        node.height,
        stroke_attrs(node.stroke.as_ref()),
        r = node.corner_radius,
    ));
}

fn render_ellipse(node: &SceneNode, svg: &mut String) {
    let rx = node.width / 2.0;
    let ry = node.height / 2.0;
    let cx = node.x + rx;
    let cy = node.y + ry;
    match &node.fill {
        Paint::Image { bytes, .. } => {
            let mime = image::guess_format(bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or("image/png");
            let clip = format!("avatar-clip-{}", node.id.index());
            svg.push_str(&format!(
                "<clipPath id=\"{clip}\"><ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\"/></clipPath>"
            ));
            svg.push_str(&format!(
                "<image x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" preserveAspectRatio=\"xMidYMid slice\" clip-path=\"url(#{clip})\" xlink:href=\"data:{mime};base64,{}\"/>",
                node.x,
                node.y,
                node.width,
                node.height,
                STANDARD.encode(bytes)
            ));
            svg.push_str(&format!(
                "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"none\"{}/>",
                stroke_attrs(node.stroke.as_ref())
            ));
        }
        Paint::Solid { color } => {
            svg.push_str(&format!(
                "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{}\"{}/>",
                color.to_hex(),
                stroke_attrs(node.stroke.as_ref())
            ));
        }
        Paint::None => {
            svg.push_str(&format!(
                "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"none\"{}/>",
                stroke_attrs(node.stroke.as_ref())
            ));
        }
    }
}

fn render_text(node: &SceneNode, svg: &mut String) {
    let Some(text) = &node.text else {
        return;
    };
    if text.characters.is_empty() {
        return;
    }
    let line_box = text.size * text.line_height;
    let font_style = if text.font.is_italic() { "italic" } else { "normal" };
    let mut y = node.y + (line_box - text.size) / 2.0 + text.size * 0.8;

    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-weight=\"{}\" font-style=\"{font_style}\" font-size=\"{}\" fill=\"{}\"",
        node.x,
        escape_xml(&text.font.family),
        text.font.weight(),
        text.size,
        text.color.to_hex()
    ));
    if text.letter_spacing != 0.0 {
        svg.push_str(&format!(" letter-spacing=\"{}\"", text.letter_spacing));
    }
    svg.push('>');
    for (idx, line) in text.characters.lines().enumerate() {
        if idx > 0 {
            y += line_box;
        }
        svg.push_str(&format!(
            "<tspan x=\"{:.2}\" y=\"{y:.2}\">{}</tspan>",
            node.x,
            escape_xml(line)
        ));
    }
    svg.push_str("</text>");
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
