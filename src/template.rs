use crate::config::{ChartConfig, LayoutConfig, TextStyle};
use crate::fonts::{FontBook, FontSpec};
use crate::scene::{Align, AutoLayout, Axis, NodeId, NodeKind, Padding, Paint, Scene, Sizing, Stroke, TextProps};
use crate::theme::{Palette, Rgb};

pub const CARD_NAME: &str = "Card";
pub const AVATAR_SLOT: &str = "Avatar";
pub const TEXT_FRAME: &str = "TextFrame";
pub const NAME_SLOT: &str = "Name";
pub const ALIAS_SLOT: &str = "Alias";
pub const META_SLOT: &str = "Meta";
pub const SPACER: &str = "Spacer";

/// The hidden prototype every person card is cloned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardTemplate {
    pub node: NodeId,
}

impl CardTemplate {
    /// Clones the prototype into an independent, visible card named `name`.
    pub fn instantiate(&self, scene: &mut Scene, name: &str) -> NodeId {
        let card = scene.clone_subtree(self.node);
        let node = scene.node_mut(card);
        node.visible = true;
        node.name = name.to_string();
        card
    }

    pub fn slot(&self, scene: &Scene, kind: NodeKind, name: &str) -> Option<NodeId> {
        scene.find_named(self.node, kind, name)
    }
}

pub fn text_props(
    characters: &str,
    style: &TextStyle,
    color: Rgb,
    layout: &LayoutConfig,
) -> TextProps {
    TextProps {
        characters: characters.to_string(),
        font: FontSpec::from(style),
        size: style.size,
        color,
        letter_spacing: 0.0,
        line_height: layout.line_height,
    }
}

/// Builds the card prototype. `fonts` is the proof that every text role loaded.
pub fn build_template(
    scene: &mut Scene,
    config: &ChartConfig,
    palette: &Palette,
    fonts: &FontBook,
    layout: &LayoutConfig,
) -> CardTemplate {
    debug_assert!(
        config
            .text
            .roles()
            .iter()
            .all(|(_, style)| fonts.contains(&FontSpec::from(*style))),
        "template built before fonts were loaded"
    );

    let card = scene.create_card(
        CARD_NAME,
        AutoLayout {
            axis: Axis::Horizontal,
            item_spacing: layout.card_item_spacing,
            padding: Padding::symmetric(layout.card_padding_x, layout.card_padding_y),
            primary_align: Align::Min,
            counter_align: Align::Center,
        },
    );
    {
        let node = scene.node_mut(card);
        node.fill = Paint::Solid {
            color: palette.background,
        };
        node.stroke = Some(Stroke {
            color: palette.border,
            opacity: 1.0,
            weight: layout.card_stroke_weight,
        });
        node.corner_radius = layout.card_corner_radius;
        node.resize(layout.template_width, layout.card_height);
        node.visible = false;
    }

    if config.avatar {
        let avatar = scene.create_ellipse(AVATAR_SLOT, layout.avatar_size);
        let node = scene.node_mut(avatar);
        node.fill = Paint::Solid {
            color: palette.border,
        };
        node.stroke = Some(Stroke {
            color: Rgb::BLACK,
            opacity: 0.12,
            weight: 1.0,
        });
        scene.append_child(card, avatar);
    }

    let text_frame = scene.create_frame(
        TEXT_FRAME,
        Some(AutoLayout {
            axis: Axis::Vertical,
            item_spacing: 0.0,
            padding: Padding::default(),
            primary_align: Align::Min,
            counter_align: Align::Min,
        }),
    );
    {
        let node = scene.node_mut(text_frame);
        node.width = layout.text_frame_width;
        node.sizing_x = Sizing::Fixed;
    }
    scene.append_child(card, text_frame);

    if config.name {
        let props = text_props(NAME_SLOT, &config.text.name, palette.primary_text, layout);
        let name = scene.create_text(NAME_SLOT, props);
        scene.append_child(text_frame, name);
    }

    if config.alias {
        let props = text_props("@alias", &config.text.alias, palette.primary_text, layout);
        let alias = scene.create_text(ALIAS_SLOT, props);
        scene.append_child(text_frame, alias);
    }

    let spacer = scene.create_frame(SPACER, None);
    scene
        .node_mut(spacer)
        .resize(layout.spacer_size, layout.spacer_size);
    scene.append_child(text_frame, spacer);

    if config.meta {
        let mut props = text_props(META_SLOT, &config.text.meta, palette.secondary_text, layout);
        props.letter_spacing = layout.meta_letter_spacing;
        let meta = scene.create_text(META_SLOT, props);
        scene.append_child(text_frame, meta);
    }

    tracing::debug!(node = %card, avatar = config.avatar, "card template built");
    CardTemplate { node: card }
}
