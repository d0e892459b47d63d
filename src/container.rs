use crate::config::LayoutConfig;
use crate::scene::{Align, AutoLayout, Axis, Effect, NodeId, Padding, Scene};
use crate::theme::Rgb;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    Team,
    Teams,
}

impl ContainerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerRole::Team => "team",
            ContainerRole::Teams => "teams",
        }
    }
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates a team (vertical) or team-group (horizontal) frame. The root frame
/// gets generous padding on every side, nested frames only top/bottom.
pub fn make_container(
    scene: &mut Scene,
    name: &str,
    role: ContainerRole,
    is_root: bool,
    layout: &LayoutConfig,
) -> NodeId {
    let padding = if is_root {
        Padding::symmetric(layout.root_padding_x, layout.root_padding_y)
    } else {
        Padding {
            top: layout.nested_padding_top,
            bottom: layout.nested_padding_bottom,
            ..Padding::default()
        }
    };
    let auto_layout = match role {
        ContainerRole::Teams => AutoLayout {
            axis: Axis::Horizontal,
            item_spacing: layout.teams_item_spacing,
            padding,
            primary_align: Align::Min,
            counter_align: Align::Min,
        },
        ContainerRole::Team => AutoLayout {
            axis: Axis::Vertical,
            item_spacing: layout.team_item_spacing,
            padding,
            primary_align: Align::Min,
            counter_align: Align::Center,
        },
    };
    scene.create_frame(name, Some(auto_layout))
}

/// Thin line above a team group, drawn as a hard-edged shadow.
pub fn apply_grouping_effect(scene: &mut Scene, id: NodeId) {
    scene.node_mut(id).effects = vec![Effect::DropShadow {
        color: Rgb::BLACK,
        opacity: 0.2,
        offset_x: 0.0,
        offset_y: -1.0,
        radius: 0.0,
    }];
}
