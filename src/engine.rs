//! Walks a chart document and builds team frames and person cards on a [`Scene`].
//!
//! Within one mapping every key is dispatched first, left to right, and only then
//! is each structured value descended into, left to right. The container a key
//! lands in is whatever the most recent `team`/`teams` dispatch selected.

use crate::avatar::{AvatarCoordinator, AvatarRequest, AvatarSink};
use crate::config::{ChartConfig, LayoutConfig};
use crate::container::{ContainerRole, apply_grouping_effect, make_container};
use crate::document::{ChartKey, DocValue};
use crate::scene::{Align, NodeId, NodeKind, Scene};
use crate::template::{ALIAS_SLOT, AVATAR_SLOT, CardTemplate, META_SLOT, NAME_SLOT, text_props};
use crate::theme::Palette;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed once per build so container names never collide with a previous run's leftovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunSignature(u64);

impl RunSignature {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    pub fn from_value(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RunSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub display_name: String,
    pub role: ContainerRole,
    pub run: RunSignature,
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} – {}", self.display_name, self.role, self.run)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub containers: usize,
    pub cards: usize,
    pub sections: usize,
    pub labels: usize,
    pub avatar_requests: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ChartContext<'a> {
    pub config: &'a ChartConfig,
    pub palette: &'a Palette,
    pub layout: &'a LayoutConfig,
    pub template: CardTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOutcome {
    pub root: Option<NodeId>,
    pub stats: TraversalStats,
}

#[derive(Debug)]
struct ContainerRecord {
    node: NodeId,
    key: ContainerKey,
    labeled: bool,
}

impl ContainerRecord {
    /// Display name a `teams` key derives from this container. Only a team's
    /// marker is stripped; a group keeps its full name, so a nested group
    /// never resolves back to its parent.
    fn group_display_name(&self) -> String {
        match self.key.role {
            ContainerRole::Team => self.key.display_name.clone(),
            ContainerRole::Teams => self.key.to_string(),
        }
    }
}

/// One person entry (manager or member). Empty strings count as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersonEntry<'a> {
    pub name: Option<&'a str>,
    pub alias: Option<&'a str>,
    pub meta: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

impl<'a> PersonEntry<'a> {
    pub fn from_value(value: &'a DocValue) -> Self {
        Self {
            name: value.field("name"),
            alias: value.field("alias"),
            meta: value.field("meta"),
            avatar: value.field("avatar"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.alias.is_none() && self.meta.is_none() && self.avatar.is_none()
    }

    fn handle(&self) -> Option<&'a str> {
        let alias = self.alias?;
        let handle = alias.strip_prefix('@').unwrap_or(alias).trim();
        (!handle.is_empty()).then_some(handle)
    }
}

pub struct Traversal<'a, S: AvatarSink> {
    scene: &'a mut Scene,
    ctx: ChartContext<'a>,
    signature: RunSignature,
    avatars: &'a mut AvatarCoordinator,
    sink: &'a mut S,
    current: Option<usize>,
    records: Vec<ContainerRecord>,
    index: HashMap<ContainerKey, usize>,
    stats: TraversalStats,
}

impl<'a, S: AvatarSink> Traversal<'a, S> {
    pub fn new(
        scene: &'a mut Scene,
        ctx: ChartContext<'a>,
        signature: RunSignature,
        avatars: &'a mut AvatarCoordinator,
        sink: &'a mut S,
    ) -> Self {
        Self {
            scene,
            ctx,
            signature,
            avatars,
            sink,
            current: None,
            records: Vec::new(),
            index: HashMap::new(),
            stats: TraversalStats::default(),
        }
    }

    pub fn run(mut self, root: &DocValue) -> TraversalOutcome {
        self.traverse(root);
        TraversalOutcome {
            root: self.records.first().map(|r| r.node),
            stats: self.stats,
        }
    }

    fn traverse(&mut self, value: &DocValue) {
        match value {
            DocValue::Mapping(entries) => {
                for (key, child) in entries {
                    self.dispatch(ChartKey::classify(key), child);
                }
                for (key, child) in entries {
                    if ChartKey::classify(key) == ChartKey::Config {
                        continue;
                    }
                    if child.is_structured() {
                        self.traverse(child);
                    }
                }
            }
            DocValue::Sequence(items) => {
                for item in items.iter().filter(|item| item.is_structured()) {
                    self.traverse(item);
                }
            }
            DocValue::Scalar(_) | DocValue::Null => {}
        }
    }

    fn dispatch(&mut self, key: ChartKey<'_>, value: &DocValue) {
        match key {
            ChartKey::Team => self.enter_team(value),
            ChartKey::Teams => self.enter_teams(value),
            ChartKey::Manager => self.add_manager(value),
            ChartKey::Members => self.add_members(value),
            ChartKey::Config | ChartKey::Unrecognized(_) => {}
        }
    }

    fn key(&self, display_name: &str, role: ContainerRole) -> ContainerKey {
        ContainerKey {
            display_name: display_name.to_string(),
            role,
            run: self.signature,
        }
    }

    fn create_container(&mut self, key: &ContainerKey, parent: Option<NodeId>) -> usize {
        let is_root = self.records.is_empty();
        let node = make_container(self.scene, &key.to_string(), key.role, is_root, self.ctx.layout);
        if let Some(parent) = parent {
            self.scene.append_child(parent, node);
        }
        self.stats.containers += 1;
        tracing::debug!(name = %key, %node, is_root, "container created");
        self.records.push(ContainerRecord {
            node,
            key: key.clone(),
            labeled: false,
        });
        self.records.len() - 1
    }

    fn find_or_create(&mut self, display_name: &str, role: ContainerRole) -> usize {
        let key = self.key(display_name, role);
        if let Some(&idx) = self.index.get(&key) {
            tracing::debug!(name = %key, "container reused");
            return idx;
        }
        let parent = self.current_node();
        let idx = self.create_container(&key, parent);
        self.index.insert(key, idx);
        idx
    }

    fn current_node(&self) -> Option<NodeId> {
        self.current.map(|idx| self.records[idx].node)
    }

    fn enter_team(&mut self, value: &DocValue) {
        let Some(display_name) = value.as_scalar() else {
            tracing::debug!("skipping non-scalar team value");
            return;
        };
        let idx = self.find_or_create(display_name, ContainerRole::Team);
        self.current = Some(idx);

        let record = &self.records[idx];
        if record.labeled || display_name.is_empty() {
            return;
        }
        let node = record.node;
        let config = self.ctx.config;
        let layout = self.ctx.layout;
        let props = text_props(display_name, &config.text.team, self.ctx.palette.primary_text, layout);
        let label = self.scene.create_text("Team", props);
        self.scene
            .node_mut(label)
            .resize(layout.team_label_width, layout.label_height);
        self.scene.append_child(node, label);
        self.records[idx].labeled = true;
        self.stats.labels += 1;
    }

    fn enter_teams(&mut self, value: &DocValue) {
        let display_name = self
            .current
            .map(|idx| self.records[idx].group_display_name())
            .unwrap_or_default();
        let idx = self.find_or_create(&display_name, ContainerRole::Teams);
        self.current = Some(idx);
        let group = self.records[idx].node;
        apply_grouping_effect(self.scene, group);

        let Some(entries) = value.as_sequence() else {
            return;
        };
        for entry in entries {
            match entry.field("team") {
                Some(team) => {
                    let key = self.key(team, ContainerRole::Team);
                    if self.index.contains_key(&key) {
                        continue;
                    }
                    let sub = self.create_container(&key, Some(group));
                    self.index.insert(key, sub);
                }
                None => {
                    let key = self.key("", ContainerRole::Team);
                    self.create_container(&key, Some(group));
                }
            }
        }
    }

    fn add_manager(&mut self, value: &DocValue) {
        if value.as_mapping().is_none() {
            tracing::debug!("skipping manager that is not a mapping");
            return;
        }
        self.add_card(PersonEntry::from_value(value));
    }

    fn add_members(&mut self, value: &DocValue) {
        let Some(entries) = value.as_sequence() else {
            tracing::debug!("skipping members that is not a sequence");
            return;
        };
        let Some(container) = self.current_node() else {
            tracing::warn!("members listed before any team, skipping");
            return;
        };

        for entry in entries.iter().filter(|e| e.as_mapping().is_some()) {
            let person = PersonEntry::from_value(entry);
            match entry.field("section") {
                Some(section) if person.is_empty() => self.add_section(container, section),
                _ => self.add_card(person),
            }
        }

        if let Some(auto) = self.scene.node_mut(container).auto_layout.as_mut() {
            auto.counter_align = Align::Max;
            auto.item_spacing = self.ctx.layout.members_item_spacing;
        }
    }

    fn add_section(&mut self, container: NodeId, section: &str) {
        let config = self.ctx.config;
        let layout = self.ctx.layout;
        let props = text_props(section, &config.text.team, self.ctx.palette.primary_text, layout);
        let label = self.scene.create_text("Section", props);
        self.scene
            .node_mut(label)
            .resize(layout.section_label_width, layout.label_height);
        self.scene.append_child(container, label);
        self.stats.sections += 1;
    }

    fn add_card(&mut self, person: PersonEntry<'_>) {
        let Some(container) = self.current_node() else {
            tracing::warn!(name = ?person.name, "person listed before any team, skipping");
            return;
        };
        let card = self
            .ctx
            .template
            .instantiate(self.scene, person.name.unwrap_or("Card"));
        self.scene.append_child(container, card);
        self.scene
            .node_mut(card)
            .resize(self.ctx.layout.card_width, self.ctx.layout.card_height);
        self.stats.cards += 1;

        if fill_card_content(self.scene, card, &person, self.ctx.config, self.avatars, self.sink) {
            self.stats.avatar_requests += 1;
        }
    }
}

/// Writes the person's text into the card's slots and, when avatars are on and
/// there is something to look up, emits one avatar request. Returns whether a
/// request was emitted. Missing slots are skipped.
pub fn fill_card_content<S: AvatarSink + ?Sized>(
    scene: &mut Scene,
    card: NodeId,
    person: &PersonEntry<'_>,
    config: &ChartConfig,
    avatars: &mut AvatarCoordinator,
    sink: &mut S,
) -> bool {
    for (slot, value) in [
        (NAME_SLOT, person.name),
        (ALIAS_SLOT, person.alias),
        (META_SLOT, person.meta),
    ] {
        if let (Some(id), Some(text)) = (scene.find_named(card, NodeKind::Text, slot), value) {
            scene.set_text(id, text);
        }
    }

    if !config.avatar {
        return false;
    }
    let handle = person.handle();
    if handle.is_none() && person.avatar.is_none() {
        return false;
    }
    let Some(target_slot) = scene.find_named(card, NodeKind::Ellipse, AVATAR_SLOT) else {
        return false;
    };
    sink.submit(AvatarRequest {
        handle: handle.unwrap_or_default().to_string(),
        target_slot,
        explicit_avatar_url: person.avatar.map(str::to_string),
        base_url: config.ogurl.clone(),
    });
    avatars.request_issued();
    true
}
