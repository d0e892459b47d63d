//! One chart-build run, from document text to a finished scene.

use crate::avatar::{AvatarCoordinator, AvatarRequest, AvatarResolver, AvatarResponse, AvatarSink, resolve_avatar};
use crate::config::{ChartConfig, LayoutConfig, resolve};
use crate::document::{DocumentFormat, parse_document};
use crate::engine::{ChartContext, RunSignature, Traversal, TraversalStats};
use crate::error::{ChartError, ChartResult};
use crate::fonts::{FontBook, FontProvider};
use crate::scene::{NodeId, Scene};
use crate::template::build_template;
use crate::theme::Palette;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct ChartOutcome {
    pub scene: Scene,
    pub root: Option<NodeId>,
    pub config: ChartConfig,
    pub palette: Palette,
    pub fonts: FontBook,
    pub stats: TraversalStats,
    pub avatars_applied: usize,
    pub signature: RunSignature,
}

/// Starts each lookup as its own task as soon as traversal emits it.
struct SpawningSink {
    resolver: Arc<dyn AvatarResolver>,
    tasks: JoinSet<AvatarResponse>,
}

impl SpawningSink {
    fn new(resolver: Arc<dyn AvatarResolver>) -> Self {
        Self {
            resolver,
            tasks: JoinSet::new(),
        }
    }
}

impl AvatarSink for SpawningSink {
    fn submit(&mut self, request: AvatarRequest) {
        let resolver = Arc::clone(&self.resolver);
        self.tasks
            .spawn(async move { resolve_avatar(resolver.as_ref(), request).await });
    }
}

/// Resolver used when avatars are off: every lookup fails.
pub struct NoAvatars;

#[async_trait::async_trait]
impl AvatarResolver for NoAvatars {
    async fn fetch(&self, request: &AvatarRequest) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!("avatar lookups disabled for {}", request.handle))
    }
}

pub struct ChartSession {
    base: ChartConfig,
    layout: LayoutConfig,
    fonts: Box<dyn FontProvider + Send>,
    resolver: Arc<dyn AvatarResolver>,
    signature: Option<RunSignature>,
    avatars_disabled: bool,
}

impl ChartSession {
    pub fn new(
        base: ChartConfig,
        fonts: impl FontProvider + Send + 'static,
        resolver: Arc<dyn AvatarResolver>,
    ) -> Self {
        Self {
            base,
            layout: LayoutConfig::default(),
            fonts: Box::new(fonts),
            resolver,
            signature: None,
            avatars_disabled: false,
        }
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Pins the run signature instead of taking the clock at build time.
    pub fn with_signature(mut self, signature: RunSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Turns avatars off regardless of what the document's config says.
    pub fn without_avatars(mut self) -> Self {
        self.avatars_disabled = true;
        self
    }

    pub async fn build(&mut self, input: &str, format: DocumentFormat) -> ChartResult<ChartOutcome> {
        let document = parse_document(input, format)?;
        let mut config = resolve(&self.base, document.config.as_ref())?;
        if self.avatars_disabled {
            config.avatar = false;
        }
        let palette = Palette::from_colors(&config.color);
        let fonts = FontBook::load(self.fonts.as_mut(), &config.text)?;
        let signature = self.signature.unwrap_or_else(RunSignature::now);
        tracing::info!(%signature, avatars = config.avatar, "chart build started");

        let mut scene = Scene::new();
        let template = build_template(&mut scene, &config, &palette, &fonts, &self.layout);
        let mut coordinator = AvatarCoordinator::new(config.avatar);
        let mut sink = SpawningSink::new(Arc::clone(&self.resolver));
        let ctx = ChartContext {
            config: &config,
            palette: &palette,
            layout: &self.layout,
            template,
        };
        let traversal =
            Traversal::new(&mut scene, ctx, signature, &mut coordinator, &mut sink).run(&document.root);

        let mut completion = coordinator.traversal_completed();
        let mut tasks = sink.tasks;
        let mut avatars_applied = 0;
        while !completion.is_finished() {
            match tasks.join_next().await {
                Some(Ok(response)) => {
                    if apply_avatar(&mut scene, response) {
                        avatars_applied += 1;
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "avatar task did not complete");
                }
                None => {
                    return Err(ChartError::AvatarChannelClosed {
                        outstanding: coordinator.outstanding(),
                    });
                }
            }
            completion = coordinator.response_received();
        }

        tracing::info!(
            containers = traversal.stats.containers,
            cards = traversal.stats.cards,
            sections = traversal.stats.sections,
            avatar_requests = traversal.stats.avatar_requests,
            avatars_applied,
            "chart build finished"
        );
        Ok(ChartOutcome {
            scene,
            root: traversal.root,
            config,
            palette,
            fonts,
            stats: traversal.stats,
            avatars_applied,
            signature,
        })
    }
}

/// Fills the target slot with the response's image. Empty or unrecognized
/// bytes leave the placeholder fill untouched.
pub fn apply_avatar(scene: &mut Scene, response: AvatarResponse) -> bool {
    if response.image_bytes.is_empty() {
        return false;
    }
    match image::guess_format(&response.image_bytes) {
        Ok(format) => {
            tracing::debug!(slot = %response.target_slot, ?format, "avatar applied");
            scene.set_image_fill(response.target_slot, response.image_bytes)
        }
        Err(err) => {
            tracing::warn!(slot = %response.target_slot, error = %err, "avatar bytes are not an image");
            false
        }
    }
}
