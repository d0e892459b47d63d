use crate::scene::NodeId;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    pub handle: String,
    pub target_slot: NodeId,
    pub explicit_avatar_url: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarResponse {
    pub target_slot: NodeId,
    /// Empty when the lookup failed.
    pub image_bytes: Vec<u8>,
}

impl AvatarResponse {
    pub fn empty(target_slot: NodeId) -> Self {
        Self {
            target_slot,
            image_bytes: Vec::new(),
        }
    }
}

/// Where traversal sends avatar requests. Submitting never blocks.
pub trait AvatarSink {
    fn submit(&mut self, request: AvatarRequest);
}

impl AvatarSink for Vec<AvatarRequest> {
    fn submit(&mut self, request: AvatarRequest) {
        self.push(request);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Finished,
}

impl Completion {
    pub fn is_finished(self) -> bool {
        self == Completion::Finished
    }
}

/// Counts outstanding avatar requests and decides, exactly once, when a run is done:
/// traversal has completed and every issued request has been answered.
#[derive(Debug, Clone)]
pub struct AvatarCoordinator {
    enabled: bool,
    outstanding: usize,
    issued: usize,
    traversal_done: bool,
    finished: bool,
}

impl AvatarCoordinator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            outstanding: 0,
            issued: 0,
            traversal_done: false,
            finished: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn request_issued(&mut self) {
        self.outstanding += 1;
        self.issued += 1;
    }

    pub fn response_received(&mut self) -> Completion {
        if self.outstanding == 0 {
            tracing::warn!("avatar response without a matching request");
        } else {
            self.outstanding -= 1;
        }
        self.check()
    }

    pub fn traversal_completed(&mut self) -> Completion {
        self.traversal_done = true;
        if !self.enabled {
            return self.finish();
        }
        self.check()
    }

    fn check(&mut self) -> Completion {
        if self.traversal_done && self.outstanding == 0 {
            self.finish()
        } else {
            Completion::Pending
        }
    }

    fn finish(&mut self) -> Completion {
        if self.finished {
            return Completion::Pending;
        }
        self.finished = true;
        Completion::Finished
    }
}

#[async_trait]
pub trait AvatarResolver: Send + Sync {
    async fn fetch(&self, request: &AvatarRequest) -> Result<Vec<u8>>;
}

/// Runs one lookup; every failure becomes an empty response.
pub async fn resolve_avatar(resolver: &dyn AvatarResolver, request: AvatarRequest) -> AvatarResponse {
    match resolver.fetch(&request).await {
        Ok(bytes) => {
            if bytes.is_empty() {
                tracing::warn!(handle = %request.handle, "avatar lookup returned no data");
            }
            AvatarResponse {
                target_slot: request.target_slot,
                image_bytes: bytes,
            }
        }
        Err(err) => {
            tracing::warn!(handle = %request.handle, error = %err, "avatar lookup failed");
            AvatarResponse::empty(request.target_slot)
        }
    }
}

/// Reads `{dir}/{handle}.{png,jpg,jpeg,gif,webp}`.
#[derive(Debug, Clone)]
pub struct DirectoryAvatarResolver {
    dir: PathBuf,
}

impl DirectoryAvatarResolver {
    const EXTENSIONS: [&'static str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AvatarResolver for DirectoryAvatarResolver {
    async fn fetch(&self, request: &AvatarRequest) -> Result<Vec<u8>> {
        if request.handle.is_empty() || request.handle.contains(['/', '\\']) {
            return Err(anyhow!("no usable handle for a local avatar lookup"));
        }
        for ext in Self::EXTENSIONS {
            let path = self.dir.join(format!("{}.{ext}", request.handle));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()));
            }
        }
        Err(anyhow!("no avatar file for {}", request.handle))
    }
}

/// Resolves through the network: an explicit URL is fetched as is, otherwise
/// `{base_url}{handle}.png`.
#[cfg(feature = "http")]
pub struct HttpAvatarResolver {
    http: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpAvatarResolver {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    pub fn avatar_url(request: &AvatarRequest) -> Option<String> {
        if let Some(url) = request.explicit_avatar_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        if request.handle.is_empty() {
            return None;
        }
        Some(format!("{}{}.png", request.base_url, request.handle))
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl AvatarResolver for HttpAvatarResolver {
    async fn fetch(&self, request: &AvatarRequest) -> Result<Vec<u8>> {
        let url = Self::avatar_url(request).ok_or_else(|| anyhow!("nothing to fetch"))?;
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("avatar request to {url} returned {status}"));
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
