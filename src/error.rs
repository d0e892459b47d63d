use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to parse chart document: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("font not available: {family} {style}")]
    FontLoad { family: String, style: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("render failed: {0}")]
    Render(String),
    #[error("avatar responses stopped with {outstanding} request(s) outstanding")]
    AvatarChannelClosed { outstanding: usize },
}

pub type ChartResult<T> = Result<T, ChartError>;
