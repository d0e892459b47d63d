pub mod avatar;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod container;
pub mod document;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod host;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod scene;
pub mod session;
pub mod template;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use document::{DocumentFormat, parse_document};
pub use error::{ChartError, ChartResult};
pub use session::{ChartOutcome, ChartSession};
