pub mod atlas;
pub mod config;
pub mod hotbar;
pub mod server;

// Curated re-exports
pub use atlas::{build_atlas, inspect, write_outputs, AtlasArtifact, AtlasError, AtlasManifest};
pub use config::{AppConfig, AtlasConfig, MountConfig, ServerConfig};
pub use hotbar::render_hotbar;
pub use server::{serve, ServeError};
