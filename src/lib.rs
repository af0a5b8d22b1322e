pub mod animation;
pub mod config;
pub mod render;
pub mod utils;

// Re-export commonly used types
pub use animation::AnimationDriver;
pub use config::{AppConfig, RenderConfig};
pub use render::camera::Viewport;
pub use render::context::{GlowContext, RenderContext};
pub use render::mesh::Mesh;
pub use render::pipeline::{FrameOutcome, FrameRenderer, RendererState};
pub use render::recording::RecordingContext;
pub use render::shaders::{cube_shaders, ShaderBindings, ShaderSource};
pub use utils::diagnostics::{Diagnostics, LogDiagnostics};
pub use utils::error::RenderError;
