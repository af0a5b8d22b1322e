pub mod buffers;
pub mod camera;
pub mod context;
pub mod mesh;
pub mod pipeline;
pub mod recording;
pub mod shaders;

pub use buffers::GeometryBuffers;
pub use camera::{Camera, Viewport};
pub use context::{GlowContext, RenderContext};
pub use mesh::Mesh;
pub use pipeline::{AnimationClock, FrameOutcome, FrameRenderer, RendererState};
pub use recording::RecordingContext;
pub use shaders::{Program, ShaderBindings, ShaderSource, ShaderStage};
