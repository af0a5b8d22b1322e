use crate::render::shaders::ShaderStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unable to initialize the rendering context: {0}")]
    ContextUnavailable(String),

    #[error("An error occurred compiling the {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("Unable to initialize the shader program: {log}")]
    Link { log: String },

    #[error("Failed to allocate {resource}: {reason}")]
    Allocation {
        resource: &'static str,
        reason: String,
    },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(#[from] MeshError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: usize },

    #[error("{colors} colors supplied for {positions} positions")]
    ColorCountMismatch { positions: usize, colors: usize },

    #[error("{0} vertices cannot be addressed with 16-bit indices")]
    TooManyVertices(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
