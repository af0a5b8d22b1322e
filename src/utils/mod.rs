pub mod diagnostics;
pub mod error;
pub mod logging;

pub use diagnostics::{CollectedDiagnostics, Diagnostics, LogDiagnostics};
pub use error::{ConfigError, MeshError, RenderError};
