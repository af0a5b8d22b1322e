pub mod rendering;

pub use rendering::{AppConfig, LoggingConfig, RenderConfig, WindowConfig};
