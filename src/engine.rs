mod error;
mod imaging;
mod module;
mod render;
mod tools;
mod viewport;


pub use error::{EngineError, Result};
pub use imaging::{Capabilities, ImagingRuntime, RuntimeBootstrap, RuntimeOptions};
pub use module::{BootstrapReport, ModuleFailure, ModuleLoader, ModuleSpec, RuntimeModule};
pub use render::RenderedImage;
pub use tools::{Binding, ToolBindings, ToolName, ToolRegistry};
pub use viewport::{Container, Rotation, ScaleBounds, SoftwareViewport, Viewport, ViewportController};
