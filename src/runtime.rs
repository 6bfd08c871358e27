mod context;
mod error;
mod image_service;
mod quiz_service;

pub use context::AppContext;
pub use error::{AppError, Result};
pub use image_service::{FrameReport, ImageService, RenderReport, RenderRequest};
pub use quiz_service::{BankReport, QuizService};
