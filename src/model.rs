mod error;
mod frame;
mod metadata;

#[cfg(test)]
mod tests;

pub use error::{CoreError, Result};
pub use frame::Frame;
pub use metadata::{FrameMetadata, Photometric, PixelType, WindowLevel};
