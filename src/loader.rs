mod error;
mod file;
mod image_id;
mod registry;
mod web;

#[cfg(test)]
mod tests;

pub use error::{LoadError, Result};
pub use file::FileLoader;
pub use image_id::ImageId;
pub use registry::{ImageLoader, LoaderRegistry, select_frame};
pub use web::{HttpFetcher, WadoUriLoader, WebImageLoader};
