use std::collections::HashMap;
use std::sync::Arc;

use crate::model::Frame;

use super::{ImageId, LoadError, Result};

/// Resolves identifiers of one or more schemes into decoded frames.
pub trait ImageLoader: Send + Sync {
    fn name(&self) -> &'static str;
    fn schemes(&self) -> &'static [&'static str];
    fn load(&self, id: &ImageId) -> Result<Frame>;
}

/// Picks the frame the identifier asks for, the first one by default.
pub fn select_frame(id: &ImageId, frames: Vec<Frame>) -> Result<Frame> {
    let index = id.frame().unwrap_or(0);
    let count = frames.len();
    frames
        .into_iter()
        .nth(index)
        .ok_or_else(|| LoadError::FrameOutOfRange {
            id: id.raw().to_string(),
            index,
            frames: count,
        })
}

/// One loader per scheme; identifiers are dispatched on their scheme prefix.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn ImageLoader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LoaderRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, loader: Arc<dyn ImageLoader>) -> Result<()> {
        if let Some(taken) = loader
            .schemes()
            .iter()
            .find(|scheme| self.loaders.contains_key(**scheme))
        {
            return Err(LoadError::DuplicateScheme((*taken).to_string()));
        }
        for scheme in loader.schemes() {
            self.loaders.insert((*scheme).to_string(), Arc::clone(&loader));
        }
        log::debug!(
            "registered image loader `{}` for {:?}",
            loader.name(),
            loader.schemes()
        );
        Ok(())
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut schemes = self.loaders.keys().cloned().collect::<Vec<_>>();
        schemes.sort();
        schemes
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.loaders.contains_key(&scheme.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn resolve(&self, raw: &str) -> Result<(ImageId, Arc<dyn ImageLoader>)> {
        let id = ImageId::parse(raw)?;
        let loader = self
            .loaders
            .get(id.scheme())
            .cloned()
            .ok_or_else(|| LoadError::UnknownScheme(id.scheme().to_string()))?;
        Ok((id, loader))
    }

    pub fn load(&self, raw: &str) -> Result<Frame> {
        let (id, loader) = self.resolve(raw)?;
        log::debug!("loading `{id}` with `{}`", loader.name());
        loader.load(&id)
    }
}
