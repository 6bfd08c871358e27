use std::io::Read;
use std::time::Duration;

use crate::formats::{decode_bytes, decode_dicom};
use crate::model::Frame;

use super::{ImageId, ImageLoader, LoadError, Result, select_frame};

#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpFetcher")
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            max_bytes,
        }
    }

    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.agent.get(url).call().map_err(|error| LoadError::Http {
            url: url.to_string(),
            message: error.to_string(),
        })?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(LoadError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(bytes)
    }
}

/// `http:` / `https:` images. The payload is sniffed, so DICOM served over plain HTTP works
/// as well as PNG or JPEG.
#[derive(Debug, Clone)]
pub struct WebImageLoader {
    fetcher: HttpFetcher,
}

impl WebImageLoader {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

impl ImageLoader for WebImageLoader {
    fn name(&self) -> &'static str {
        "web-image"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["http", "https"]
    }

    fn load(&self, id: &ImageId) -> Result<Frame> {
        let url = id.url();
        let bytes = self.fetcher.fetch(&url)?;
        select_frame(id, decode_bytes(&bytes, id.raw())?)
    }
}

/// `wadouri:<http url>` objects, always decoded as DICOM.
#[derive(Debug, Clone)]
pub struct WadoUriLoader {
    fetcher: HttpFetcher,
}

impl WadoUriLoader {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

impl ImageLoader for WadoUriLoader {
    fn name(&self) -> &'static str {
        "wado-uri"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["wadouri"]
    }

    fn load(&self, id: &ImageId) -> Result<Frame> {
        let bytes = self.fetcher.fetch(id.location())?;
        select_frame(id, decode_dicom(&bytes, id.raw())?)
    }
}
