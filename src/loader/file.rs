use std::path::PathBuf;

use crate::formats::read_frames;
use crate::model::Frame;

use super::{ImageId, ImageLoader, Result, select_frame};

/// Local files: `dicomfile:/scans/ct.dcm` or `file:///scans/ct.png`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    pub fn path_for(id: &ImageId) -> PathBuf {
        let location = id.location();
        PathBuf::from(location.strip_prefix("//").unwrap_or(location))
    }
}

impl ImageLoader for FileLoader {
    fn name(&self) -> &'static str {
        "file"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["dicomfile", "file"]
    }

    fn load(&self, id: &ImageId) -> Result<Frame> {
        select_frame(id, read_frames(Self::path_for(id))?)
    }
}
