use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use tempfile::tempdir;

use super::{FileLoader, ImageId, ImageLoader, LoadError, LoaderRegistry, Result, select_frame};
use crate::formats::write_gray_png;
use crate::model::{Frame, PixelType};

#[derive(Default)]
struct CountingLoader {
    calls: AtomicUsize,
}

impl ImageLoader for CountingLoader {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["mem"]
    }

    fn load(&self, _id: &ImageId) -> Result<Frame> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::from_data(Array2::zeros((2, 2)), PixelType::U8).expect("frame"))
    }
}

#[test]
fn bare_identifiers_become_https_urls() {
    let id = ImageId::parse("example.org/images/chest.png").expect("parse");
    assert_eq!(id.scheme(), "https");
    assert_eq!(id.url(), "https://example.org/images/chest.png");

    let id = ImageId::parse("//cdn.example.org/a.jpg").expect("parse");
    assert_eq!(id.url(), "https://cdn.example.org/a.jpg");

    let id = ImageId::parse("localhost:8080/a.png").expect("parse");
    assert_eq!(id.url(), "https://localhost:8080/a.png");
}

#[test]
fn scheme_prefixed_identifiers_keep_their_scheme_and_frame() {
    let id = ImageId::parse("wadouri:http://pacs.local/wado?study=1&frame=3&series=2")
        .expect("parse");
    assert_eq!(id.scheme(), "wadouri");
    assert_eq!(id.location(), "http://pacs.local/wado?study=1&series=2");
    assert_eq!(id.frame(), Some(3));

    let id = ImageId::parse("HTTPS://example.org/x.png").expect("parse");
    assert_eq!(id.scheme(), "https");
    assert_eq!(id.frame(), None);
}

#[test]
fn malformed_identifiers_are_rejected() {
    assert!(matches!(
        ImageId::parse("   "),
        Err(LoadError::InvalidIdentifier(_))
    ));
    assert!(ImageId::parse("dicomfile:").is_err());
    assert!(ImageId::parse("wadouri:http://x/y?frame=abc").is_err());
}

#[test]
fn registry_dispatches_by_scheme_and_rejects_duplicates() {
    let loader = Arc::new(CountingLoader::default());
    let mut registry = LoaderRegistry::new();
    registry.register(loader.clone()).expect("register");
    assert!(registry.supports("MEM"));

    registry.load("mem:slot-1").expect("load");
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

    let duplicate = registry.register(Arc::new(CountingLoader::default()));
    assert!(matches!(duplicate, Err(LoadError::DuplicateScheme(scheme)) if scheme == "mem"));

    let unknown = registry.load("ftp:somewhere/a.dcm");
    assert!(matches!(unknown, Err(LoadError::UnknownScheme(scheme)) if scheme == "ftp"));
}

#[test]
fn file_loader_reads_local_images() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("knee.png");
    write_gray_png(&path, 2, 1, &[10, 20]).expect("write");

    let mut registry = LoaderRegistry::new();
    registry.register(Arc::new(FileLoader)).expect("register");
    let frame = registry
        .load(&format!("dicomfile:{}", path.display()))
        .expect("load");
    assert_eq!(frame.data[[0, 1]], 20.0);
    assert_eq!(registry.schemes(), vec!["dicomfile", "file"]);
}

#[test]
fn file_urls_strip_the_authority_slashes() {
    let id = ImageId::parse("file:///scans/ct.dcm").expect("parse");
    assert_eq!(
        FileLoader::path_for(&id),
        std::path::PathBuf::from("/scans/ct.dcm")
    );
}

#[test]
fn frame_selection_reports_out_of_range() {
    let id = ImageId::parse("mem:stack?frame=2").expect("parse");
    let frames = vec![Frame::from_data(Array2::zeros((1, 1)), PixelType::U8).expect("frame")];
    let error = select_frame(&id, frames).expect_err("out of range");
    assert!(matches!(
        error,
        LoadError::FrameOutOfRange {
            index: 2,
            frames: 1,
            ..
        }
    ));
}
