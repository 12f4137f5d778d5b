//! Still-image capture from a file or directory.
//!
//! Lists image files up front (sorted, optionally filtered and
//! depth-limited) and decodes them one per `read`.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::frame::Frame;
use crate::fs::list_files;

pub const DEFAULT_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png"];

/// Iterates decoded images from a path.
pub struct ImageCapture {
    root: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl ImageCapture {
    /// Build a capture over `path`: a single image file, or a directory
    /// listed recursively with the given filters.
    pub fn new(
        path: &Path,
        valid_exts: &[&str],
        contains: Option<&str>,
        level: Option<usize>,
    ) -> Result<Self> {
        let pending: VecDeque<PathBuf> = if path.is_file() {
            VecDeque::from([path.to_path_buf()])
        } else if path.is_dir() {
            list_files(path, valid_exts, contains, level)?.into()
        } else {
            return Err(anyhow!("no such file or directory: {}", path.display()));
        };
        Ok(Self {
            root: path.to_path_buf(),
            pending,
        })
    }

    /// The path the capture was created with.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of images not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Decode the next image, `None` once the listing is exhausted.
    pub fn read(&mut self) -> Result<Option<(PathBuf, Frame)>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        Ok(Some((path, Frame::from_image(image))))
    }
}
