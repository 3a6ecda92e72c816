use std::path::{Path, PathBuf};

use crate::shared::constants::{DEFAULT_INPUT_NAME, DEFAULT_MEDIA_DIR, DEFAULT_OUTPUT_NAME};

/// Source and destination of a single conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl MediaPaths {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// `public/video/anime.mp4` -> `public/video/anime.webm`, relative to the
    /// working directory.
    pub fn default_relative() -> Self {
        Self::under(default_media_dir())
    }

    /// The default file names joined onto `dir`.
    pub fn under(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_INPUT_NAME), dir.join(DEFAULT_OUTPUT_NAME))
    }

    pub fn input_exists(&self) -> bool {
        self.input.exists()
    }
}

impl Default for MediaPaths {
    fn default() -> Self {
        Self::default_relative()
    }
}

pub fn default_media_dir() -> PathBuf {
    DEFAULT_MEDIA_DIR.iter().collect()
}
