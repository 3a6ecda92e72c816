use std::path::Path;

use crate::shared::media_info::MediaInfo;
use crate::shared::transcode_settings::TranscodeSettings;

/// Progress callback: `(frames_encoded, total_frames)`.
/// `total_frames` is 0 when the source length is unknown.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// Converts one opened source into a new file.
///
/// Implementations own the decoding/encoding library handles; the use case
/// only sees `MediaInfo` and `TranscodeSettings`.
pub trait VideoTranscoder: Send {
    /// Opens a video file and returns what it contains.
    fn open(&mut self, path: &Path) -> Result<MediaInfo, Box<dyn std::error::Error>>;

    /// Blocks until the whole source has been written to `output`.
    fn transcode(
        &mut self,
        output: &Path,
        settings: &TranscodeSettings,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Releases the source. Safe to call more than once.
    fn close(&mut self);
}
