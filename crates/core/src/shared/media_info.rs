use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub codec: String,
}

/// What opening a source reports before any transcoding starts.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container frame count, or `duration * fps` when the container does not
    /// record one. Zero when neither is known.
    pub total_frames: usize,
    pub duration_secs: f64,
    pub video_codec: String,
    pub audio: Option<AudioInfo>,
    pub source_path: Option<PathBuf>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// Picks the frame count to report progress against.
pub fn estimate_total_frames(container_frames: i64, duration_secs: f64, fps: f64) -> usize {
    if container_frames > 0 {
        return container_frames as usize;
    }
    if duration_secs > 0.0 && fps > 0.0 {
        return (duration_secs * fps).round() as usize;
    }
    0
}
