pub const DEFAULT_MEDIA_DIR: &[&str] = &["public", "video"];
pub const DEFAULT_INPUT_NAME: &str = "anime.mp4";
pub const DEFAULT_OUTPUT_NAME: &str = "anime.webm";

/// WebM is VP8 video plus Vorbis audio.
pub const VIDEO_CODEC: &str = "libvpx";
pub const AUDIO_CODEC: &str = "libvorbis";

pub const VIDEO_BIT_RATE: usize = 1_000_000;
pub const AUDIO_BIT_RATE: usize = 128_000;
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Used when the source stream does not report a usable frame rate.
pub const FALLBACK_FPS: i32 = 30;

/// Frames between progress bar redraws.
pub const PROGRESS_THROTTLE_FRAMES: usize = 10;
pub const PROGRESS_BAR_WIDTH: usize = 30;
