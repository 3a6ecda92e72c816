use crate::shared::constants::{
    AUDIO_BIT_RATE, AUDIO_CODEC, AUDIO_SAMPLE_RATE, VIDEO_BIT_RATE, VIDEO_CODEC,
};

/// Target format of a conversion. Codec names are FFmpeg encoder names.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bit_rate: usize,
    pub audio_bit_rate: usize,
    pub audio_sample_rate: u32,
}

impl TranscodeSettings {
    pub fn webm() -> Self {
        Self {
            video_codec: VIDEO_CODEC.to_string(),
            audio_codec: AUDIO_CODEC.to_string(),
            video_bit_rate: VIDEO_BIT_RATE,
            audio_bit_rate: AUDIO_BIT_RATE,
            audio_sample_rate: AUDIO_SAMPLE_RATE,
        }
    }
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self::webm()
    }
}
