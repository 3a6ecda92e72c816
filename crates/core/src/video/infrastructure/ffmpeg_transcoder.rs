use std::path::{Path, PathBuf};

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::util::frame::audio::Audio as AudioFrame;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{ChannelLayout, Rational};
use thiserror::Error;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::media_info::{estimate_total_frames, AudioInfo, MediaInfo};
use crate::shared::transcode_settings::TranscodeSettings;
use crate::video::domain::video_transcoder::{ProgressFn, VideoTranscoder};
use crate::video::infrastructure::sample_fifo::SampleFifo;

/// `AVFormatContext::duration` is expressed in these units.
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Frame size for encoders that accept any number of samples per frame.
const VARIABLE_FRAME_SIZE: usize = 1024;

/// Spare output capacity per resampler call, on top of the rate-scaled
/// input length, for samples buffered inside libswresample.
const RESAMPLE_HEADROOM: usize = 256;

const FLUSH_FRAME_SAMPLES: usize = 4096;

const ENCODER_PIXEL_FORMAT: Pixel = Pixel::YUV420P;
const ENCODER_SAMPLE_FORMAT: Sample = Sample::F32(SampleType::Planar);

/// Audio is always written as stereo, whatever the source layout.
const OUTPUT_CHANNEL_LAYOUT: ChannelLayout = ChannelLayout::STEREO;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("transcoder has no open input")]
    NotOpened,
    #[error("no video stream found in {0}")]
    NoVideoStream(PathBuf),
    #[error("encoder '{0}' is not available in this FFmpeg build")]
    EncoderNotFound(String),
    #[error("encoder '{codec}' does not accept {format}")]
    UnsupportedFormat { codec: String, format: String },
    #[error("output stream {0} missing after header was written")]
    MissingOutputStream(usize),
}

/// Transcodes a whole file in-process via ffmpeg-next.
///
/// The best video stream is re-encoded to YUV420P with the configured video
/// encoder. The best audio stream, if any, is resampled to planar float and
/// re-encoded with the configured audio encoder. Everything else is dropped.
pub struct FfmpegTranscoder {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    info: Option<MediaInfo>,
    video_stream_index: usize,
    audio_stream_index: Option<usize>,
    consumed: bool,
}

// Safety: FfmpegTranscoder is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegTranscoder {}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            info: None,
            video_stream_index: 0,
            audio_stream_index: None,
            consumed: false,
        }
    }

    pub fn info(&self) -> Option<&MediaInfo> {
        self.info.as_ref()
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoTranscoder for FfmpegTranscoder {
    fn open(&mut self, path: &Path) -> Result<MediaInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let (video_stream_index, width, height, fps, container_frames, video_codec) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| TranscodeError::NoVideoStream(path.to_path_buf()))?;
            let decoder =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
                    .decoder()
                    .video()?;

            let mut fps = rational_to_f64(stream.rate());
            if fps <= 0.0 {
                fps = rational_to_f64(stream.avg_frame_rate());
            }

            (
                stream.index(),
                decoder.width(),
                decoder.height(),
                fps,
                stream.frames(),
                decoder
                    .codec()
                    .map(|c| c.name().to_string())
                    .unwrap_or_default(),
            )
        };

        let audio = match ictx.streams().best(ffmpeg_next::media::Type::Audio) {
            Some(stream) => {
                let decoder =
                    ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
                        .decoder()
                        .audio()?;
                Some((
                    stream.index(),
                    AudioInfo {
                        sample_rate: decoder.rate(),
                        channels: decoder.channels() as u16,
                        codec: decoder
                            .codec()
                            .map(|c| c.name().to_string())
                            .unwrap_or_default(),
                    },
                ))
            }
            None => None,
        };

        let duration_secs = if ictx.duration() > 0 {
            ictx.duration() as f64 / AV_TIME_BASE
        } else {
            0.0
        };

        let info = MediaInfo {
            width,
            height,
            fps,
            total_frames: estimate_total_frames(container_frames, duration_secs, fps),
            duration_secs,
            video_codec,
            audio: audio.as_ref().map(|(_, info)| info.clone()),
            source_path: Some(path.to_path_buf()),
        };

        log::debug!(
            "Opened {}: {}x{} @ {:.2} fps, {} frames, video={}, audio={:?}",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.total_frames,
            info.video_codec,
            info.audio
        );

        self.video_stream_index = video_stream_index;
        self.audio_stream_index = audio.map(|(index, _)| index);
        self.info = Some(info.clone());
        self.input_ctx = Some(ictx);
        self.consumed = false;

        Ok(info)
    }

    fn transcode(
        &mut self,
        output: &Path,
        settings: &TranscodeSettings,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let info = self.info.clone().ok_or(TranscodeError::NotOpened)?;
        let ictx = self.input_ctx.as_mut().ok_or(TranscodeError::NotOpened)?;

        // Packets were already read by an earlier call; start from the top.
        if self.consumed {
            if let Some(source) = info.source_path.as_ref() {
                *ictx = ffmpeg_next::format::input(source)?;
            }
        }
        self.consumed = true;

        let mut octx = ffmpeg_next::format::output(output)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut video = VideoPipeline::new(
            ictx,
            self.video_stream_index,
            &info,
            &mut octx,
            settings,
            global_header,
        )?;
        let mut audio = match self.audio_stream_index {
            Some(index) => Some(AudioPipeline::new(
                ictx,
                index,
                &mut octx,
                settings,
                global_header,
            )?),
            None => None,
        };

        octx.write_header()?;

        video.ost_time_base = output_time_base(&octx, video.ost_index)?;
        if let Some(audio) = audio.as_mut() {
            audio.ost_time_base = output_time_base(&octx, audio.ost_index)?;
        }

        log::info!(
            "Transcoding {} -> {} ({} + {})",
            info.source_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            output.display(),
            settings.video_codec,
            if audio.is_some() {
                settings.audio_codec.as_str()
            } else {
                "no audio"
            }
        );

        let total = info.total_frames;
        let mut report = |current: usize| {
            if let Some(progress) = progress.as_mut() {
                progress(current, total.max(current));
            }
        };

        for (stream, packet) in ictx.packets() {
            let index = stream.index();
            if index == video.input_index {
                video.decoder.send_packet(&packet)?;
                video.drain_decoder(&mut octx, &mut report)?;
            } else if let Some(audio) = audio.as_mut().filter(|a| a.input_index == index) {
                audio.decoder.send_packet(&packet)?;
                audio.drain_decoder(&mut octx)?;
            }
        }

        video.finish(&mut octx, &mut report)?;
        if let Some(audio) = audio.as_mut() {
            audio.finish(&mut octx)?;
        }

        octx.write_trailer()?;

        log::info!(
            "Encoded {} video frames{}",
            video.frame_count,
            audio
                .as_ref()
                .map(|a| format!(", {} audio samples", a.next_pts))
                .unwrap_or_default()
        );

        Ok(())
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.info = None;
        self.audio_stream_index = None;
        self.consumed = false;
    }
}

/// Decoder -> swscale -> video encoder for the selected video stream.
struct VideoPipeline {
    input_index: usize,
    ost_index: usize,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    width: u32,
    height: u32,
    enc_time_base: Rational,
    ost_time_base: Rational,
    frame_count: usize,
}

impl VideoPipeline {
    fn new(
        ictx: &ffmpeg_next::format::context::Input,
        input_index: usize,
        info: &MediaInfo,
        octx: &mut ffmpeg_next::format::context::Output,
        settings: &TranscodeSettings,
        global_header: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx.stream(input_index).ok_or_else(|| {
            TranscodeError::NoVideoStream(info.source_path.clone().unwrap_or_default())
        })?;
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let codec = find_encoder(&settings.video_codec)?;
        if let Some(mut formats) = codec.video()?.formats() {
            if !formats.any(|f| f == ENCODER_PIXEL_FORMAT) {
                return Err(TranscodeError::UnsupportedFormat {
                    codec: settings.video_codec.clone(),
                    format: format!("{ENCODER_PIXEL_FORMAT:?}"),
                }
                .into());
            }
        }

        let fps = encoder_fps(info.fps);
        let enc_time_base = Rational(1, fps);

        let mut ost = octx.add_stream(Some(codec))?;
        let ost_index = ost.index();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(info.width);
        encoder_ctx.set_height(info.height);
        encoder_ctx.set_format(ENCODER_PIXEL_FORMAT);
        encoder_ctx.set_time_base(enc_time_base);
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        encoder_ctx.set_bit_rate(settings.video_bit_rate);
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(enc_time_base);

        log::debug!(
            "Video encoder {} opened: {}x{} @ {fps} fps, {} b/s",
            settings.video_codec,
            info.width,
            info.height,
            settings.video_bit_rate
        );

        Ok(Self {
            input_index,
            ost_index,
            decoder,
            scaler: None,
            encoder,
            width: info.width,
            height: info.height,
            enc_time_base,
            ost_time_base: enc_time_base,
            frame_count: 0,
        })
    }

    fn drain_decoder(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
        report: &mut dyn FnMut(usize),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut converted = VideoFrame::empty();
            self.scaler_for(&decoded)?.run(&decoded, &mut converted)?;
            converted.set_pts(Some(self.frame_count as i64));

            self.encoder.send_frame(&converted)?;
            write_packets(
                &mut self.encoder,
                octx,
                self.ost_index,
                self.enc_time_base,
                self.ost_time_base,
            )?;

            self.frame_count += 1;
            report(self.frame_count);
        }
        Ok(())
    }

    /// Builds the scaler on the first frame, and again if the source
    /// dimensions or pixel format change mid-stream.
    fn scaler_for(
        &mut self,
        frame: &VideoFrame,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context, ffmpeg_next::Error> {
        let stale = match self.scaler.as_ref() {
            Some(scaler) => {
                let input = scaler.input();
                input.format != frame.format()
                    || input.width != frame.width()
                    || input.height != frame.height()
            }
            None => true,
        };

        if stale {
            self.scaler = None;
        }

        match self.scaler {
            Some(ref mut scaler) => Ok(scaler),
            None => {
                let scaler = ffmpeg_next::software::scaling::Context::get(
                    frame.format(),
                    frame.width(),
                    frame.height(),
                    ENCODER_PIXEL_FORMAT,
                    self.width,
                    self.height,
                    ffmpeg_next::software::scaling::Flags::BILINEAR,
                )?;
                Ok(self.scaler.insert(scaler))
            }
        }
    }

    fn finish(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
        report: &mut dyn FnMut(usize),
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.decoder.send_eof()?;
        self.drain_decoder(octx, report)?;

        self.encoder.send_eof()?;
        write_packets(
            &mut self.encoder,
            octx,
            self.ost_index,
            self.enc_time_base,
            self.ost_time_base,
        )?;
        Ok(())
    }
}

/// Decoder -> swresample -> sample FIFO -> audio encoder for the selected
/// audio stream.
struct AudioPipeline {
    input_index: usize,
    ost_index: usize,
    decoder: ffmpeg_next::decoder::Audio,
    resampler: ffmpeg_next::software::resampling::Context,
    encoder: ffmpeg_next::codec::encoder::audio::Encoder,
    fifo: SampleFifo,
    frame_size: usize,
    layout: ChannelLayout,
    in_layout: ChannelLayout,
    in_rate: u32,
    out_rate: u32,
    enc_time_base: Rational,
    ost_time_base: Rational,
    next_pts: i64,
}

impl AudioPipeline {
    fn new(
        ictx: &ffmpeg_next::format::context::Input,
        input_index: usize,
        octx: &mut ffmpeg_next::format::context::Output,
        settings: &TranscodeSettings,
        global_header: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .stream(input_index)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .audio()?;

        let layout = OUTPUT_CHANNEL_LAYOUT;
        let out_rate = settings.audio_sample_rate;
        let (in_layout, in_rate) = resolve_input_format(
            decoder.channel_layout(),
            decoder.channels() as u16,
            decoder.rate(),
            out_rate,
        );

        let resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            in_layout,
            in_rate,
            ENCODER_SAMPLE_FORMAT,
            layout,
            out_rate,
        )?;

        let codec = find_encoder(&settings.audio_codec)?;
        if let Some(mut formats) = codec.audio()?.formats() {
            if !formats.any(|f| f == ENCODER_SAMPLE_FORMAT) {
                return Err(TranscodeError::UnsupportedFormat {
                    codec: settings.audio_codec.clone(),
                    format: format!("{ENCODER_SAMPLE_FORMAT:?}"),
                }
                .into());
            }
        }

        let enc_time_base = Rational(1, out_rate as i32);

        let mut ost = octx.add_stream(Some(codec))?;
        let ost_index = ost.index();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()?;
        encoder_ctx.set_rate(out_rate as i32);
        encoder_ctx.set_channel_layout(layout);
        encoder_ctx.set_format(ENCODER_SAMPLE_FORMAT);
        encoder_ctx.set_bit_rate(settings.audio_bit_rate);
        encoder_ctx.set_time_base(enc_time_base);
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_as(codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(enc_time_base);

        let frame_size = match encoder.frame_size() as usize {
            0 => VARIABLE_FRAME_SIZE,
            n => n,
        };

        log::debug!(
            "Audio encoder {} opened: {} Hz, {} channels, frame size {frame_size}",
            settings.audio_codec,
            out_rate,
            layout.channels()
        );

        Ok(Self {
            input_index,
            ost_index,
            decoder,
            resampler,
            encoder,
            fifo: SampleFifo::new(layout.channels() as usize),
            frame_size,
            layout,
            in_layout,
            in_rate,
            out_rate,
            enc_time_base,
            ost_time_base: enc_time_base,
            next_pts: 0,
        })
    }

    fn drain_decoder(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut decoded = AudioFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            fill_missing_format(&mut decoded, self.in_layout, self.in_rate);
            let capacity = resampled_capacity(decoded.samples(), self.in_rate, self.out_rate);
            let mut resampled = AudioFrame::new(ENCODER_SAMPLE_FORMAT, capacity, self.layout);
            self.resampler.run(&decoded, &mut resampled)?;
            self.push_resampled(&resampled);
            self.encode_full_frames(octx)?;
        }
        Ok(())
    }

    fn push_resampled(&mut self, frame: &AudioFrame) {
        let samples = frame.samples();
        if samples == 0 {
            return;
        }
        let planes: Vec<Vec<f32>> = (0..self.fifo.channels())
            .map(|ch| plane_to_f32(frame.data(ch), samples))
            .collect();
        let chunks: Vec<&[f32]> = planes.iter().map(|p| p.as_slice()).collect();
        self.fifo.push(&chunks);
    }

    fn encode_full_frames(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
    ) -> Result<(), Box<dyn std::error::Error>> {
        while let Some(planes) = self.fifo.pop(self.frame_size) {
            self.encode_planes(&planes, octx)?;
        }
        Ok(())
    }

    fn encode_planes(
        &mut self,
        planes: &[Vec<f32>],
        octx: &mut ffmpeg_next::format::context::Output,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let samples = planes[0].len();
        let mut frame = AudioFrame::new(ENCODER_SAMPLE_FORMAT, samples, self.layout);
        frame.set_rate(self.out_rate);
        frame.set_pts(Some(self.next_pts));

        for (ch, plane) in planes.iter().enumerate() {
            let dst = frame.data_mut(ch);
            for (bytes, sample) in dst.chunks_exact_mut(4).zip(plane) {
                bytes.copy_from_slice(&sample.to_ne_bytes());
            }
        }

        self.encoder.send_frame(&frame)?;
        self.next_pts += samples as i64;

        write_packets(
            &mut self.encoder,
            octx,
            self.ost_index,
            self.enc_time_base,
            self.ost_time_base,
        )
    }

    fn finish(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.decoder.send_eof()?;
        self.drain_decoder(octx)?;

        // libswresample may still hold samples.
        loop {
            let mut resampled =
                AudioFrame::new(ENCODER_SAMPLE_FORMAT, FLUSH_FRAME_SAMPLES, self.layout);
            self.resampler.flush(&mut resampled)?;
            if resampled.samples() == 0 {
                break;
            }
            self.push_resampled(&resampled);
        }
        self.encode_full_frames(octx)?;

        if let Some(planes) = self.fifo.drain() {
            self.encode_planes(&planes, octx)?;
        }

        self.encoder.send_eof()?;
        write_packets(
            &mut self.encoder,
            octx,
            self.ost_index,
            self.enc_time_base,
            self.ost_time_base,
        )
    }
}

/// Channel layout and sample rate the resampler is configured with. Streams
/// that leave either unset get the default layout for their channel count
/// and `fallback_rate`.
fn resolve_input_format(
    layout: ChannelLayout,
    channels: u16,
    rate: u32,
    fallback_rate: u32,
) -> (ChannelLayout, u32) {
    let layout = if layout.is_empty() {
        log::warn!("Audio stream has no channel layout, assuming default for {channels} channels");
        ChannelLayout::default(i32::from(channels.max(1)))
    } else {
        layout
    };
    let rate = if rate == 0 { fallback_rate } else { rate };
    (layout, rate)
}

/// Stamps the resolved input layout and rate onto decoded frames that carry
/// none, so they match what the resampler was built with.
fn fill_missing_format(frame: &mut AudioFrame, layout: ChannelLayout, rate: u32) {
    if frame.channel_layout().is_empty() {
        frame.set_channel_layout(layout);
    }
    if frame.rate() == 0 {
        frame.set_rate(rate);
    }
}

fn find_encoder(name: &str) -> Result<ffmpeg_next::Codec, TranscodeError> {
    ffmpeg_next::encoder::find_by_name(name)
        .ok_or_else(|| TranscodeError::EncoderNotFound(name.to_string()))
}

fn output_time_base(
    octx: &ffmpeg_next::format::context::Output,
    index: usize,
) -> Result<Rational, TranscodeError> {
    octx.stream(index)
        .map(|s| s.time_base())
        .ok_or(TranscodeError::MissingOutputStream(index))
}

/// Moves every packet the encoder has ready into the muxer.
fn write_packets(
    encoder: &mut ffmpeg_next::encoder::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    stream_idx: usize,
    enc_time_base: Rational,
    ost_time_base: Rational,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(stream_idx);
        encoded.rescale_ts(enc_time_base, ost_time_base);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}

fn rational_to_f64(rate: Rational) -> f64 {
    if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}

/// Integral encoder frame rate; falls back when the source rate is unknown.
fn encoder_fps(fps: f64) -> i32 {
    let rounded = fps.round() as i32;
    if rounded <= 0 {
        log::warn!("Unknown source frame rate, encoding at {FALLBACK_FPS} fps");
        FALLBACK_FPS
    } else {
        rounded
    }
}

/// Output samples needed for `input_samples` converted from `in_rate` to
/// `out_rate`, rounded up, plus headroom.
fn resampled_capacity(input_samples: usize, in_rate: u32, out_rate: u32) -> usize {
    let in_rate = in_rate.max(1) as usize;
    let scaled = (input_samples * out_rate as usize).div_ceil(in_rate);
    scaled + RESAMPLE_HEADROOM
}

/// Reads `samples` native-endian f32 values from a raw plane.
fn plane_to_f32(bytes: &[u8], samples: usize) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .take(samples)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
