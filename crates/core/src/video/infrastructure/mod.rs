pub mod ffmpeg_transcoder;
mod sample_fifo;
